pub mod cache;
pub mod tvdb;
