pub mod claims;
pub mod models;
