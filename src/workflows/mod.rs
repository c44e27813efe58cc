pub mod extract;
pub mod matchers;
pub mod references;
pub mod renamer;
pub mod report;
pub mod tagging;
