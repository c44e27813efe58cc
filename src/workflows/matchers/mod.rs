use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::domain::claims::{ClaimSet, ClaimSource};

/// Ranks unlabeled files against every reference episode.
pub trait Matcher {
    fn source(&self) -> ClaimSource;

    /// Local files this matcher consumes, picked from a directory listing.
    fn accepts(&self, file: &Path) -> bool;

    fn collect_claims(&self, files: &[PathBuf]) -> Result<ClaimSet>;
}

pub mod subtitle;
pub mod video;
