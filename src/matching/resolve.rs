use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::claims::{ClaimList, ClaimSet, ClaimSource, MatchClaim};
use crate::domain::models::EpisodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(MatchClaim),
    NoMatch,
    /// Left alone because the run was conflicted; see the dump.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub episode: EpisodeId,
    pub outcome: Outcome,
}

/// First file found to be the best claim of two episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub file: String,
    pub claimed_by: EpisodeId,
    pub contested_by: EpisodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub decisions: Vec<Decision>,
    pub collision: Option<Collision>,
}

impl Resolution {
    pub fn is_conflicted(&self) -> bool {
        self.collision.is_some()
    }

    pub fn accepted(&self) -> impl Iterator<Item = &MatchClaim> {
        self.decisions.iter().filter_map(|decision| match &decision.outcome {
            Outcome::Accepted(claim) => Some(claim),
            _ => None,
        })
    }
}

/// Files an episode lays claim to when checking for collisions.
///
/// A subtitle episode claims only its closest file. A video episode claims
/// every video with a qualifying interval, so a video that shows two
/// thumbnails is always a collision whatever the confidences.
fn contested_files(list: &ClaimList) -> Vec<&MatchClaim> {
    match list.best_qualifying() {
        Some(best) if best.source == ClaimSource::Video => list
            .iter()
            .filter(|claim| claim.strength.qualifies())
            .collect(),
        Some(best) => vec![best],
        None => Vec::new(),
    }
}

fn find_collision(claims: &ClaimSet) -> Option<Collision> {
    let mut claimed: HashMap<&str, EpisodeId> = HashMap::new();

    for (episode, list) in claims.iter() {
        for claim in contested_files(list) {
            match claimed.insert(claim.file.as_str(), episode) {
                Some(previous) if previous != episode => {
                    return Some(Collision {
                        file: claim.file.clone(),
                        claimed_by: previous,
                        contested_by: episode,
                    });
                }
                _ => {}
            }
        }
    }
    None
}

/// Accepts each episode's best qualifying claim unless two episodes want the same file.
///
/// Episodes are scanned in order and the scan stops at the first reused file;
/// a conflicted run accepts nothing. For videos every qualifying claim counts,
/// not only the best one.
pub fn resolve(claims: &ClaimSet) -> Resolution {
    let collision = find_collision(claims);

    let decisions = claims
        .iter()
        .map(|(episode, list)| {
            let outcome = match (list.best_qualifying(), &collision) {
                (None, _) => Outcome::NoMatch,
                (Some(_), Some(_)) => Outcome::Unresolved,
                (Some(best), None) => Outcome::Accepted(best.clone()),
            };
            Decision { episode, outcome }
        })
        .collect();

    Resolution {
        decisions,
        collision,
    }
}

/// Writes every episode's ordered claims to `<dir>/<episode>.json`.
pub fn write_conflict_dump(claims: &ClaimSet, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create dump directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(claims.len());
    for (episode, list) in claims.iter() {
        let path = dir.join(format!("{episode}.json"));
        let content = serde_json::to_string_pretty(list)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write conflict dump {}", path.display()))?;
        debug!("Wrote {} claim(s) for {episode} to {}", list.len(), path.display());
        written.push(path);
    }
    Ok(written)
}
