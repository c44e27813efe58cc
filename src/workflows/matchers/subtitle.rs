use anyhow::{Context, Result};
use log::{debug, info};
use rayon::ThreadPool;
use std::fs;
use std::path::{Path, PathBuf};

use super::Matcher;
use crate::domain::claims::{ClaimSet, ClaimSource};
use crate::domain::models::{EpisodeId, SubtitleDocument};
use crate::matching::{aggregate, distance};

/// Matches extracted `.srt` files against reference subtitles by edit distance.
pub struct SubtitleMatcher<'p> {
    episodes: Vec<EpisodeId>,
    references: Vec<SubtitleDocument>,
    pool: &'p ThreadPool,
}

impl<'p> SubtitleMatcher<'p> {
    pub fn new(references: Vec<(EpisodeId, SubtitleDocument)>, pool: &'p ThreadPool) -> Self {
        let (episodes, references) = references.into_iter().unzip();
        Self {
            episodes,
            references,
            pool,
        }
    }
}

/// Reads a subtitle file; the document key is the file name.
pub fn read_subtitle(path: &Path) -> Result<SubtitleDocument> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let key = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Invalid subtitle path {}", path.display()))?;
    let document = SubtitleDocument::new(key, String::from_utf8_lossy(&bytes));
    debug!(
        "{}: {} chars, {} after normalizing",
        document.key(),
        document.raw_text().len(),
        document.normalized_text().len()
    );
    Ok(document)
}

impl Matcher for SubtitleMatcher<'_> {
    fn source(&self) -> ClaimSource {
        ClaimSource::Subtitle
    }

    fn accepts(&self, file: &Path) -> bool {
        file.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("srt"))
    }

    fn collect_claims(&self, files: &[PathBuf]) -> Result<ClaimSet> {
        let candidates = files
            .iter()
            .map(|path| read_subtitle(path))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Running levenshtein distance for {} reference(s) x {} subtitle file(s)...",
            self.references.len(),
            candidates.len()
        );
        let rankings = distance::rank_all(self.pool, &self.references, &candidates);
        for ranking in &rankings {
            if let Some(best) = ranking.best() {
                debug!(
                    "{}: closest is {} at {}, next {}",
                    ranking.reference_key(),
                    best.candidate_key,
                    best.distance,
                    ranking
                        .runner_up()
                        .map_or_else(|| "none".to_string(), |next| next.distance.to_string())
                );
            }
        }

        Ok(aggregate::subtitle_claims(
            self.episodes.iter().copied().zip(rankings.iter()),
        ))
    }
}
