use rayon::prelude::*;
use rayon::ThreadPool;

use crate::domain::models::{DistanceResult, SubtitleDocument};

/// Candidates for one reference, closest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    reference_key: String,
    results: Vec<DistanceResult>,
}

impl Ranking {
    /// Sorts by distance; ties fall back to the candidate's input position.
    fn from_scored(reference_key: &str, mut scored: Vec<(usize, DistanceResult)>) -> Self {
        scored.sort_by_key(|(position, result)| (result.distance, *position));
        Self {
            reference_key: reference_key.to_string(),
            results: scored.into_iter().map(|(_, result)| result).collect(),
        }
    }

    pub fn reference_key(&self) -> &str {
        &self.reference_key
    }

    pub fn results(&self) -> &[DistanceResult] {
        &self.results
    }

    pub fn best(&self) -> Option<&DistanceResult> {
        self.results.first()
    }

    pub fn runner_up(&self) -> Option<&DistanceResult> {
        self.results.get(1)
    }
}

/// Levenshtein distance with unit costs, case-sensitive, over the whole string.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

fn score(reference: &SubtitleDocument, candidate: &SubtitleDocument) -> DistanceResult {
    DistanceResult {
        reference_key: reference.key().to_string(),
        candidate_key: candidate.key().to_string(),
        distance: levenshtein(reference.normalized_text(), candidate.normalized_text()),
    }
}

/// Ranks `candidates` against a single reference on the current thread.
pub fn rank_candidates(reference: &SubtitleDocument, candidates: &[SubtitleDocument]) -> Ranking {
    let scored = candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| (position, score(reference, candidate)))
        .collect();
    Ranking::from_scored(reference.key(), scored)
}

/// Ranks every candidate against every reference, one pool job per pair.
///
/// Rankings come back in reference order.
pub fn rank_all(
    pool: &ThreadPool,
    references: &[SubtitleDocument],
    candidates: &[SubtitleDocument],
) -> Vec<Ranking> {
    let pairs: Vec<(usize, usize)> = (0..references.len())
        .flat_map(|r| (0..candidates.len()).map(move |c| (r, c)))
        .collect();

    let scored: Vec<(usize, usize, DistanceResult)> = pool.install(|| {
        pairs
            .par_iter()
            .map(|&(r, c)| (r, c, score(&references[r], &candidates[c])))
            .collect()
    });

    let mut per_reference: Vec<Vec<(usize, DistanceResult)>> = vec![Vec::new(); references.len()];
    for (r, c, result) in scored {
        per_reference[r].push((c, result));
    }

    references
        .iter()
        .zip(per_reference)
        .map(|(reference, scored)| Ranking::from_scored(reference.key(), scored))
        .collect()
}
