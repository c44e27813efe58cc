use crate::domain::claims::{ClaimSet, ClaimSource, MatchClaim, Strength};
use crate::domain::models::{EpisodeId, MatchInterval};

use super::distance::Ranking;

/// Outcome of comparing one video against one episode's thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct PairMatch {
    pub episode: EpisodeId,
    pub video: String,
    pub intervals: Vec<MatchInterval>,
}

/// Turns one ranking per reference episode into claims, strength being the distance.
pub fn subtitle_claims<'a>(rankings: impl IntoIterator<Item = (EpisodeId, &'a Ranking)>) -> ClaimSet {
    let rankings: Vec<(EpisodeId, &Ranking)> = rankings.into_iter().collect();
    let mut claims = ClaimSet::with_episodes(rankings.iter().map(|(id, _)| *id));

    for (episode, ranking) in rankings {
        for result in ranking.results() {
            claims.insert(MatchClaim {
                episode,
                file: result.candidate_key.clone(),
                source: ClaimSource::Subtitle,
                strength: Strength::Distance(result.distance),
                intervals: Vec::new(),
            });
        }
    }
    claims
}

/// Turns per-pair intervals into claims, strength being peak confidence and interval count.
///
/// Pairs without intervals are kept so the conflict dump shows every comparison.
pub fn video_claims(
    episodes: impl IntoIterator<Item = EpisodeId>,
    pairs: Vec<PairMatch>,
) -> ClaimSet {
    let mut claims = ClaimSet::with_episodes(episodes);

    for pair in pairs {
        let confidence = pair
            .intervals
            .iter()
            .map(|interval| interval.confidence)
            .fold(0.0, f64::max);
        claims.insert(MatchClaim {
            episode: pair.episode,
            file: pair.video,
            source: ClaimSource::Video,
            strength: Strength::Visual {
                confidence,
                intervals: pair.intervals.len(),
            },
            intervals: pair.intervals,
        });
    }
    claims
}
