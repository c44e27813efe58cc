use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::models::{EpisodeId, MatchInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    Subtitle,
    Video,
}

/// How strongly a file claims an episode.
///
/// Distances are better when lower; visual strengths are better when they
/// carry at least one interval, then by peak confidence, then interval count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Distance(usize),
    Visual { confidence: f64, intervals: usize },
}

impl Strength {
    /// Whether this strength is enough for the claim to be acted on.
    pub fn qualifies(&self) -> bool {
        match self {
            Strength::Distance(_) => true,
            Strength::Visual { intervals, .. } => *intervals > 0,
        }
    }

    /// `Less` means `self` is the better claim.
    pub fn cmp_best_first(&self, other: &Strength) -> Ordering {
        match (self, other) {
            (Strength::Distance(a), Strength::Distance(b)) => a.cmp(b),
            (
                Strength::Visual {
                    confidence: conf_a,
                    intervals: count_a,
                },
                Strength::Visual {
                    confidence: conf_b,
                    intervals: count_b,
                },
            ) => other
                .qualifies()
                .cmp(&self.qualifies())
                .then_with(|| conf_b.total_cmp(conf_a))
                .then_with(|| count_b.cmp(count_a)),
            (Strength::Distance(_), Strength::Visual { .. }) => Ordering::Less,
            (Strength::Visual { .. }, Strength::Distance(_)) => Ordering::Greater,
        }
    }
}

/// Assertion that `file` is `episode`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchClaim {
    pub episode: EpisodeId,
    pub file: String,
    pub source: ClaimSource,
    pub strength: Strength,
    pub intervals: Vec<MatchInterval>,
}

/// Claims for a single episode, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClaimList(Vec<MatchClaim>);

impl ClaimList {
    /// Inserts after every claim that is at least as strong, so equal claims keep insertion order.
    pub fn insert(&mut self, claim: MatchClaim) {
        let at = self
            .0
            .partition_point(|c| c.strength.cmp_best_first(&claim.strength) != Ordering::Greater);
        self.0.insert(at, claim);
    }

    pub fn best(&self) -> Option<&MatchClaim> {
        self.0.first()
    }

    pub fn runner_up(&self) -> Option<&MatchClaim> {
        self.0.get(1)
    }

    pub fn best_qualifying(&self) -> Option<&MatchClaim> {
        self.best().filter(|claim| claim.strength.qualifies())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchClaim> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Claim lists keyed by episode, iterated in episode order.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    lists: BTreeMap<EpisodeId, ClaimList>,
}

#[derive(Debug, Clone, Copy)]
pub struct EpisodeSummary<'a> {
    pub episode: EpisodeId,
    pub best: Option<&'a MatchClaim>,
    pub runner_up: Option<&'a MatchClaim>,
}

impl ClaimSet {
    /// Starts with an empty list for every episode so unmatched episodes still show up.
    pub fn with_episodes(episodes: impl IntoIterator<Item = EpisodeId>) -> Self {
        Self {
            lists: episodes
                .into_iter()
                .map(|id| (id, ClaimList::default()))
                .collect(),
        }
    }

    pub fn insert(&mut self, claim: MatchClaim) {
        self.lists.entry(claim.episode).or_default().insert(claim);
    }

    pub fn get(&self, episode: EpisodeId) -> Option<&ClaimList> {
        self.lists.get(&episode)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EpisodeId, &ClaimList)> {
        self.lists.iter().map(|(id, list)| (*id, list))
    }

    pub fn summaries(&self) -> impl Iterator<Item = EpisodeSummary<'_>> {
        self.iter().map(|(episode, list)| EpisodeSummary {
            episode,
            best: list.best(),
            runner_up: list.runner_up(),
        })
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
