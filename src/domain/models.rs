use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::matching::normalize::normalize;

static EPISODE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^s(\d{1,4})e(\d{1,4})$").unwrap());

static EPISODE_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)s(\d{1,4})e(\d{1,4})\s*-?\s*s(\d{1,4})e(\d{1,4})").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEpisodeIdError {
    #[error("invalid episode identifier '{0}', expected S<season>E<episode>")]
    Id(String),
    #[error("invalid episode range '{0}', expected S<season>E<episode>-S<season>E<episode>")]
    Range(String),
    #[error("episode range '{0}' ends before it starts")]
    Reversed(String),
}

/// Season/episode pair. Ordering is by season, then episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpisodeId {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeId {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// Reads an id from a reference file named like `S1E2.srt` or `S01E02.jpg`.
    pub fn from_file_stem(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse().ok())
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}E{}", self.season, self.episode)
    }
}

impl FromStr for EpisodeId {
    type Err = ParseEpisodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = EPISODE_ID_RE
            .captures(s.trim())
            .ok_or_else(|| ParseEpisodeIdError::Id(s.to_string()))?;
        let season = caps[1]
            .parse()
            .map_err(|_| ParseEpisodeIdError::Id(s.to_string()))?;
        let episode = caps[2]
            .parse()
            .map_err(|_| ParseEpisodeIdError::Id(s.to_string()))?;
        Ok(Self { season, episode })
    }
}

impl Serialize for EpisodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive span of episodes, e.g. `S1E1-S1E13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeRange {
    pub start: EpisodeId,
    pub end: EpisodeId,
}

impl EpisodeRange {
    /// Looks for a range anywhere in `name`; used on directory names such as `S1E1S1E13`.
    pub fn find_in(name: &str) -> Option<Self> {
        let caps = EPISODE_RANGE_RE.captures(name)?;
        let number = |i: usize| caps[i].parse::<u32>().ok();
        let range = Self {
            start: EpisodeId::new(number(1)?, number(2)?),
            end: EpisodeId::new(number(3)?, number(4)?),
        };
        (range.start <= range.end).then_some(range)
    }

    pub fn contains(&self, id: EpisodeId) -> bool {
        self.start <= id && id <= self.end
    }
}

impl FromStr for EpisodeRange {
    type Err = ParseEpisodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = EPISODE_RANGE_RE
            .captures(trimmed)
            .filter(|caps| caps[0].len() == trimmed.len())
            .ok_or_else(|| ParseEpisodeIdError::Range(s.to_string()))?;
        let number = |i: usize| {
            caps[i]
                .parse::<u32>()
                .map_err(|_| ParseEpisodeIdError::Range(s.to_string()))
        };
        let range = Self {
            start: EpisodeId::new(number(1)?, number(2)?),
            end: EpisodeId::new(number(3)?, number(4)?),
        };
        if range.start > range.end {
            return Err(ParseEpisodeIdError::Reversed(s.to_string()));
        }
        Ok(range)
    }
}

/// Episode as cached from the catalog service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl CatalogEpisode {
    pub fn id(&self) -> EpisodeId {
        EpisodeId::new(self.season_number, self.episode_number)
    }
}

/// An episode the unlabeled files may belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeCandidate {
    pub id: EpisodeId,
    pub title: Option<String>,
}

impl EpisodeCandidate {
    pub fn new(id: EpisodeId) -> Self {
        Self { id, title: None }
    }

    pub fn display_id(&self) -> String {
        self.id.to_string()
    }
}

/// Subtitle text with its comparison form computed once at construction.
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    key: String,
    raw_text: String,
    normalized_text: String,
}

impl SubtitleDocument {
    pub fn new(key: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let normalized_text = normalize(&raw_text);
        Self {
            key: key.into(),
            raw_text,
            normalized_text,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceResult {
    pub reference_key: String,
    pub candidate_key: String,
    pub distance: usize,
}

/// One frame from the frame-difference report that carried a confidence value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEvent {
    pub frame_index: u64,
    pub pts_time: f64,
    pub confidence: f64,
}

/// A run of matching frames, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchInterval {
    pub confidence: f64,
    pub start: f64,
    pub end: f64,
}

impl MatchInterval {
    pub fn at(event: &FrameEvent) -> Self {
        Self {
            confidence: event.confidence,
            start: event.pts_time,
            end: event.pts_time,
        }
    }
}
