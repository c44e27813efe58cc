use anyhow::{bail, Context, Result};
use log::debug;
use serde::Deserialize;
use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use crate::matching::clustering::DEFAULT_MERGE_GAP_SECS;
use crate::matching::frames::DEFAULT_CONFIDENCE_KEY;
use crate::media::ffmpeg::BlendSettings;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub tvdb_api_key: Option<String>,
    #[serde(default)]
    pub matching: MatchSettings,
}

/// `[matching]` table of the config file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Subtitle language used when extracting tracks.
    pub language: String,
    pub video_extensions: Vec<String>,
    pub merge_gap_secs: f64,
    pub blackframe_amount: u32,
    pub blackframe_threshold: u32,
    pub scale: String,
    pub confidence_key: String,
    pub jobs: Option<usize>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            video_extensions: vec!["mkv".to_string(), "mp4".to_string()],
            merge_gap_secs: DEFAULT_MERGE_GAP_SECS,
            blackframe_amount: 85,
            blackframe_threshold: 50,
            scale: "400:224".to_string(),
            confidence_key: DEFAULT_CONFIDENCE_KEY.to_string(),
            jobs: None,
        }
    }
}

impl MatchSettings {
    /// Worker count; defaults to the number of available cores.
    pub fn jobs(&self) -> usize {
        self.jobs.filter(|jobs| *jobs > 0).unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    pub fn blend(&self) -> BlendSettings {
        BlendSettings {
            scale: self.scale.clone(),
            amount: self.blackframe_amount,
            threshold: self.blackframe_threshold,
            confidence_key: self.confidence_key.clone(),
        }
    }

    pub fn is_video(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.video_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

/// Merge gaps must be finite and not negative; NaN would never merge anything.
pub fn check_merge_gap(gap: f64) -> Result<f64> {
    if !gap.is_finite() || gap < 0.0 {
        bail!("merge gap must be a finite number of seconds, not negative (got {gap})");
    }
    Ok(gap)
}

pub fn parse(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    check_merge_gap(config.matching.merge_gap_secs).context("Invalid matching.merge_gap_secs")?;
    Ok(config)
}

/// Reads the config file if there is one; a missing file means defaults.
pub fn load() -> Result<ConfigFile> {
    let config_path = get_config_path();
    if !config_path.exists() {
        debug!("No config file at {}", config_path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    parse(&content).with_context(|| format!("Invalid config file {}", config_path.display()))
}

pub fn get_tvdb_api_key(config: &ConfigFile) -> Result<String> {
    // Environment wins over the config file
    if let Ok(key) = env::var("TVDB_API_KEY") {
        return Ok(key);
    }

    if let Some(key) = &config.tvdb_api_key {
        return Ok(key.clone());
    }

    bail!("TVDB API key not found. Set TVDB_API_KEY environment variable or add tvdb_api_key = \"your-key\" to {}", get_config_path().display())
}

pub fn get_cache_path() -> PathBuf {
    get_config_dir_path().join("cache.json")
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("episode-tagger"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
