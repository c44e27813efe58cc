use crate::config::get_cache_path;
use crate::domain::models::CatalogEpisode;
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Cache {
    pub series: HashMap<String, String>, // series_id -> series_name
    pub episodes: HashMap<String, Vec<CatalogEpisode>>, // series_id -> episodes
    #[serde(skip)]
    path: PathBuf,
}

impl Cache {
    pub fn load() -> Self {
        Self::load_from(&get_cache_path())
    }

    pub fn load_from(cache_path: &Path) -> Self {
        debug!("Using cache path: {}", cache_path.display());
        let mut cache = fs::read_to_string(cache_path)
            .ok()
            .and_then(|content| serde_json::from_str::<Cache>(&content).ok())
            .unwrap_or_default();
        cache.path = cache_path.to_path_buf();
        cache
    }

    pub fn save(&self) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get_series_name(&self, series_id: &str) -> Option<&String> {
        self.series.get(series_id)
    }

    pub fn set_series_name(&mut self, series_id: String, name: String) {
        self.series.insert(series_id, name);
    }

    pub fn get_episodes(&self, series_id: &str) -> Option<&[CatalogEpisode]> {
        self.episodes.get(series_id).map(Vec::as_slice)
    }

    pub fn set_episodes(&mut self, series_id: String, episodes: Vec<CatalogEpisode>) {
        self.episodes.insert(series_id, episodes);
    }

    pub fn has_series_episodes(&self, series_id: &str) -> bool {
        self.episodes
            .get(series_id)
            .is_some_and(|episodes| !episodes.is_empty())
    }
}
