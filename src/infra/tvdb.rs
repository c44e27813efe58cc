use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use crate::domain::models::CatalogEpisode;

const TVDB_API_BASE: &str = "https://api4.thetvdb.com/v4";

#[derive(Debug, Clone)]
pub struct TvdbClient {
    api_key: String,
    token: Option<String>,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: LoginData,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub tvdb_id: String,
    #[serde(rename = "translations")]
    pub name: Option<HashMap<String, String>>,
}

impl SearchResult {
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .and_then(|n| n.get("eng").or_else(|| n.values().next()))
            .map(|s| s.as_str())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    data: EpisodesData,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct EpisodesData {
    episodes: Vec<Episode>,
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Episode {
    #[serde(rename = "seasonNumber")]
    season_number: u32,
    #[serde(rename = "number")]
    episode_number: u32,
    name: Option<String>,
    image: Option<String>,
}

impl From<Episode> for CatalogEpisode {
    fn from(episode: Episode) -> Self {
        Self {
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            name: episode.name,
            image: episode.image.filter(|url| !url.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    data: SeriesData,
}

#[derive(Debug, Deserialize)]
struct SeriesData {
    pub name: String,
}

impl TvdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            token: None,
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn login(&mut self) -> Result<()> {
        let body = serde_json::json!({
            "apikey": self.api_key
        });
        let response = self
            .http
            .post(format!("{TVDB_API_BASE}/login"))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .context("Failed to reach TVDB")?;

        if !response.status().is_success() {
            bail!("TVDB login failed: HTTP {}", response.status());
        }

        let login_resp: LoginResponse = serde_json::from_str(&response.text()?)?;
        self.token = Some(login_resp.data.token);
        info!("Logged in to TVDB");
        Ok(())
    }

    fn bearer(&mut self) -> Result<String> {
        if self.token.is_none() {
            self.login()?;
        }
        let token = self.token.as_deref().context("TVDB token missing after login")?;
        Ok(format!("Bearer {token}"))
    }

    pub fn search_series(&mut self, query: &str) -> Result<Vec<SearchResult>> {
        let bearer = self.bearer()?;
        let response = self
            .http
            .get(format!("{TVDB_API_BASE}/search"))
            .header("Authorization", bearer)
            .query(&[("query", query), ("type", "series")])
            .send()?;

        if !response.status().is_success() {
            bail!("TVDB search failed: HTTP {}", response.status());
        }

        let search_resp: SearchResponse = serde_json::from_str(&response.text()?)?;
        Ok(search_resp.data)
    }

    pub fn get_series_name(&mut self, series_id: &str) -> Result<String> {
        let bearer = self.bearer()?;
        let response = self
            .http
            .get(format!("{TVDB_API_BASE}/series/{series_id}"))
            .header("Authorization", bearer)
            .send()?;

        if !response.status().is_success() {
            bail!("TVDB series lookup failed: HTTP {}", response.status());
        }

        let series_resp: SeriesResponse = serde_json::from_str(&response.text()?)?;

        Ok(series_resp.data.name)
    }

    /// All aired-order episodes of a series, following pagination.
    pub fn get_episodes(&mut self, series_id: &str) -> Result<Vec<CatalogEpisode>> {
        let bearer = self.bearer()?;
        let url = format!("{TVDB_API_BASE}/series/{series_id}/episodes/default");
        let mut page = 0;
        let mut all_episodes = Vec::new();

        loop {
            let response = self
                .http
                .get(&url)
                .header("Authorization", &bearer)
                .query(&[("page", page.to_string())])
                .send()?;

            let status = response.status();
            let response_text = response.text()?;

            if !status.is_success() {
                if status == 404 {
                    break;
                }
                bail!("TVDB episodes lookup failed: HTTP {}", status);
            }

            let episodes_resp = parse_episodes_page(&response_text)?;
            let has_next = episodes_resp
                .links
                .as_ref()
                .is_some_and(|links| links.next.is_some());
            let episodes = episodes_resp.data.episodes;

            if episodes.is_empty() {
                break;
            }

            debug!("Fetched page {page} with {} episodes", episodes.len());
            all_episodes.extend(episodes.into_iter().map(CatalogEpisode::from));
            if !has_next {
                break;
            }
            page += 1;
        }

        Ok(all_episodes)
    }

    /// Downloads an artwork URL, e.g. an episode thumbnail.
    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {url}"))?;

        if !response.status().is_success() {
            bail!("Download of {url} failed: HTTP {}", response.status());
        }

        Ok(response.bytes()?.to_vec())
    }
}

fn parse_episodes_page(text: &str) -> Result<EpisodesResponse> {
    serde_json::from_str(text).context("Unexpected TVDB episodes response")
}
