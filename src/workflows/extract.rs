use anyhow::Result;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::MatchSettings;
use crate::media::subtitles;
use crate::workflows::references::collect_files;

/// Videos in `dir` that have no `.srt` beside them yet.
fn videos_missing_subtitles(dir: &Path, settings: &MatchSettings) -> Result<Vec<PathBuf>> {
    Ok(collect_files(dir, |path| settings.is_video(path))?
        .into_iter()
        .filter(|video| !video.with_extension("srt").exists())
        .collect())
}

/// Extracts a text subtitle track from every video lacking one. Failures are per file.
pub fn extract_missing_subtitles(dir: &Path, settings: &MatchSettings) -> Result<Vec<PathBuf>> {
    let videos = videos_missing_subtitles(dir, settings)?;
    info!("Extracting subtitles from {} video(s)", videos.len());

    let mut extracted = Vec::with_capacity(videos.len());
    for video in videos {
        match subtitles::extract_to_srt(&video, &settings.language) {
            Ok(path) => {
                info!("Extracted {}", path.display());
                extracted.push(path);
            }
            Err(e) => warn!("No subtitles extracted from {}: {e:#}", video.display()),
        }
    }
    Ok(extracted)
}
