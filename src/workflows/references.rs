use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::models::{CatalogEpisode, EpisodeId, EpisodeRange, SubtitleDocument};
use crate::infra::tvdb::TvdbClient;
use crate::workflows::matchers::subtitle::read_subtitle;

const THUMBNAIL_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Files directly inside `dir` accepted by `predicate`, sorted by path.
pub fn collect_files(dir: &Path, predicate: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && predicate(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

fn in_range(id: EpisodeId, range: Option<&EpisodeRange>) -> bool {
    range.map_or(true, |range| range.contains(id))
}

/// Files named `S<season>E<episode>.<ext>` in `dir`, ordered by episode.
fn labeled_files(
    dir: &Path,
    extensions: &[&str],
    range: Option<&EpisodeRange>,
) -> Result<Vec<(EpisodeId, PathBuf)>> {
    let mut labeled: Vec<(EpisodeId, PathBuf)> =
        collect_files(dir, |path| has_extension(path, extensions))?
            .into_iter()
            .filter_map(|path| match EpisodeId::from_file_stem(&path) {
                Some(id) => Some((id, path)),
                None => {
                    debug!("Skipping unlabeled reference {}", path.display());
                    None
                }
            })
            .filter(|(id, _)| in_range(*id, range))
            .collect();
    labeled.sort_by_key(|(id, _)| *id);
    labeled.dedup_by_key(|(id, _)| *id);
    Ok(labeled)
}

/// Reference subtitles named by episode, e.g. `S1E2.srt`.
pub fn load_reference_subtitles(
    dir: &Path,
    range: Option<&EpisodeRange>,
) -> Result<Vec<(EpisodeId, SubtitleDocument)>> {
    let references = labeled_files(dir, &["srt"], range)?
        .into_iter()
        .map(|(id, path)| Ok((id, read_subtitle(&path)?)))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "Loaded {} reference subtitle(s) from {}",
        references.len(),
        dir.display()
    );
    Ok(references)
}

/// Reference thumbnails named by episode, e.g. `S1E2.jpg`.
pub fn find_thumbnails(
    dir: &Path,
    range: Option<&EpisodeRange>,
) -> Result<Vec<(EpisodeId, PathBuf)>> {
    let thumbnails = labeled_files(dir, &THUMBNAIL_EXTENSIONS, range)?;
    info!(
        "Found {} reference thumbnail(s) in {}",
        thumbnails.len(),
        dir.display()
    );
    Ok(thumbnails)
}

fn image_extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| THUMBNAIL_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or("jpg")
}

/// Downloads catalog episode images into `dest` as `S<season>E<episode>.<ext>`.
///
/// Episodes without an image are skipped; a failed download is logged and skipped.
pub fn download_thumbnails(
    client: &TvdbClient,
    episodes: &[CatalogEpisode],
    range: Option<&EpisodeRange>,
    dest: &Path,
) -> Result<Vec<(EpisodeId, PathBuf)>> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut thumbnails = Vec::new();
    for episode in episodes.iter().filter(|e| in_range(e.id(), range)) {
        let Some(url) = episode.image.as_deref() else {
            debug!("{} has no thumbnail", episode.id());
            continue;
        };
        let path = dest.join(format!("{}.{}", episode.id(), image_extension(url)));
        match client.download(url) {
            Ok(bytes) => {
                fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                thumbnails.push((episode.id(), path));
            }
            Err(e) => warn!("Skipping thumbnail for {}: {e}", episode.id()),
        }
    }
    thumbnails.sort_by_key(|(id, _)| *id);
    info!("Downloaded {} thumbnail(s)", thumbnails.len());
    Ok(thumbnails)
}
