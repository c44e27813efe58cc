use anyhow::{Context, Result};
use log::{debug, info};
use rustyline::DefaultEditor;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::models::EpisodeCandidate;

/// Target file name for a matched file.
///
/// With both a show name and an episode title this is
/// `"<Show> - S01E02 - <Title>.<ext>"`, otherwise the bare id, `"S1E2.<ext>"`.
pub fn generate_filename(
    candidate: &EpisodeCandidate,
    show_name: Option<&str>,
    extension: &str,
) -> String {
    match (show_name, candidate.title.as_deref()) {
        (Some(show), Some(title)) => format!(
            "{} - S{:02}E{:02} - {}.{extension}",
            sanitize_filename(show),
            candidate.id.season,
            candidate.id.episode,
            sanitize_filename(title)
        ),
        _ => format!("{}.{extension}", candidate.display_id()),
    }
}

fn sanitize_filename(name: &str) -> String {
    // Remove or replace invalid filename characters
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn find_unique_filename(old_path: &Path, directory: &Path, base_filename: &str) -> PathBuf {
    let mut path = directory.join(base_filename);
    let mut counter = 1;

    let stem = Path::new(base_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let extension = Path::new(base_filename)
        .extension()
        .and_then(|s| s.to_str());

    while path.exists() && path != old_path {
        let new_filename = match extension {
            Some(extension) => format!("{stem} [copy {counter}].{extension}"),
            None => format!("{stem} [copy {counter}]"),
        };
        path = directory.join(new_filename);
        counter += 1;
    }

    path
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn confirm_rename(old_path: &Path, new_path: &Path) -> Result<bool> {
    println!(
        "Rename \"{}\" -> \"{}\"? [y/N] ",
        display_name(old_path),
        display_name(new_path)
    );

    let mut rl = DefaultEditor::new()?;
    loop {
        let input = rl.readline("").unwrap_or_default();
        let input = input.trim().to_lowercase();

        if input == "y" || input == "yes" {
            return Ok(true);
        } else if input == "n" || input == "no" || input.is_empty() {
            return Ok(false);
        } else {
            println!("Please enter 'y' or 'n'.");
        }
    }
}

/// Renames `old_path` to `new_path`, asking first unless `skip_confirm`.
///
/// Returns whether the file now lives at `new_path`.
pub fn rename_file(old_path: &Path, new_path: &Path, skip_confirm: bool) -> Result<bool> {
    if old_path == new_path {
        println!("{} is already named correctly.", display_name(old_path));
        return Ok(true);
    }
    if !skip_confirm && !confirm_rename(old_path, new_path)? {
        println!("Skipped.");
        return Ok(false);
    }

    fs::rename(old_path, new_path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            old_path.display(),
            new_path.display()
        )
    })?;
    info!(
        "Renamed {} -> {}",
        display_name(old_path),
        display_name(new_path)
    );
    Ok(true)
}

/// The video an extracted subtitle belongs to: same stem, one of `extensions`.
pub fn companion_video(subtitle: &Path, extensions: &[String]) -> Option<PathBuf> {
    let found = extensions
        .iter()
        .map(|ext| subtitle.with_extension(ext))
        .find(|candidate| candidate.is_file());
    if found.is_none() {
        debug!("No companion video for {}", subtitle.display());
    }
    found
}
