use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::media::ffmpeg;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    index: u32,
    codec_name: Option<String>,
    tags: Option<Tags>,
}

#[derive(Debug, Deserialize)]
struct Tags {
    language: Option<String>,
}

const TEXT_CODECS: &[&str] = &["subrip", "ass", "ssa", "webvtt", "mov_text", "text"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub index: u32,
    pub codec_name: String,
    pub language: Option<String>,
}

/// Text subtitle streams of `path`; image-based tracks are skipped.
pub fn probe_text_tracks(path: &Path) -> Result<Vec<SubtitleTrack>> {
    let json_output = ffmpeg::get_streams_json(path)?;
    parse_text_tracks(&json_output)
}

fn parse_text_tracks(json_output: &[u8]) -> Result<Vec<SubtitleTrack>> {
    let info: FfprobeOutput =
        serde_json::from_slice(json_output).context("Failed to parse ffprobe output")?;

    Ok(info
        .streams
        .into_iter()
        .filter_map(|stream| {
            let codec_name = stream.codec_name?;
            TEXT_CODECS
                .contains(&codec_name.as_str())
                .then(|| SubtitleTrack {
                    index: stream.index,
                    codec_name,
                    language: stream
                        .tags
                        .and_then(|t| t.language)
                        .map(|l| l.to_lowercase()),
                })
        })
        .collect())
}

// "eng" and "en" name the same language.
fn same_language(track_language: &str, wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    track_language == wanted
        || (track_language.len() == 2 && wanted.starts_with(track_language))
        || (wanted.len() == 2 && track_language.starts_with(&wanted))
}

/// Prefers a track in `language`, falling back to the first text track.
pub fn select_track<'a>(tracks: &'a [SubtitleTrack], language: &str) -> Option<&'a SubtitleTrack> {
    tracks
        .iter()
        .find(|t| {
            t.language
                .as_deref()
                .is_some_and(|l| same_language(l, language))
        })
        .or_else(|| tracks.first())
}

/// Writes the best text track of `video` to `<stem>.srt` next to it.
pub fn extract_to_srt(video: &Path, language: &str) -> Result<PathBuf> {
    let tracks = probe_text_tracks(video)?;
    let track = select_track(&tracks, language)
        .with_context(|| format!("No text subtitle track found in {}", video.display()))?;

    let output_path = video.with_extension("srt");
    ffmpeg::extract_subtitle_track(video, track.index, &output_path)
}
