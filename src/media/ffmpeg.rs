use anyhow::{bail, Context, Result};
use log::debug;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to start ffmpeg: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to read ffmpeg report: {0}")]
    Read(#[source] io::Error),
    #[error("ffmpeg exited with {0}")]
    Exit(ExitStatus),
}

/// Parameters of the scale/blend/blackframe filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendSettings {
    /// `width:height` both inputs are scaled to before blending.
    pub scale: String,
    /// Minimum percentage of "black" pixels for blackframe to report a frame.
    pub amount: u32,
    /// Pixel value below which a difference pixel counts as black.
    pub threshold: u32,
    pub confidence_key: String,
}

impl BlendSettings {
    pub fn filter_complex(&self) -> String {
        format!(
            "[0]scale={scale}[s1];[1]scale={scale}[s2];[s1][s2]blend=difference,\
             blackframe={amount}:{threshold},\
             metadata=mode=print:key={key}:file='pipe\\:1'",
            scale = self.scale,
            amount = self.amount,
            threshold = self.threshold,
            key = self.confidence_key,
        )
    }
}

/// Runs the difference filter of `thumbnail` over every frame of `video` and
/// returns the metadata report ffmpeg prints on stdout.
///
/// Stdout is drained to end-of-stream before the process is reaped, so a
/// long report never blocks the child on a full pipe.
pub fn compare_frames(
    video: &Path,
    thumbnail: &Path,
    settings: &BlendSettings,
) -> Result<String, CompareError> {
    let mut child = Command::new("ffmpeg")
        .args(["-loglevel", "quiet", "-i"])
        .arg(video)
        // Loop the still image into a stream as long as the video
        .args(["-loop", "1", "-i"])
        .arg(thumbnail)
        // Looped frames share timestamps; drop the duplicates
        .args(["-vsync", "2", "-shortest", "-filter_complex"])
        .arg(settings.filter_complex())
        .args(["-f", "null", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(CompareError::Spawn)?;

    let mut raw = Vec::new();
    let read = match child.stdout.take() {
        Some(mut stdout) => stdout.read_to_end(&mut raw).map(|_| ()),
        None => Ok(()),
    };
    let status = child.wait().map_err(CompareError::Read)?;
    read.map_err(CompareError::Read)?;

    if !status.success() {
        return Err(CompareError::Exit(status));
    }

    debug!(
        "ffmpeg compared {} with {}: {} byte report",
        video.display(),
        thumbnail.display(),
        raw.len()
    );
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

pub fn get_streams_json(path: &Path) -> Result<Vec<u8>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "s",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        bail!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(output.stdout)
}

/// Extracts one subtitle stream, converted to SubRip.
pub fn extract_subtitle_track(input_path: &Path, track_index: u32, output_path: &Path) -> Result<PathBuf> {
    let output = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(input_path)
        .args(["-map", &format!("0:{track_index}"), "-c:s", "srt"])
        .arg(output_path)
        .output();

    let output = match output {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            bail!("FFmpeg not found. Please install ffmpeg and ensure it's in your PATH.");
        }
        Err(e) => {
            bail!("Failed to execute ffmpeg: {e}");
        }
    };

    if !output.status.success() {
        bail!(
            "ffmpeg subtitle extraction failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(output_path.to_path_buf())
}
