//! Parser for the per-frame metadata report printed by ffmpeg's `metadata` filter.
//!
//! The report is a sequence of blocks:
//!
//! ```text
//! frame:112  pts:112     pts_time:4.67133
//! lavfi.blackframe.pblack=91
//! ```
//!
//! Each `frame:` line opens a block and the `key=value` lines that follow belong to it.

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::models::FrameEvent;

pub const DEFAULT_CONFIDENCE_KEY: &str = "lavfi.blackframe.pblack";

static FRAME_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^frame:\s*(\S+)\s+pts:\s*(\S+)\s+pts_time:\s*(\S+)").unwrap());

static METADATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^=\s][^=]*)=(.*)$").unwrap());

struct PendingFrame<'a> {
    // None when the marker's numbers did not parse; the block is still consumed.
    position: Option<(u64, f64)>,
    confidence: Option<&'a str>,
}

impl PendingFrame<'_> {
    fn into_event(self) -> Option<FrameEvent> {
        let (frame_index, pts_time) = self.position?;
        let confidence: f64 = self.confidence?.parse().ok()?;
        if !(0.0..=100.0).contains(&confidence) {
            return None;
        }
        Some(FrameEvent {
            frame_index,
            pts_time,
            confidence,
        })
    }
}

fn parse_marker(caps: &regex::Captures<'_>) -> Option<(u64, f64)> {
    let frame_index = caps[1].parse().ok()?;
    caps[2].parse::<i64>().ok()?;
    let pts_time: f64 = caps[3].parse().ok()?;
    pts_time.is_finite().then_some((frame_index, pts_time))
}

/// Parses a full report into events, in report order.
///
/// Blocks without a usable `confidence_key` value are dropped, as are blocks
/// whose marker numbers do not parse. Lines that are neither markers nor
/// metadata, and metadata before the first marker, are ignored.
pub fn parse_report(report: &str, confidence_key: &str) -> Vec<FrameEvent> {
    let mut frames: Vec<PendingFrame<'_>> = Vec::new();

    for line in report.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(caps) = FRAME_MARKER.captures(line) {
            let position = parse_marker(&caps);
            if position.is_none() {
                trace!("Skipping malformed frame marker: {line}");
            }
            frames.push(PendingFrame {
                position,
                confidence: None,
            });
        } else if let Some(caps) = METADATA.captures(line) {
            let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if key.as_str().trim() != confidence_key {
                continue;
            }
            if let Some(current) = frames.last_mut() {
                current.confidence = Some(value.as_str().trim());
            }
        }
    }

    frames
        .into_iter()
        .filter_map(PendingFrame::into_event)
        .collect()
}
