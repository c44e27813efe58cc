use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::domain::models::EpisodeRange;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum MatchMode {
    /// Compare extracted subtitles with reference subtitles
    Subtitles,
    /// Look for episode thumbnails inside the videos
    Video,
}

#[derive(Parser, Debug)]
#[command(name = "episode-tagger")]
#[command(about = "Identify which episode each ripped video is and rename it accordingly")]
pub struct Cli {
    /// Directory holding the unlabeled files
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Matching mode
    #[arg(long, value_enum, default_value = "subtitles")]
    pub mode: MatchMode,

    /// Directory of reference files named like S1E2.srt or S1E2.jpg
    #[arg(long)]
    pub references: Option<PathBuf>,

    /// Show name to search in TVDB
    #[arg(long)]
    pub show: Option<String>,

    /// Direct TVDB show ID
    #[arg(long)]
    pub show_id: Option<String>,

    /// Episodes to consider, e.g. S1E1-S1E10. Defaults to a range found in the directory name
    #[arg(long)]
    pub range: Option<EpisodeRange>,

    /// Extract subtitles from videos that have no .srt yet
    #[arg(long)]
    pub extract: bool,

    /// Skip confirmation prompts
    #[arg(long)]
    pub no_confirm: bool,

    /// Report matches without renaming anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep matched subtitles, renamed beside their video
    #[arg(long)]
    pub keep_subtitles: bool,

    /// Where claim dumps are written on conflict. Defaults to DIR
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,

    /// Worker threads for comparisons
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Seconds between sightings that still count as one interval
    #[arg(long)]
    pub merge_gap: Option<f64>,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}
