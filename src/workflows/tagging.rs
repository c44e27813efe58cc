use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::claims::{ClaimSource, MatchClaim};
use crate::domain::models::{EpisodeCandidate, EpisodeId};
use crate::matching::resolve::{self, Resolution};
use crate::workflows::matchers::Matcher;
use crate::workflows::references::collect_files;
use crate::workflows::{renamer, report};

/// Everything a tagging run needs besides the matcher itself.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding the unlabeled files.
    pub dir: PathBuf,
    /// Where `<episode>.json` claim dumps go when the run is conflicted.
    pub dump_dir: PathBuf,
    /// Reference directory, so labeled references in `dir` are not taken as candidates.
    pub reference_dir: Option<PathBuf>,
    pub show_name: Option<String>,
    pub no_confirm: bool,
    pub dry_run: bool,
    pub keep_subtitles: bool,
    pub video_extensions: Vec<String>,
}

/// Matches the files in `options.dir`, reports, then renames what was accepted.
///
/// A conflicted run writes the claim dump and renames nothing. A video run
/// rings the terminal bell when it ends, however it ends.
pub fn tag(
    options: &RunOptions,
    candidates: &[EpisodeCandidate],
    matcher: &dyn Matcher,
) -> Result<Resolution> {
    tag_with_bell(options, candidates, matcher, &mut io::stdout())
}

fn tag_with_bell(
    options: &RunOptions,
    candidates: &[EpisodeCandidate],
    matcher: &dyn Matcher,
    bell: &mut dyn Write,
) -> Result<Resolution> {
    let outcome = run(options, candidates, matcher);
    if matcher.source() == ClaimSource::Video {
        ring_bell(bell);
    }
    outcome
}

/// Whether `path` is one of the labeled reference files sitting in the working directory.
fn is_reference_file(options: &RunOptions, path: &Path) -> bool {
    let Some(reference_dir) = options.reference_dir.as_deref() else {
        return false;
    };
    let same_dir = match (reference_dir.canonicalize(), options.dir.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => reference_dir == options.dir,
    };
    same_dir && EpisodeId::from_file_stem(path).is_some()
}

fn run(
    options: &RunOptions,
    candidates: &[EpisodeCandidate],
    matcher: &dyn Matcher,
) -> Result<Resolution> {
    let (references, files): (Vec<PathBuf>, Vec<PathBuf>) =
        collect_files(&options.dir, |path| matcher.accepts(path))?
            .into_iter()
            .partition(|path| is_reference_file(options, path));
    if !references.is_empty() {
        warn!(
            "Skipping {} reference file(s) found in {}; they are not matched against themselves",
            references.len(),
            options.dir.display()
        );
    }
    if files.is_empty() {
        bail!("No files to match in {}", options.dir.display());
    }
    info!(
        "Matching {} file(s) against {} episode(s)",
        files.len(),
        candidates.len()
    );

    let claims = matcher.collect_claims(&files)?;
    if claims.is_empty() {
        bail!("No reference episodes to match against");
    }
    report::print_summary(&claims);

    let resolution = resolve::resolve(&claims);
    report::print_resolution(&resolution);

    if resolution.is_conflicted() {
        let written = resolve::write_conflict_dump(&claims, &options.dump_dir)?;
        warn!(
            "Conflicting matches, wrote {} claim dump(s) to {}",
            written.len(),
            options.dump_dir.display()
        );
        return Ok(resolution);
    }

    if options.dry_run {
        info!("Dry run, nothing renamed");
        return Ok(resolution);
    }

    for claim in resolution.accepted() {
        let candidate = candidates
            .iter()
            .find(|candidate| candidate.id == claim.episode)
            .cloned()
            .unwrap_or_else(|| EpisodeCandidate::new(claim.episode));
        let applied = match claim.source {
            ClaimSource::Subtitle => apply_subtitle_claim(options, &candidate, claim),
            ClaimSource::Video => apply_video_claim(options, &candidate, claim),
        };
        if let Err(e) = applied {
            error!("Could not rename {} as {}: {e:#}", claim.file, claim.episode);
        }
    }

    Ok(resolution)
}

fn extension_of(path: &Path) -> &str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
}

/// Renames `file` to its canonical name; returns the new path if it moved.
fn rename_matched(
    options: &RunOptions,
    candidate: &EpisodeCandidate,
    file: &Path,
    skip_confirm: bool,
) -> Result<Option<PathBuf>> {
    let name = renamer::generate_filename(
        candidate,
        options.show_name.as_deref(),
        extension_of(file),
    );
    let target = renamer::find_unique_filename(file, &options.dir, &name);
    Ok(renamer::rename_file(file, &target, skip_confirm)?.then_some(target))
}

fn apply_video_claim(
    options: &RunOptions,
    candidate: &EpisodeCandidate,
    claim: &MatchClaim,
) -> Result<()> {
    rename_matched(options, candidate, &options.dir.join(&claim.file), true)?;
    Ok(())
}

/// Renames the video the subtitle was extracted from, then drops or moves the subtitle.
fn apply_subtitle_claim(
    options: &RunOptions,
    candidate: &EpisodeCandidate,
    claim: &MatchClaim,
) -> Result<()> {
    let subtitle = options.dir.join(&claim.file);
    let Some(video) = renamer::companion_video(&subtitle, &options.video_extensions) else {
        warn!(
            "{} matched {} but has no video beside it, skipping",
            claim.file, claim.episode
        );
        return Ok(());
    };

    let Some(renamed) = rename_matched(options, candidate, &video, options.no_confirm)? else {
        return Ok(());
    };

    if options.keep_subtitles {
        let name = renamed.with_extension("srt");
        let name = name
            .file_name()
            .and_then(|name| name.to_str())
            .context("Renamed video has no file name")?;
        let target = renamer::find_unique_filename(&subtitle, &options.dir, name);
        renamer::rename_file(&subtitle, &target, true)?;
    } else {
        fs::remove_file(&subtitle)
            .with_context(|| format!("Failed to delete {}", subtitle.display()))?;
    }
    Ok(())
}

fn ring_bell(out: &mut dyn Write) {
    let _ = out.write_all(b"\x07").and_then(|()| out.flush());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::claims::{ClaimSet, Strength};
    use crate::domain::models::{EpisodeId, MatchInterval, SubtitleDocument};
    use crate::workflows::matchers::subtitle::SubtitleMatcher;
    use rayon::ThreadPool;
    use tempfile::TempDir;

    const PILOT: &str = "1\n00:00:01,000 --> 00:00:03,000\nThe lighthouse keeper never came back.\n";
    const SECOND: &str = "1\n00:00:01,000 --> 00:00:03,000\nWe should have listened to the radio warnings.\n";

    fn pool() -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap()
    }

    fn references() -> Vec<(EpisodeId, SubtitleDocument)> {
        vec![
            (EpisodeId::new(1, 1), SubtitleDocument::new("S1E1.srt", PILOT)),
            (EpisodeId::new(1, 2), SubtitleDocument::new("S1E2.srt", SECOND)),
        ]
    }

    fn candidates() -> Vec<EpisodeCandidate> {
        vec![
            EpisodeCandidate {
                id: EpisodeId::new(1, 1),
                title: Some("Pilot".to_string()),
            },
            EpisodeCandidate::new(EpisodeId::new(1, 2)),
        ]
    }

    fn options(dir: &Path, dump_dir: &Path) -> RunOptions {
        RunOptions {
            dir: dir.to_path_buf(),
            dump_dir: dump_dir.to_path_buf(),
            reference_dir: None,
            show_name: Some("Harbor".to_string()),
            no_confirm: true,
            dry_run: false,
            keep_subtitles: false,
            video_extensions: vec!["mkv".to_string()],
        }
    }

    fn write_rip(dir: &Path, stem: &str, subtitle: &str) {
        fs::write(dir.join(format!("{stem}.srt")), subtitle).unwrap();
        fs::write(dir.join(format!("{stem}.mkv")), b"video").unwrap();
    }

    #[test]
    fn test_tag_renames_companion_videos() {
        let work = TempDir::new().unwrap();
        let dumps = TempDir::new().unwrap();
        let dir = work.path();
        write_rip(dir, "title_t00", SECOND);
        write_rip(dir, "title_t01", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        let resolution = tag(&options(dir, dumps.path()), &candidates(), &matcher).unwrap();

        assert!(!resolution.is_conflicted());
        assert!(dir.join("Harbor - S01E01 - Pilot.mkv").exists());
        assert!(dir.join("S1E2.mkv").exists());
        assert!(!dir.join("title_t00.mkv").exists());
        assert!(!dir.join("title_t00.srt").exists());
        assert!(!dir.join("title_t01.srt").exists());
    }

    #[test]
    fn test_tag_keeps_subtitles_beside_video() {
        let work = TempDir::new().unwrap();
        let dumps = TempDir::new().unwrap();
        let dir = work.path();
        write_rip(dir, "title_t00", SECOND);
        write_rip(dir, "title_t01", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        let options = RunOptions {
            keep_subtitles: true,
            ..options(dir, dumps.path())
        };
        tag(&options, &candidates(), &matcher).unwrap();

        assert!(dir.join("S1E2.mkv").exists());
        assert!(dir.join("S1E2.srt").exists());
        assert!(dir.join("Harbor - S01E01 - Pilot.srt").exists());
    }

    #[test]
    fn test_conflicted_run_dumps_and_renames_nothing() {
        let work = TempDir::new().unwrap();
        let dumps = TempDir::new().unwrap();
        let dir = work.path();
        write_rip(dir, "title_t00", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        let resolution = tag(&options(dir, dumps.path()), &candidates(), &matcher).unwrap();

        assert!(resolution.is_conflicted());
        assert!(dir.join("title_t00.mkv").exists());
        assert!(dir.join("title_t00.srt").exists());
        assert!(dumps.path().join("S1E1.json").exists());
        assert!(dumps.path().join("S1E2.json").exists());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let work = TempDir::new().unwrap();
        let dumps = TempDir::new().unwrap();
        let dir = work.path();
        write_rip(dir, "title_t00", SECOND);
        write_rip(dir, "title_t01", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        let options = RunOptions {
            dry_run: true,
            ..options(dir, dumps.path())
        };
        let resolution = tag(&options, &candidates(), &matcher).unwrap();

        assert_eq!(resolution.accepted().count(), 2);
        assert!(dir.join("title_t00.mkv").exists());
        assert!(dir.join("title_t01.srt").exists());
        assert!(fs::read_dir(dumps.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let work = TempDir::new().unwrap();
        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        assert!(tag(&options(work.path(), work.path()), &candidates(), &matcher).is_err());
    }

    /// Video matcher that hands back fixed claims.
    struct FixedVideoClaims(ClaimSet);

    impl Matcher for FixedVideoClaims {
        fn source(&self) -> ClaimSource {
            ClaimSource::Video
        }

        fn accepts(&self, file: &Path) -> bool {
            file.extension().is_some_and(|ext| ext == "mkv")
        }

        fn collect_claims(&self, _files: &[PathBuf]) -> Result<ClaimSet> {
            Ok(self.0.clone())
        }
    }

    fn sighting(episode: EpisodeId, file: &str) -> MatchClaim {
        MatchClaim {
            episode,
            file: file.to_string(),
            source: ClaimSource::Video,
            strength: Strength::Visual {
                confidence: 90.0,
                intervals: 1,
            },
            intervals: vec![MatchInterval {
                confidence: 90.0,
                start: 5.0,
                end: 7.0,
            }],
        }
    }

    #[test]
    fn test_conflicted_video_run_rings_bell() {
        let work = TempDir::new().unwrap();
        let dir = work.path();
        fs::write(dir.join("x.mkv"), b"video").unwrap();
        let mut claims = ClaimSet::with_episodes([EpisodeId::new(1, 1), EpisodeId::new(1, 2)]);
        claims.insert(sighting(EpisodeId::new(1, 1), "x.mkv"));
        claims.insert(sighting(EpisodeId::new(1, 2), "x.mkv"));

        let mut bell = Vec::new();
        let resolution = tag_with_bell(
            &options(dir, dir),
            &candidates(),
            &FixedVideoClaims(claims),
            &mut bell,
        )
        .unwrap();

        assert!(resolution.is_conflicted());
        assert_eq!(bell, b"\x07");
        assert!(dir.join("x.mkv").exists());
    }

    #[test]
    fn test_dry_and_failed_video_runs_ring_bell() {
        let work = TempDir::new().unwrap();
        let dir = work.path();
        fs::write(dir.join("x.mkv"), b"video").unwrap();
        let mut claims = ClaimSet::with_episodes([EpisodeId::new(1, 1)]);
        claims.insert(sighting(EpisodeId::new(1, 1), "x.mkv"));
        let dry_run = RunOptions {
            dry_run: true,
            ..options(dir, dir)
        };

        let mut bell = Vec::new();
        tag_with_bell(&dry_run, &candidates(), &FixedVideoClaims(claims.clone()), &mut bell)
            .unwrap();
        assert_eq!(bell, b"\x07");
        assert!(dir.join("x.mkv").exists());

        let empty = TempDir::new().unwrap();
        let mut bell = Vec::new();
        let failed = tag_with_bell(
            &options(empty.path(), empty.path()),
            &candidates(),
            &FixedVideoClaims(claims),
            &mut bell,
        );
        assert!(failed.is_err());
        assert_eq!(bell, b"\x07");
    }

    #[test]
    fn test_subtitle_run_does_not_ring_bell() {
        let work = TempDir::new().unwrap();
        let dumps = TempDir::new().unwrap();
        let dir = work.path();
        write_rip(dir, "title_t00", SECOND);
        write_rip(dir, "title_t01", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        let mut bell = Vec::new();
        tag_with_bell(&options(dir, dumps.path()), &candidates(), &matcher, &mut bell).unwrap();
        assert!(bell.is_empty());
    }

    #[test]
    fn test_run_without_reference_episodes_is_an_error() {
        let work = TempDir::new().unwrap();
        let dir = work.path();
        write_rip(dir, "title_t00", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(Vec::new(), &pool);
        assert!(tag(&options(dir, dir), &candidates(), &matcher).is_err());
        assert!(dir.join("title_t00.mkv").exists());
    }

    #[test]
    fn test_references_in_working_dir_are_not_candidates() {
        let work = TempDir::new().unwrap();
        let dumps = TempDir::new().unwrap();
        let dir = work.path();
        fs::write(dir.join("S1E1.srt"), PILOT).unwrap();
        fs::write(dir.join("S1E2.srt"), SECOND).unwrap();
        write_rip(dir, "title_t00", SECOND);
        write_rip(dir, "title_t01", PILOT);

        let pool = pool();
        let matcher = SubtitleMatcher::new(references(), &pool);
        let options = RunOptions {
            reference_dir: Some(dir.to_path_buf()),
            ..options(dir, dumps.path())
        };
        let resolution = tag(&options, &candidates(), &matcher).unwrap();

        let files: Vec<&str> = resolution.accepted().map(|c| c.file.as_str()).collect();
        assert_eq!(files, vec!["title_t01.srt", "title_t00.srt"]);
        assert!(dir.join("Harbor - S01E01 - Pilot.mkv").exists());
        assert!(dir.join("S1E2.mkv").exists());
        assert!(dir.join("S1E1.srt").exists());
    }
}
