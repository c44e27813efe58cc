use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};

use super::Matcher;
use crate::domain::claims::{ClaimSet, ClaimSource};
use crate::domain::models::{EpisodeId, MatchInterval};
use crate::matching::aggregate::{self, PairMatch};
use crate::matching::{clustering, frames};
use crate::media::ffmpeg::{self, BlendSettings, CompareError};

/// Produces the frame-difference report of one video against one thumbnail.
pub trait FrameComparer: Sync {
    fn compare(&self, video: &Path, thumbnail: &Path) -> Result<String, CompareError>;
}

impl FrameComparer for BlendSettings {
    fn compare(&self, video: &Path, thumbnail: &Path) -> Result<String, CompareError> {
        ffmpeg::compare_frames(video, thumbnail, self)
    }
}

/// Matches videos against episode thumbnails.
pub struct VideoMatcher<'p, C> {
    thumbnails: Vec<(EpisodeId, PathBuf)>,
    comparer: C,
    confidence_key: String,
    merge_gap: f64,
    video_extensions: Vec<String>,
    pool: &'p ThreadPool,
}

impl<'p, C: FrameComparer> VideoMatcher<'p, C> {
    pub fn new(
        thumbnails: Vec<(EpisodeId, PathBuf)>,
        comparer: C,
        confidence_key: impl Into<String>,
        merge_gap: f64,
        video_extensions: Vec<String>,
        pool: &'p ThreadPool,
    ) -> Self {
        Self {
            thumbnails,
            comparer,
            confidence_key: confidence_key.into(),
            merge_gap,
            video_extensions,
            pool,
        }
    }

    /// Intervals where `video` shows `thumbnail`. A failed comparison yields none.
    fn match_pair(&self, video: &Path, thumbnail: &Path) -> Vec<MatchInterval> {
        match self.comparer.compare(video, thumbnail) {
            Ok(report) => {
                let events = frames::parse_report(&report, &self.confidence_key);
                clustering::cluster(&events, self.merge_gap)
            }
            Err(e) => {
                warn!(
                    "Comparing {} with {} failed, treating as no match: {e}",
                    video.display(),
                    thumbnail.display()
                );
                Vec::new()
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl<C: FrameComparer> Matcher for VideoMatcher<'_, C> {
    fn source(&self) -> ClaimSource {
        ClaimSource::Video
    }

    fn accepts(&self, file: &Path) -> bool {
        file.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.video_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    fn collect_claims(&self, files: &[PathBuf]) -> Result<ClaimSet> {
        let pairs: Vec<(&PathBuf, &(EpisodeId, PathBuf))> = files
            .iter()
            .flat_map(|video| self.thumbnails.iter().map(move |thumb| (video, thumb)))
            .collect();

        info!(
            "Comparing {} video(s) against {} thumbnail(s). This could take a while...",
            files.len(),
            self.thumbnails.len()
        );

        let matches: Vec<PairMatch> = self.pool.install(|| {
            pairs
                .par_iter()
                .map(|(video, (episode, thumbnail))| {
                    let intervals = self.match_pair(video, thumbnail);
                    info!(
                        "{} vs {episode}: {} interval(s)",
                        file_name(video),
                        intervals.len()
                    );
                    PairMatch {
                        episode: *episode,
                        video: file_name(video),
                        intervals,
                    }
                })
                .collect()
        });

        Ok(aggregate::video_claims(
            self.thumbnails.iter().map(|(id, _)| *id),
            matches,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::clustering::DEFAULT_MERGE_GAP_SECS;
    use crate::matching::frames::DEFAULT_CONFIDENCE_KEY;
    use crate::matching::resolve::resolve;
    use std::collections::HashMap;

    /// Canned reports keyed by (video file name, thumbnail file name).
    struct CannedReports(HashMap<(String, String), Result<String, ()>>);

    impl FrameComparer for CannedReports {
        fn compare(&self, video: &Path, thumbnail: &Path) -> Result<String, CompareError> {
            match self.0.get(&(file_name(video), file_name(thumbnail))) {
                Some(Ok(report)) => Ok(report.clone()),
                Some(Err(())) => Err(CompareError::Read(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "pipe closed",
                ))),
                None => Ok(String::new()),
            }
        }
    }

    fn spike(start: f64, seconds: u32, confidence: u32) -> String {
        (0..=seconds * 4)
            .map(|i| {
                let t = start + f64::from(i) * 0.25;
                format!(
                    "frame:{i} pts:{i} pts_time:{t}\n{DEFAULT_CONFIDENCE_KEY}={confidence}\n"
                )
            })
            .collect()
    }

    fn pool() -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap()
    }

    fn thumbnails() -> Vec<(EpisodeId, PathBuf)> {
        vec![
            (EpisodeId::new(1, 1), PathBuf::from("thumbs/S1E1.jpg")),
            (EpisodeId::new(1, 2), PathBuf::from("thumbs/S1E2.jpg")),
        ]
    }

    fn matcher<'p>(reports: CannedReports, pool: &'p ThreadPool) -> VideoMatcher<'p, CannedReports> {
        VideoMatcher::new(
            thumbnails(),
            reports,
            DEFAULT_CONFIDENCE_KEY,
            DEFAULT_MERGE_GAP_SECS,
            vec!["mkv".to_string()],
            pool,
        )
    }

    #[test]
    fn test_single_sustained_spike() {
        let reports = CannedReports(HashMap::from([(
            ("title_t00.mkv".to_string(), "S1E1.jpg".to_string()),
            Ok(spike(120.0, 3, 92)),
        )]));
        let pool = pool();
        let claims = matcher(reports, &pool)
            .collect_claims(&[PathBuf::from("rips/title_t00.mkv")])
            .unwrap();

        let s1e1 = claims.get(EpisodeId::new(1, 1)).unwrap().best().unwrap();
        assert_eq!(
            s1e1.intervals,
            vec![MatchInterval {
                confidence: 92.0,
                start: 120.0,
                end: 123.0
            }]
        );
        let s1e2 = claims.get(EpisodeId::new(1, 2)).unwrap().best().unwrap();
        assert!(s1e2.intervals.is_empty());

        let resolution = resolve(&claims);
        let accepted: Vec<_> = resolution.accepted().collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].episode, EpisodeId::new(1, 1));
        assert_eq!(accepted[0].file, "title_t00.mkv");
    }

    #[test]
    fn test_video_matching_two_thumbnails_is_a_conflict() {
        let reports = CannedReports(HashMap::from([
            (
                ("title_t00.mkv".to_string(), "S1E1.jpg".to_string()),
                Ok(spike(10.0, 1, 90)),
            ),
            (
                ("title_t00.mkv".to_string(), "S1E2.jpg".to_string()),
                Ok(spike(600.0, 1, 95)),
            ),
        ]));
        let pool = pool();
        let claims = matcher(reports, &pool)
            .collect_claims(&[PathBuf::from("title_t00.mkv")])
            .unwrap();

        let resolution = resolve(&claims);
        assert!(resolution.is_conflicted());
        assert_eq!(resolution.accepted().count(), 0);
    }

    #[test]
    fn test_video_outranked_on_one_episode_still_conflicts() {
        let reports = CannedReports(HashMap::from([
            (
                ("x.mkv".to_string(), "S1E1.jpg".to_string()),
                Ok(spike(10.0, 1, 95)),
            ),
            (
                ("y.mkv".to_string(), "S1E1.jpg".to_string()),
                Ok(spike(10.0, 1, 99)),
            ),
            (
                ("x.mkv".to_string(), "S1E2.jpg".to_string()),
                Ok(spike(600.0, 1, 90)),
            ),
        ]));
        let pool = pool();
        let claims = matcher(reports, &pool)
            .collect_claims(&[PathBuf::from("x.mkv"), PathBuf::from("y.mkv")])
            .unwrap();

        let resolution = resolve(&claims);
        assert!(resolution.is_conflicted());
        assert_eq!(resolution.collision.unwrap().file, "x.mkv");
    }

    #[test]
    fn test_failed_comparison_is_no_match() {
        let reports = CannedReports(HashMap::from([
            (
                ("a.mkv".to_string(), "S1E1.jpg".to_string()),
                Err(()),
            ),
            (
                ("b.mkv".to_string(), "S1E2.jpg".to_string()),
                Ok(spike(50.0, 2, 88)),
            ),
        ]));
        let pool = pool();
        let claims = matcher(reports, &pool)
            .collect_claims(&[PathBuf::from("a.mkv"), PathBuf::from("b.mkv")])
            .unwrap();

        assert!(claims
            .get(EpisodeId::new(1, 1))
            .unwrap()
            .best_qualifying()
            .is_none());
        let resolution = resolve(&claims);
        let accepted: Vec<_> = resolution.accepted().map(|c| c.file.as_str()).collect();
        assert_eq!(accepted, vec!["b.mkv"]);
    }

    #[test]
    fn test_accepts_configured_extensions() {
        let pool = pool();
        let matcher = matcher(CannedReports(HashMap::new()), &pool);
        assert!(matcher.accepts(Path::new("x.MKV")));
        assert!(!matcher.accepts(Path::new("x.mp4")));
    }
}
