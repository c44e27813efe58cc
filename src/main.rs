mod cli;
mod config;
mod domain;
mod infra;
mod matching;
mod media;
mod workflows;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::io::{self, Write};
use std::path::Path;
use tempfile::TempDir;

use cli::{Cli, MatchMode};
use config::ConfigFile;
use domain::models::{CatalogEpisode, EpisodeCandidate, EpisodeId, EpisodeRange};
use infra::cache::Cache;
use infra::tvdb::TvdbClient;
use workflows::matchers::{subtitle::SubtitleMatcher, video::VideoMatcher};
use workflows::references;
use workflows::tagging::{self, RunOptions};

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

/// Show data fetched from TVDB (or the cache) for naming and thumbnails.
struct Catalog {
    client: TvdbClient,
    show_name: String,
    episodes: Vec<CatalogEpisode>,
}

impl Catalog {
    fn title_of(&self, id: EpisodeId) -> Option<String> {
        self.episodes
            .iter()
            .find(|episode| episode.id() == id)
            .and_then(|episode| episode.name.clone())
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load()?;
    let mut settings = config.matching.clone();
    if let Some(jobs) = cli.jobs {
        settings.jobs = Some(jobs);
    }
    if let Some(gap) = cli.merge_gap {
        settings.merge_gap_secs = config::check_merge_gap(gap).context("Invalid --merge-gap")?;
    }

    if !cli.dir.is_dir() {
        bail!("{} is not a directory", cli.dir.display());
    }

    let range = cli.range.or_else(|| range_from_dir_name(&cli.dir));
    match &range {
        Some(range) => info!("Considering episodes {}-{}", range.start, range.end),
        None => info!("No episode range given, considering every reference"),
    }

    let catalog = load_catalog(&cli, &config)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs())
        .thread_name(|i| format!("matcher-{i}"))
        .build()
        .context("Failed to start worker pool")?;

    let options = RunOptions {
        dir: cli.dir.clone(),
        dump_dir: cli.dump_dir.clone().unwrap_or_else(|| cli.dir.clone()),
        reference_dir: cli.references.clone(),
        show_name: catalog.as_ref().map(|catalog| catalog.show_name.clone()),
        no_confirm: cli.no_confirm,
        dry_run: cli.dry_run,
        keep_subtitles: cli.keep_subtitles,
        video_extensions: settings.video_extensions.clone(),
    };

    let resolution = match cli.mode {
        MatchMode::Subtitles => {
            if cli.extract {
                workflows::extract::extract_missing_subtitles(&cli.dir, &settings)?;
            }
            let reference_dir = cli
                .references
                .as_deref()
                .context("Subtitle mode needs --references <DIR> with files named like S1E2.srt")?;
            let references = references::load_reference_subtitles(reference_dir, range.as_ref())?;
            if references.is_empty() {
                bail!("No reference subtitles found in {}", reference_dir.display());
            }
            let candidates = candidates_for(references.iter().map(|(id, _)| *id), &catalog);
            let matcher = SubtitleMatcher::new(references, &pool);
            tagging::tag(&options, &candidates, &matcher)?
        }
        MatchMode::Video => {
            // Downloaded thumbnails live until the run is over
            let mut download_dir: Option<TempDir> = None;
            let thumbnails = match (&cli.references, &catalog) {
                (Some(dir), _) => references::find_thumbnails(dir, range.as_ref())?,
                (None, Some(catalog)) => {
                    let dir = download_dir.insert(TempDir::new()?);
                    references::download_thumbnails(
                        &catalog.client,
                        &catalog.episodes,
                        range.as_ref(),
                        dir.path(),
                    )?
                }
                (None, None) => {
                    bail!("Video mode needs --references <DIR> or --show/--show-id to fetch thumbnails")
                }
            };
            if thumbnails.is_empty() {
                bail!("No reference thumbnails to compare against");
            }
            let candidates = candidates_for(thumbnails.iter().map(|(id, _)| *id), &catalog);
            let matcher = VideoMatcher::new(
                thumbnails,
                settings.blend(),
                settings.confidence_key.clone(),
                settings.merge_gap_secs,
                settings.video_extensions.clone(),
                &pool,
            );
            tagging::tag(&options, &candidates, &matcher)?
        }
    };

    if resolution.is_conflicted() {
        warn!("Resolve the conflict by hand or narrow the episode range, then run again");
    }
    Ok(())
}

fn range_from_dir_name(dir: &Path) -> Option<EpisodeRange> {
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    dir.file_name()
        .and_then(|name| name.to_str())
        .and_then(EpisodeRange::find_in)
}

fn candidates_for(
    ids: impl Iterator<Item = EpisodeId>,
    catalog: &Option<Catalog>,
) -> Vec<EpisodeCandidate> {
    ids.map(|id| EpisodeCandidate {
        id,
        title: catalog.as_ref().and_then(|catalog| catalog.title_of(id)),
    })
    .collect()
}

fn load_catalog(cli: &Cli, config: &ConfigFile) -> Result<Option<Catalog>> {
    if cli.show.is_none() && cli.show_id.is_none() {
        return Ok(None);
    }

    let api_key = config::get_tvdb_api_key(config)?;
    let mut cache = Cache::load();
    let mut client = TvdbClient::new(api_key);

    let show_id = match (&cli.show, &cli.show_id) {
        (Some(show_name), None) => search_and_select_show(&mut client, show_name)
            .with_context(|| format!("Error searching for show '{show_name}'"))?,
        (None, Some(id)) => id.clone(),
        _ => bail!("Specify exactly one of --show and --show-id"),
    };

    if cache.has_series_episodes(&show_id) {
        info!("Using cached episode data for series {show_id}");
    } else {
        info!("Fetching episodes for series {show_id}...");
        let episodes = client.get_episodes(&show_id)?;
        cache.set_episodes(show_id.clone(), episodes);
    }

    let show_name = match cache.get_series_name(&show_id) {
        Some(name) => name.clone(),
        None => {
            let name = client.get_series_name(&show_id)?;
            cache.set_series_name(show_id.clone(), name.clone());
            name
        }
    };

    if let Err(e) = cache.save() {
        warn!("Failed to save cache: {e}");
    }

    let episodes = cache.get_episodes(&show_id).unwrap_or_default().to_vec();
    Ok(Some(Catalog {
        client,
        show_name,
        episodes,
    }))
}

fn search_and_select_show(client: &mut TvdbClient, query: &str) -> Result<String> {
    let results = client.search_series(query)?;

    if results.is_empty() {
        bail!("No shows found matching '{query}'");
    }

    if results.len() == 1 {
        return Ok(results[0].tvdb_id.clone());
    }

    // Multiple results - let user select
    println!("Multiple shows found. Please select one:");
    for (i, result) in results.iter().enumerate() {
        println!("  {}: {} (ID: {})", i + 1, result.display_name(), result.tvdb_id);
    }

    print!("Enter number (1-{}): ", results.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid selection"))?;

    if choice < 1 || choice > results.len() {
        bail!("Invalid selection");
    }

    Ok(results[choice - 1].tvdb_id.clone())
}
