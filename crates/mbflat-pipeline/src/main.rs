//! Pipeline CLI: extract, filter, index, build the search index, and
//! normalize, as separate subcommands or one `run`.
//!
//! Every stage is idempotent behind its source manifest, so `mbflat run`
//! after an interrupted build resumes where the previous run stopped.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use mbflat_formats::BuildFlags;
use mbflat_index::IndexPaths;
use mbflat_normalize::{ProcessConfig, run_process};

#[derive(Parser)]
#[command(
    name = "mbflat",
    about = "Offline build pipeline for the mbflat metadata dataset",
    version,
    long_about = "Converts the MusicBrainz JSON dumps into a read-only flat-file \
                  dataset: filtered NDJSON, byte-offset indexes, normalized artist \
                  and album documents, and full-text search databases."
)]
struct Cli {
    /// Directory holding the dump archives and extracted NDJSON
    #[arg(long, env = "MBFLAT_INPUT_DIR", default_value = "/data/current")]
    input_dir: PathBuf,

    /// Output root for filtered files, indexes, documents, and databases
    #[arg(long, env = "MBFLAT_OUTPUT_DIR", default_value = "/data/processed")]
    output_dir: PathBuf,

    /// Load per-release data and emit full track lists
    #[arg(long, env = "MBFLAT_USE_FULL_RELEASE_DATA")]
    use_full_release_data: bool,

    /// Primary release-group types to keep (comma-separated); all when omitted
    #[arg(long, env = "MBFLAT_INCLUDE_RELEASE_TYPES", value_delimiter = ',')]
    include_release_types: Option<Vec<String>>,

    /// Secondary types that exclude a release-group (comma-separated)
    #[arg(long, env = "MBFLAT_EXCLUDE_SECONDARY_TYPES", value_delimiter = ',')]
    exclude_secondary_types: Vec<String>,

    /// Artist types to keep (comma-separated); all when omitted
    #[arg(long, env = "MBFLAT_INCLUDE_ARTIST_TYPES", value_delimiter = ',')]
    include_artist_types: Option<Vec<String>>,

    /// Tolerated ratio of unparseable input lines per filter pass
    #[arg(long, env = "MBFLAT_INVALID_LINE_TOLERANCE", default_value_t = 0.0)]
    invalid_line_tolerance: f64,

    /// Cap on processed artists, for development runs
    #[arg(long, env = "MBFLAT_MAX_ARTISTS")]
    max_artists: Option<usize>,

    /// Tolerated failed artists before the processing run fails
    #[arg(long, env = "MBFLAT_MAX_FAILED_ARTISTS")]
    max_failed_artists: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompress the artist and release-group archives
    Extract,
    /// Produce the schema-filtered NDJSON files
    Filter,
    /// Build the byte-offset and join indexes
    Index,
    /// Build the artist full-text search database
    Fts,
    /// Normalize every artist into the sharded document trees
    Process,
    /// Run the whole pipeline in order
    Run,
}

impl Cli {
    fn flags(&self) -> BuildFlags {
        BuildFlags {
            use_full_release_data: self.use_full_release_data,
            include_release_types: self.include_release_types.clone(),
            exclude_secondary_types: self.exclude_secondary_types.clone(),
            include_artist_types: self.include_artist_types.clone(),
        }
    }

    /// Prefer a filtered file, falling back to the raw extracted dump.
    fn source_file(&self, entity: &str) -> PathBuf {
        let filtered = self.output_dir.join(format!("{entity}.filtered"));
        if filtered.exists() {
            filtered
        } else {
            self.input_dir.join(entity)
        }
    }

    fn release_file(&self) -> Option<PathBuf> {
        [
            self.output_dir.join("release.filtered"),
            self.input_dir.join("release"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    fn index_paths(&self) -> IndexPaths {
        IndexPaths::new(self.output_dir.join("indexes"))
    }
}

fn stage_extract(cli: &Cli) -> Result<()> {
    mbflat_dump::run_extract(&cli.input_dir)?;
    Ok(())
}

fn stage_filter(cli: &Cli) -> Result<()> {
    mbflat_dump::run_filter(&cli.input_dir, &cli.output_dir, cli.invalid_line_tolerance)?;
    Ok(())
}

fn stage_index(cli: &Cli) -> Result<()> {
    let release_file = cli.release_file();
    mbflat_index::run_index(
        &cli.source_file("artist"),
        &cli.source_file("release-group"),
        release_file.as_deref(),
        &cli.index_paths(),
        &cli.flags(),
    )?;
    Ok(())
}

fn stage_fts(cli: &Cli) -> Result<()> {
    mbflat_search::run_fts(&cli.source_file("artist"), &cli.output_dir)?;
    Ok(())
}

fn stage_process(cli: &Cli) -> Result<()> {
    let config = ProcessConfig {
        artist_file: cli.source_file("artist"),
        release_group_file: cli.source_file("release-group"),
        release_file: cli.release_file(),
        index_dir: cli.index_paths().dir().to_path_buf(),
        output_dir: cli.output_dir.clone(),
        flags: cli.flags(),
        max_artists: cli.max_artists,
        max_failed_artists: cli.max_failed_artists,
    };
    let outcome = run_process(&config)?;
    tracing::info!(
        "Artists written: {}, albums written: {}, failed: {}",
        outcome.processed,
        outcome.albums_written,
        outcome.failed
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    ensure_dir(&cli.output_dir)?;
    match cli.command {
        Commands::Extract => stage_extract(cli),
        Commands::Filter => stage_filter(cli),
        Commands::Index => stage_index(cli),
        Commands::Fts => stage_fts(cli),
        Commands::Process => stage_process(cli),
        Commands::Run => {
            stage_extract(cli)?;
            stage_filter(cli)?;
            stage_index(cli)?;
            stage_fts(cli)?;
            stage_process(cli)
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
