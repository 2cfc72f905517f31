use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use tunegrab::catalog::{pick_default_input, LEGACY_FILENAME};
use tunegrab::cli_style::{get_styles, print_error, print_key_value, print_summary};
use tunegrab::config::{AppConfig, CliConfig, FileConfig};
use tunegrab::fetcher::ProgressBoard;
use tunegrab::runner::{run_batch, RunReport};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

fn parse_path(s: &str) -> Result<PathBuf> {
    let path = PathBuf::from(s);
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}

/// Download a catalog of tracks with their covers as tagged MP3 files.
#[derive(Parser, Debug)]
#[command(name = "tunegrab", version = VERSION, styles = get_styles())]
struct CliArgs {
    /// Catalog file (.json, .csv, .tsv or legacy list.txt). When omitted, one
    /// is picked from the current directory.
    #[clap(short, long, value_parser = parse_path)]
    pub input: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory receiving the finished files.
    #[clap(long, default_value = "downloads")]
    pub output_dir: PathBuf,

    /// Directory for per-item scratch data.
    #[clap(long, default_value = "tmp")]
    pub tmp_dir: PathBuf,

    /// File receiving warnings and errors. Truncated on start.
    #[clap(long, default_value = "errors.log")]
    pub log_file: PathBuf,

    /// Maximum concurrent audio downloads.
    #[clap(long, default_value_t = 5)]
    pub audio_concurrency: usize,

    /// Maximum concurrent cover downloads.
    #[clap(long, default_value_t = 2)]
    pub cover_concurrency: usize,

    /// Attempts per asset (and per cover header set).
    #[clap(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Connect and read-stall timeout in seconds.
    #[clap(long, default_value_t = 60)]
    pub timeout_sec: u64,

    /// Skip the second pass over missing covers.
    #[clap(long)]
    pub no_repair: bool,

    /// Disable progress bars.
    #[clap(long)]
    pub no_progress: bool,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            output_dir: args.output_dir.clone(),
            tmp_dir: args.tmp_dir.clone(),
            log_file: args.log_file.clone(),
            audio_concurrency: args.audio_concurrency,
            cover_concurrency: args.cover_concurrency,
            max_attempts: args.max_attempts,
            timeout_sec: args.timeout_sec,
            no_repair: args.no_repair,
            no_progress: args.no_progress,
        }
    }
}

fn resolve_input(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    pick_default_input(&cwd)
        .with_context(|| format!("Failed to scan {:?} for input files", cwd))?
        .with_context(|| {
            format!(
                "No input file found in {:?} (expected *.json, *.csv, *.tsv or {})",
                cwd, LEGACY_FILENAME
            )
        })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

async fn run(cli_args: CliArgs) -> Result<RunReport> {
    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    let progress = ProgressBoard::new(config.progress_enabled);
    tunegrab::logging::init(&config.log_file, &progress)?;

    let input = resolve_input(cli_args.input)?;
    print_key_value("Input file", &display_name(&input));
    info!(
        "Output to {:?}, scratch in {:?}, audio x{}, cover x{}",
        config.output_dir, config.tmp_dir, config.audio_concurrency, config.cover_concurrency
    );

    run_batch(&config, &input, progress).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = CliArgs::parse();

    match run(cli_args).await {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
