// Image harvester CLI
//
// Renders a gallery page in headless Chromium, follows its "next" chain,
// downloads every image, normalizes them and writes a zip archive.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use kodegen_tools_imagegrab::{
    CrawlError, HarvestConfig, OutputFormat, StatusReporter, harvest,
    utils::{DEFAULT_CONCURRENCY_LIMIT, DEFAULT_MAX_PAGES, DEFAULT_NEXT_PAGE_SELECTOR, DEFAULT_OUTPUT_DIR},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "kodegen-imagegrab",
    about = "Harvest every image from a paginated gallery into a zip archive",
    version
)]
struct Cli {
    /// Gallery URL to start from
    url: String,

    /// Directory receiving image_N files; the archive is written beside it
    #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Archive path (defaults to <output-dir>.zip)
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Output image format: png, jpeg, webp, bmp or tiff
    #[arg(long, short, default_value = "png")]
    format: OutputFormat,

    /// Maximum concurrent downloads
    #[arg(long, short, default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
    concurrency: usize,

    /// Maximum pages to follow
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES, conflicts_with = "unbounded")]
    max_pages: usize,

    /// Follow the "next" chain without a page cap
    #[arg(long)]
    unbounded: bool,

    /// CSS selector of the "next page" control
    #[arg(long, default_value = DEFAULT_NEXT_PAGE_SELECTOR)]
    next_selector: String,

    /// Resize every image to exactly WIDTHxHEIGHT
    #[arg(long, value_parser = parse_dimensions)]
    resize: Option<(u32, u32)>,

    /// Name files with the output format's extension even when the source
    /// URL carries a recognized image extension
    #[arg(long)]
    canonical_extension: bool,

    /// Show the browser window (debug builds only)
    #[arg(long)]
    headful: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_dimensions(raw: &str) -> Result<(u32, u32)> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width = w.trim().parse().context("invalid width")?;
    let height = h.trim().parse().context("invalid height")?;
    Ok((width, height))
}

fn build_config(cli: &Cli) -> Result<HarvestConfig> {
    let mut builder = HarvestConfig::builder()
        .output_dir(&cli.output_dir)
        .start_url(&cli.url)
        .target_format(cli.format)
        .concurrency_limit(cli.concurrency)
        .max_pages((!cli.unbounded).then_some(cli.max_pages))
        .next_page_selector(&cli.next_selector)
        .keep_source_extension(!cli.canonical_extension)
        .headless(!cli.headful);

    if let Some(path) = &cli.archive {
        builder = builder.archive_path(path);
    }
    if let Some((width, height)) = cli.resize {
        builder = builder.resize(width, height);
    }

    builder.build()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromiumoxide=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling harvest");
            ctrl_c.cancel();
        }
    });

    let (reporter, _status) = StatusReporter::new();
    match harvest(&config, &reporter, &cancel).await {
        Ok(result) => {
            if cli.json {
                match serde_json::to_string_pretty(&result) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("error: failed to serialize result: {e}"),
                }
            } else if result.is_empty() {
                println!("No images found ({} pages visited)", result.pages_visited);
            } else {
                println!("References:   {}", result.references.len());
                println!("Pages:        {} ({:?})", result.pages_visited, result.termination);
                println!("Saved:        {}", result.success_count());
                println!("Failed:       {}", result.failure_count());
                if let Some(archive) = &result.archive {
                    println!("Archive:      {} ({} bytes)", archive.path.display(), archive.size_bytes);
                }
            }
            ExitCode::SUCCESS
        }
        Err(CrawlError::CrawlFailed { message, partial }) => {
            eprintln!("error: crawl failed: {message}");
            eprintln!("{} references were collected before the failure", partial.len());
            ExitCode::FAILURE
        }
        Err(CrawlError::Archive { source, materialized }) => {
            let saved = materialized.iter().filter(|f| f.is_success()).count();
            eprintln!("error: {source}");
            eprintln!("{saved} images remain in {}", config.output_dir().display());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
