//! Shnaton scraper main entry point
//!
//! This is the command-line interface for scraping the course catalog into JSON.

use anyhow::{anyhow, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shnaton_scraper::config::{load_config_or_default, Config};
use shnaton_scraper::fetch::{Catalog, MaslulQuery};
use shnaton_scraper::model::{Toar, ToarYear};
use shnaton_scraper::output::{export, print_statistics, ScrapeOutput, ScrapeStatistics};
use shnaton_scraper::parse::parser_for;
use shnaton_scraper::{Fetcher, ScrapeReport, Scraper};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Shnaton scraper: course catalog to JSON
///
/// Scrapes individual courses by id, or every course of a study program
/// ("maslul"), including schedules and optionally exam dates.
#[derive(Parser, Debug)]
#[command(name = "shnaton-scraper")]
#[command(version = "1.0.0")]
#[command(about = "Scrapes the course catalog into JSON", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Academic year, e.g. 2025
    #[arg(short, long)]
    year: u16,

    /// Comma-separated course ids
    #[arg(
        short,
        long,
        value_delimiter = ',',
        required_unless_present = "maslul",
        conflicts_with = "maslul"
    )]
    courses: Vec<String>,

    /// Program ("maslul") code to scrape every course of
    #[arg(short, long, requires_all = ["faculty", "hug"])]
    maslul: Option<String>,

    /// Faculty code of the program
    #[arg(long)]
    faculty: Option<String>,

    /// Department ("hug") code of the program
    #[arg(long)]
    hug: Option<String>,

    /// Degree filter: 0 any, 1 bachelor
    #[arg(short, long, default_value_t = 0)]
    toar: u8,

    /// Degree year filter: 0 any, 1-4
    #[arg(short = 's', long, default_value_t = 0)]
    toar_year: u8,

    /// Scrape only this results page of the program (1-based)
    #[arg(short, long, requires = "maslul")]
    page: Option<u32>,

    /// Write JSON here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip exam dates
    #[arg(long)]
    no_exams: bool,

    /// Abort after this many courses are reported missing
    #[arg(long)]
    missing_limit: Option<usize>,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(limit) = cli.missing_limit {
        config.scraper.missing_course_limit = Some(limit);
    }
    if let Some(path) = &cli.config {
        tracing::info!("Configuration loaded from: {}", path.display());
    }

    let fetcher = Arc::new(Fetcher::new(&config.fetcher).context("Failed to create fetcher")?);
    let started = Instant::now();

    let outcome = run(&cli, &config, Arc::clone(&fetcher)).await;
    fetcher.shutdown().await;
    let (report, requested) = outcome?;

    let output = ScrapeOutput::new(cli.year, &report.courses);
    export(&output, cli.output.as_deref()).context("Failed to write JSON output")?;
    if let Some(path) = &cli.output {
        tracing::info!("Wrote {} courses to {}", report.courses.len(), path.display());
    }

    if !cli.quiet {
        let stats = ScrapeStatistics::from_report(&report, requested, started.elapsed());
        print_statistics(&stats, &report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shnaton_scraper=info,warn"),
            1 => EnvFilter::new("shnaton_scraper=debug,info"),
            2 => EnvFilter::new("shnaton_scraper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the requested scrape and returns the report with the number of
/// requested entities
async fn run(
    cli: &Cli,
    config: &Config,
    fetcher: Arc<Fetcher>,
) -> anyhow::Result<(ScrapeReport, usize)> {
    let catalog = Catalog::new(&config.catalog);
    let parser = parser_for(config.catalog.layout, &config.catalog.base_url)
        .context("Failed to build course parser")?;
    tracing::debug!("Expecting the {:?} course layout", parser.layout());
    let include_exams = config.scraper.include_exams && !cli.no_exams;

    let mut scraper = Scraper::new(fetcher, catalog, parser, config.scraper.clone());
    if cli.progress && !cli.quiet {
        scraper = scraper.with_progress(progress_bar()?);
    }

    match &cli.maslul {
        Some(maslul) => {
            let query = MaslulQuery {
                year: cli.year,
                faculty: cli.faculty.clone().unwrap_or_default(),
                hug: cli.hug.clone().unwrap_or_default(),
                maslul: maslul.clone(),
                toar: Toar::from_code(cli.toar)
                    .ok_or_else(|| anyhow!("Unknown degree code: {}", cli.toar))?,
                toar_year: ToarYear::from_code(cli.toar_year)
                    .ok_or_else(|| anyhow!("Unknown degree year: {}", cli.toar_year))?,
            };
            tracing::info!("Scraping program {} for {}", query.maslul, query.year);

            let report = match cli.page {
                Some(page) => scraper.scrape_maslul_page(&query, page, include_exams).await,
                None => scraper.scrape_maslul(&query, include_exams).await,
            }
            .with_context(|| format!("Failed to scrape program {}", maslul))?;
            let pages = report.pages as usize;
            Ok((report, pages))
        }
        None => {
            let report = scraper
                .scrape_courses(&cli.courses, cli.year, include_exams)
                .await
                .context("Failed to scrape courses")?;
            Ok((report, cli.courses.len()))
        }
    }
}

fn progress_bar() -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );
    Ok(bar)
}
