mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use leggi_core::{AbrogationRule, MetadataExtractor, is_abrogated};
use leggi_pipeline::{DetailExtractor, Pipeline, ProfileOverrides, SiteProfile, SourceSpec};
use leggi_store::SheetFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leggi")]
#[command(about = "Collect Italian regional laws as PDFs with a searchable index")]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG is ignored when set)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one region as described by a site profile
    Run {
        /// Site profile (JSON)
        profile: PathBuf,

        /// Where PDFs, the sheet and progress are written
        #[arg(long, env = "LEGGI_OUT_DIR", default_value = "output")]
        out_dir: PathBuf,

        /// Concurrent law jobs
        #[arg(long, env = "LEGGI_WORKERS")]
        workers: Option<usize>,

        /// Rows between sheet flushes
        #[arg(long)]
        flush_every: Option<usize>,

        /// Listing page cap per group
        #[arg(long)]
        max_pages: Option<u32>,

        /// Year range, e.g. 2015..2020 or 2019
        #[arg(long, value_parser = parse_year_range)]
        years: Option<(i32, i32)>,

        /// Index sheet format: xlsx or csv
        #[arg(long, env = "LEGGI_SHEET_FORMAT")]
        sheet_format: Option<SheetFormat>,
    },

    /// Validate a site profile without touching the network
    Check { profile: PathBuf },

    /// Show what the extractor derives from a piece of text
    Extract {
        text: String,

        /// Use this profile's number patterns and abrogation rules
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Count downloaded PDFs per year
    Count { dir: PathBuf },

    /// Print one law from a Parquet mirror
    Show { parquet: PathBuf, filename: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            profile,
            out_dir,
            workers,
            flush_every,
            max_pages,
            years,
            sheet_format,
        } => {
            let overrides = ProfileOverrides {
                workers,
                flush_every,
                max_pages,
                years,
                sheet_format,
            };
            cmd_run(&profile, out_dir, &overrides).await
        }
        Commands::Check { profile } => cmd_check(&profile),
        Commands::Extract { text, profile } => cmd_extract(&text, profile.as_deref()),
        Commands::Count { dir } => cmd_count(&dir),
        Commands::Show { parquet, filename } => cmd_show(&parquet, &filename),
    }
}

fn init_tracing(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_profile(path: &Path) -> anyhow::Result<SiteProfile> {
    SiteProfile::load(path).with_context(|| format!("loading profile {}", path.display()))
}

async fn cmd_run(profile: &Path, out_dir: PathBuf, overrides: &ProfileOverrides) -> anyhow::Result<()> {
    let mut profile = load_profile(profile)?;
    profile.apply(overrides);
    tracing::info!(region = %profile.region, "leggi v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  Output: {}", out_dir.display());

    let pipeline = Pipeline::connect(profile, out_dir).context("setting up pipeline")?;
    let report = pipeline.run().await.context("run failed")?;
    display::print_run_report(&report);
    Ok(())
}

fn cmd_check(path: &Path) -> anyhow::Result<()> {
    let profile = load_profile(path)?;
    profile
        .validate()
        .with_context(|| format!("profile {} is invalid", path.display()))?;
    DetailExtractor::from_profile(&profile).context("compiling detail extractor")?;

    let source = match &profile.source {
        SourceSpec::Listing(listing) => format!("listing ({:?})", listing.fetch),
        SourceSpec::Probe(_) => "probe".to_string(),
    };
    println!("{}: ok", path.display());
    println!("  {:<12} {}", "region", profile.region);
    println!("  {:<12} {}", "source", source);
    println!("  {:<12} {:?}", "metadata", profile.metadata_from);
    println!("  {:<12} {:?}", "acquisition", profile.acquisition);
    println!("  {:<12} {}", "sheet", profile.run.sheet_format);
    match profile.years() {
        Some(years) => println!(
            "  {:<12} {} ({}..{})",
            "groups",
            years.len(),
            years.first().copied().unwrap_or_default(),
            years.last().copied().unwrap_or_default()
        ),
        None => println!("  {:<12} 1 (ungrouped)", "groups"),
    }
    Ok(())
}

fn cmd_extract(text: &str, profile: Option<&Path>) -> anyhow::Result<()> {
    let (extractor, rules) = match profile {
        Some(path) => {
            let profile = load_profile(path)?;
            let detail = DetailExtractor::from_profile(&profile)?;
            (detail.metadata().clone(), profile.abrogation)
        }
        None => (
            MetadataExtractor::default(),
            vec![
                AbrogationRule::Parenthesised,
                AbrogationRule::Indicators { phrases: Vec::new() },
            ],
        ),
    };

    let meta = extractor.extract(text);
    println!("  {:<10} {}", "number", meta.number.as_deref().unwrap_or("-"));
    match meta.date {
        Some(date) => {
            println!("  {:<10} {}", "date", date.iso());
            println!("  {:<10} {}", "display", date.italian());
        }
        None => println!("  {:<10} -", "date"),
    }
    let verdict = if is_abrogated(text, &rules) { "yes" } else { "no" };
    println!("  {:<10} {}", "abrogated", verdict);
    Ok(())
}

fn cmd_count(dir: &Path) -> anyhow::Result<()> {
    let census = leggi_store::count_pdfs(dir)
        .with_context(|| format!("reading {}", dir.display()))?;
    eprintln!("  PDFs in {}", dir.display());
    display::print_census(&census);
    Ok(())
}

fn cmd_show(parquet: &Path, filename: &str) -> anyhow::Result<()> {
    let batches = leggi_store::read_parquet(parquet)
        .with_context(|| format!("reading {}", parquet.display()))?;
    let Some(row) = display::find_law(&batches, filename) else {
        bail!("no law with filename {filename} in {}", parquet.display());
    };
    display::print_law_card(&row);
    Ok(())
}

/// `FROM..TO`, `FROM..=TO` or a single year.
fn parse_year_range(s: &str) -> Result<(i32, i32), String> {
    let parse = |y: &str| {
        y.trim()
            .parse::<i32>()
            .map_err(|_| format!("not a year: {y:?}"))
    };
    let (from, to) = match s.split_once("..") {
        Some((from, to)) => (parse(from)?, parse(to.trim_start_matches('='))?),
        None => {
            let y = parse(s)?;
            (y, y)
        }
    };
    if from > to {
        return Err(format!("empty year range {from}..{to}"));
    }
    Ok((from, to))
}
