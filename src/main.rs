mod collector;
mod combiner;
mod error;
mod extractor;
mod http_session;
mod parser;
mod progress;
mod session;
mod settings;
mod store;

use std::time::Instant;

use clap::{Parser, Subcommand};

use http_session::HttpSession;
use session::PageSession;
use settings::{Credentials, Settings};
use store::RunSummary;

#[derive(Parser)]
#[command(name = "workflow_harvest", about = "Harvest workflow metadata and JSON definitions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download each workflow's JSON definition
    Download {
        /// Max URLs to visit (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape each workflow page's metadata
    Scrape {
        /// Max URLs to visit (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Merge scraped metadata with downloaded definitions
    Combine,
    /// Download + scrape with one login, then combine
    Run {
        /// Max URLs to visit
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show file counts per output directory
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Download { limit } => {
            let credentials = Credentials::from_env()?;
            let urls = load_urls(&settings, limit)?;
            println!("Found {} workflows to download", urls.len());

            let mut site = HttpSession::new(&settings)?;
            session::authenticate(&mut site, &settings, &credentials).await?;
            let stats = collector::download_all(&mut site, &urls, &settings).await?;
            println!(
                "Done: {} visited ({} ok, {} failed). Files saved to {}",
                stats.total,
                stats.ok,
                stats.failed,
                settings.workflows_dir.display()
            );
            Ok(())
        }
        Commands::Scrape { limit } => {
            let credentials = Credentials::from_env()?;
            let urls = load_urls(&settings, limit)?;
            println!("Found {} workflows to scrape", urls.len());

            let mut site = HttpSession::new(&settings)?;
            session::authenticate(&mut site, &settings, &credentials).await?;
            let stats = extractor::scrape_all(&mut site, &urls, &settings).await?;
            println!(
                "Done: {} visited ({} ok, {} failed). Files saved to {}",
                stats.total,
                stats.ok,
                stats.failed,
                settings.metadata_dir.display()
            );
            println!(
                "Combined file: {}",
                settings.metadata_dir.join(store::AGGREGATE_FILE).display()
            );
            Ok(())
        }
        Commands::Combine => {
            let summary = combiner::combine(
                &settings.metadata_dir,
                &settings.workflows_dir,
                &settings.combined_dir,
            )?;
            summary.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let credentials = Credentials::from_env()?;
            let urls = load_urls(&settings, limit)?;
            let mut site = HttpSession::new(&settings)?;
            let summary = run_pipeline(&mut site, &urls, &settings, &credentials).await?;
            summary.print();
            Ok(())
        }
        Commands::Stats => {
            println!(
                "Definitions: {:>6}  ({})",
                store::count_workflow_files(&settings.workflows_dir)?,
                settings.workflows_dir.display()
            );
            println!(
                "Metadata:    {:>6}  ({})",
                store::count_workflow_files(&settings.metadata_dir)?,
                settings.metadata_dir.display()
            );
            println!(
                "Combined:    {:>6}  ({})",
                store::count_workflow_files(&settings.combined_dir)?,
                settings.combined_dir.display()
            );
            match store::read_summary(&settings.combined_dir)? {
                Some(summary) => {
                    println!("\nLast combine run ({}):", summary.generated_at.to_rfc3339());
                    summary.print();
                }
                None => println!("\nNo combine run yet."),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Download and scrape with one login, then combine. With no URLs the
/// browsing phases are skipped but whatever is already on disk is combined.
async fn run_pipeline<S: PageSession>(
    site: &mut S,
    urls: &[String],
    settings: &Settings,
    credentials: &Credentials,
) -> anyhow::Result<RunSummary> {
    if urls.is_empty() {
        println!(
            "No URLs in {}; skipping download and scrape.",
            settings.urls_file.display()
        );
    } else {
        session::authenticate(site, settings, credentials).await?;

        // Phase 1: definitions
        let t_download = Instant::now();
        println!("Pipeline: downloading {} workflows...", urls.len());
        let stats = collector::download_all(site, urls, settings).await?;
        println!(
            "Downloaded {} ({} ok, {} failed) in {:.1}s",
            stats.total,
            stats.ok,
            stats.failed,
            t_download.elapsed().as_secs_f64()
        );

        // Phase 2: metadata
        let t_scrape = Instant::now();
        println!("Pipeline: scraping {} workflows...", urls.len());
        let stats = extractor::scrape_all(site, urls, settings).await?;
        println!(
            "Scraped {} ({} ok, {} failed) in {:.1}s",
            stats.total,
            stats.ok,
            stats.failed,
            t_scrape.elapsed().as_secs_f64()
        );
    }

    // Phase 3: join
    combiner::combine(
        &settings.metadata_dir,
        &settings.workflows_dir,
        &settings.combined_dir,
    )
}

fn load_urls(settings: &Settings, limit: Option<usize>) -> anyhow::Result<Vec<String>> {
    let mut urls = store::load_urls(&settings.urls_file)?;
    if let Some(n) = limit {
        urls.truncate(n);
    }
    Ok(urls)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
