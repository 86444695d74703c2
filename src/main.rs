mod error;
mod fetcher;
mod loader;
mod model;
mod normalize;
mod parser;
mod settings;
mod store;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use model::CourseSet;
use settings::Settings;
use store::{PostgrestStore, SqliteStore, Store, TABLES};

#[derive(Parser)]
#[command(name = "course_harvest", about = "Informatics course and instructor history loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download archived time schedules, one file per term
    Fetch {
        /// Output directory
        #[arg(short, long, default_value = "data")]
        out: PathBuf,
        #[arg(long, default_value_t = model::FIRST_YEAR)]
        from: i32,
        #[arg(long, default_value_t = model::LAST_YEAR)]
        to: i32,
        /// Site root serving /students/timeschd/
        #[arg(long, default_value = fetcher::DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Extract unique course headings from saved schedules into a text file
    Catalog {
        #[arg(short, long, default_value = "data")]
        dir: PathBuf,
        #[arg(short, long, default_value = "courses.txt")]
        out: PathBuf,
    },
    /// Parse schedules and the current catalog without writing anywhere
    Parse {
        #[arg(short, long, default_value = "data-timeschd")]
        dir: PathBuf,
        /// Read the current catalog from this file instead of object storage
        #[arg(long)]
        catalog_file: Option<PathBuf>,
        /// Print every instructor appearance
        #[arg(short, long)]
        verbose: bool,
    },
    /// Reconcile schedules against the current catalog and load the store
    Load {
        #[arg(short, long, default_value = "data-timeschd")]
        dir: PathBuf,
        /// Read the current catalog from this file instead of object storage
        #[arg(long)]
        catalog_file: Option<PathBuf>,
        /// Load into a local SQLite database instead of the hosted store
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },
    /// Show row counts of every store table
    Stats {
        /// Inspect a local SQLite database instead of the hosted store
        #[arg(long)]
        sqlite: Option<PathBuf>,
    },
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

    let result = match cli.command {
        Commands::Fetch {
            out,
            from,
            to,
            base_url,
        } => {
            println!("Fetching {} terms into {:?}...", (from..=to).count() * 4, out);
            let stats = fetcher::fetch_terms(&base_url, from..=to, &out).await?;
            println!(
                "Done: {} terms ({} saved, {} without a schedule).",
                stats.total, stats.saved, stats.missing
            );
            Ok(())
        }
        Commands::Catalog { dir, out } => {
            let entries = parser::catalog::extract_dir(&dir)?;
            parser::catalog::write_courses(&out, &entries)?;
            println!("Wrote {} courses to {:?}", entries.len(), out);
            Ok(())
        }
        Commands::Parse {
            dir,
            catalog_file,
            verbose,
        } => {
            let settings = Settings::load()?;
            let catalog = load_catalog(&settings, catalog_file.as_deref()).await?;
            let professors = parser::schedule::parse_schedule_dir(&dir)?;
            let current = loader::current_professors(&professors, &catalog);
            if verbose {
                for p in &current {
                    println!("{} {} | {} | {}", p.quarter, p.year, p.course, p);
                }
            }
            println!(
                "{} catalog courses, {} instructor rows, {} teaching current courses.",
                catalog.len(),
                professors.len(),
                current.len()
            );
            Ok(())
        }
        Commands::Load {
            dir,
            catalog_file,
            sqlite,
        } => {
            let settings = Settings::load()?;
            // credentials are checked before any parsing when the hosted side is used
            if sqlite.is_none() || catalog_file.is_none() {
                settings.require_remote()?;
            }

            let professors = parser::schedule::parse_schedule_dir(&dir)?;
            let catalog = load_catalog(&settings, catalog_file.as_deref()).await?;

            let report = match sqlite {
                Some(path) => {
                    let store = SqliteStore::open(&path)?;
                    loader::load(&store, &catalog, &professors).await?
                }
                None => {
                    let store = PostgrestStore::new(&settings.require_remote()?);
                    loader::load(&store, &catalog, &professors).await?
                }
            };
            report.print();
            Ok(())
        }
        Commands::Stats { sqlite } => {
            match sqlite {
                Some(path) => print_counts(&SqliteStore::open(&path)?).await?,
                None => {
                    let remote = Settings::load()?.require_remote()?;
                    print_counts(&PostgrestStore::new(&remote)).await?
                }
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

/// Current catalog from a local file, or from object storage.
async fn load_catalog(settings: &Settings, file: Option<&Path>) -> Result<CourseSet> {
    let html = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {:?}", path))?,
        None => {
            let remote = settings.require_remote()?;
            PostgrestStore::new(&remote)
                .download(&remote.bucket, &remote.object)
                .await
                .context("Failed to download current catalog")?
        }
    };
    let catalog = parser::current::parse_current_catalog(&html);
    if catalog.is_empty() {
        tracing::warn!("Current catalog contains no courses; nothing will be loaded");
    }
    Ok(catalog)
}

async fn print_counts<S: Store>(store: &S) -> Result<()> {
    for table in TABLES {
        let rows = store
            .count(table)
            .await
            .with_context(|| format!("Failed to count {}", table))?;
        println!("{:<20} {}", format!("{}:", table), rows);
    }
    Ok(())
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
