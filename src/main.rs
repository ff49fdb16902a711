use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use playstore_harvest::{
    load_app_list, save_criteria_counts, Config, DirStore, Harvester, PlayApiClient,
};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Incrementally harvest app-store reviews and metadata")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to YAML config file
    #[arg(long, default_value = "harvest.yml")]
    config: PathBuf,

    /// Override the aggregation API base URL
    #[arg(long, env = "HARVEST_BASE_URL")]
    base_url: Option<String>,

    /// Override the directory harvested documents are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override the app list file
    #[arg(long)]
    app_list: Option<PathBuf>,

    /// Also write logs to a timestamped file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every app in the app list
    Run,

    /// Harvest a single app
    App {
        /// App identifier (e.g. com.example.app)
        app_id: String,
    },

    /// Recompute the criteria counts from an app's stored reviews
    Criteria {
        /// App identifier
        app_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if let Some(output_dir) = cli.output_dir {
        config.storage.output_dir = output_dir;
    }
    if let Some(app_list) = cli.app_list {
        config.storage.app_list = app_list;
    }
    if let Some(log_dir) = cli.log_dir {
        config.logging.directory = Some(log_dir);
    }

    init_tracing(config.logging.directory.as_deref())?;

    let store = DirStore::new(&config.storage.output_dir)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Run => {
            let app_ids = load_app_list(&config.storage.app_list)?;
            let api = PlayApiClient::new(&config.api);
            let harvester = Harvester::new(api, store, config);

            let summary = harvester.run(&app_ids, today).await?;
            for app in &summary.apps {
                println!(
                    "{}: {} reviews ({} fetched), {} criteria",
                    app.app_id, app.reviews.stored, app.reviews.fetched, app.criteria
                );
            }
        }
        Commands::App { app_id } => {
            let api = PlayApiClient::new(&config.api);
            let harvester = Harvester::new(api, store, config);

            let app = harvester.harvest_app(&app_id, today).await?;
            println!(
                "{}: {} reviews ({} fetched, {:?}), {} criteria",
                app.app_id, app.reviews.stored, app.reviews.fetched, app.reviews.mode, app.criteria
            );
        }
        Commands::Criteria { app_id } => {
            let counts = save_criteria_counts(&store, &app_id, &config.sync.criteria_prefix)?;
            for (criterion, count) in &counts {
                println!("{}: {}", criterion, count);
            }
        }
    }

    Ok(())
}

fn init_tracing(log_dir: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::from_default_env().add_directive("playstore_harvest=info".parse()?);

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let path = dir.join(format!(
                "ExtractReviews{}.log",
                Local::now().format("%Y%m%d-%H%M%S")
            ));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    info!("Logging initialized");

    Ok(())
}
