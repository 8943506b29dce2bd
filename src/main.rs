use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use reqwest::Client;
use scraper::Html;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use wxscrape::{
    config::{Config, ForecastConfig, ObservationsConfig},
    extract::{forecast::scrape_city_forecast, table::extract_table},
    fetch::{fetch_page, page_url},
    logging,
    store::DatasetStore,
};

#[derive(Parser)]
#[command(
    name = "wxscrape",
    about = "Scrape weather.gc.ca observations and forecasts into per-year CSV files"
)]
struct Cli {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge each station's past-24-hour table into its yearly file
    Observations {
        /// Station code (repeatable; default: stations from config)
        #[arg(short, long = "station")]
        stations: Vec<String>,
    },
    /// Scrape each city page and append one row to its yearly file
    Forecast {
        /// Location code such as `bc-85` (repeatable; default: cities from config)
        #[arg(short = 'l', long = "city")]
        cities: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    // ─── 1) init logging (console + daily run log) ──────────────────
    let _log_guard = logging::init(&cfg)?;
    info!("wxscrape {} started", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", cfg.data_dir.display());
    info!("Log directory: {}", cfg.log_dir.display());

    let client = Client::new();

    // ─── 2) scrape + merge, one entity at a time ─────────────────────
    let (attempted, failed) = match cli.command {
        Commands::Observations { stations } => {
            let stations = if stations.is_empty() {
                cfg.observations.stations.clone()
            } else {
                stations
            };
            let mut failed = 0;
            for code in &stations {
                if let Err(e) =
                    scrape_station(&client, &cfg.observations, &cfg.data_dir, code).await
                {
                    error!("station {} failed: {:#}", code, e);
                    failed += 1;
                }
            }
            (stations.len(), failed)
        }
        Commands::Forecast { cities } => {
            let targets: Vec<(String, String)> = if cities.is_empty() {
                cfg.forecast
                    .cities
                    .iter()
                    .map(|(name, code)| (name.clone(), code.clone()))
                    .collect()
            } else {
                cities.into_iter().map(|c| (c.clone(), c)).collect()
            };
            let mut failed = 0;
            for (name, code) in &targets {
                info!("City: {} ({})", name, code);
                if let Err(e) = scrape_city(&client, &cfg.forecast, &cfg.data_dir, code).await {
                    error!("city {} failed: {:#}", code, e);
                    failed += 1;
                }
            }
            (targets.len(), failed)
        }
    };

    if failed > 0 {
        bail!("{} of {} scrapes failed", failed, attempted);
    }
    info!("all done");
    Ok(())
}

async fn scrape_station(
    client: &Client,
    cfg: &ObservationsConfig,
    data_dir: &Path,
    code: &str,
) -> Result<()> {
    info!("Station code: {}", code);
    let url = page_url(&cfg.url_template, code)?;
    let html = fetch_page(client, &url).await?;

    let set = {
        let doc = Html::parse_document(&html);
        extract_table(&doc, &cfg.table_spec(), Local::now().date_naive())?
    };

    let store = DatasetStore::new(data_dir, cfg.file_template.as_str());
    store.merge_and_save(code, set)?;
    Ok(())
}

async fn scrape_city(
    client: &Client,
    cfg: &ForecastConfig,
    data_dir: &Path,
    code: &str,
) -> Result<()> {
    let url = page_url(&cfg.url_template, code)?;
    let html = fetch_page(client, &url).await?;

    let record = {
        let doc = Html::parse_document(&html);
        scrape_city_forecast(&doc, &cfg.forecast_spec(), code, Local::now().naive_local())?
    };

    let store = DatasetStore::new(data_dir, cfg.file_template.as_str());
    store.merge_and_save(code, record.into_record_set())?;
    Ok(())
}
