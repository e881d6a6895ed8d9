//! # gwmon
//!
//! Manual trigger for the groundwater service: fetch, train, predict and
//! verify from the command line.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use gwmon_service::config::{DEFAULT_CONFIG_PATH, ServiceConfig};
use gwmon_service::ingest::{RetryPolicy, WrisClient};
use gwmon_service::logging::{self, DataSource};
use gwmon_service::model::{Record, RecordSet};
use gwmon_service::{GroundwaterService, verify};

#[derive(Parser)]
#[command(name = "gwmon")]
#[command(about = "Groundwater level data and predictions", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records for a district (falls back to synthetic data)
    Fetch {
        #[arg(long)]
        state: String,
        #[arg(long)]
        district: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Write the record set here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train the model from a record file or a live fetch
    Train {
        /// JSON file with a record set or a plain array of records
        #[arg(short, long, conflicts_with_all = ["state", "district"])]
        input: Option<PathBuf>,
        #[arg(long, requires_all = ["district", "start", "end"])]
        state: Option<String>,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },

    /// Predict water levels for the records in a file
    Predict {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Probe WRIS with known districts and report which return data
    Verify {
        /// Also write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Record files are either what `fetch` writes or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Set(RecordSet),
    Records(Vec<Record>),
}

fn load_records(path: &Path) -> Result<Vec<Record>, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    Ok(match serde_json::from_str::<RecordFile>(&contents)? {
        RecordFile::Set(set) => set.records,
        RecordFile::Records(records) => records,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(&cli.config)?;
    logging::init_logger(
        config.logging.min_level(),
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let service = GroundwaterService::from_config(&config)?;

    match cli.command {
        Commands::Fetch {
            state,
            district,
            start,
            end,
            output,
        } => {
            let set = service.fetch(&state, &district, &start, &end).await;
            let json = serde_json::to_string_pretty(&set)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!("Wrote {} {} records to {}", set.len(), set.provenance, path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Train {
            input,
            state,
            district,
            start,
            end,
        } => {
            let records = match (input, state, district, start, end) {
                (Some(path), ..) => load_records(&path)?,
                (None, Some(state), Some(district), Some(start), Some(end)) => {
                    service.fetch(&state, &district, &start, &end).await.records
                }
                _ => return Err("train needs --input or --state/--district/--start/--end".into()),
            };

            if !service.train(&records) {
                return Err("training failed, see log for the reason".into());
            }
            println!("Model trained on {} records", records.len());
        }
        Commands::Predict { input } => {
            let records = load_records(&input)?;
            let prediction = service.predict(&records)?;
            println!("{}", serde_json::to_string_pretty(&prediction.values)?);
        }
        Commands::Verify { output } => {
            let client = WrisClient::from_config(&config.wris)?;
            let policy = RetryPolicy::with_max_retries(config.wris.max_retries);
            let report =
                verify::run_verification(&client, &policy, &config.wris.agency, &verify::default_cases()).await;
            verify::print_summary(&report);

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&report)?)?;
                logging::info(
                    DataSource::System,
                    None,
                    &format!("Verification report written to {}", path.display()),
                );
            }
        }
    }

    Ok(())
}
