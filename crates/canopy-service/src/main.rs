//! `canopy` command-line entry point.
//!
//! Reads a calculation request as JSON (from a file or stdin), prints the
//! response envelope to stdout and logs to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use canopy_service::{CalculationError, CalculationRequest, CalculationService, ServiceConfig, SignalMode};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Estimate carbon stored in a map parcel.
#[derive(Debug, Parser)]
#[command(name = "canopy", version, about)]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a carbon calculation and print the response envelope.
    Calculate {
        /// Request JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        request: String,

        /// Use the live signal source regardless of configuration.
        #[arg(long)]
        live: bool,

        /// Append audit records to this JSON-lines file.
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Print the computed area, centroid and bounding box of a request's geometry.
    Area {
        /// Request JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        request: String,
    },

    /// Print the effective coefficient table.
    Coefficients,
}

fn read_request(source: &str) -> Result<String, CalculationError> {
    let mut text = String::new();
    if source == "-" {
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| CalculationError::InvalidInput(format!("failed to read stdin: {e}")))?;
    } else {
        text = std::fs::read_to_string(source)
            .map_err(|e| CalculationError::InvalidInput(format!("failed to read {source}: {e}")))?;
    }
    Ok(text)
}

fn load_config(path: Option<&PathBuf>) -> Result<ServiceConfig, CalculationError> {
    let mut config = match path {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

fn run(cli: Cli) -> Result<bool, CalculationError> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Calculate { request, live, store } => {
            if live {
                config.signal.mode = SignalMode::Live;
            }
            if store.is_some() {
                config.store.jsonl_path = store;
            }
            let service = CalculationService::from_config(&config)?;
            let body = read_request(&request)?;
            let response = service.handle_json(&body);
            print_json(&response.body);
            Ok(response.is_success())
        }
        Command::Area { request } => {
            let request = CalculationRequest::from_json(&read_request(&request)?)?;
            let polygon = request.polygon()?;
            let centroid = polygon.centroid();
            print_json(&json!({
                "area_hectares": canopy_engine::round2(polygon.area_hectares()),
                "centroid": { "lon": centroid.lon, "lat": centroid.lat },
                "bounding_box": polygon.bounding_box(),
                "vertices": polygon.exterior().distinct_vertex_count(),
            }));
            Ok(true)
        }
        Command::Coefficients => {
            let params = config.estimation_params();
            print_json(&json!(params.coefficients));
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    canopy_metrics::describe_metrics();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "canopy failed");
            print_json(&json!({ "success": false, "error": e.code(), "message": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}
