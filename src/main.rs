use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use geojson2boxes::{process_dataset, Args};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !PathBuf::from(&args.input).exists() {
        error!("The specified input does not exist: {}", args.input);
        return ExitCode::FAILURE;
    }

    info!("Starting the conversion process...");

    match process_dataset(&args) {
        Ok(stats) if stats.failed_conversions == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("Failed to process labels: {}", e);
            ExitCode::FAILURE
        }
    }
}
