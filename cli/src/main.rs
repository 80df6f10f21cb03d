//! Command-line frontend: `synthesize` renders one transition directly;
//! `job submit|get|list` drives the scheduler in-process against a durable
//! store on disk. See `crate::cli` for the argument tree and
//! `crate::errors` for the exit-code mapping.

mod cli;
mod drivers;
mod errors;
mod job;
mod synthesize;

use std::process::ExitCode;

use clap::Parser;
use setlist_core::config::Settings;
use setlist_core::logger;

use cli::{Cli, Command};
use errors::CliError;

const STEMS_CACHE_CAPACITY: usize = 8;

async fn run(cli: &Cli) -> Result<serde_json::Value, CliError> {
    let settings = Settings::init(cli.config.clone())?;

    match &cli.command {
        Command::Synthesize { request } => {
            let output_path = synthesize::run(request, settings.engine.output_sample_rate, STEMS_CACHE_CAPACITY)?;
            Ok(serde_json::json!({ "output_path": output_path }))
        }
        Command::Job { command } => job::run(&settings, command).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logger::init_logger(log::LevelFilter::Info);
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
