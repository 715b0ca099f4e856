// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fiskal — simulated TSE
//
// Entry point. Initialises logging, resolves configuration and dispatches to
// the subcommands.

mod commands;
mod controller;
mod data_dir;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fiskal")]
#[command(about = "Simulated TSE producing signed, counter-ordered DER log records", long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults apply when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Directory for the record store, snapshot and key (overrides the config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted register session and shut down cleanly.
    Demo {
        /// Number of sales to record; the last one is left open for the
        /// shutdown drain.
        #[arg(long, short, default_value_t = 3)]
        transactions: u32,
    },
    /// Sign a Disable record and shut down.
    Disable,
    /// Re-verify every stored record against the TSE key.
    Verify,
    /// Print counters, clock and certificate state as JSON.
    Status,
    /// Write the effective configuration to a file.
    InitConfig {
        path: PathBuf,
    },
}

fn run(cli: Cli) -> fiskal_core::error::Result<ExitCode> {
    let config = commands::resolve_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Demo { transactions } => commands::demo(config, transactions)?,
        Commands::Disable => commands::disable(config)?,
        Commands::Verify => {
            if commands::verify(&config)? > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status => {
            let status = commands::status(&config)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::InitConfig { path } => commands::init_config(&config, &path)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Fiskal starting");

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, class = ?e.class(), "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
