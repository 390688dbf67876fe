//! ngspice-kinds CLI: signal-kind registry lookup and ngspice runs.
//!
//! This is the main entry point for the ngspice binding tool.

mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_types::SignalKind;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ngspice-kinds")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the signal-kind registry
    Kinds,

    /// Resolve raw type tags (or kind names) against the registry
    Decode {
        /// Raw `v_type` values, labels (`Voltage`) or native constants (`SV_VOLTAGE`)
        #[arg(required = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Run a netlist through ngspice
    Simulate {
        /// Path to the run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// ngspice shared library, overriding the config
        #[arg(long)]
        library: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Kinds => {
            output::write_kinds(&mut std::io::stdout().lock(), cli.format)?;
        }
        Commands::Decode { values } => {
            decode(&values)?;
        }
        Commands::Simulate { config, output, library } => {
            run_simulation(&config, &output, library, cli.format)?;
        }
    }

    Ok(())
}

fn decode(values: &[String]) -> Result<()> {
    for value in values {
        let kind = match value.trim().parse::<i32>() {
            Ok(raw) => SignalKind::from_raw(raw)
                .with_context(|| format!("cannot decode '{}'", value))?,
            Err(_) => value.parse::<SignalKind>()?,
        };
        println!(
            "{:>3}  {:<18} {:<24} {}",
            kind.to_raw(),
            kind.name(),
            kind.native_name(),
            kind.unit()
        );
    }
    Ok(())
}

fn run_simulation(
    config_path: &PathBuf,
    output_dir: &PathBuf,
    library: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Loading configuration from {:?}", config_path);

    let mut config = config::load_config(config_path)?;
    if library.is_some() {
        config.engine.library = library;
    }
    let engine_log = config.output.engine_log;

    let orchestrator = orchestrator::Orchestrator::new(config)?;
    let results = orchestrator.run()?;

    std::fs::create_dir_all(output_dir)?;
    output::write_results(&results, output_dir, format, engine_log)?;

    println!(
        "Plot {}: {} vectors written to {:?}",
        results.simulation.plot.name,
        results.simulation.plot.len(),
        output_dir
    );
    Ok(())
}
