//! Market Radar - momentum screener for crypto and equity snapshots.
//!
//! Reads snapshot files for the configured universes, screens them and
//! prints a report per universe.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use radar_common::config::Config;
use radar_common::logging::{generate_trace_id, init_logging};
use radar_screener::screener::ReportFormat;
use radar_screener::RadarService;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "market-radar")]
#[command(author = "theonlyhennygod")]
#[command(version = "0.1.0")]
#[command(about = "Momentum screener over market snapshots.", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.market-radar/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Screen every configured universe once
    Scan {
        /// Only this universe
        #[arg(short, long)]
        universe: Option<String>,

        /// Output format (markdown, json)
        #[arg(short, long, default_value = "markdown")]
        format: String,

        /// Also write each report under this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Refresh on the configured interval until Ctrl-C
    Watch {
        /// Only this universe
        #[arg(short, long)]
        universe: Option<String>,

        /// Output format (markdown, json)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },

    /// Validate the configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_and_validate(cli.config.as_deref())?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    let trace_id = generate_trace_id();
    tracing::info!(trace_id = %trace_id, "Market Radar v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan {
            universe,
            format,
            output,
        } => {
            let format = parse_format(&format)?;
            let service = RadarService::new(config, universe.as_deref())?;

            for (runtime, result) in service.scan().await {
                let report = runtime.report(result);
                println!("{}", report.generate(format));

                if let Some(dir) = &output {
                    let path = report.save_to_file(&dir.join(&runtime.name), format)?;
                    tracing::info!(path = %path.display(), "Report saved");
                }
            }
        }
        Commands::Watch { universe, format } => {
            let format = parse_format(&format)?;
            let service = RadarService::new(config, universe.as_deref())?;

            service
                .watch(|runtime, result| {
                    println!("{}", runtime.report(result.clone()).generate(format));
                })
                .await;
        }
        Commands::CheckConfig => {
            println!(
                "Configuration OK: {} universes, snapshots in {}",
                config.universes.len(),
                config.snapshot_dir().display()
            );
            for universe in &config.universes {
                println!(
                    "  - {} ({}), source {}",
                    universe.name,
                    universe.profile.as_deref().unwrap_or("ranked"),
                    universe.source
                );
            }
        }
    }

    Ok(())
}

fn parse_format(format: &str) -> Result<ReportFormat> {
    format
        .parse::<ReportFormat>()
        .map_err(anyhow::Error::msg)
        .context("Invalid --format")
}
