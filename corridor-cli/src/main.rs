//! Green Corridor CLI Application
//!
//! Command-line simulator for the corridor-engine library. It adds what the
//! library deliberately leaves out:
//! - Configuration loading (TOML) and command-line overrides
//! - Simulated positioning along a route of waypoints
//! - The tick-driven mission loop and the push reconciler thread
//! - Report generation (TXT / JSON lines)

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod mission;
mod report;
mod route;

use config::{AppConfig, AuthorityMode, OutputFormat};
use mission::MissionOptions;
use report::Reporter;
use route::Route;

/// Green Corridor - simulate traffic signal priority for an emergency vehicle
#[derive(Parser, Debug)]
#[command(name = "corridor-cli")]
#[command(about = "Simulate proximity-based signal priority along a route", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON roster served by the simulated decision service
    #[arg(long, value_name = "FILE")]
    roster: Option<PathBuf>,

    /// Availability of the simulated decision service
    #[arg(long, value_enum)]
    authority: Option<AuthorityMode>,

    /// In flaky mode, fail every N-th request
    #[arg(long, value_name = "N")]
    fail_every: Option<u32>,

    /// Do not subscribe to the push feed
    #[arg(long)]
    no_push: bool,

    /// Proximity threshold in meters
    #[arg(long, value_name = "METERS")]
    threshold: Option<f64>,

    /// Sampling interval in milliseconds (0 = as fast as possible)
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Stop after this many ticks
    #[arg(long, value_name = "COUNT")]
    max_ticks: Option<usize>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Green Corridor CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using engine library v{}", corridor_engine::VERSION);

    let config = build_config(&args)?;
    log::debug!("Effective configuration: {:?}", config);

    // No route, no mission
    let route = Route::from_config(&config.route)?;

    let out: Box<dyn Write> = match &config.output.path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(io::stdout()),
    };
    let mut reporter = Reporter::new(out, config.output.format);

    let options = MissionOptions {
        max_ticks: args.max_ticks,
    };
    let summary = mission::run_mission(&config, &route, options, &mut reporter)?;
    reporter.summary(&summary)?;

    Ok(())
}

/// Load the config file (if any) and apply command-line overrides
fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(path) = &args.roster {
        config.roster.file = Some(path.clone());
    }
    if let Some(mode) = args.authority {
        config.authority.mode = mode;
    }
    if let Some(n) = args.fail_every {
        config.authority.fail_every = n;
    }
    if args.no_push {
        config.authority.push = false;
    }
    if let Some(threshold) = args.threshold {
        config.engine.proximity_threshold_m = threshold;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.route.tick_ms = tick_ms;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(path) = &args.output {
        config.output.path = Some(path.clone());
    }

    config.engine.validate().context("Invalid engine settings")?;
    Ok(config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_defaults() {
        let args = Args::parse_from([
            "corridor-cli",
            "--authority",
            "flaky",
            "--fail-every",
            "5",
            "--no-push",
            "--threshold",
            "150",
            "--tick-ms",
            "0",
            "--format",
            "json",
        ]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.authority.mode, AuthorityMode::Flaky);
        assert_eq!(config.authority.fail_every, 5);
        assert!(!config.authority.push);
        assert_eq!(config.engine.proximity_threshold_m, 150.0);
        assert_eq!(config.route.tick_ms, 0);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_threshold_override() {
        let args = Args::parse_from(["corridor-cli", "--threshold=-1"]);
        assert!(build_config(&args).is_err());
    }
}
