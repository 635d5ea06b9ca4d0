//! # Karekare Tides Entry Point
//!
//! Runs the tide table pipeline once and exits. Meant to be started by cron
//! every few hours.
//!
//! ```bash
//! # Publish the page using ./tide-config.toml
//! karekare-tides
//!
//! # Print the page instead of publishing it
//! karekare-tides --stdout
//!
//! # Use another settings file
//! karekare-tides --config /usr/local/etc/tide-config.toml
//! ```
//!
//! Log levels come from `RUST_LOG` (default `info`).


use anyhow::Context;
use std::env;
use std::path::PathBuf;
use tide_table_lib::config::{Config, CONFIG_FILE};
use tide_table_lib::{pipeline::TidePipeline, RunDates, TideError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command line options. Anything unrecognised is ignored.
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Print the rendered page instead of publishing it
    stdout: bool,
    config: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdout" => parsed.stdout = true,
            "--config" => {
                parsed.config = args.next().map(PathBuf::from);
                if parsed.config.is_none() {
                    tracing::warn!("--config given without a path, using {}", CONFIG_FILE);
                }
            }
            _ => {}
        }
    }
    parsed
}

/// Load settings and run the pipeline once.
async fn run(args: &Args) -> Result<(), TideError> {
    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let pipeline = TidePipeline::new(config)?;

    // One clock reading for the whole run
    let dates = RunDates::now();

    if args.stdout {
        println!("{}", pipeline.build_page(&dates).await?);
    } else {
        pipeline.run(&dates).await?;
    }
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(env::args().skip(1));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    // Failures are logged, not returned; the previous page stays published.
    if let Err(error) = rt.block_on(run(&args)) {
        tracing::error!(
            stage = error.stage(),
            status = error.status().map(|s| s.as_u16()),
            %error,
            "tide table run failed"
        );
    }

    Ok(())
}
