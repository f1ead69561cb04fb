mod bench;
mod compile;
mod config;
mod report;
mod runner;
mod signal;
mod workload;

use clap::Parser;
use config::{ConfigErrors, HarnessConfig};
use std::{error::Error as _, path::PathBuf, process::exit};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Compile(#[from] compile::CompileError),
    #[error(transparent)]
    Bench(#[from] bench::BenchError),
    #[error(transparent)]
    Report(#[from] report::ReportError),
}

/// Build hash-table implementation variants and benchmark them across
/// collision modes and tuple-count scales.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// path to a yaml config file; built-in defaults are used when omitted
    config: Option<PathBuf>,

    /// reuse previously built executables instead of compiling
    #[arg(long)]
    skip_build: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run(Cli::parse()) {
        error!("{error}");
        let mut cause = error.source();
        while let Some(inner) = cause {
            error!("  caused by: {inner}");
            cause = inner.source();
        }

        exit(1);
    }
}

fn run(cli: Cli) -> Result<(), HarnessError> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    if config.preflight_checks() {
        return Err(ConfigErrors::FailedPreflight.into());
    }

    let artifacts = if cli.skip_build {
        compile::existing_artifacts(&config.build)
    } else {
        compile::compile_all(&config.build)?
    };
    let built = artifacts.values().filter(|outcome| outcome.is_built()).count();
    info!("{built} of {} variants ready to bench", artifacts.len());

    let matrix = bench::run_benchmarks(&artifacts, &config.bench)?;
    report::render(&matrix, &config.bench.scales, &config.report)?;

    Ok(())
}
