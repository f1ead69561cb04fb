use crate::{
    compile::{ArtifactMap, BuildOutcome},
    config::BenchConfig,
    runner, workload,
    workload::CollisionMode,
};
use itertools::iproduct;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Failed to write the workload file")]
    Workload(#[source] std::io::Error),
    #[error(transparent)]
    Runner(#[from] runner::RunnerError),
}

/// mode -> measurements, index-aligned with the configured scale sequence
pub type ModeSeries = BTreeMap<CollisionMode, Vec<Option<u64>>>;

/// variant name -> per-mode measurement series
pub type ResultMatrix = BTreeMap<String, ModeSeries>;

/// Bench every built variant over the full mode x scale cross-product, one
/// cell at a time. Cells serialize deliberately: they share the workload
/// file and the persisted database state.
///
/// An absent measurement is recorded in place and iteration continues, so
/// every (variant, mode) series ends up with exactly one slot per scale.
#[instrument(skip(artifacts, config), level = "info")]
pub fn run_benchmarks(
    artifacts: &ArtifactMap,
    config: &BenchConfig,
) -> Result<ResultMatrix, BenchError> {
    let mut matrix = ResultMatrix::new();

    for (variant, outcome) in artifacts {
        let executable = match outcome {
            BuildOutcome::Built { executable } => executable,
            BuildOutcome::Failed { .. } => {
                warn!("Skipping {variant}: its build failed");
                continue;
            }
        };

        let series = matrix.entry(variant.clone()).or_default();
        for (mode, count) in iproduct!(
            config.modes.iter().copied(),
            config.scales.iter().copied()
        ) {
            info!("Running: variant={variant}, mode={mode}, size={count}");

            workload::generate(&config.workload, count, mode).map_err(BenchError::Workload)?;
            let elapsed = runner::run(executable, mode, config)?;

            match elapsed {
                Some(elapsed) => info!("  -> {elapsed} µs"),
                None => info!("  -> no measurement"),
            }
            series.entry(mode).or_default().push(elapsed);
        }
    }

    Ok(matrix)
}
