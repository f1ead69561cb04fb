use crate::config::BuildConfig;
use rayon::{prelude::*, ThreadPoolBuilder};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Command,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Failed to start the compile worker pool")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of one compilation, independent of every sibling. Diagnostics are
/// kept in full, nothing is truncated.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Built {
        executable: PathBuf,
    },
    Failed {
        status: Option<i32>,
        diagnostics: String,
    },
}

impl BuildOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built { .. })
    }
}

/// variant name -> build outcome
pub type ArtifactMap = BTreeMap<String, BuildOutcome>;

/// Variant identifier for a source: its file stem.
pub fn variant_name(source: &Path) -> String {
    source
        .file_stem()
        .unwrap_or(source.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Executable path for a source: the extension replaced with `.out`, next to
/// the source itself. A bare file name would hit PATH lookup on spawn, so it
/// is anchored to the working directory.
pub fn artifact_path(source: &Path) -> PathBuf {
    let executable = source.with_extension("out");
    match executable.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new(".").join(executable),
        _ => executable,
    }
}

/// Compile every configured source on a fixed-size worker pool. Workers
/// share no state and write distinct outputs; a failing variant never blocks
/// its siblings and nothing is retried.
#[instrument(skip(config), level = "info")]
pub fn compile_all(config: &BuildConfig) -> Result<ArtifactMap, CompileError> {
    let workers = config.workers.unwrap_or_else(num_cpus::get);
    debug!("Starting compile pool with {workers} workers");

    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
    let artifacts = pool.install(|| {
        config
            .sources
            .par_iter()
            .map(|source| (variant_name(source), compile_one(config, source)))
            .collect()
    });

    Ok(artifacts)
}

/// Map previously built executables without compiling, for reruns with
/// `--skip-build`.
pub fn existing_artifacts(config: &BuildConfig) -> ArtifactMap {
    config
        .sources
        .iter()
        .map(|source| {
            let executable = artifact_path(source);
            let outcome = if executable.is_file() {
                BuildOutcome::Built { executable }
            } else {
                BuildOutcome::Failed {
                    status: None,
                    diagnostics: format!("{} has not been built yet", executable.display()),
                }
            };

            (variant_name(source), outcome)
        })
        .collect()
}

fn compile_one(config: &BuildConfig, source: &Path) -> BuildOutcome {
    let executable = artifact_path(source);

    let output = match Command::new(&config.compiler)
        .args(config.flags.iter())
        .arg(source)
        .arg("-o")
        .arg(&executable)
        .output()
    {
        Ok(output) => output,
        Err(spawn_error) => {
            error!("Failed to run {} on {}: {spawn_error}", config.compiler, source.display());

            return BuildOutcome::Failed {
                status: None,
                diagnostics: format!("failed to run {}: {spawn_error}", config.compiler),
            };
        }
    };

    if output.status.success() {
        info!("Compiled {} successfully", source.display());

        BuildOutcome::Built { executable }
    } else {
        let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stdout));
        error!(
            "Error while compiling {} (status {:?}):\n{diagnostics}",
            source.display(),
            output.status.code()
        );

        BuildOutcome::Failed {
            status: output.status.code(),
            diagnostics,
        }
    }
}
