use crate::{compile, workload::CollisionMode};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read the config file")]
    UnreadableFile(#[from] std::io::Error),
    #[error("Failed to parse the config file")]
    InvalidConfig(#[from] serde_yaml::Error),
    #[error("Preflight checks failed")]
    FailedPreflight,
}

/// Single source of truth for everything the harness touches: sources and
/// compiler for the build, shared file paths and scales for the benchmark,
/// output directory for the charts. Built-in defaults reproduce the buzzdb
/// setup, a yaml file can override any section.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub bench: BenchConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// sources to compile, one implementation variant each
    #[serde(default = "default_sources")]
    pub sources: Vec<PathBuf>,
    #[serde(default = "default_compiler")]
    pub compiler: String,
    #[serde(default = "default_compiler_flags")]
    pub flags: Vec<String>,
    /// worker pool size, defaults to the logical cpu count
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// workload file shared with the executable under test
    #[serde(default = "default_workload_path")]
    pub workload: PathBuf,
    /// persisted state of the executable under test, deleted before each run
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// tuple counts, benched in order for every variant and mode
    #[serde(default = "default_scales")]
    pub scales: Vec<u64>,
    #[serde(default = "default_modes")]
    pub modes: Vec<CollisionMode>,
    /// per run timeout in seconds; the wait is unbounded when absent
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// open each chart with the platform image viewer after rendering
    #[serde(default = "default_display")]
    pub display: bool,
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let raw = fs::read_to_string(path)?;

        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Validate the whole config up front, reporting every problem instead
    /// of stopping at the first one. Returns whether an error was found.
    pub fn preflight_checks(&mut self) -> bool {
        let mut contains_error = false;

        if self.build.sources.is_empty() {
            error!("build.sources is empty, there is nothing to build or benchmark");
            contains_error = true;
        }

        for source in &self.build.sources {
            if !source.is_file() {
                error!("Failed to find source {}", source.display());
                contains_error = true;
            }
        }

        for variant in self
            .build
            .sources
            .iter()
            .map(|source| compile::variant_name(source))
            .duplicates()
        {
            error!("Multiple sources map to the executable {variant}.out");
            contains_error = true;
        }

        if self.bench.scales.is_empty() {
            error!("bench.scales cannot be empty");
            contains_error = true;
        }

        if self.bench.scales.iter().any(|&scale| scale == 0) {
            error!("bench.scales entries must be positive tuple counts");
            contains_error = true;
        }

        if !self.bench.scales.windows(2).all(|pair| pair[0] < pair[1]) {
            warn!("bench.scales is not strictly increasing, charts may be hard to read");
        }

        if self.bench.modes.is_empty() {
            warn!("bench.modes is empty. Falling back to all collision modes");
            self.bench.modes = CollisionMode::ALL.to_vec();
        } else {
            let deduped = self.bench.modes.iter().copied().unique().collect_vec();
            if deduped.len() != self.bench.modes.len() {
                warn!("bench.modes contains duplicates, keeping the first occurrence of each");
                self.bench.modes = deduped;
            }
        }

        if self.bench.modes.contains(&CollisionMode::SomeCollision)
            && self.bench.scales.iter().any(|&scale| scale < 10)
        {
            warn!("some_collision degenerates to a single key for scales below 10");
        }

        if self.bench.timeout == Some(0) {
            error!("bench.timeout cannot be 0, omit it for an unbounded wait");
            contains_error = true;
        }

        contains_error
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            compiler: default_compiler(),
            flags: default_compiler_flags(),
            workers: None,
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            workload: default_workload_path(),
            database: default_database_path(),
            scales: default_scales(),
            modes: default_modes(),
            timeout: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            display: default_display(),
        }
    }
}

fn default_sources() -> Vec<PathBuf> {
    vec![
        PathBuf::from("45-buzzdb.cpp"),
        PathBuf::from("46-buzzdb.cpp"),
    ]
}

fn default_compiler() -> String {
    String::from("g++")
}

fn default_compiler_flags() -> Vec<String> {
    [
        "-fdiagnostics-color",
        "-std=c++17",
        "-O0",
        "-Wall",
        "-Werror",
        "-Wextra",
    ]
    .map(String::from)
    .to_vec()
}

fn default_workload_path() -> PathBuf {
    PathBuf::from("output.txt")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("buzzdb.dat")
}

fn default_scales() -> Vec<u64> {
    vec![5000, 10000, 30000, 50000]
}

fn default_modes() -> Vec<CollisionMode> {
    CollisionMode::ALL.to_vec()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_display() -> bool {
    true
}
