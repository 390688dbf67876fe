//! Simulation run configuration loading and validation.

use anyhow::{Context, Result};
use lib_ngspice_ffi::{ExecutionConfig, UnknownKindPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level run configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run name/description.
    pub name: String,

    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Circuit and analysis to run.
    pub circuit: CircuitConfig,

    /// Output configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

/// ngspice library and call handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the ngspice shared library. Falls back to `$NGSPICE_LIBRARY`
    /// and then the platform default name.
    #[serde(default)]
    pub library: Option<PathBuf>,

    /// Timeout for any single engine call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// What to do with vectors whose type tag is not in the registry.
    #[serde(default)]
    pub unknown_kinds: KindPolicy,
}

fn default_timeout_secs() -> u64 { 60 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            library: None,
            timeout_secs: default_timeout_secs(),
            unknown_kinds: KindPolicy::default(),
        }
    }
}

/// Unknown type tag handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindPolicy {
    /// Abort result ingestion on the first unknown tag.
    #[default]
    Reject,
    /// Keep the vector, marked as unknown, and warn.
    Keep,
}

impl From<KindPolicy> for UnknownKindPolicy {
    fn from(policy: KindPolicy) -> Self {
        match policy {
            KindPolicy::Reject => UnknownKindPolicy::Reject,
            KindPolicy::Keep => UnknownKindPolicy::KeepUnknown,
        }
    }
}

/// Circuit configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Path to the netlist, relative to the config file.
    pub netlist: PathBuf,

    /// Analysis command, e.g. `tran 100u 0.17s`.
    pub command: String,
}

/// Output configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Vectors to write. Empty writes every vector of the plot.
    #[serde(default)]
    pub vectors: Vec<String>,

    /// Write captured engine output to `ngspice.log`.
    #[serde(default = "default_true")]
    pub engine_log: bool,
}

fn default_true() -> bool { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            vectors: Vec::new(),
            engine_log: true,
        }
    }
}

impl RunConfig {
    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            timeout: Duration::from_secs(self.engine.timeout_secs),
            unknown_kinds: self.engine.unknown_kinds.into(),
            ..Default::default()
        }
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let is_json = path.extension().map_or(false, |e| e == "json");
    let mut config = parse_config(&content, is_json)?;

    // Netlist and library paths are relative to the config file.
    if let Some(base) = path.parent() {
        if config.circuit.netlist.is_relative() {
            config.circuit.netlist = base.join(&config.circuit.netlist);
        }
        if let Some(library) = config.engine.library.as_mut() {
            if library.is_relative() && library.components().count() > 1 {
                *library = base.join(&*library);
            }
        }
    }

    validate_config(&config)?;
    if !config.circuit.netlist.exists() {
        anyhow::bail!("Netlist not found: {:?}", config.circuit.netlist);
    }

    Ok(config)
}

/// Parse configuration text as JSON or TOML.
pub fn parse_config(content: &str, is_json: bool) -> Result<RunConfig> {
    if is_json {
        serde_json::from_str(content).with_context(|| "Failed to parse config as JSON")
    } else {
        toml::from_str(content).with_context(|| "Failed to parse config as TOML")
    }
}

/// Validate configuration values that do not touch the filesystem.
pub fn validate_config(config: &RunConfig) -> Result<()> {
    if config.circuit.command.trim().is_empty() {
        anyhow::bail!("circuit.command must not be empty");
    }
    if config.circuit.command.contains('\0') {
        anyhow::bail!("circuit.command contains a null byte");
    }
    if config.engine.timeout_secs == 0 {
        anyhow::bail!("engine.timeout_secs must be at least 1");
    }
    if config.output.vectors.iter().any(|v| v.trim().is_empty()) {
        anyhow::bail!("output.vectors contains an empty name");
    }
    Ok(())
}
