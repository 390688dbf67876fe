//! Simulation run orchestration.

use crate::config::RunConfig;
use anyhow::{Context, Result};
use lib_ngspice_ffi::{NgSpiceLibrary, NgSpiceSession};
use lib_types::{Plot, Simulation};
use std::sync::Arc;

/// Results of one configured run.
#[derive(Clone, Debug)]
pub struct RunResults {
    /// Run name from the config.
    pub name: String,

    /// Analysis command that produced the plot.
    pub command: String,

    /// Engine output and the (possibly filtered) plot.
    pub simulation: Simulation,

    /// Requested vectors the plot did not contain.
    pub missing_vectors: Vec<String>,
}

/// Simulation orchestrator.
pub struct Orchestrator {
    config: RunConfig,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: RunConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Load the engine, run the configured analysis and collect results.
    pub fn run(&self) -> Result<RunResults> {
        tracing::info!("Starting run: {}", self.config.name);

        let library = self.load_library()?;
        let mut session = NgSpiceSession::with_config(library, self.config.execution_config())?;

        let netlist = std::fs::read_to_string(&self.config.circuit.netlist)
            .with_context(|| format!("Failed to read netlist {:?}", self.config.circuit.netlist))?;

        let mut simulation = session
            .simulate(&netlist, &self.config.circuit.command)
            .with_context(|| format!("Simulation '{}' failed", self.config.name))?;

        let (plot, missing_vectors) = select_vectors(simulation.plot, &self.config.output.vectors);
        for name in &missing_vectors {
            tracing::warn!(vector = %name, "Requested vector not found in plot");
        }
        simulation.plot = plot;

        tracing::info!(
            plot = %simulation.plot.name,
            vectors = simulation.plot.len(),
            "Run complete"
        );

        Ok(RunResults {
            name: self.config.name.clone(),
            command: self.config.circuit.command.clone(),
            simulation,
            missing_vectors,
        })
    }

    fn load_library(&self) -> Result<Arc<NgSpiceLibrary>> {
        let library = match &self.config.engine.library {
            Some(path) => {
                tracing::info!("Loading ngspice from {:?}", path);
                NgSpiceLibrary::load(path)?
            }
            None => {
                tracing::info!("Loading ngspice from default location");
                NgSpiceLibrary::load_default()?
            }
        };
        Ok(library)
    }
}

/// Keep only the named vectors, plus the sweep axis from [`Plot::scale`].
/// An empty selection keeps everything. Returns the names that were not found.
pub fn select_vectors(plot: Plot, names: &[String]) -> (Plot, Vec<String>) {
    if names.is_empty() {
        return (plot, Vec::new());
    }

    let scale = plot.scale().map(|v| v.name.clone());
    let missing = names
        .iter()
        .filter(|n| plot.get(n).is_none())
        .cloned()
        .collect();

    let mut selected = Plot::new(plot.name.clone());
    for (name, vector) in plot.vectors {
        if names.contains(&name) || scale.as_deref() == Some(name.as_str()) {
            selected.insert(vector);
        }
    }
    (selected, missing)
}
