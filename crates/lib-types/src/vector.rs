//! Owned result vectors and simulation output.
//!
//! A [`ResultVector`] is a copy of one ngspice `vector_info`: its name, its
//! raw `v_type` tag, the decoded [`SignalKind`] and the sample data. Vectors
//! produced by the same analysis run are grouped in a [`Plot`].
//!
//! # Kind Semantics
//!
//! `raw_kind` always holds the tag exactly as the engine reported it. `kind`
//! is `Some` whenever that tag is in the registry. It is `None` only when the
//! decoder was told to keep vectors with unknown tags; it is never replaced by
//! [`SignalKind::NoType`].

use crate::error::UnknownSignalKind;
use crate::signal_kind::SignalKind;
use crate::units::{Amperes, Hertz, Seconds, Volts};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sample storage of a result vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
pub enum VectorValues {
    /// Real-valued samples (transient, DC, operating point).
    Real(Vec<f64>),
    /// Complex samples (AC, noise, pole/zero, S-parameters).
    Complex(Vec<Complex64>),
}

impl VectorValues {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    /// Real part of every sample.
    pub fn real(&self) -> Vec<f64> {
        match self {
            Self::Real(v) => v.clone(),
            Self::Complex(v) => v.iter().map(|c| c.re).collect(),
        }
    }

    /// Magnitude of every sample.
    pub fn magnitude(&self) -> Vec<f64> {
        match self {
            Self::Real(v) => v.iter().map(|x| x.abs()).collect(),
            Self::Complex(v) => v.iter().map(|c| c.norm()).collect(),
        }
    }
}

/// One named result vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultVector {
    /// Vector name as reported by the engine, e.g. `v(out)` or `time`.
    pub name: String,

    /// The `v_type` tag as received.
    pub raw_kind: i32,

    /// Decoded kind, `None` if the tag was unknown and kept anyway.
    pub kind: Option<SignalKind>,

    /// Sample data.
    pub values: VectorValues,
}

impl ResultVector {
    /// Create a vector with a known kind.
    pub fn new(name: impl Into<String>, kind: SignalKind, values: VectorValues) -> Self {
        Self {
            name: name.into(),
            raw_kind: kind.to_raw(),
            kind: Some(kind),
            values,
        }
    }

    /// Create a vector from a raw tag, decoding it if possible.
    pub fn from_raw_tag(name: impl Into<String>, raw_kind: i32, values: VectorValues) -> Self {
        Self {
            name: name.into(),
            raw_kind,
            kind: SignalKind::from_raw(raw_kind).ok(),
            values,
        }
    }

    /// The decoded kind, or the error describing the unknown tag.
    pub fn signal_kind(&self) -> Result<SignalKind, UnknownSignalKind> {
        match self.kind {
            Some(kind) => Ok(kind),
            None => Err(UnknownSignalKind::new(self.raw_kind)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Human-readable kind label, including the raw tag if it is unknown.
    pub fn kind_label(&self) -> String {
        match self.kind {
            Some(kind) => kind.name().to_string(),
            None => format!("Unknown({})", self.raw_kind),
        }
    }

    /// Unit symbol for the samples, empty if unknown or dimensionless.
    pub fn unit(&self) -> &'static str {
        self.kind.map_or("", SignalKind::unit)
    }

    /// Real samples as voltages. `None` unless this is a real voltage vector.
    pub fn as_volts(&self) -> Option<Vec<Volts>> {
        match (&self.kind, &self.values) {
            (Some(SignalKind::Voltage), VectorValues::Real(v)) => {
                Some(v.iter().copied().map(Volts).collect())
            }
            _ => None,
        }
    }

    /// Real samples as currents. `None` unless this is a real current vector.
    pub fn as_amperes(&self) -> Option<Vec<Amperes>> {
        match (&self.kind, &self.values) {
            (Some(SignalKind::Current), VectorValues::Real(v)) => {
                Some(v.iter().copied().map(Amperes).collect())
            }
            _ => None,
        }
    }

    /// First and last point of a time axis.
    pub fn time_span(&self) -> Option<(Seconds, Seconds)> {
        if self.kind != Some(SignalKind::Time) {
            return None;
        }
        let real = self.values.real();
        Some((Seconds(*real.first()?), Seconds(*real.last()?)))
    }

    /// First and last point of a frequency axis. AC sweeps report the
    /// frequency as complex with zero imaginary part.
    pub fn frequency_span(&self) -> Option<(Hertz, Hertz)> {
        if self.kind != Some(SignalKind::Frequency) {
            return None;
        }
        let real = self.values.real();
        Some((Hertz(*real.first()?), Hertz(*real.last()?)))
    }
}

/// Vectors produced by one analysis run (an ngspice plot such as `tran1`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    /// Plot name, e.g. `tran1`, `ac1`, `const`.
    pub name: String,

    /// Vectors by name.
    pub vectors: BTreeMap<String, ResultVector>,
}

impl Plot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vectors: BTreeMap::new(),
        }
    }

    /// Add a vector, replacing any vector with the same name.
    pub fn insert(&mut self, vector: ResultVector) {
        self.vectors.insert(vector.name.clone(), vector);
    }

    pub fn get(&self, name: &str) -> Option<&ResultVector> {
        self.vectors.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The sweep axis: the first Time or Frequency vector in name order.
    ///
    /// The shared-library interface does not name the plot's scale vector.
    /// Analyses produce a single axis, so this is that axis; a plot holding
    /// both a `frequency` and a `time` vector yields `frequency`.
    pub fn scale(&self) -> Option<&ResultVector> {
        self.vectors
            .values()
            .find(|v| v.kind.is_some_and(SignalKind::is_axis))
    }

    /// All vectors of the given kind.
    pub fn of_kind(&self, kind: SignalKind) -> impl Iterator<Item = &ResultVector> {
        self.vectors.values().filter(move |v| v.kind == Some(kind))
    }

    /// Vectors whose tag was not recognised.
    pub fn unknown(&self) -> impl Iterator<Item = &ResultVector> {
        self.vectors.values().filter(|v| v.kind.is_none())
    }

    /// Count of vectors per kind label, for summaries.
    pub fn kind_histogram(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for v in self.vectors.values() {
            *counts.entry(v.kind_label()).or_insert(0) += 1;
        }
        counts
    }
}

/// Results of a single simulation: captured engine output and the plot the
/// command produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    /// Engine log output to stdout.
    pub stdout: String,

    /// Engine log output to stderr.
    pub stderr: String,

    /// The current plot after the command finished.
    pub plot: Plot,
}
