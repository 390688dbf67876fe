//! # lib-types
//!
//! Core type definitions for the ngspice binding.
//!
//! This crate provides the types shared across the workspace:
//! - The signal-kind registry mirroring ngspice's `enum simulation_types`
//! - Physical units for typed access to result data
//! - Owned result vectors, plots and simulation output

pub mod error;
pub mod signal_kind;
pub mod units;
pub mod vector;

pub use error::*;
pub use signal_kind::*;
pub use units::*;
pub use vector::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;
