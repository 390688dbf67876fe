//! Physical units with type safety.
//!
//! These newtypes give typed access to the scalar values of a result vector
//! once its [`SignalKind`](crate::SignalKind) has been checked, so a current
//! cannot be passed where a voltage is expected.

use serde::{Deserialize, Serialize};

/// Time in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

impl Seconds {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn as_ms(&self) -> f64 {
        self.0 * 1e3
    }
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    #[inline]
    pub fn as_khz(&self) -> f64 {
        self.0 * 1e-3
    }
}

/// Voltage in Volts.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Volts(pub f64);

/// Current in Amperes.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Amperes(pub f64);

impl Amperes {
    #[inline]
    pub fn as_ma(&self) -> f64 {
        self.0 * 1e3
    }
}
