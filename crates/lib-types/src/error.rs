//! Error types for the signal-kind registry.

use crate::signal_kind::SignalKind;
use thiserror::Error;

/// A raw `v_type` tag that has no counterpart in [`SignalKind`].
///
/// This means the loaded ngspice library and this binding disagree about the
/// tag space. The offending value is kept so it can be checked against the
/// engine's current `sim.h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
#[error(
    "unknown signal kind tag {value}: known tags are 0..={max} (table validated against {version})",
    max = SignalKind::MAX_RAW,
    version = SignalKind::NATIVE_VERSION
)]
pub struct UnknownSignalKind {
    /// The raw tag as received from the native library.
    pub value: i32,
}

impl UnknownSignalKind {
    /// Create an error for the given raw tag.
    #[inline]
    pub const fn new(value: i32) -> Self {
        Self { value }
    }

    /// Whether the tag lies just past the known range, i.e. the engine most
    /// likely appended variants this binding does not know about yet.
    pub const fn looks_appended(&self) -> bool {
        self.value > SignalKind::MAX_RAW
    }
}

/// A signal-kind name that matches neither a variant label nor a native
/// constant.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unrecognised signal kind name '{0}'")]
pub struct ParseSignalKindError(pub String);
