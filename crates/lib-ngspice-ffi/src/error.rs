//! Error types for ngspice FFI operations.

use crate::lifecycle::SessionState;
use lib_types::UnknownSignalKind;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving the ngspice shared library.
#[derive(Debug, Error)]
pub enum NgSpiceError {
    /// Failed to load the shared library.
    #[error("Failed to load library '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// Required symbol not found in library.
    #[error("Symbol '{symbol}' not found in library")]
    SymbolNotFound { symbol: String },

    /// Another session is already driving this library.
    #[error("ngspice library '{path}' is already in use by another session")]
    SessionActive { path: String },

    /// A call made by an earlier session is still running inside the engine.
    #[error("ngspice library '{path}' still has {pending} call(s) in flight from an earlier session")]
    EngineBusy { path: String, pending: usize },

    /// `ngSpice_Init` returned an error.
    #[error("ngSpice_Init failed with code {code}")]
    InitFailed { code: i32 },

    /// Operation not supported by this library build.
    #[error("Operation '{operation}' not supported by this ngspice build")]
    NotSupported { operation: String },

    /// A string argument could not be handed to C.
    #[error("invalid string encoding in {what}; strings must not contain null bytes")]
    InvalidStringEncoding { what: &'static str },

    /// ngspice was unable to parse the circuit. Holds the engine's stderr.
    #[error("error parsing circuit; ngspice logs follow:\n{0}")]
    InvalidCircuit(String),

    /// ngspice rejected or failed a command. Holds the engine's stderr.
    #[error("command '{command}' failed; ngspice logs follow:\n{log}")]
    CommandFailed { command: String, log: String },

    /// No plot exists yet (no analysis has run).
    #[error("ngspice has no current plot")]
    NoCurrentPlot,

    /// The engine returned a malformed `vector_info`.
    #[error("invalid vector '{name}': {reason}")]
    InvalidVector { name: String, reason: String },

    /// A vector carries a `v_type` tag this binding does not know.
    #[error("vector '{vector}' has an unrecognised type tag {}", .source.value)]
    UnknownKind {
        vector: String,
        #[source]
        source: UnknownSignalKind,
    },

    /// ngspice asked the host to exit (fatal engine error or `quit`).
    #[error("ngspice requested exit with status {status} (immediate: {immediate}, quit: {quit})")]
    EngineExited {
        status: i32,
        immediate: bool,
        quit: bool,
    },

    /// Engine call timed out.
    #[error("ngspice call timed out after {0:?}")]
    Timeout(Duration),

    /// Engine call panicked.
    #[error("ngspice call panicked: {0}")]
    EnginePanicked(String),

    /// Invalid session state for operation.
    #[error("Invalid session state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    /// Too many orphaned threads from previous timeouts.
    #[error("Too many orphaned threads ({count}), max allowed is {max}")]
    TooManyOrphanedThreads { count: usize, max: usize },
}

impl NgSpiceError {
    /// Create a load error.
    pub fn load_error(path: impl Into<String>, source: libloading::Error) -> Self {
        Self::LoadError {
            path: path.into(),
            source,
        }
    }

    /// Create a symbol not found error.
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    /// Create an invalid vector error.
    pub fn invalid_vector(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVector {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(expected: SessionState, actual: SessionState) -> Self {
        Self::InvalidState { expected, actual }
    }

    /// The unknown tag, if this error is a tag mismatch.
    pub fn unknown_kind(&self) -> Option<UnknownSignalKind> {
        match self {
            Self::UnknownKind { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// Check if the session should be considered faulted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EngineExited { .. }
                | Self::EnginePanicked(_)
                | Self::Timeout(_)
                | Self::InitFailed { .. }
        )
    }
}

/// Result type for ngspice operations.
pub type NgSpiceResult<T> = Result<T, NgSpiceError>;
