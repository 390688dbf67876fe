//! # lib-ngspice-ffi
//!
//! Safe FFI wrappers for the ngspice shared library.
//!
//! This crate loads `libngspice` at runtime and drives it through the
//! `sharedspice.h` interface. It handles:
//!
//! - Dynamic library loading with `libloading`
//! - Session lifecycle (Init / Circ / Command)
//! - Capture of engine console output and exit requests
//! - Decoding of result vectors, including their
//!   [`SignalKind`](lib_types::SignalKind) tags
//!
//! # Safety
//!
//! ngspice is a process-global C engine. This crate implements several
//! safety layers:
//!
//! 1. **Exclusive sessions**: one live session per loaded library
//! 2. **Timeout protection**: all calls are wrapped with configurable timeouts
//! 3. **Panic catching**: `catch_unwind` prevents panics from unwinding into C
//! 4. **Exit interception**: the engine's exit request faults the session
//!    instead of terminating the process
//! 5. **In-flight tracking**: a call abandoned on timeout keeps the library
//!    loaded, and no new session starts until it returns
//!
//! Result vectors whose type tag is outside the registry are rejected by
//! default; see [`UnknownKindPolicy`].

pub mod callbacks;
pub mod decode;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod raw;

pub use callbacks::{CapturedOutput, ExitRequest};
pub use decode::{decode_vector, UnknownKindPolicy};
pub use error::{NgSpiceError, NgSpiceResult};
pub use lifecycle::{ExecutionConfig, NgSpiceSession, SessionState};
pub use loader::{default_library_name, LibraryFormat, NgSpiceLibrary};
