//! Dynamic library loading for ngspice.
//!
//! This module loads the shared ngspice library (`libngspice.so`,
//! `ngspice.dll`, `libngspice.dylib`) and extracts the `sharedspice.h`
//! entry points used by the session.

use crate::callbacks::CallbackContext;
use crate::error::{NgSpiceError, NgSpiceResult};
use crate::raw::{
    NgGetVecInfoFn, NgSpiceAllPlotsFn, NgSpiceAllVecsFn, NgSpiceCircFn, NgSpiceCommandFn,
    NgSpiceCurPlotFn, NgSpiceInitFn,
};
use libloading::Library;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Environment variable that overrides the library location.
pub const LIBRARY_ENV_VAR: &str = "NGSPICE_LIBRARY";

/// Entry points resolved from the library.
#[derive(Clone, Copy)]
pub(crate) struct EntryPoints {
    pub(crate) init: NgSpiceInitFn,
    pub(crate) circ: NgSpiceCircFn,
    pub(crate) command: NgSpiceCommandFn,
    pub(crate) get_vec_info: NgGetVecInfoFn,
    pub(crate) cur_plot: NgSpiceCurPlotFn,
    pub(crate) all_vecs: NgSpiceAllVecsFn,
    pub(crate) all_plots: Option<NgSpiceAllPlotsFn>,
}

/// Loaded ngspice library with extracted function pointers.
///
/// ngspice keeps its state in process globals, so one loaded library backs at
/// most one [`NgSpiceSession`](crate::NgSpiceSession) at a time, and no new
/// session starts while a call from an earlier one is still inside the engine.
pub struct NgSpiceLibrary {
    /// The underlying dynamic library handle. Declared first so it is
    /// unloaded before the callback context is freed. `None` only for
    /// in-process entry points.
    #[allow(dead_code)]
    library: Option<Library>,

    /// Path to the library file.
    pub path: String,

    entry: EntryPoints,

    /// Target of the `user_data` pointer given to `ngSpice_Init`.
    context: Box<CallbackContext>,

    engine_initialized: AtomicBool,
    session_active: AtomicBool,

    /// Engine calls that have started and not yet returned, including calls
    /// abandoned after a timeout.
    pending_calls: AtomicUsize,
}

/// Resolve a required symbol or fail with `SymbolNotFound`.
macro_rules! required {
    ($library:expr, $ty:ty, $name:literal) => {
        unsafe {
            *$library
                .get::<$ty>(concat!($name, "\0").as_bytes())
                .map_err(|_| NgSpiceError::symbol_not_found($name))?
        }
    };
}

impl NgSpiceLibrary {
    /// Load ngspice from a shared library file.
    ///
    /// # Safety
    ///
    /// The library must be a genuine ngspice build exporting the
    /// `sharedspice.h` interface. Anything else is undefined behavior.
    pub fn load<P: AsRef<Path>>(path: P) -> NgSpiceResult<Arc<Self>> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let library = unsafe { Library::new(path) }
            .map_err(|e| NgSpiceError::load_error(&path_str, e))?;

        let entry = EntryPoints {
            init: required!(library, NgSpiceInitFn, "ngSpice_Init"),
            circ: required!(library, NgSpiceCircFn, "ngSpice_Circ"),
            command: required!(library, NgSpiceCommandFn, "ngSpice_Command"),
            get_vec_info: required!(library, NgGetVecInfoFn, "ngGet_Vec_Info"),
            cur_plot: required!(library, NgSpiceCurPlotFn, "ngSpice_CurPlot"),
            all_vecs: required!(library, NgSpiceAllVecsFn, "ngSpice_AllVecs"),
            // Present in every current release, but not needed to simulate.
            all_plots: unsafe {
                library
                    .get::<NgSpiceAllPlotsFn>(b"ngSpice_AllPlots\0")
                    .ok()
                    .map(|s| *s)
            },
        };

        tracing::info!(
            path = %path_str,
            has_all_plots = entry.all_plots.is_some(),
            "Loaded ngspice library"
        );

        Ok(Self::assemble(Some(library), path_str, entry))
    }

    /// Load from `$NGSPICE_LIBRARY`, falling back to the platform's default
    /// library name on the loader search path.
    pub fn load_default() -> NgSpiceResult<Arc<Self>> {
        match std::env::var_os(LIBRARY_ENV_VAR) {
            Some(path) => Self::load(path),
            None => Self::load(default_library_name()),
        }
    }

    /// Wrap entry points that live in the current process.
    #[cfg(test)]
    pub(crate) fn from_entry_points(path: &str, entry: EntryPoints) -> Arc<Self> {
        Self::assemble(None, path.to_string(), entry)
    }

    fn assemble(library: Option<Library>, path: String, entry: EntryPoints) -> Arc<Self> {
        Arc::new(Self {
            library,
            path,
            entry,
            context: Box::new(CallbackContext::new()),
            engine_initialized: AtomicBool::new(false),
            session_active: AtomicBool::new(false),
            pending_calls: AtomicUsize::new(0),
        })
    }

    /// Claim the library for a session.
    ///
    /// Fails with `SessionActive` if another session holds it, and with
    /// `EngineBusy` while a call made by an earlier session is still running.
    pub(crate) fn claim_session(&self) -> NgSpiceResult<()> {
        if self
            .session_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(NgSpiceError::SessionActive {
                path: self.path.clone(),
            });
        }

        let pending = self.pending_calls();
        if pending > 0 {
            self.release_session();
            return Err(NgSpiceError::EngineBusy {
                path: self.path.clone(),
                pending,
            });
        }
        Ok(())
    }

    pub(crate) fn release_session(&self) {
        self.session_active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn mark_initialized(&self) {
        self.engine_initialized.store(true, Ordering::SeqCst);
    }

    /// Whether `ngSpice_Init` has completed for this library.
    pub fn is_initialized(&self) -> bool {
        self.engine_initialized.load(Ordering::SeqCst)
    }

    /// Whether a session currently holds this library.
    pub fn in_use(&self) -> bool {
        self.session_active.load(Ordering::SeqCst)
    }

    /// Number of engine calls still running, abandoned ones included.
    pub fn pending_calls(&self) -> usize {
        self.pending_calls.load(Ordering::SeqCst)
    }

    /// Register an engine call. The returned guard keeps the library loaded
    /// and counts the call as pending until it is dropped.
    pub(crate) fn begin_call(self: &Arc<Self>) -> PendingCall {
        self.pending_calls.fetch_add(1, Ordering::SeqCst);
        PendingCall {
            library: Arc::clone(self),
        }
    }

    pub(crate) fn context(&self) -> &CallbackContext {
        &self.context
    }

    pub(crate) fn init_fn(&self) -> NgSpiceInitFn {
        self.entry.init
    }

    pub(crate) fn circ_fn(&self) -> NgSpiceCircFn {
        self.entry.circ
    }

    pub(crate) fn command_fn(&self) -> NgSpiceCommandFn {
        self.entry.command
    }

    pub(crate) fn get_vec_info_fn(&self) -> NgGetVecInfoFn {
        self.entry.get_vec_info
    }

    pub(crate) fn cur_plot_fn(&self) -> NgSpiceCurPlotFn {
        self.entry.cur_plot
    }

    pub(crate) fn all_vecs_fn(&self) -> NgSpiceAllVecsFn {
        self.entry.all_vecs
    }

    pub(crate) fn all_plots_fn(&self) -> Option<NgSpiceAllPlotsFn> {
        self.entry.all_plots
    }
}

/// An engine call in flight. Moved into the worker thread that makes the
/// call, so the library outlives the call even when the caller gives up.
pub(crate) struct PendingCall {
    library: Arc<NgSpiceLibrary>,
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.library.pending_calls.fetch_sub(1, Ordering::SeqCst);
    }
}

// NgSpiceLibrary is Send + Sync because it only stores function pointers,
// the Library handle, and a context whose state sits behind mutexes.
unsafe impl Send for NgSpiceLibrary {}
unsafe impl Sync for NgSpiceLibrary {}

impl std::fmt::Debug for NgSpiceLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NgSpiceLibrary")
            .field("path", &self.path)
            .field("initialized", &self.is_initialized())
            .field("pending_calls", &self.pending_calls())
            .finish_non_exhaustive()
    }
}

/// Platform-specific library format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryFormat {
    /// Windows DLL.
    Dll,
    /// Linux/Unix shared object.
    So,
    /// macOS dynamic library.
    Dylib,
    /// Unknown format.
    Unknown,
}

impl LibraryFormat {
    /// Detect format from file name. Versioned sonames (`libngspice.so.0`)
    /// count as shared objects.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("dll") | Some("DLL") => Self::Dll,
            Some("so") => Self::So,
            Some("dylib") => Self::Dylib,
            _ => {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name.contains(".so.") {
                    Self::So
                } else {
                    Self::Unknown
                }
            }
        }
    }

    /// Get the default format for the current platform.
    #[cfg(target_os = "windows")]
    pub fn native() -> Self {
        Self::Dll
    }

    #[cfg(target_os = "macos")]
    pub fn native() -> Self {
        Self::Dylib
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    pub fn native() -> Self {
        Self::So
    }
}

/// File name of the ngspice shared library on this platform.
pub fn default_library_name() -> &'static str {
    match LibraryFormat::native() {
        LibraryFormat::Dll => "ngspice.dll",
        LibraryFormat::Dylib => "libngspice.dylib",
        LibraryFormat::So | LibraryFormat::Unknown => "libngspice.so",
    }
}
