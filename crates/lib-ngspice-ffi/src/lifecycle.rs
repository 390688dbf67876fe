//! ngspice session lifecycle management.
//!
//! This module drives the engine through its shared-library interface:
//! - Initialization (`ngSpice_Init`)
//! - Circuit loading (`ngSpice_Circ`)
//! - Command execution (`ngSpice_Command`)
//! - Result collection (`ngSpice_CurPlot`, `ngSpice_AllVecs`, `ngGet_Vec_Info`)
//!
//! ngspice keeps all of its state in process globals. A session therefore
//! claims its [`NgSpiceLibrary`] exclusively and every operation takes
//! `&mut self`.

use crate::callbacks::{controlled_exit, send_char, send_stat, CapturedOutput};
use crate::decode::{decode_vector, UnknownKindPolicy};
use crate::error::{NgSpiceError, NgSpiceResult};
use crate::loader::NgSpiceLibrary;
use crossbeam::channel::RecvTimeoutError;
use lib_types::{Plot, Simulation};
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Global counter for orphaned threads from timed-out engine calls.
/// A timed-out call keeps running; this bounds how many can pile up.
static ORPHANED_THREAD_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Maximum number of orphaned threads allowed before refusing new operations.
const MAX_ORPHANED_THREADS: usize = 4;

/// Worker status for one protected call.
const CALL_RUNNING: u8 = 0;
const CALL_FINISHED: u8 = 1;
const CALL_ABANDONED: u8 = 2;

/// Session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Library claimed, `ngSpice_Init` not yet completed.
    Uninitialized,
    /// Engine ready, no circuit loaded by this session.
    Initialized,
    /// A circuit has been loaded.
    CircuitLoaded,
    /// The engine exited, panicked or timed out. No further calls are made.
    Faulted,
}

/// Configuration for session execution.
#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// Maximum time for any single engine call.
    pub timeout: Duration,

    /// Whether to catch panics raised while calling the engine.
    pub catch_panics: bool,

    /// Handling of result vectors with unrecognised type tags.
    pub unknown_kinds: UnknownKindPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            catch_panics: true,
            unknown_kinds: UnknownKindPolicy::Reject,
        }
    }
}

/// An active ngspice session.
///
/// This struct is intentionally `!Sync`: ngspice must not be entered from two
/// threads at once. Wrap it in a `Mutex` to share it.
///
/// ```ignore
/// let library = NgSpiceLibrary::load_default()?;
/// let mut session = NgSpiceSession::new(library)?;
/// let sim = session.simulate(netlist, "tran 100u 0.17s")?;
/// let out = sim.plot.get("v(out)");
/// ```
pub struct NgSpiceSession {
    /// The loaded library.
    library: Arc<NgSpiceLibrary>,

    /// Current session state.
    state: SessionState,

    /// Execution configuration.
    config: ExecutionConfig,

    /// Number of commands executed successfully.
    command_count: u64,

    /// Marker to prevent a Sync implementation.
    _not_sync: std::marker::PhantomData<std::cell::Cell<()>>,
}

impl NgSpiceSession {
    /// Claim the library with the default configuration.
    pub fn new(library: Arc<NgSpiceLibrary>) -> NgSpiceResult<Self> {
        Self::with_config(library, ExecutionConfig::default())
    }

    /// Claim the library and initialize the engine if it has not been yet.
    ///
    /// Fails with `SessionActive` while another session holds the library,
    /// and with `EngineBusy` while a call abandoned by an earlier session is
    /// still running inside the engine.
    pub fn with_config(library: Arc<NgSpiceLibrary>, config: ExecutionConfig) -> NgSpiceResult<Self> {
        library.claim_session()?;

        let mut session = Self {
            library,
            state: SessionState::Uninitialized,
            config,
            command_count: 0,
            _not_sync: std::marker::PhantomData,
        };
        session.init()?;
        Ok(session)
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn library(&self) -> &Arc<NgSpiceLibrary> {
        &self.library
    }

    fn init(&mut self) -> NgSpiceResult<()> {
        if self.library.is_initialized() {
            self.check_exit()?;
            self.state = SessionState::Initialized;
            tracing::debug!(path = %self.library.path, "Reusing initialized ngspice engine");
            return Ok(());
        }

        let library = self.library.clone();
        let code = self.guarded(move || {
            let init_fn = library.init_fn();
            unsafe {
                init_fn(
                    Some(send_char),
                    Some(send_stat),
                    Some(controlled_exit),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    library.context().as_user_data(),
                )
            }
        })?;

        if code != 0 {
            self.state = SessionState::Faulted;
            return Err(NgSpiceError::InitFailed { code });
        }

        self.library.mark_initialized();
        self.state = SessionState::Initialized;
        tracing::info!(path = %self.library.path, "ngspice initialized");
        Ok(())
    }

    /// Load a circuit listing. The listing is passed to ngspice line by line
    /// and must be self-contained.
    pub fn load_circuit(&mut self, circuit: &str) -> NgSpiceResult<()> {
        self.require_ready(SessionState::Initialized)?;

        let lines = circuit
            .lines()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| NgSpiceError::InvalidStringEncoding { what: "circuit" })?;
        let line_count = lines.len();

        let circ_fn = self.library.circ_fn();
        let code = self.guarded(move || {
            // NULL-terminated array of NUL-terminated lines. ngspice does not
            // write through these pointers despite the non-const signature.
            let mut ptrs: Vec<*mut c_char> = lines.iter().map(|l| l.as_ptr() as *mut c_char).collect();
            ptrs.push(ptr::null_mut());
            unsafe { circ_fn(ptrs.as_mut_ptr()) }
        })?;

        if code != 0 {
            return Err(NgSpiceError::InvalidCircuit(self.library.context().stderr()));
        }

        self.state = SessionState::CircuitLoaded;
        tracing::debug!(lines = line_count, "Circuit loaded");
        Ok(())
    }

    /// Execute an ngspice command such as `tran 1u 1m` or `ac dec 10 1 1meg`.
    pub fn command(&mut self, command: &str) -> NgSpiceResult<()> {
        self.require_ready(SessionState::Initialized)?;

        let cmd = CString::new(command)
            .map_err(|_| NgSpiceError::InvalidStringEncoding { what: "command" })?;

        let command_fn = self.library.command_fn();
        let code = self.guarded(move || unsafe { command_fn(cmd.as_ptr() as *mut c_char) })?;

        if code != 0 {
            return Err(NgSpiceError::CommandFailed {
                command: command.to_string(),
                log: self.library.context().stderr(),
            });
        }

        self.command_count += 1;
        tracing::debug!(command, command_count = self.command_count, "Command completed");
        Ok(())
    }

    /// Name of the current plot.
    pub fn current_plot(&mut self) -> NgSpiceResult<String> {
        self.require_ready(SessionState::Initialized)?;

        let cur_plot_fn = self.library.cur_plot_fn();
        let name = self.guarded(move || unsafe { read_c_string(cur_plot_fn()) })?;
        name.filter(|n| !n.is_empty()).ok_or(NgSpiceError::NoCurrentPlot)
    }

    /// Names of every plot the engine holds.
    pub fn all_plots(&mut self) -> NgSpiceResult<Vec<String>> {
        self.require_ready(SessionState::Initialized)?;

        let all_plots_fn = self.library.all_plots_fn().ok_or(NgSpiceError::NotSupported {
            operation: "ngSpice_AllPlots".to_string(),
        })?;
        self.guarded(move || unsafe { read_c_string_array(all_plots_fn()) })
    }

    /// Decode every vector of the named plot.
    pub fn plot_vectors(&mut self, plot: &str) -> NgSpiceResult<Plot> {
        self.require_ready(SessionState::Initialized)?;

        let plot_name = CString::new(plot)
            .map_err(|_| NgSpiceError::InvalidStringEncoding { what: "plot name" })?;
        let all_vecs_fn = self.library.all_vecs_fn();
        let get_vec_info_fn = self.library.get_vec_info_fn();
        let policy = self.config.unknown_kinds;
        let name = plot.to_string();

        let decoded = self.guarded(move || -> NgSpiceResult<Plot> {
            let mut out = Plot::new(name);
            let names = unsafe { all_vecs_fn(plot_name.as_ptr() as *mut c_char) };
            if names.is_null() {
                return Ok(out);
            }

            let mut cursor = names;
            // SAFETY: ngspice returns a NULL-terminated array that stays valid
            // until the next call into the engine.
            unsafe {
                while !(*cursor).is_null() {
                    let info = get_vec_info_fn(*cursor);
                    if info.is_null() {
                        let vec_name = CStr::from_ptr(*cursor).to_string_lossy();
                        tracing::warn!(vector = %vec_name, "ngGet_Vec_Info returned null");
                    } else {
                        out.insert(decode_vector(&*info, policy)?);
                    }
                    cursor = cursor.add(1);
                }
            }
            Ok(out)
        })??;

        tracing::debug!(plot, vectors = decoded.len(), "Collected plot vectors");
        Ok(decoded)
    }

    /// Load a circuit, run a command and collect the resulting plot.
    ///
    /// Captured output is reset first, so the returned logs belong to this
    /// run only.
    pub fn simulate(&mut self, circuit: &str, command: &str) -> NgSpiceResult<Simulation> {
        self.library.context().clear_output();

        self.load_circuit(circuit)?;
        self.command(command)?;
        let plot_name = self.current_plot()?;
        let plot = self.plot_vectors(&plot_name)?;

        let CapturedOutput { stdout, stderr } = self.library.context().take_output();
        tracing::info!(
            plot = %plot.name,
            vectors = plot.len(),
            unknown = plot.unknown().count(),
            "Simulation complete"
        );

        Ok(Simulation {
            stdout,
            stderr,
            plot,
        })
    }

    fn require_ready(&self, expected: SessionState) -> NgSpiceResult<()> {
        match self.state {
            SessionState::Initialized | SessionState::CircuitLoaded => Ok(()),
            actual => Err(NgSpiceError::invalid_state(expected, actual)),
        }
    }

    fn check_exit(&mut self) -> NgSpiceResult<()> {
        match self.library.context().exit_request() {
            Some(request) => {
                self.state = SessionState::Faulted;
                Err(NgSpiceError::EngineExited {
                    status: request.status,
                    immediate: request.immediate,
                    quit: request.quit,
                })
            }
            None => Ok(()),
        }
    }

    /// Run an engine call under protection, fault the session on fatal
    /// errors, and surface any exit request the call triggered.
    ///
    /// The call is counted on the library until the worker returns, and the
    /// worker holds the library, so a call abandoned on timeout never outlives
    /// the loaded engine.
    fn guarded<F, R>(&mut self, f: F) -> NgSpiceResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let call = self.library.begin_call();
        let result = execute_protected(&self.config, move || {
            let _call = call;
            f()
        });
        if let Err(e) = &result {
            if e.is_fatal() {
                self.state = SessionState::Faulted;
            }
        }
        let value = result?;
        self.check_exit()?;
        Ok(value)
    }
}

impl Drop for NgSpiceSession {
    fn drop(&mut self) {
        tracing::debug!(
            state = ?self.state,
            command_count = self.command_count,
            "Releasing ngspice session"
        );
        self.library.release_session();
    }
}

/// Execute a function with timeout and panic protection.
///
/// The call runs on its own thread. If it times out, the thread is orphaned:
/// it keeps running and is counted globally until it finishes. New calls are
/// refused while too many orphans exist.
pub fn execute_protected<F, R>(config: &ExecutionConfig, f: F) -> NgSpiceResult<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let orphaned_count = orphaned_thread_count();
    if orphaned_count >= MAX_ORPHANED_THREADS {
        return Err(NgSpiceError::TooManyOrphanedThreads {
            count: orphaned_count,
            max: MAX_ORPHANED_THREADS,
        });
    }

    let timeout = config.timeout;
    let catch_panics = config.catch_panics;

    let (tx, rx) = crossbeam::channel::bounded(1);
    let status = Arc::new(AtomicU8::new(CALL_RUNNING));
    let worker_status = Arc::clone(&status);

    std::thread::spawn(move || {
        // Dropped after the send, and also when `f` unwinds uncaught.
        let _finished = CallFinished {
            status: worker_status,
            orphans: &ORPHANED_THREAD_COUNT,
        };
        let result = if catch_panics {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        } else {
            Ok(f())
        };
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => into_outcome(result),
        Err(RecvTimeoutError::Timeout) => {
            if abandon(&status, &ORPHANED_THREAD_COUNT) {
                tracing::warn!(
                    orphaned_threads = orphaned_thread_count(),
                    timeout_ms = timeout.as_millis(),
                    "ngspice call timed out, thread orphaned"
                );
                return Err(NgSpiceError::Timeout(timeout));
            }
            // Finished between the timeout and the abandon; the result is
            // already in the channel.
            match rx.try_recv() {
                Ok(result) => into_outcome(result),
                Err(_) => Err(worker_vanished()),
            }
        }
        Err(RecvTimeoutError::Disconnected) => Err(worker_vanished()),
    }
}

/// Mark a timed-out call as abandoned and count its thread as orphaned.
/// Returns `false`, leaving the count unchanged, if the worker already
/// finished.
fn abandon(status: &AtomicU8, orphans: &AtomicUsize) -> bool {
    // Incremented before the exchange so the worker's decrement never precedes it.
    orphans.fetch_add(1, Ordering::SeqCst);
    match status.compare_exchange(CALL_RUNNING, CALL_ABANDONED, Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => true,
        Err(_) => {
            orphans.fetch_sub(1, Ordering::SeqCst);
            false
        }
    }
}

/// Marks a worker finished when dropped, releasing its orphan count if the
/// caller already gave up on it.
struct CallFinished<'a> {
    status: Arc<AtomicU8>,
    orphans: &'a AtomicUsize,
}

impl Drop for CallFinished<'_> {
    fn drop(&mut self) {
        if self.status.swap(CALL_FINISHED, Ordering::SeqCst) == CALL_ABANDONED {
            self.orphans.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn into_outcome<R>(result: std::thread::Result<R>) -> NgSpiceResult<R> {
    result.map_err(|panic_info| {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        NgSpiceError::EnginePanicked(message)
    })
}

fn worker_vanished() -> NgSpiceError {
    NgSpiceError::EnginePanicked("engine thread ended without a result".to_string())
}

/// Threads still running calls that timed out.
fn orphaned_thread_count() -> usize {
    ORPHANED_THREAD_COUNT.load(Ordering::SeqCst)
}

/// Read a C string, returning None if null or invalid UTF-8.
///
/// # Safety
/// The pointer must be null or point to a valid null-terminated C string.
unsafe fn read_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: Caller guarantees ptr is valid if not null
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(String::from) }
}

/// Read a NULL-terminated array of C strings. Invalid UTF-8 entries are
/// converted lossily.
///
/// # Safety
/// `array` must be null or a NULL-terminated array of valid C strings.
unsafe fn read_c_string_array(array: *const *mut c_char) -> Vec<String> {
    let mut out = Vec::new();
    if array.is_null() {
        return out;
    }
    let mut cursor = array;
    // SAFETY: Caller guarantees the array is NULL-terminated.
    unsafe {
        while !(*cursor).is_null() {
            out.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::EntryPoints;
    use crate::raw::{
        ControlledExitFn, NgSpiceCircFn, NgSpiceCommandFn, NgSpiceInitFn, SendCharFn, SendStatFn,
        VectorInfoRaw, VF_REAL,
    };
    use lib_types::SignalKind;
    use std::ffi::{c_int, c_void};
    use std::sync::atomic::AtomicPtr;
    use std::sync::Weak;
    use std::time::Instant;

    // In-process stand-ins for the sharedspice.h entry points.

    /// Defines an `ngSpice_Init` that stores its `user_data` in `$slot`.
    macro_rules! recording_init {
        ($init:ident, $slot:ident) => {
            static $slot: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

            unsafe extern "C" fn $init(
                _send_char: Option<SendCharFn>,
                _send_stat: Option<SendStatFn>,
                _controlled_exit: Option<ControlledExitFn>,
                _send_data: *mut c_void,
                _send_init_data: *mut c_void,
                _bg_thread_running: *mut c_void,
                user_data: *mut c_void,
            ) -> c_int {
                $slot.store(user_data, Ordering::SeqCst);
                0
            }
        };
    }

    recording_init!(plain_init, PLAIN_CTX);
    recording_init!(echo_init, ECHO_CTX);
    recording_init!(failing_init, FAILING_CTX);
    recording_init!(exit_init, EXIT_CTX);

    unsafe extern "C" fn refusing_init(
        _send_char: Option<SendCharFn>,
        _send_stat: Option<SendStatFn>,
        _controlled_exit: Option<ControlledExitFn>,
        _send_data: *mut c_void,
        _send_init_data: *mut c_void,
        _bg_thread_running: *mut c_void,
        _user_data: *mut c_void,
    ) -> c_int {
        1
    }

    /// Send one NUL-terminated line through the output callback.
    unsafe fn emit(slot: &AtomicPtr<c_void>, line: &[u8]) {
        unsafe { send_char(line.as_ptr() as *mut c_char, 0, slot.load(Ordering::SeqCst)) };
    }

    unsafe extern "C" fn accept_circ(_circ: *mut *mut c_char) -> c_int {
        0
    }

    unsafe extern "C" fn accept_command(_command: *mut c_char) -> c_int {
        0
    }

    unsafe extern "C" fn echo_command(_command: *mut c_char) -> c_int {
        unsafe { emit(&ECHO_CTX, b"stdout Doing analysis at TEMP = 27.000000\0") };
        0
    }

    unsafe extern "C" fn failing_circ(_circ: *mut *mut c_char) -> c_int {
        unsafe { emit(&FAILING_CTX, b"stderr Error: unknown subckt: xq1\0") };
        1
    }

    unsafe extern "C" fn failing_command(_command: *mut c_char) -> c_int {
        unsafe { emit(&FAILING_CTX, b"stderr Error: no such command available in ngspice: frob\0") };
        1
    }

    unsafe extern "C" fn exit_command(_command: *mut c_char) -> c_int {
        unsafe { controlled_exit(1, false, true, 0, EXIT_CTX.load(Ordering::SeqCst)) };
        0
    }

    unsafe extern "C" fn slow_command(_command: *mut c_char) -> c_int {
        std::thread::sleep(Duration::from_millis(500));
        0
    }

    unsafe extern "C" fn cur_plot() -> *mut c_char {
        b"tran1\0".as_ptr() as *mut c_char
    }

    fn leak_names(names: &[&'static [u8]]) -> *mut *mut c_char {
        let mut ptrs: Vec<*mut c_char> = names.iter().map(|n| n.as_ptr() as *mut c_char).collect();
        ptrs.push(ptr::null_mut());
        Box::leak(ptrs.into_boxed_slice()).as_mut_ptr()
    }

    unsafe extern "C" fn all_plots() -> *mut *mut c_char {
        leak_names(&[b"tran1\0", b"const\0"])
    }

    unsafe extern "C" fn all_vecs(_plot: *mut c_char) -> *mut *mut c_char {
        leak_names(&[b"time\0", b"v(out)\0"])
    }

    static TIME: [f64; 3] = [0.0, 5e-4, 1e-3];
    static VOUT: [f64; 3] = [0.0, 1.25, 2.5];

    unsafe extern "C" fn vec_info(name: *mut c_char) -> *mut VectorInfoRaw {
        let name = unsafe { CStr::from_ptr(name) };
        let (kind, data) = match name.to_bytes() {
            b"time" => (1, &TIME),
            b"v(out)" => (3, &VOUT),
            _ => return ptr::null_mut(),
        };
        Box::leak(Box::new(VectorInfoRaw {
            v_name: name.as_ptr() as *mut c_char,
            v_type: kind,
            v_flags: VF_REAL,
            v_realdata: data.as_ptr() as *mut f64,
            v_compdata: ptr::null_mut(),
            v_length: data.len() as c_int,
        }))
    }

    fn entry_points(init: NgSpiceInitFn, circ: NgSpiceCircFn, command: NgSpiceCommandFn) -> EntryPoints {
        EntryPoints {
            init,
            circ,
            command,
            get_vec_info: vec_info,
            cur_plot,
            all_vecs,
            all_plots: Some(all_plots),
        }
    }

    fn fake_library(
        init: NgSpiceInitFn,
        circ: NgSpiceCircFn,
        command: NgSpiceCommandFn,
    ) -> Arc<NgSpiceLibrary> {
        NgSpiceLibrary::from_entry_points("libfakespice.so", entry_points(init, circ, command))
    }

    fn short_timeout() -> ExecutionConfig {
        ExecutionConfig {
            timeout: Duration::from_millis(100),
            ..Default::default()
        }
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "condition not reached within 5s");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_execution_config_default() {
        let config = ExecutionConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.catch_panics);
        assert_eq!(config.unknown_kinds, UnknownKindPolicy::Reject);
    }

    #[test]
    fn test_execute_protected_returns_value() {
        let config = ExecutionConfig::default();
        assert_eq!(execute_protected(&config, || 40 + 2).unwrap(), 42);
    }

    #[test]
    fn test_execute_protected_catches_panic() {
        let config = ExecutionConfig::default();
        let err = execute_protected(&config, || -> i32 { panic!("fatal ngspice error") })
            .unwrap_err();

        assert!(matches!(err, NgSpiceError::EnginePanicked(ref m) if m == "fatal ngspice error"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_execute_protected_times_out() {
        let config = ExecutionConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let err = execute_protected(&config, || {
            std::thread::sleep(Duration::from_millis(200));
        })
        .unwrap_err();

        assert!(matches!(err, NgSpiceError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[test]
    fn test_read_c_string_array() {
        let names = [CString::new("tran1").unwrap(), CString::new("const").unwrap()];
        let mut ptrs: Vec<*mut c_char> = names.iter().map(|n| n.as_ptr() as *mut c_char).collect();
        ptrs.push(ptr::null_mut());

        let read = unsafe { read_c_string_array(ptrs.as_ptr()) };
        assert_eq!(read, ["tran1", "const"]);
        assert!(unsafe { read_c_string_array(ptr::null()) }.is_empty());
    }

    #[test]
    fn test_read_c_string_null() {
        assert_eq!(unsafe { read_c_string(ptr::null()) }, None);
        let s = CString::new("ac1").unwrap();
        assert_eq!(unsafe { read_c_string(s.as_ptr()) }, Some("ac1".to_string()));
    }

    #[test]
    fn test_execute_protected_uncaught_panic() {
        let config = ExecutionConfig {
            catch_panics: false,
            ..Default::default()
        };
        let err = execute_protected(&config, || -> i32 { panic!("unwound") }).unwrap_err();

        assert!(matches!(err, NgSpiceError::EnginePanicked(ref m) if m.contains("without a result")));
    }

    #[test]
    fn test_abandon_after_worker_finished() {
        let orphans = AtomicUsize::new(0);
        let status = Arc::new(AtomicU8::new(CALL_RUNNING));
        drop(CallFinished {
            status: Arc::clone(&status),
            orphans: &orphans,
        });

        assert!(!abandon(&status, &orphans));
        assert_eq!(orphans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_orphan_released_when_worker_finishes() {
        let orphans = AtomicUsize::new(0);
        let status = Arc::new(AtomicU8::new(CALL_RUNNING));
        let finished = CallFinished {
            status: Arc::clone(&status),
            orphans: &orphans,
        };

        assert!(abandon(&status, &orphans));
        assert_eq!(orphans.load(Ordering::SeqCst), 1);
        drop(finished);
        assert_eq!(orphans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_second_session_rejected_until_release() {
        let library = fake_library(plain_init, accept_circ, accept_command);
        let session = NgSpiceSession::new(library.clone()).unwrap();
        assert_eq!(session.state(), SessionState::Initialized);
        assert!(library.in_use());

        let Err(err) = NgSpiceSession::new(library.clone()) else {
            panic!("second live session accepted");
        };
        assert!(matches!(err, NgSpiceError::SessionActive { ref path } if path == "libfakespice.so"));

        drop(session);
        assert!(!library.in_use());
        let reused = NgSpiceSession::new(library.clone()).unwrap();
        assert_eq!(reused.state(), SessionState::Initialized);
        assert!(library.is_initialized());
    }

    #[test]
    fn test_refused_init_releases_library() {
        let library = fake_library(refusing_init, accept_circ, accept_command);
        let Err(err) = NgSpiceSession::new(library.clone()) else {
            panic!("session started on a refused init");
        };

        assert!(matches!(err, NgSpiceError::InitFailed { code: 1 }));
        assert!(!library.is_initialized());
        assert!(!library.in_use());
    }

    #[test]
    fn test_simulate_collects_current_plot() {
        let library = fake_library(echo_init, accept_circ, echo_command);
        let mut session = NgSpiceSession::new(library).unwrap();

        let sim = session
            .simulate("* divider\nv1 in 0 5\n.end", "tran 0.5m 1m")
            .unwrap();

        assert_eq!(session.state(), SessionState::CircuitLoaded);
        assert_eq!(sim.plot.name, "tran1");
        assert_eq!(sim.plot.len(), 2);
        assert_eq!(sim.plot.get("v(out)").unwrap().kind, Some(SignalKind::Voltage));
        assert_eq!(sim.plot.scale().unwrap().name, "time");
        assert!(sim.stdout.contains("Doing analysis"));
        assert!(sim.stderr.is_empty());
        assert_eq!(session.all_plots().unwrap(), ["tran1", "const"]);
    }

    #[test]
    fn test_all_plots_needs_symbol() {
        let entry = EntryPoints {
            all_plots: None,
            ..entry_points(plain_init, accept_circ, accept_command)
        };
        let library = NgSpiceLibrary::from_entry_points("libfakespice.so", entry);
        let mut session = NgSpiceSession::new(library).unwrap();

        let err = session.all_plots().unwrap_err();
        assert!(matches!(err, NgSpiceError::NotSupported { ref operation } if operation == "ngSpice_AllPlots"));
    }

    #[test]
    fn test_failures_carry_engine_stderr() {
        let library = fake_library(failing_init, failing_circ, failing_command);
        let mut session = NgSpiceSession::new(library).unwrap();

        match session.load_circuit("xq1 a b nosuch\n.end").unwrap_err() {
            NgSpiceError::InvalidCircuit(log) => assert!(log.contains("unknown subckt: xq1")),
            other => panic!("unexpected error: {other}"),
        }
        match session.command("frob").unwrap_err() {
            NgSpiceError::CommandFailed { command, log } => {
                assert_eq!(command, "frob");
                assert!(log.contains("no such command"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.state(), SessionState::Initialized);
    }

    #[test]
    fn test_nul_bytes_rejected_before_engine() {
        let library = fake_library(plain_init, accept_circ, accept_command);
        let mut session = NgSpiceSession::new(library.clone()).unwrap();

        let err = session.load_circuit("r1 1 0 1k\0\n.end").unwrap_err();
        assert!(matches!(err, NgSpiceError::InvalidStringEncoding { what: "circuit" }));
        let err = session.command("tran 1u\0 1m").unwrap_err();
        assert!(matches!(err, NgSpiceError::InvalidStringEncoding { what: "command" }));
        assert_eq!(session.state(), SessionState::Initialized);
        assert_eq!(library.pending_calls(), 0);
    }

    #[test]
    fn test_controlled_exit_faults_session() {
        let library = fake_library(exit_init, accept_circ, exit_command);
        let mut session = NgSpiceSession::new(library.clone()).unwrap();

        let err = session.command("quit").unwrap_err();
        assert!(matches!(
            err,
            NgSpiceError::EngineExited {
                status: 1,
                immediate: false,
                quit: true
            }
        ));
        assert_eq!(session.state(), SessionState::Faulted);

        let err = session.command("run").unwrap_err();
        assert!(matches!(
            err,
            NgSpiceError::InvalidState {
                expected: SessionState::Initialized,
                actual: SessionState::Faulted
            }
        ));

        drop(session);
        let Err(err) = NgSpiceSession::new(library) else {
            panic!("exited engine accepted a new session");
        };
        assert!(matches!(err, NgSpiceError::EngineExited { status: 1, .. }));
    }

    #[test]
    fn test_timed_out_call_blocks_new_sessions() {
        let library = fake_library(plain_init, accept_circ, slow_command);
        let mut session = NgSpiceSession::with_config(library.clone(), short_timeout()).unwrap();

        let err = session.command("tran 1u 1").unwrap_err();
        assert!(matches!(err, NgSpiceError::Timeout(_)));
        assert_eq!(session.state(), SessionState::Faulted);
        assert_eq!(library.pending_calls(), 1);

        drop(session);
        let Err(err) = NgSpiceSession::new(library.clone()) else {
            panic!("engine re-entered while a call was in flight");
        };
        assert!(matches!(err, NgSpiceError::EngineBusy { pending: 1, .. }));
        assert!(!library.in_use());

        wait_until(|| library.pending_calls() == 0);
        let session = NgSpiceSession::new(library.clone()).unwrap();
        assert_eq!(session.state(), SessionState::Initialized);
    }

    #[test]
    fn test_abandoned_call_keeps_library_alive() {
        let library = fake_library(plain_init, accept_circ, slow_command);
        let mut session = NgSpiceSession::with_config(library.clone(), short_timeout()).unwrap();
        assert!(matches!(session.command("tran 1u 1"), Err(NgSpiceError::Timeout(_))));

        let weak: Weak<NgSpiceLibrary> = Arc::downgrade(&library);
        drop(session);
        drop(library);
        assert!(weak.strong_count() > 0);

        wait_until(|| weak.strong_count() == 0);
    }
}
