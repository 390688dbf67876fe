//! Callbacks handed to `ngSpice_Init`.
//!
//! ngspice reports console output and exit requests through C callbacks that
//! receive a `user_data` pointer. That pointer is a [`CallbackContext`] owned
//! by the loaded library, so it stays valid for as long as the engine can
//! call back.
//!
//! The callbacks never unwind into C: lock poisoning is ignored, invalid
//! UTF-8 is replaced, and an exit request is recorded instead of aborting.

use crate::raw::NgBool;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::{Mutex, MutexGuard};

/// Console output captured since the last [`CallbackContext::take_output`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Arguments of an ngspice `ControlledExit` callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitRequest {
    pub status: i32,
    pub immediate: bool,
    pub quit: bool,
}

/// State shared with the engine through `user_data`.
#[derive(Debug, Default)]
pub struct CallbackContext {
    output: Mutex<CapturedOutput>,
    exit: Mutex<Option<ExitRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CallbackContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one line of engine output. ngspice prefixes lines with
    /// `stdout ` or `stderr `; unprefixed lines go to stdout.
    pub fn push_line(&self, line: &str) {
        let mut out = lock(&self.output);
        if let Some(x) = line.strip_prefix("stderr ") {
            tracing::debug!(target: "ngspice", "{}", x);
            out.stderr.push_str(x);
            out.stderr.push('\n');
        } else {
            let x = line.strip_prefix("stdout ").unwrap_or(line);
            tracing::trace!(target: "ngspice", "{}", x);
            out.stdout.push_str(x);
            out.stdout.push('\n');
        }
    }

    /// Take the captured output, leaving the buffers empty.
    pub fn take_output(&self) -> CapturedOutput {
        std::mem::take(&mut *lock(&self.output))
    }

    /// Copy of the captured stderr.
    pub fn stderr(&self) -> String {
        lock(&self.output).stderr.clone()
    }

    /// Discard captured output.
    pub fn clear_output(&self) {
        *lock(&self.output) = CapturedOutput::default();
    }

    pub fn record_exit(&self, request: ExitRequest) {
        tracing::error!(
            status = request.status,
            immediate = request.immediate,
            quit = request.quit,
            "ngspice requested exit"
        );
        *lock(&self.exit) = Some(request);
    }

    /// The pending exit request, if the engine asked to exit.
    pub fn exit_request(&self) -> Option<ExitRequest> {
        *lock(&self.exit)
    }

    /// Pointer passed to ngspice as `user_data`.
    pub fn as_user_data(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }
}

/// `SendChar` callback.
///
/// # Safety
/// `ctx` must be null or point to a live [`CallbackContext`]; `text` must be
/// null or a valid C string.
pub unsafe extern "C" fn send_char(text: *mut c_char, _lib_id: c_int, ctx: *mut c_void) -> c_int {
    if text.is_null() || ctx.is_null() {
        return 0;
    }
    // SAFETY: both pointers checked non-null; validity guaranteed by caller.
    let (ctx, line) = unsafe { (&*(ctx as *const CallbackContext), CStr::from_ptr(text)) };
    ctx.push_line(&line.to_string_lossy());
    0
}

/// `SendStat` callback. Progress messages are only logged.
///
/// # Safety
/// `text` must be null or a valid C string.
pub unsafe extern "C" fn send_stat(text: *mut c_char, _lib_id: c_int, _ctx: *mut c_void) -> c_int {
    if !text.is_null() {
        // SAFETY: checked non-null; validity guaranteed by caller.
        let status = unsafe { CStr::from_ptr(text) };
        tracing::trace!(target: "ngspice", status = %status.to_string_lossy(), "progress");
    }
    0
}

/// `ControlledExit` callback.
///
/// # Safety
/// `ctx` must be null or point to a live [`CallbackContext`].
pub unsafe extern "C" fn controlled_exit(
    status: c_int,
    immediate: NgBool,
    quit: NgBool,
    _lib_id: c_int,
    ctx: *mut c_void,
) -> c_int {
    if !ctx.is_null() {
        // SAFETY: checked non-null; validity guaranteed by caller.
        let ctx = unsafe { &*(ctx as *const CallbackContext) };
        ctx.record_exit(ExitRequest {
            status,
            immediate,
            quit,
        });
    }
    0
}
