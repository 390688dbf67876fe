//! `#[repr(C)]` mirrors of the ngspice shared-library interface.
//!
//! Layouts and signatures follow `sharedspice.h`. Only the parts this crate
//! calls are mirrored.

use std::ffi::{c_char, c_double, c_int, c_short, c_void};

/// `NG_BOOL` is C99 `bool` in `sharedspice.h`.
pub type NgBool = bool;

/// `ngcomplex_t`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NgComplex {
    pub cx_real: c_double,
    pub cx_imag: c_double,
}

/// `vector_info`, the header ngspice returns from `ngGet_Vec_Info`.
///
/// ```c
/// typedef struct vector_info {
///     char        *v_name;
///     int          v_type;
///     short        v_flags;
///     double      *v_realdata;
///     ngcomplex_t *v_compdata;
///     int          v_length;
/// } vector_info, *pvector_info;
/// ```
///
/// `v_type` holds a raw [`SignalKind`](lib_types::SignalKind) tag.
#[repr(C)]
#[derive(Debug)]
pub struct VectorInfoRaw {
    pub v_name: *mut c_char,
    pub v_type: c_int,
    pub v_flags: c_short,
    pub v_realdata: *mut c_double,
    pub v_compdata: *mut NgComplex,
    pub v_length: c_int,
}

/// `v_flags` bit: vector holds real data.
pub const VF_REAL: c_short = 1 << 0;
/// `v_flags` bit: vector holds complex data.
pub const VF_COMPLEX: c_short = 1 << 1;

/// `int SendChar(char *output, int lib_id, void *user_data)`.
pub type SendCharFn = unsafe extern "C" fn(*mut c_char, c_int, *mut c_void) -> c_int;

/// `int SendStat(char *status, int lib_id, void *user_data)`.
pub type SendStatFn = unsafe extern "C" fn(*mut c_char, c_int, *mut c_void) -> c_int;

/// `int ControlledExit(int status, NG_BOOL immediate, NG_BOOL quit, int lib_id, void *user_data)`.
pub type ControlledExitFn =
    unsafe extern "C" fn(c_int, NgBool, NgBool, c_int, *mut c_void) -> c_int;

/// `int ngSpice_Init(SendChar*, SendStat*, ControlledExit*, SendData*, SendInitData*, BGThreadRunning*, void*)`.
///
/// The data and background-thread callbacks are always passed as null, so
/// they are typed as plain pointers.
pub type NgSpiceInitFn = unsafe extern "C" fn(
    send_char: Option<SendCharFn>,
    send_stat: Option<SendStatFn>,
    controlled_exit: Option<ControlledExitFn>,
    send_data: *mut c_void,
    send_init_data: *mut c_void,
    bg_thread_running: *mut c_void,
    user_data: *mut c_void,
) -> c_int;

/// `int ngSpice_Circ(char **circarray)`.
pub type NgSpiceCircFn = unsafe extern "C" fn(circarray: *mut *mut c_char) -> c_int;

/// `int ngSpice_Command(char *command)`.
pub type NgSpiceCommandFn = unsafe extern "C" fn(command: *mut c_char) -> c_int;

/// `pvector_info ngGet_Vec_Info(char *vecname)`.
pub type NgGetVecInfoFn = unsafe extern "C" fn(vecname: *mut c_char) -> *mut VectorInfoRaw;

/// `char *ngSpice_CurPlot(void)`.
pub type NgSpiceCurPlotFn = unsafe extern "C" fn() -> *mut c_char;

/// `char **ngSpice_AllVecs(char *plotname)`.
pub type NgSpiceAllVecsFn = unsafe extern "C" fn(plotname: *mut c_char) -> *mut *mut c_char;

/// `char **ngSpice_AllPlots(void)`.
pub type NgSpiceAllPlotsFn = unsafe extern "C" fn() -> *mut *mut c_char;
