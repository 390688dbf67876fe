//! Conversion of native `vector_info` headers into owned result vectors.
//!
//! This sits on the hot path of result ingestion: one call per vector per
//! plot. Tag interpretation goes through [`SignalKind::from_raw`] only.

use crate::error::{NgSpiceError, NgSpiceResult};
use crate::raw::VectorInfoRaw;
use lib_types::{Complex64, ResultVector, SignalKind, VectorValues};
use std::ffi::CStr;

/// What to do with a vector whose `v_type` is not in the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownKindPolicy {
    /// Fail the decode with [`NgSpiceError::UnknownKind`].
    #[default]
    Reject,
    /// Keep the vector with `kind: None` and log a warning.
    KeepUnknown,
}

/// Copy a native vector into a [`ResultVector`].
///
/// # Safety
///
/// `info` must come from `ngGet_Vec_Info` (or be laid out the same way):
/// `v_name` null or a valid C string, and whichever data pointer is non-null
/// valid for `v_length` elements.
pub unsafe fn decode_vector(
    info: &VectorInfoRaw,
    policy: UnknownKindPolicy,
) -> NgSpiceResult<ResultVector> {
    if info.v_name.is_null() {
        return Err(NgSpiceError::invalid_vector("<null>", "null name"));
    }
    // SAFETY: checked non-null; caller guarantees a valid C string.
    let name = unsafe { CStr::from_ptr(info.v_name) }
        .to_str()
        .map_err(|_| NgSpiceError::invalid_vector("<non-utf8>", "name is not UTF-8"))?
        .to_owned();

    let kind = match SignalKind::from_raw(info.v_type) {
        Ok(kind) => Some(kind),
        Err(source) => match policy {
            UnknownKindPolicy::Reject => {
                return Err(NgSpiceError::UnknownKind {
                    vector: name,
                    source,
                });
            }
            UnknownKindPolicy::KeepUnknown => {
                tracing::warn!(
                    vector = %name,
                    raw_kind = info.v_type,
                    validated_against = SignalKind::NATIVE_VERSION,
                    "Keeping vector with unrecognised type tag"
                );
                None
            }
        },
    };

    let len = usize::try_from(info.v_length).map_err(|_| {
        NgSpiceError::invalid_vector(&name, format!("negative length {}", info.v_length))
    })?;

    let values = if !info.v_realdata.is_null() {
        // SAFETY: caller guarantees v_realdata is valid for v_length doubles.
        let data = unsafe { std::slice::from_raw_parts(info.v_realdata, len) };
        VectorValues::Real(data.to_vec())
    } else if !info.v_compdata.is_null() {
        // SAFETY: caller guarantees v_compdata is valid for v_length elements.
        let data = unsafe { std::slice::from_raw_parts(info.v_compdata, len) };
        VectorValues::Complex(
            data.iter()
                .map(|c| Complex64::new(c.cx_real, c.cx_imag))
                .collect(),
        )
    } else if len == 0 {
        VectorValues::Real(Vec::new())
    } else {
        return Err(NgSpiceError::invalid_vector(
            &name,
            "neither real nor complex data present",
        ));
    };

    Ok(ResultVector {
        name,
        raw_kind: info.v_type,
        kind,
        values,
    })
}
