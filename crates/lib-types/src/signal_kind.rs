//! Physical interpretation tags for ngspice result vectors.
//!
//! ngspice stores a `v_type` field in every `vector_info` it hands out. The
//! field is a plain C `int` drawn from `enum simulation_types` in the engine's
//! `sim.h`. [`SignalKind`] mirrors that enumeration position for position.
//!
//! # ABI Contract
//!
//! The discriminants are part of the native interface, not a convenience:
//!
//! ```text
//! SV_NOTYPE = 0, SV_TIME = 1, SV_FREQUENCY = 2, ..., SV_CHARGE = 22
//! ```
//!
//! Every variant has its value written out explicitly so that moving a line
//! during a refactor cannot shift the tags. The header has been unchanged
//! since `ngspice-27` ([`SignalKind::NATIVE_VERSION`]). When the engine
//! releases a new `sim.h`, re-derive the table from it. Upstream appends new
//! variants; it does not reorder.
//!
//! A raw tag outside the table is reported as [`UnknownSignalKind`] and is
//! never folded into [`SignalKind::NoType`]: doing so would hide version skew
//! between this binding and the loaded library.

use crate::error::{ParseSignalKindError, UnknownSignalKind};
use serde::{Deserialize, Serialize};
use std::ffi::c_int;
use std::fmt;
use std::str::FromStr;

/// Physical quantity carried by a result vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum SignalKind {
    /// Untyped / unknown.
    NoType = 0,
    /// Time axis.
    Time = 1,
    /// Frequency axis.
    Frequency = 2,
    /// Node voltage.
    Voltage = 3,
    /// Branch current.
    Current = 4,
    /// Voltage noise spectral density.
    VoltageDensity = 5,
    /// Current noise spectral density.
    CurrentDensity = 6,
    /// Squared voltage noise density.
    SqrVoltageDensity = 7,
    /// Squared current noise density.
    SqrCurrentDensity = 8,
    /// Squared voltage.
    SqrVoltage = 9,
    /// Squared current.
    SqrCurrent = 10,
    /// Pole location (pole/zero analysis).
    Pole = 11,
    /// Zero location (pole/zero analysis).
    Zero = 12,
    /// Scattering parameter.
    SParam = 13,
    /// Device/circuit temperature.
    Temperature = 14,
    /// Resistance.
    Resistance = 15,
    /// Impedance.
    Impedance = 16,
    /// Admittance.
    Admittance = 17,
    /// Power.
    Power = 18,
    /// Phase angle.
    Phase = 19,
    /// Magnitude in dB.
    DecibelMagnitude = 20,
    /// Capacitance.
    Capacitance = 21,
    /// Charge.
    Charge = 22,
}

// The native field is a C `int`; the enum must have the same width.
const _: () = assert!(std::mem::size_of::<SignalKind>() == std::mem::size_of::<c_int>());
const _: () = assert!(SignalKind::ALL.len() as i32 == SignalKind::MAX_RAW + 1);

impl SignalKind {
    /// Every variant, ordered by raw tag. `ALL[i].to_raw() == i`.
    pub const ALL: [SignalKind; 23] = [
        Self::NoType,
        Self::Time,
        Self::Frequency,
        Self::Voltage,
        Self::Current,
        Self::VoltageDensity,
        Self::CurrentDensity,
        Self::SqrVoltageDensity,
        Self::SqrCurrentDensity,
        Self::SqrVoltage,
        Self::SqrCurrent,
        Self::Pole,
        Self::Zero,
        Self::SParam,
        Self::Temperature,
        Self::Resistance,
        Self::Impedance,
        Self::Admittance,
        Self::Power,
        Self::Phase,
        Self::DecibelMagnitude,
        Self::Capacitance,
        Self::Charge,
    ];

    /// Largest raw tag known to this binding.
    pub const MAX_RAW: i32 = 22;

    /// ngspice release whose `sim.h` this table was validated against.
    pub const NATIVE_VERSION: &'static str = "ngspice-27";

    /// Interpret a raw `v_type` tag received from the engine.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSignalKind`] carrying `value` when it is outside
    /// `0..=MAX_RAW`.
    #[inline]
    pub const fn from_raw(value: i32) -> Result<Self, UnknownSignalKind> {
        let kind = match value {
            0 => Self::NoType,
            1 => Self::Time,
            2 => Self::Frequency,
            3 => Self::Voltage,
            4 => Self::Current,
            5 => Self::VoltageDensity,
            6 => Self::CurrentDensity,
            7 => Self::SqrVoltageDensity,
            8 => Self::SqrCurrentDensity,
            9 => Self::SqrVoltage,
            10 => Self::SqrCurrent,
            11 => Self::Pole,
            12 => Self::Zero,
            13 => Self::SParam,
            14 => Self::Temperature,
            15 => Self::Resistance,
            16 => Self::Impedance,
            17 => Self::Admittance,
            18 => Self::Power,
            19 => Self::Phase,
            20 => Self::DecibelMagnitude,
            21 => Self::Capacitance,
            22 => Self::Charge,
            _ => return Err(UnknownSignalKind::new(value)),
        };
        Ok(kind)
    }

    /// The raw tag the engine uses for this kind.
    #[inline]
    pub const fn to_raw(self) -> i32 {
        self as i32
    }

    /// Human-readable label. Diagnostics only, not part of the ABI.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoType => "NoType",
            Self::Time => "Time",
            Self::Frequency => "Frequency",
            Self::Voltage => "Voltage",
            Self::Current => "Current",
            Self::VoltageDensity => "VoltageDensity",
            Self::CurrentDensity => "CurrentDensity",
            Self::SqrVoltageDensity => "SqrVoltageDensity",
            Self::SqrCurrentDensity => "SqrCurrentDensity",
            Self::SqrVoltage => "SqrVoltage",
            Self::SqrCurrent => "SqrCurrent",
            Self::Pole => "Pole",
            Self::Zero => "Zero",
            Self::SParam => "SParam",
            Self::Temperature => "Temperature",
            Self::Resistance => "Resistance",
            Self::Impedance => "Impedance",
            Self::Admittance => "Admittance",
            Self::Power => "Power",
            Self::Phase => "Phase",
            Self::DecibelMagnitude => "DecibelMagnitude",
            Self::Capacitance => "Capacitance",
            Self::Charge => "Charge",
        }
    }

    /// Name of the matching constant in `enum simulation_types`.
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::NoType => "SV_NOTYPE",
            Self::Time => "SV_TIME",
            Self::Frequency => "SV_FREQUENCY",
            Self::Voltage => "SV_VOLTAGE",
            Self::Current => "SV_CURRENT",
            Self::VoltageDensity => "SV_VOLTAGE_DENSITY",
            Self::CurrentDensity => "SV_CURRENT_DENSITY",
            Self::SqrVoltageDensity => "SV_SQR_VOLTAGE_DENSITY",
            Self::SqrCurrentDensity => "SV_SQR_CURRENT_DENSITY",
            Self::SqrVoltage => "SV_SQR_VOLTAGE",
            Self::SqrCurrent => "SV_SQR_CURRENT",
            Self::Pole => "SV_POLE",
            Self::Zero => "SV_ZERO",
            Self::SParam => "SV_SPARAM",
            Self::Temperature => "SV_TEMP",
            Self::Resistance => "SV_RES",
            Self::Impedance => "SV_IMPEDANCE",
            Self::Admittance => "SV_ADMITTANCE",
            Self::Power => "SV_POWER",
            Self::Phase => "SV_PHASE",
            Self::DecibelMagnitude => "SV_DB",
            Self::Capacitance => "SV_CAPACITANCE",
            Self::Charge => "SV_CHARGE",
        }
    }

    /// One-line description of the quantity.
    pub const fn meaning(self) -> &'static str {
        match self {
            Self::NoType => "Untyped / unknown",
            Self::Time => "Time axis",
            Self::Frequency => "Frequency axis",
            Self::Voltage => "Node voltage",
            Self::Current => "Branch current",
            Self::VoltageDensity => "Voltage noise spectral density",
            Self::CurrentDensity => "Current noise spectral density",
            Self::SqrVoltageDensity => "Squared voltage noise density",
            Self::SqrCurrentDensity => "Squared current noise density",
            Self::SqrVoltage => "Squared voltage",
            Self::SqrCurrent => "Squared current",
            Self::Pole => "Pole location",
            Self::Zero => "Zero location",
            Self::SParam => "Scattering parameter",
            Self::Temperature => "Device/circuit temperature",
            Self::Resistance => "Resistance",
            Self::Impedance => "Impedance",
            Self::Admittance => "Admittance",
            Self::Power => "Power",
            Self::Phase => "Phase angle",
            Self::DecibelMagnitude => "Magnitude in dB",
            Self::Capacitance => "Capacitance",
            Self::Charge => "Charge",
        }
    }

    /// Unit symbol for values of this kind. Empty for dimensionless kinds.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::NoType | Self::Pole | Self::Zero | Self::SParam => "",
            Self::Time => "s",
            Self::Frequency => "Hz",
            Self::Voltage => "V",
            Self::Current => "A",
            Self::VoltageDensity => "V/sqrt(Hz)",
            Self::CurrentDensity => "A/sqrt(Hz)",
            Self::SqrVoltageDensity => "V^2/Hz",
            Self::SqrCurrentDensity => "A^2/Hz",
            Self::SqrVoltage => "V^2",
            Self::SqrCurrent => "A^2",
            Self::Temperature => "Celsius",
            Self::Resistance | Self::Impedance => "Ohm",
            Self::Admittance => "S",
            Self::Power => "W",
            Self::Phase => "deg",
            Self::DecibelMagnitude => "dB",
            Self::Capacitance => "F",
            Self::Charge => "C",
        }
    }

    /// Whether vectors of this kind can be a sweep axis.
    #[inline]
    pub const fn is_axis(self) -> bool {
        matches!(self, Self::Time | Self::Frequency)
    }
}

impl TryFrom<i32> for SignalKind {
    type Error = UnknownSignalKind;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl From<SignalKind> for i32 {
    fn from(kind: SignalKind) -> Self {
        kind.to_raw()
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignalKind {
    type Err = ParseSignalKindError;

    /// Accepts either the label (`Voltage`) or the native constant
    /// (`SV_VOLTAGE`), ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s) || k.native_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSignalKindError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Every variant paired with its documented tag. The match has no
    /// wildcard arm, so adding a variant without a row here fails to compile.
    fn documented_tag(kind: SignalKind) -> i32 {
        match kind {
            SignalKind::NoType => 0,
            SignalKind::Time => 1,
            SignalKind::Frequency => 2,
            SignalKind::Voltage => 3,
            SignalKind::Current => 4,
            SignalKind::VoltageDensity => 5,
            SignalKind::CurrentDensity => 6,
            SignalKind::SqrVoltageDensity => 7,
            SignalKind::SqrCurrentDensity => 8,
            SignalKind::SqrVoltage => 9,
            SignalKind::SqrCurrent => 10,
            SignalKind::Pole => 11,
            SignalKind::Zero => 12,
            SignalKind::SParam => 13,
            SignalKind::Temperature => 14,
            SignalKind::Resistance => 15,
            SignalKind::Impedance => 16,
            SignalKind::Admittance => 17,
            SignalKind::Power => 18,
            SignalKind::Phase => 19,
            SignalKind::DecibelMagnitude => 20,
            SignalKind::Capacitance => 21,
            SignalKind::Charge => 22,
        }
    }

    #[test]
    fn test_known_range_round_trips() {
        for v in 0..=22 {
            let kind = SignalKind::from_raw(v).unwrap();
            assert_eq!(kind.to_raw(), v);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        for v in [-1, 23, 1000, i32::MIN, i32::MAX] {
            assert_eq!(SignalKind::from_raw(v), Err(UnknownSignalKind { value: v }));
        }
    }

    #[test]
    fn test_all_matches_documented_tags() {
        for (i, kind) in SignalKind::ALL.iter().enumerate() {
            assert_eq!(kind.to_raw(), i as i32, "{kind} out of place in ALL");
            assert_eq!(documented_tag(*kind), kind.to_raw());
        }
    }

    #[test]
    fn test_to_raw_is_injective() {
        let raws: HashSet<i32> = SignalKind::ALL.iter().map(|k| k.to_raw()).collect();
        assert_eq!(raws.len(), SignalKind::ALL.len());
    }

    #[test]
    fn test_native_names_match_header_order() {
        // Order of `enum simulation_types` in ngspice's sim.h.
        let header = [
            "SV_NOTYPE",
            "SV_TIME",
            "SV_FREQUENCY",
            "SV_VOLTAGE",
            "SV_CURRENT",
            "SV_VOLTAGE_DENSITY",
            "SV_CURRENT_DENSITY",
            "SV_SQR_VOLTAGE_DENSITY",
            "SV_SQR_CURRENT_DENSITY",
            "SV_SQR_VOLTAGE",
            "SV_SQR_CURRENT",
            "SV_POLE",
            "SV_ZERO",
            "SV_SPARAM",
            "SV_TEMP",
            "SV_RES",
            "SV_IMPEDANCE",
            "SV_ADMITTANCE",
            "SV_POWER",
            "SV_PHASE",
            "SV_DB",
            "SV_CAPACITANCE",
            "SV_CHARGE",
        ];
        let names: Vec<_> = SignalKind::ALL.iter().map(|k| k.native_name()).collect();
        assert_eq!(names, header);
    }

    #[test]
    fn test_from_str_accepts_label_and_constant() {
        assert_eq!("Voltage".parse::<SignalKind>().unwrap(), SignalKind::Voltage);
        assert_eq!("sv_db".parse::<SignalKind>().unwrap(), SignalKind::DecibelMagnitude);
        assert_eq!(" power ".parse::<SignalKind>().unwrap(), SignalKind::Power);
        assert!("volts".parse::<SignalKind>().is_err());
    }

    #[test]
    fn test_axis_kinds() {
        let axes: Vec<_> = SignalKind::ALL.iter().filter(|k| k.is_axis()).collect();
        assert_eq!(axes, [&SignalKind::Time, &SignalKind::Frequency]);
    }

    #[test]
    fn test_serde_uses_variant_label() {
        let json = serde_json::to_string(&SignalKind::SqrCurrentDensity).unwrap();
        assert_eq!(json, "\"SqrCurrentDensity\"");
        let back: SignalKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SignalKind::SqrCurrentDensity);
    }
}
