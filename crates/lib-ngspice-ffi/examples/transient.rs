//! Transient run of a resistor divider.
//!
//! Requires the ngspice shared library. Point `NGSPICE_LIBRARY` at it if it
//! is not on the loader search path.

use lib_ngspice_ffi::{NgSpiceLibrary, NgSpiceSession};
use lib_types::SignalKind;

const DIVIDER: &str = ".title divider
V2 refv GND dc(3.3)
V1 vin GND sin(0 17.4 60)
R3 meas GND 10k
R1 vin meas 60.4k
R4 refv meas 10k
.end";

fn main() -> anyhow::Result<()> {
    let library = NgSpiceLibrary::load_default()?;
    let mut session = NgSpiceSession::new(library)?;

    let sim = session.simulate(DIVIDER, "tran 100u 0.17s")?;

    println!("=== Plot {} ===\n", sim.plot.name);
    for vector in sim.plot.vectors.values() {
        println!(
            "  {:<12} {:<10} raw={:<3} {} points",
            vector.name,
            vector.kind_label(),
            vector.raw_kind,
            vector.len()
        );
    }

    if let Some(meas) = sim.plot.get("meas").and_then(|v| v.as_volts()) {
        let peak = meas.iter().map(|v| v.0).fold(f64::MIN, f64::max);
        println!("\nPeak v(meas): {:.4} V", peak);
    }

    let voltages = sim.plot.of_kind(SignalKind::Voltage).count();
    println!("Voltage vectors: {}", voltages);
    Ok(())
}
