//! Result output formatting and writing.

use crate::orchestrator::RunResults;
use crate::OutputFormat;
use anyhow::Result;
use lib_types::{Plot, ResultVector, SignalKind, VectorValues};
use std::io::Write;
use std::path::Path;

/// Write run results to the output directory.
pub fn write_results(results: &RunResults, output_dir: &Path, format: OutputFormat, engine_log: bool) -> Result<()> {
    let plot = &results.simulation.plot;

    let ext = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
    };
    let vectors_path = output_dir.join(format!("vectors.{ext}"));
    let mut f = std::fs::File::create(&vectors_path)?;
    write_vectors(&mut f, plot, format)?;
    tracing::info!("Wrote {} vectors to {:?}", plot.len(), vectors_path);

    if engine_log {
        let log_path = output_dir.join("ngspice.log");
        let mut f = std::fs::File::create(&log_path)?;
        writeln!(f, "=== stdout ===")?;
        f.write_all(results.simulation.stdout.as_bytes())?;
        writeln!(f, "=== stderr ===")?;
        f.write_all(results.simulation.stderr.as_bytes())?;
        tracing::info!("Wrote engine log to {:?}", log_path);
    }

    let summary_path = output_dir.join("summary.txt");
    let mut f = std::fs::File::create(&summary_path)?;
    write_summary(&mut f, results)?;
    tracing::info!("Wrote summary to {:?}", summary_path);

    Ok(())
}

/// Write every vector of a plot in the given format.
pub fn write_vectors<W: Write>(w: &mut W, plot: &Plot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "Plot: {}", plot.name)?;
            writeln!(w, "{:<20} {:<18} {:>4} {:<10} {:>8} {:<8}", "vector", "kind", "raw", "unit", "points", "format")?;
            for v in plot.vectors.values() {
                writeln!(
                    w,
                    "{:<20} {:<18} {:>4} {:<10} {:>8} {:<8}",
                    v.name,
                    v.kind_label(),
                    v.raw_kind,
                    v.unit(),
                    v.len(),
                    if v.values.is_complex() { "complex" } else { "real" }
                )?;
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(plot)?)?;
        }
        OutputFormat::Csv => {
            let columns: Vec<&ResultVector> = plot.vectors.values().collect();

            let mut header = Vec::new();
            for v in &columns {
                let label = format!("{} [{}={}]", v.name, v.kind_label(), v.raw_kind);
                if v.values.is_complex() {
                    header.push(format!("{label}.re"));
                    header.push(format!("{label}.im"));
                } else {
                    header.push(label);
                }
            }
            writeln!(w, "{}", header.join(","))?;

            let rows = columns.iter().map(|v| v.len()).max().unwrap_or(0);
            for i in 0..rows {
                let mut cells = Vec::with_capacity(header.len());
                for v in &columns {
                    match &v.values {
                        VectorValues::Real(data) => {
                            cells.push(data.get(i).map(f64::to_string).unwrap_or_default());
                        }
                        VectorValues::Complex(data) => {
                            let c = data.get(i);
                            cells.push(c.map(|c| c.re.to_string()).unwrap_or_default());
                            cells.push(c.map(|c| c.im.to_string()).unwrap_or_default());
                        }
                    }
                }
                writeln!(w, "{}", cells.join(","))?;
            }
        }
    }
    Ok(())
}

/// Write the run summary.
pub fn write_summary<W: Write>(w: &mut W, results: &RunResults) -> Result<()> {
    let plot = &results.simulation.plot;

    writeln!(w, "ngspice Run Summary")?;
    writeln!(w, "===================")?;
    writeln!(w)?;
    writeln!(w, "Run:      {}", results.name)?;
    writeln!(w, "Command:  {}", results.command)?;
    writeln!(w, "Plot:     {}", plot.name)?;
    writeln!(w, "Vectors:  {}", plot.len())?;
    writeln!(w, "Kinds validated against {}", SignalKind::NATIVE_VERSION)?;

    if let Some(scale) = plot.scale() {
        if let Some((start, end)) = scale.time_span() {
            writeln!(w, "Time:     {:.6} ms .. {:.6} ms", start.as_ms(), end.as_ms())?;
        } else if let Some((lo, hi)) = scale.frequency_span() {
            writeln!(w, "Freq:     {:.3} kHz .. {:.3} kHz", lo.as_khz(), hi.as_khz())?;
        }
    }

    let finals: Vec<String> = plot
        .vectors
        .values()
        .filter_map(|v| {
            if let Some(volts) = v.as_volts() {
                volts.last().map(|x| format!("  {:<20} {:.6} V", v.name, x.0))
            } else {
                v.as_amperes()?
                    .last()
                    .map(|x| format!("  {:<20} {:.6} mA", v.name, x.as_ma()))
            }
        })
        .collect();
    if !finals.is_empty() {
        writeln!(w)?;
        writeln!(w, "Final values:")?;
        for line in finals {
            writeln!(w, "{}", line)?;
        }
    }

    writeln!(w)?;
    writeln!(w, "By kind:")?;
    for (kind, count) in plot.kind_histogram() {
        writeln!(w, "  {:<20} {}", kind, count)?;
    }

    let unknown: Vec<_> = plot.unknown().collect();
    if !unknown.is_empty() {
        writeln!(w)?;
        writeln!(w, "WARNING: {} vector(s) carry type tags unknown to this build:", unknown.len())?;
        for v in unknown {
            writeln!(w, "  {} (raw {})", v.name, v.raw_kind)?;
        }
    }

    if !results.missing_vectors.is_empty() {
        writeln!(w)?;
        writeln!(w, "Requested but missing: {}", results.missing_vectors.join(", "))?;
    }

    Ok(())
}

/// Write the signal-kind registry.
pub fn write_kinds<W: Write>(w: &mut W, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "Signal kinds (validated against {})", SignalKind::NATIVE_VERSION)?;
            writeln!(w, "{:>3}  {:<18} {:<24} {:<11} {}", "raw", "name", "native", "unit", "meaning")?;
            for k in SignalKind::ALL {
                writeln!(
                    w,
                    "{:>3}  {:<18} {:<24} {:<11} {}",
                    k.to_raw(),
                    k.name(),
                    k.native_name(),
                    k.unit(),
                    k.meaning()
                )?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = SignalKind::ALL
                .iter()
                .map(|k| {
                    serde_json::json!({
                        "raw": k.to_raw(),
                        "name": k.name(),
                        "native": k.native_name(),
                        "unit": k.unit(),
                        "meaning": k.meaning(),
                    })
                })
                .collect();
            let doc = serde_json::json!({
                "validated_against": SignalKind::NATIVE_VERSION,
                "kinds": rows,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "raw,name,native,unit,meaning")?;
            for k in SignalKind::ALL {
                writeln!(w, "{},{},{},{},{}", k.to_raw(), k.name(), k.native_name(), k.unit(), k.meaning())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::{Complex64, Simulation};

    fn ac_plot() -> Plot {
        let mut plot = Plot::new("ac1");
        plot.insert(ResultVector::new(
            "frequency",
            SignalKind::Frequency,
            VectorValues::Complex(vec![Complex64::new(1.0, 0.0), Complex64::new(10.0, 0.0)]),
        ));
        plot.insert(ResultVector::new(
            "out",
            SignalKind::Voltage,
            VectorValues::Complex(vec![Complex64::new(1.0, -0.1), Complex64::new(0.5, -0.4)]),
        ));
        plot.insert(ResultVector::from_raw_tag("odd", 31, VectorValues::Real(vec![7.0])));
        plot
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv_vectors_label_kinds() {
        let plot = ac_plot();
        let csv = render(|w| write_vectors(w, &plot, OutputFormat::Csv));
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "frequency [Frequency=2].re,frequency [Frequency=2].im,odd [Unknown(31)=31],out [Voltage=3].re,out [Voltage=3].im"
        );
        assert_eq!(lines.next().unwrap(), "1,0,7,1,-0.1");
        assert_eq!(lines.next().unwrap(), "10,0,,0.5,-0.4");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_json_vectors_keep_raw_tag() {
        let plot = ac_plot();
        let json = render(|w| write_vectors(w, &plot, OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["vectors"]["out"]["kind"], "Voltage");
        assert_eq!(value["vectors"]["out"]["raw_kind"], 3);
        assert!(value["vectors"]["odd"]["kind"].is_null());
        assert_eq!(value["vectors"]["odd"]["raw_kind"], 31);
    }

    #[test]
    fn test_kinds_table_formats() {
        let csv = render(|w| write_kinds(w, OutputFormat::Csv));
        assert_eq!(csv.lines().count(), 24);
        assert_eq!(csv.lines().nth(4).unwrap(), "3,Voltage,SV_VOLTAGE,V,Node voltage");

        let json = render(|w| write_kinds(w, OutputFormat::Json));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["validated_against"], "ngspice-27");
        assert_eq!(value["kinds"][18]["name"], "Power");

        let text = render(|w| write_kinds(w, OutputFormat::Text));
        assert!(text.contains("SV_CHARGE"));
    }

    #[test]
    fn test_summary_flags_unknown_kinds() {
        let results = RunResults {
            name: "rc".to_string(),
            command: "ac dec 10 1 10".to_string(),
            simulation: Simulation {
                plot: ac_plot(),
                ..Default::default()
            },
            missing_vectors: vec!["v(in)".to_string()],
        };
        let text = render(|w| write_summary(w, &results));

        assert!(text.contains("Freq:     0.001 kHz .. 0.010 kHz"));
        assert!(text.contains("odd (raw 31)"));
        assert!(text.contains("Requested but missing: v(in)"));
        // complex voltages have no real final value
        assert!(!text.contains("Final values:"));
    }

    #[test]
    fn test_summary_final_values() {
        let mut plot = Plot::new("tran1");
        plot.insert(ResultVector::new(
            "time",
            SignalKind::Time,
            VectorValues::Real(vec![0.0, 1e-3]),
        ));
        plot.insert(ResultVector::new(
            "v(out)",
            SignalKind::Voltage,
            VectorValues::Real(vec![0.0, 2.5]),
        ));
        plot.insert(ResultVector::new(
            "v1#branch",
            SignalKind::Current,
            VectorValues::Real(vec![0.0, -2.5e-3]),
        ));
        let results = RunResults {
            name: "divider".to_string(),
            command: "tran 1m 1m".to_string(),
            simulation: Simulation {
                plot,
                ..Default::default()
            },
            missing_vectors: Vec::new(),
        };
        let text = render(|w| write_summary(w, &results));

        assert!(text.contains("Time:     0.000000 ms .. 1.000000 ms"));
        assert!(text.contains("Final values:"));
        assert!(text.contains("v(out)               2.500000 V"));
        assert!(text.contains("v1#branch            -2.500000 mA"));
    }
}
