//! Example: Extract the pitch contour of one recording
//!
//! Usage:
//!   cargo run --release --example analyze_file -- [--interactive] [--json] [--reference ref.json] <file>
//!
//! The file must already be at the configured target rate (16 kHz by default).
//! With `--reference`, the recording is also aligned against a reference
//! record written by the `build_features` example and scored.

use std::env;

use tonal_dsp::io::decoder::decode_audio_at;
use tonal_dsp::io::reference::load_reference;
use tonal_dsp::{analyze_recording, compare_with_reference, AnalysisConfig, CompareConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut interactive = false;
    let mut reference_path: Option<String> = None;
    let mut path: Option<String> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--interactive" => interactive = true,
            "--reference" => {
                reference_path = Some(args.first().cloned().ok_or("--reference requires a path")?);
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_file [--interactive] [--json] [--reference ref.json] <file>\n\
                     \n\
                     --interactive   Skip prior shaping (live-recording preset)\n\
                     --json          Print the contour (and scores) as JSON\n\
                     --reference F   Compare against a reference record\n"
                );
                return Ok(());
            }
            _ => path = Some(a),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide an audio file path. Use --help for usage.");
        std::process::exit(2);
    };

    let config = if interactive {
        AnalysisConfig::interactive()
    } else {
        AnalysisConfig::default()
    };

    let audio = decode_audio_at(&path, config.target_sample_rate)?;
    let analysis = analyze_recording(&audio.samples, audio.sample_rate, &config)?;
    let contour = &analysis.contour;

    let report = match &reference_path {
        Some(reference_path) => {
            let reference = load_reference(reference_path)?;
            let report = compare_with_reference(
                analysis.trimmed(&audio.samples),
                audio.sample_rate,
                contour,
                &reference,
                &CompareConfig::default(),
            )?;
            Some(report)
        }
        None => None,
    };

    if json {
        let out = serde_json::json!({
            "file": path,
            "contour": contour,
            "metadata": analysis.metadata,
            "scores": report.as_ref().and_then(|r| r.scores),
        });
        println!("{}", serde_json::to_string(&out)?);
        return Ok(());
    }

    println!("Contour of {}:", path);
    println!("  Duration: {:.2} s (trimmed to {:.2} s)", audio.duration(), contour.duration);
    println!("  Frames: {} ({:.0}% voiced)", contour.len(), contour.voiced_ratio() * 100.0);
    println!("  Tracker: {:?}", analysis.metadata.tracker);
    println!("  Processing time: {:.2} ms", analysis.metadata.processing_time_ms);
    if !analysis.metadata.flags.is_empty() {
        println!("  Flags: {:?}", analysis.metadata.flags);
    }

    let voiced: Vec<f32> = contour.f0_hz().into_iter().filter(|v| v.is_finite()).collect();
    if !voiced.is_empty() {
        let min = voiced.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = voiced.iter().cloned().fold(0.0, f32::max);
        println!("  F0 range: {:.1} - {:.1} Hz", min, max);
    }

    if let Some(report) = report {
        match report.scores {
            Some(scores) => {
                println!("Comparison:");
                println!("  Correlation: {:.3}", scores.corr);
                println!("  RMSE (log-F0): {:.3}", scores.rmse);
                println!("  Slope match: {:.1}%", scores.slope_match * 100.0);
                println!("  Peak shift: {:.0} ms", scores.peak_shift_ms);
            }
            None => println!("Comparison: alignment failed"),
        }
    }

    Ok(())
}
