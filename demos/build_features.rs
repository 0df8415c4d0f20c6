//! Example: Build reference feature records for a set of takes in parallel
//!
//! Usage:
//!   cargo run --release --example build_features -- [--jobs N] [--out DIR] [--key KEY] <file1> <file2> ...
//!
//! Each take is written to `<DIR>/<stem>.json` (default DIR: current
//! directory). Parallelism is across files; each take is analysed on one
//! thread.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tonal_dsp::io::decoder::decode_audio_at;
use tonal_dsp::io::reference::save_reference;
use tonal_dsp::{build_reference_feature, AnalysisConfig, AnalysisError, MfccConfig, ReferenceIds};

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn build_one(
    path: &Path,
    out_dir: &Path,
    key: &str,
    config: &AnalysisConfig,
    mfcc: &MfccConfig,
) -> Result<(PathBuf, usize), AnalysisError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AnalysisError::InvalidInput(format!("{}: no file name", path.display())))?;

    let audio = decode_audio_at(path, config.target_sample_rate)?;
    let ids = ReferenceIds {
        id: stem.to_string(),
        key: key.to_string(),
        audio_id: format!("{}-{}", key, stem),
    };
    let reference = build_reference_feature(&audio.samples, audio.sample_rate, ids, config, mfcc)?;

    let out = out_dir.join(format!("{}.json", stem));
    save_reference(&out, &reference)?;
    Ok((out, reference.f0_log.len()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut jobs: Option<usize> = None;
    let mut out_dir = PathBuf::from(".");
    let mut key = String::from("ref");
    let mut paths: Vec<PathBuf> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--jobs" => {
                let v = args.first().ok_or("--jobs requires a value")?.parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--out" => {
                out_dir = PathBuf::from(args.first().ok_or("--out requires a directory")?);
                args.remove(0);
            }
            "--key" => {
                key = args.first().cloned().ok_or("--key requires a value")?;
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: build_features [--jobs N] [--out DIR] [--key KEY] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --out DIR  Output directory (default: .)\n\
                     --key KEY  Item key stored in every record (default: ref)\n"
                );
                return Ok(());
            }
            _ => paths.push(PathBuf::from(a)),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }
    std::fs::create_dir_all(&out_dir)?;

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Building {} reference(s), jobs={}", paths.len(), jobs);

    // Reference data is always built with prior shaping on
    let config = AnalysisConfig::default();
    let mfcc = MfccConfig::default();

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let outs: Vec<(PathBuf, Result<(PathBuf, usize), AnalysisError>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| (path.clone(), build_one(path, &out_dir, &key, &config, &mfcc)))
            .collect()
    });

    let mut ok = 0;
    for (idx, (path, out)) in outs.iter().enumerate() {
        match out {
            Ok((written, frames)) => {
                ok += 1;
                println!(
                    "[{}/{}] {} -> {} ({} frames)",
                    idx + 1,
                    outs.len(),
                    path.display(),
                    written.display(),
                    frames
                );
            }
            Err(e) => println!("[{}/{}] {}: ERROR: {}", idx + 1, outs.len(), path.display(), e),
        }
    }

    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}
