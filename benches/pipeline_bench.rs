//! Performance benchmarks for contour analysis and alignment

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tonal_dsp::features::mfcc::{frame_geometry, MfccExtractor};
use tonal_dsp::{analyze, dtw_align, AnalysisConfig, MfccConfig};

const SR: u32 = 16000;

/// 3 s glide from 120 to 240 Hz at 16 kHz
fn glide() -> Vec<f32> {
    let n = SR as usize * 3;
    let mut phase = 0.0f32;
    (0..n)
        .map(|i| {
            let f = 120.0 + 120.0 * i as f32 / n as f32;
            phase += 2.0 * std::f32::consts::PI * f / SR as f32;
            0.5 * phase.sin()
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let samples = glide();
    let default = AnalysisConfig::default();
    let threshold = AnalysisConfig {
        dp_enabled: false,
        ..AnalysisConfig::default()
    };

    c.bench_function("analyze_viterbi_3s", |b| {
        b.iter(|| analyze(black_box(&samples), black_box(SR), black_box(&default)));
    });
    c.bench_function("analyze_threshold_3s", |b| {
        b.iter(|| analyze(black_box(&samples), black_box(SR), black_box(&threshold)));
    });
}

fn bench_mfcc(c: &mut Criterion) {
    let samples = glide();
    let (frame, hop) = frame_geometry(SR, 100.0, 4.0).expect("valid MFCC geometry");
    let extractor = MfccExtractor::new(SR, frame, hop, &MfccConfig::default()).expect("valid MFCC setup");

    c.bench_function("mfcc_3s", |b| {
        b.iter(|| extractor.extract(black_box(&samples)));
    });
}

fn bench_dtw(c: &mut Criterion) {
    let a: Vec<f32> = (0..750).map(|i| 5.0 + (i as f32 * 0.02).sin() * 0.3).collect();
    let b: Vec<f32> = (0..700).map(|i| 5.0 + (i as f32 * 0.021).sin() * 0.3).collect();

    c.bench_function("dtw_band_750x700", |bench| {
        bench.iter(|| dtw_align(black_box(&a), black_box(&b), 0.15, 1.0));
    });
}

criterion_group!(benches, bench_analyze, bench_mfcc, bench_dtw);
criterion_main!(benches);
