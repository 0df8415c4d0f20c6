//! # Tonal DSP
//!
//! Pitch-contour extraction and comparison for tone and intonation practice:
//! a recording's fundamental-frequency (F0) contour is tracked, stabilised
//! and smoothed, then aligned against a reference take and scored.
//!
//! ## Features
//!
//! - **Pitch tracking**: YIN candidates with a Viterbi path over voiced and unvoiced states
//! - **Post-filtering**: NaN-aware median, short-gap interpolation and smoothing
//! - **MFCC**: spectral envelope frames for robust time alignment
//! - **Banded DTW**: scalar and feature-vector alignment with bounded memory
//! - **Scoring**: correlation, RMSE, slope agreement and pitch-peak timing
//!
//! ## Quick Start
//!
//! ```no_run
//! use tonal_dsp::{analyze, AnalysisConfig};
//!
//! // Mono f32 PCM at a known sample rate
//! let samples: Vec<f32> = vec![];
//! let result = analyze(&samples, 16000, &AnalysisConfig::default())?;
//!
//! for (t, f0) in result.times.iter().zip(result.f0_hz()) {
//!     println!("{:.3}s  {:.1} Hz", t, f0);
//! }
//! # Ok::<(), tonal_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PCM → Trim → YIN candidates → Viterbi → Post-filter → F0Result
//! PCM → MFCC → Banded DTW (vs reference) → Projection + Scoring → ComparisonResult
//! ```
//!
//! Unvoiced frames are NaN in every contour. No function here panics or fails
//! on silent, short or degenerate audio; errors are reserved for invalid
//! parameters and I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alignment;
pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;

// Re-export main types
pub use alignment::{AlignmentPath, DtwResult};
pub use analysis::pipeline::{analyze_recording, compare_with_reference, ComparisonReport, RecordingAnalysis};
pub use analysis::reference::{build_reference_feature, ReferenceIds};
pub use analysis::result::{ComparisonResult, F0Result, ReferenceFeature};
pub use config::{AnalysisConfig, CompareConfig, MfccConfig};
pub use error::AnalysisError;
pub use features::mfcc::FeatureSequence;

use features::pitch::postfilter::PostFilter;

/// Main analysis function
///
/// Extracts the stabilised log-F0 contour of a mono recording.
///
/// # Arguments
///
/// * `samples` - Mono PCM samples (no silence trimming is applied here)
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `F0Result` with one frame per hop. Frames are only produced for complete
/// analysis windows, so empty or very short input yields an empty contour.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `sample_rate` is 0 or the
/// configuration fails [`AnalysisConfig::validate`].
///
/// # Example
///
/// ```
/// use tonal_dsp::{analyze, AnalysisConfig};
///
/// let silence = vec![0.0f32; 16000];
/// let result = analyze(&silence, 16000, &AnalysisConfig::default())?;
/// assert!(result.f0_log.iter().all(|v| v.is_nan()));
/// # Ok::<(), tonal_dsp::AnalysisError>(())
/// ```
pub fn analyze(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<F0Result, AnalysisError> {
    config.validate(sample_rate)?;
    log::debug!(
        "Starting contour analysis: {} samples at {} Hz (dp={}, shaping={})",
        samples.len(),
        sample_rate,
        config.dp_enabled,
        config.prior_shaping
    );

    let hop = config.hop_samples(sample_rate);
    let duration = samples.len() as f32 / sample_rate as f32;
    if samples.len() < config.frame_size(sample_rate) {
        log::warn!(
            "{} samples is shorter than one analysis frame ({}); no frames",
            samples.len(),
            config.frame_size(sample_rate)
        );
    }

    let raw = features::pitch::track_log_f0(samples, sample_rate, config);
    let f0_log = PostFilter::from_config(config, sample_rate).apply(&raw);
    let times = (0..f0_log.len())
        .map(|i| ((i * hop) as f64 / sample_rate as f64) as f32)
        .collect();

    Ok(F0Result {
        sample_rate,
        duration,
        times,
        f0_log,
    })
}

/// Align two scalar contours with banded DTW
///
/// Thin wrapper over [`alignment::dtw::dtw_band`]. An empty input or an
/// unreachable end cell yields infinite cost and an empty path.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `band_ratio` is not finite.
pub fn dtw_align(a: &[f32], b: &[f32], band_ratio: f32, nan_cost: f32) -> Result<DtwResult, AnalysisError> {
    alignment::dtw::dtw_band(a, b, band_ratio, nan_cost)
}

/// Score a user contour against a reference along a DTW path
///
/// See [`alignment::scoring::evaluate`].
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if a contour and its times differ in length.
pub fn evaluate(
    reference: &[f32],
    user: &[f32],
    ref_times: &[f32],
    user_times: &[f32],
    path: &[(usize, usize)],
) -> Result<ComparisonResult, AnalysisError> {
    alignment::scoring::evaluate(reference, user, ref_times, user_times, path)
}
