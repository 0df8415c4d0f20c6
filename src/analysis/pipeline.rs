//! Recording and comparison pipelines
//!
//! The interactive flow for one user attempt:
//!
//! 1. [`analyze_recording`]: trim leading/trailing silence, then extract the
//!    stabilised log-F0 contour of what remains
//! 2. [`compare_with_reference`]: MFCC frames of the same trimmed PCM are
//!    aligned against the reference's stored frames; the path drives the
//!    projection of the reference contour and the similarity scores
//!
//! Alignment failure is an outcome, not an error: the report then carries an
//! empty path, an all-NaN projection and no scores.

use std::ops::Range;
use std::time::Instant;

use super::metadata::{AnalysisFlag, AnalysisMetadata, MOSTLY_UNVOICED_RATIO};
use super::result::{ComparisonResult, F0Result, ReferenceFeature};
use crate::alignment::dtw::dtw_band_features;
use crate::alignment::projection::project_reference;
use crate::alignment::scoring::evaluate;
use crate::alignment::DtwResult;
use crate::config::{AnalysisConfig, CompareConfig};
use crate::error::AnalysisError;
use crate::features::mfcc::{frame_geometry, MfccExtractor};
use crate::preprocessing::normalization::normalize_log_f0;
use crate::preprocessing::silence::SilenceTrimmer;

/// Contour of a trimmed recording
#[derive(Debug, Clone)]
pub struct RecordingAnalysis {
    /// Log-F0 contour of the trimmed PCM
    pub contour: F0Result,

    /// Sample range of the input that was analysed
    pub trimmed_range: Range<usize>,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

impl RecordingAnalysis {
    /// The analysed part of `samples` (the same buffer passed to [`analyze_recording`])
    pub fn trimmed<'a>(&self, samples: &'a [f32]) -> &'a [f32] {
        let end = self.trimmed_range.end.min(samples.len());
        let start = self.trimmed_range.start.min(end);
        &samples[start..end]
    }
}

/// Outcome of comparing one recording against a reference
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    /// Feature alignment; reference frames are the path's first index
    pub alignment: DtwResult,

    /// Reference contour resampled onto the user's frames
    pub aligned_reference: F0Result,

    /// Similarity scores; `None` when alignment failed
    pub scores: Option<ComparisonResult>,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

/// Trim a recording and extract its contour
///
/// # Arguments
///
/// * `samples` - Mono PCM of the whole recording
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Analysis configuration (trim and tracker parameters)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `config` fails validation.
pub fn analyze_recording(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<RecordingAnalysis, AnalysisError> {
    let start_time = Instant::now();
    config.validate(sample_rate)?;
    log::debug!(
        "Analyzing recording: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    let mut metadata = AnalysisMetadata::for_config(config);
    let trimmed_range = SilenceTrimmer::from(config).trim_range(samples, sample_rate);
    if trimmed_range.len() == samples.len() {
        metadata.flag(AnalysisFlag::TrimSkipped);
    }

    let contour = crate::analyze(&samples[trimmed_range.clone()], sample_rate, config)?;
    if contour.is_empty() {
        metadata.flag(AnalysisFlag::ShortInput);
    }
    if contour.voiced_ratio() < MOSTLY_UNVOICED_RATIO {
        metadata.flag(AnalysisFlag::MostlyUnvoiced);
    }

    metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;
    log::debug!(
        "Recording analysed: {} frames, {:.0}% voiced, {:.1} ms",
        contour.len(),
        contour.voiced_ratio() * 100.0,
        metadata.processing_time_ms
    );

    Ok(RecordingAnalysis {
        contour,
        trimmed_range,
        metadata,
    })
}

/// Compare a user recording with a precomputed reference
///
/// User MFCC frames are extracted with the reference's window, hop and MFCC
/// parameters and aligned against the stored reference frames. The path then
/// maps both log-F0 contours for scoring (z-scored first when
/// `compare.normalize_contours` is set).
///
/// # Arguments
///
/// * `user_samples` - PCM the user contour was extracted from (already trimmed)
/// * `sample_rate` - Sample rate of `user_samples`
/// * `user` - User contour from [`crate::analyze`] or [`analyze_recording`]
/// * `reference` - Reference features built offline
/// * `compare` - Alignment parameters
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the sample rates differ, the
/// reference geometry is invalid, its features have inconsistent dimensions,
/// or a contour and its time array differ in length.
pub fn compare_with_reference(
    user_samples: &[f32],
    sample_rate: u32,
    user: &F0Result,
    reference: &ReferenceFeature,
    compare: &CompareConfig,
) -> Result<ComparisonReport, AnalysisError> {
    let start_time = Instant::now();
    if sample_rate != reference.sample_rate {
        return Err(AnalysisError::InvalidInput(format!(
            "Sample rate mismatch: recording at {} Hz, reference at {} Hz",
            sample_rate, reference.sample_rate
        )));
    }
    log::debug!(
        "Comparing {} user samples against reference {} ({} feature frames)",
        user_samples.len(),
        reference.audio_id,
        reference.features.len()
    );

    let (frame_size, hop) = frame_geometry(sample_rate, reference.window_ms, reference.hop_ms)?;
    let user_features = MfccExtractor::new(sample_rate, frame_size, hop, &reference.mfcc)?
        .extract(user_samples);
    let alignment = dtw_band_features(&reference.features, &user_features.features, compare.band_ratio)?;

    let mut metadata = AnalysisMetadata::default();
    let ref_contour = reference.contour();
    let aligned_reference = F0Result {
        sample_rate: user.sample_rate,
        duration: user.duration,
        times: user.times.clone(),
        f0_log: project_reference(&ref_contour.f0_log, user.len(), &alignment.path),
    };

    let scores = if alignment.is_aligned() {
        let (ref_log, user_log) = if compare.normalize_contours {
            (normalize_log_f0(&ref_contour.f0_log), normalize_log_f0(&user.f0_log))
        } else {
            (ref_contour.f0_log.clone(), user.f0_log.clone())
        };
        Some(evaluate(
            &ref_log,
            &user_log,
            &ref_contour.times,
            &user.times,
            &alignment.path,
        )?)
    } else {
        log::warn!(
            "Alignment against reference {} failed; no scores",
            reference.audio_id
        );
        metadata.flag(AnalysisFlag::AlignmentFailed);
        None
    };

    metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;
    Ok(ComparisonReport {
        alignment,
        aligned_reference,
        scores,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::reference::{build_reference_feature, ReferenceIds};
    use crate::config::MfccConfig;

    fn glide(f_start: f64, f_end: f64, seconds: f64, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f64) as usize;
        let mut phase = 0.0f64;
        (0..n)
            .map(|i| {
                let f = f_start + (f_end - f_start) * i as f64 / n as f64;
                phase += 2.0 * std::f64::consts::PI * f / sample_rate as f64;
                (0.5 * phase.sin()) as f32
            })
            .collect()
    }

    fn ids() -> ReferenceIds {
        ReferenceIds {
            id: "glide".to_string(),
            key: "rise".to_string(),
            audio_id: "glide-1".to_string(),
        }
    }

    #[test]
    fn test_analyze_recording_trims_silence() {
        let sr = 16000;
        let mut samples = vec![0.0f32; 8000];
        samples.extend(glide(150.0, 220.0, 0.5, sr));
        samples.extend(vec![0.0f32; 8000]);

        let analysis = analyze_recording(&samples, sr, &AnalysisConfig::interactive()).unwrap();
        assert!(analysis.trimmed_range.start > 4000);
        assert!(analysis.trimmed_range.end < samples.len() - 4000);
        assert!(!analysis.metadata.flags.contains(&AnalysisFlag::TrimSkipped));
        assert!(analysis.contour.voiced_ratio() > 0.8);
        assert_eq!(analysis.trimmed(&samples).len(), analysis.trimmed_range.len());
    }

    #[test]
    fn test_analyze_recording_flags_silence() {
        let samples = vec![0.0f32; 16000];
        let analysis = analyze_recording(&samples, 16000, &AnalysisConfig::default()).unwrap();
        assert!(analysis.metadata.flags.contains(&AnalysisFlag::TrimSkipped));
        assert!(analysis.metadata.flags.contains(&AnalysisFlag::MostlyUnvoiced));
    }

    #[test]
    fn test_compare_against_own_reference() {
        let sr = 16000;
        let samples = glide(140.0, 240.0, 0.8, sr);
        let config = AnalysisConfig::default();
        let reference =
            build_reference_feature(&samples, sr, ids(), &config, &MfccConfig::default()).unwrap();

        let user = crate::analyze(&samples, sr, &config).unwrap();
        let report =
            compare_with_reference(&samples, sr, &user, &reference, &CompareConfig::default()).unwrap();

        assert!(report.alignment.is_aligned());
        let scores = report.scores.expect("identical input must align");
        assert!(scores.corr > 0.99, "corr {}", scores.corr);
        assert!(scores.rmse < 1e-3, "rmse {}", scores.rmse);
        assert!(scores.peak_shift_ms.abs() < 1e-3);
        assert_eq!(report.aligned_reference.len(), user.len());
    }

    #[test]
    fn test_compare_empty_recording_reports_failure() {
        let sr = 16000;
        let samples = glide(140.0, 240.0, 0.5, sr);
        let config = AnalysisConfig::default();
        let reference =
            build_reference_feature(&samples, sr, ids(), &config, &MfccConfig::default()).unwrap();

        let user = crate::analyze(&[], sr, &config).unwrap();
        let report = compare_with_reference(&[], sr, &user, &reference, &CompareConfig::default()).unwrap();
        assert!(report.scores.is_none());
        assert!(report.alignment.path.is_empty());
        assert!(report.metadata.flags.contains(&AnalysisFlag::AlignmentFailed));
    }

    #[test]
    fn test_compare_rejects_oversized_reference_window() {
        let samples = glide(140.0, 240.0, 0.5, 16000);
        let config = AnalysisConfig::default();
        let mut reference =
            build_reference_feature(&samples, 16000, ids(), &config, &MfccConfig::default()).unwrap();
        let user = crate::analyze(&samples, 16000, &config).unwrap();

        reference.window_ms = 1e30;
        let err = compare_with_reference(&samples, 16000, &user, &reference, &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)), "{:?}", err);

        reference.window_ms = 100.0;
        reference.hop_ms = 0.0;
        assert!(compare_with_reference(&samples, 16000, &user, &reference, &CompareConfig::default()).is_err());
    }

    #[test]
    fn test_compare_rejects_sample_rate_mismatch() {
        let samples = glide(140.0, 240.0, 0.5, 16000);
        let config = AnalysisConfig::default();
        let reference =
            build_reference_feature(&samples, 16000, ids(), &config, &MfccConfig::default()).unwrap();
        let user = crate::analyze(&samples, 16000, &config).unwrap();
        assert!(compare_with_reference(&samples, 8000, &user, &reference, &CompareConfig::default()).is_err());
    }
}
