//! Configuration parameters for contour analysis

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Smallest analysis frame in samples (F0 and MFCC alike)
pub const MIN_FRAME_SIZE: usize = 64;

/// Largest analysis frame in samples (about 65 s at 16 kHz)
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// Analysis configuration parameters
///
/// Ranges mentioned below are the ones a UI would clamp to. They are advice,
/// not invariants: every stage still behaves sanely outside them (a filter
/// window of 1 is the identity, a gap fill of 0 ms disables filling, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Sample rate the offline tools decode at (default: 16000 Hz)
    pub target_sample_rate: u32,

    // Framing
    /// Hop between analysis frames in milliseconds (default: 4.0)
    pub hop_ms: f32,

    /// Analysis window in milliseconds, rounded up to a power of two in samples (default: 100.0)
    ///
    /// The frame is at least [`MIN_FRAME_SIZE`] and at most [`MAX_FRAME_SIZE`]
    /// samples; contour and MFCC frames always share this size.
    pub window_ms: f32,

    // Pitch band
    /// Lowest pitch considered (default: 70 Hz)
    pub f_min_hz: f32,

    /// Highest pitch considered (default: 500 Hz)
    pub f_max_hz: f32,

    /// CMND threshold for the threshold tracker (default: 0.12, typical 0.08-0.18)
    pub yin_threshold: f32,

    /// Frame RMS below which a frame counts as silent (default: 0.02)
    pub rms_silence: f32,

    // Recording trim
    /// Trim threshold as a fraction of the loudest window RMS (default: 0.02)
    pub trim_rms_ratio: f32,

    /// Padding kept around the trimmed region in milliseconds (default: 60.0)
    pub trim_pad_ms: f32,

    // Viterbi stabilisation
    /// Select the candidate + Viterbi tracker instead of the threshold tracker (default: true)
    pub dp_enabled: bool,

    /// Voiced candidates kept per frame (default: 5, clamped to 2-6)
    pub dp_top_k: usize,

    /// Smoothness weight on squared log-F0 steps between voiced frames (default: 80.0)
    pub dp_lambda: f32,

    /// Cost of switching between voiced and unvoiced (default: 0.5)
    pub dp_u_switch: f32,

    /// Base cost of the unvoiced state in an energetic frame (default: 0.6)
    pub dp_u_penalty: f32,

    /// Apply min-max cost scaling, voicing priors and near-silence biases (default: true)
    ///
    /// The interactive preset turns this off; reference data is built with it on.
    pub prior_shaping: bool,

    /// Prior probability of a frame being voiced (default: 0.55, clamped to 0.05-0.95)
    pub voiced_prior: f32,

    /// A frame is "near silence" below `rms_silence * near_silence_ratio` (default: 1.1)
    pub near_silence_ratio: f32,

    /// Added to voiced costs in near-silent frames (default: 0.2)
    pub near_silence_voiced_bias: f32,

    /// Subtracted from the unvoiced cost in near-silent frames (default: 0.15)
    pub near_silence_unvoiced_bias: f32,

    // Post-filter
    /// Largest accepted frame-to-frame jump for the threshold tracker, in semitones (default: 12.0)
    pub max_jump_semitones: f32,

    /// Unvoiced gaps up to this length are bridged linearly (default: 30 ms)
    pub gap_fill_ms: f32,

    /// Median filter window in frames, forced odd (default: 3)
    pub median_window: usize,

    /// Moving-average window in frames, forced odd (default: 7)
    pub smoothing_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            hop_ms: 4.0,
            window_ms: 100.0,
            f_min_hz: 70.0,
            f_max_hz: 500.0,
            yin_threshold: 0.12,
            rms_silence: 0.02,
            trim_rms_ratio: 0.02,
            trim_pad_ms: 60.0,
            dp_enabled: true,
            dp_top_k: 5,
            dp_lambda: 80.0,
            dp_u_switch: 0.5,
            dp_u_penalty: 0.6,
            prior_shaping: true,
            voiced_prior: 0.55,
            near_silence_ratio: 1.1,
            near_silence_voiced_bias: 0.2,
            near_silence_unvoiced_bias: 0.15,
            max_jump_semitones: 12.0,
            gap_fill_ms: 30.0,
            median_window: 3,
            smoothing_window: 7,
        }
    }
}

impl AnalysisConfig {
    /// Preset for live recordings
    ///
    /// Identical to [`AnalysisConfig::default`] except that prior/bias shaping
    /// of the observation costs is skipped.
    pub fn interactive() -> Self {
        Self {
            prior_shaping: false,
            ..Self::default()
        }
    }

    /// Check the contract of the numeric parameters for a given sample rate
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a zero sample rate, a
    /// non-finite or non-positive frame geometry, a window longer than
    /// [`MAX_FRAME_SIZE`] samples, or an empty pitch band, and
    /// `AnalysisError::NumericalError` for any other non-finite parameter.
    pub fn validate(&self, sample_rate: u32) -> Result<(), AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        check_positive("hop_ms", self.hop_ms)?;
        check_positive("window_ms", self.window_ms)?;
        if window_frame_size(sample_rate, self.window_ms).is_none() {
            return Err(AnalysisError::InvalidInput(format!(
                "window_ms {} exceeds the largest frame of {} samples at {} Hz",
                self.window_ms, MAX_FRAME_SIZE, sample_rate
            )));
        }
        check_positive("f_min_hz", self.f_min_hz)?;
        check_positive("f_max_hz", self.f_max_hz)?;

        if self.f_min_hz >= self.f_max_hz {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid pitch band: [{:.1}, {:.1}] Hz",
                self.f_min_hz, self.f_max_hz
            )));
        }

        for (name, value) in [
            ("yin_threshold", self.yin_threshold),
            ("rms_silence", self.rms_silence),
            ("trim_rms_ratio", self.trim_rms_ratio),
            ("trim_pad_ms", self.trim_pad_ms),
            ("dp_lambda", self.dp_lambda),
            ("dp_u_switch", self.dp_u_switch),
            ("dp_u_penalty", self.dp_u_penalty),
            ("voiced_prior", self.voiced_prior),
            ("near_silence_ratio", self.near_silence_ratio),
            ("near_silence_voiced_bias", self.near_silence_voiced_bias),
            ("near_silence_unvoiced_bias", self.near_silence_unvoiced_bias),
            ("gap_fill_ms", self.gap_fill_ms),
        ] {
            if !value.is_finite() {
                return Err(AnalysisError::NumericalError(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Hop size in samples (at least 1)
    pub fn hop_samples(&self, sample_rate: u32) -> usize {
        ms_to_samples(self.hop_ms, sample_rate).max(1)
    }

    /// Analysis frame size in samples: the window rounded up to a power of two
    ///
    /// Shares [`window_frame_size`] with the MFCC framing, so both produce
    /// the same frame count. Out-of-range windows (rejected by
    /// [`AnalysisConfig::validate`]) fall back to [`MAX_FRAME_SIZE`].
    pub fn frame_size(&self, sample_rate: u32) -> usize {
        window_frame_size(sample_rate, self.window_ms).unwrap_or(MAX_FRAME_SIZE)
    }

    /// Longest unvoiced run (in frames) the gap filler bridges
    pub fn gap_fill_frames(&self, sample_rate: u32) -> usize {
        let hop = self.hop_samples(sample_rate) as f64;
        let frames = (self.gap_fill_ms as f64 / 1000.0) * sample_rate as f64 / hop;
        if frames.is_finite() && frames > 0.0 {
            frames.round() as usize
        } else {
            0
        }
    }
}

/// MFCC extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfccConfig {
    /// Number of triangular mel filters (default: 24)
    pub n_mels: usize,

    /// Number of cepstral coefficients kept (default: 12)
    pub n_mfcc: usize,

    /// Lower edge of the filterbank (default: 20 Hz)
    pub f_min_hz: f32,

    /// Upper edge of the filterbank; `None` means Nyquist
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub f_max_hz: Option<f32>,

    /// First-order pre-emphasis coefficient (default: 0.97)
    pub pre_emphasis: f32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mels: 24,
            n_mfcc: 12,
            f_min_hz: 20.0,
            f_max_hz: None,
            pre_emphasis: 0.97,
        }
    }
}

impl MfccConfig {
    /// Upper filterbank edge for a sample rate
    pub fn f_max_for(&self, sample_rate: u32) -> f32 {
        self.f_max_hz.unwrap_or(sample_rate as f32 / 2.0)
    }
}

/// Parameters for comparing a user recording against a reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareConfig {
    /// DTW band as a fraction of the longer sequence (default: 0.15)
    pub band_ratio: f32,

    /// Cost of aligning a voiced frame with an unvoiced one in scalar DTW (default: 1.0)
    pub nan_cost: f32,

    /// Z-score both contours before scoring, removing the speaker's register (default: true)
    pub normalize_contours: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            band_ratio: 0.15,
            nan_cost: 1.0,
            normalize_contours: true,
        }
    }
}

/// Frame size for a window in milliseconds
///
/// `round(sr·window_ms/1000)` rounded up to a power of two, at least
/// [`MIN_FRAME_SIZE`]. `None` when the window is non-finite or longer than
/// [`MAX_FRAME_SIZE`] samples.
pub fn window_frame_size(sample_rate: u32, window_ms: f32) -> Option<usize> {
    let samples = (sample_rate as f64 * window_ms as f64 / 1000.0).round();
    if !samples.is_finite() || samples > MAX_FRAME_SIZE as f64 {
        return None;
    }
    Some((samples.max(1.0) as usize).next_power_of_two().max(MIN_FRAME_SIZE))
}

fn ms_to_samples(ms: f32, sample_rate: u32) -> usize {
    (sample_rate as f64 * ms as f64 / 1000.0).round().max(0.0) as usize
}

fn check_positive(name: &str, value: f32) -> Result<(), AnalysisError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "{} must be finite and > 0, got {}",
            name, value
        )));
    }
    Ok(())
}
