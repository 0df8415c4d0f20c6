//! Mel-frequency cepstral coefficients
//!
//! Per frame: pre-emphasis (restarted at each frame) → Hamming window →
//! radix-2 FFT → power spectrum → triangular mel filterbank →
//! `ln(max(1e-12, energy))` → DCT-II projection. The resulting sequence is
//! the spectral envelope track used to align a recording with its reference.

pub mod fft;
pub mod mel;

use serde::{Deserialize, Serialize};

use crate::config::{window_frame_size, MfccConfig, MAX_FRAME_SIZE};
use crate::error::AnalysisError;
use mel::MelFilterbank;

/// Floor applied to mel energies before the logarithm
const LOG_ENERGY_FLOOR: f32 = 1e-12;

/// Feature vectors with the start time of each frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSequence {
    /// One vector of `n_mfcc` coefficients per frame
    pub features: Vec<Vec<f32>>,

    /// Frame start times in seconds
    pub times: Vec<f32>,
}

impl FeatureSequence {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when there are no frames
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// MFCC frame and hop sizes in samples for a window/hop in milliseconds
///
/// Frame = [`window_frame_size`] (the same frame the F0 tracker uses);
/// hop = `max(1, round(sr·hop_ms/1000))`.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the window or hop is non-finite
/// or non-positive, or the window exceeds [`MAX_FRAME_SIZE`] samples.
pub fn frame_geometry(sample_rate: u32, window_ms: f32, hop_ms: f32) -> Result<(usize, usize), AnalysisError> {
    if !(window_ms.is_finite() && window_ms > 0.0 && hop_ms.is_finite() && hop_ms > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid MFCC geometry: window {} ms, hop {} ms",
            window_ms, hop_ms
        )));
    }
    let frame = window_frame_size(sample_rate, window_ms).ok_or_else(|| {
        AnalysisError::InvalidInput(format!(
            "MFCC window of {} ms exceeds {} samples at {} Hz",
            window_ms, MAX_FRAME_SIZE, sample_rate
        ))
    })?;
    let hop = (sample_rate as f64 * hop_ms as f64 / 1000.0).round().max(1.0) as usize;
    Ok((frame, hop))
}

/// Precomputed tables for one sample rate and frame geometry
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    sample_rate: u32,
    frame_size: usize,
    hop: usize,
    pre_emphasis: f32,
    window: Vec<f32>,
    filterbank: MelFilterbank,
    dct: Vec<Vec<f32>>,
}

impl MfccExtractor {
    /// Build the window, filterbank and DCT tables
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate or hop is zero,
    /// the frame size is not a power of two, there are no mel filters or
    /// coefficients, or the filterbank band is empty or non-finite.
    pub fn new(
        sample_rate: u32,
        frame_size: usize,
        hop: usize,
        config: &MfccConfig,
    ) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
        }
        if hop == 0 {
            return Err(AnalysisError::InvalidInput("MFCC hop must be > 0".to_string()));
        }
        if !frame_size.is_power_of_two() {
            return Err(AnalysisError::InvalidInput(format!(
                "MFCC frame size must be a power of two, got {}",
                frame_size
            )));
        }
        if config.n_mels == 0 || config.n_mfcc == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "MFCC needs at least one filter and one coefficient (n_mels={}, n_mfcc={})",
                config.n_mels, config.n_mfcc
            )));
        }

        let f_max = config.f_max_for(sample_rate);
        if !config.f_min_hz.is_finite() || !f_max.is_finite() || config.f_min_hz < 0.0 || f_max <= config.f_min_hz {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid mel band: [{:.1}, {:.1}] Hz",
                config.f_min_hz, f_max
            )));
        }

        Ok(Self {
            sample_rate,
            frame_size,
            hop,
            pre_emphasis: config.pre_emphasis,
            window: mel::hamming(frame_size),
            filterbank: MelFilterbank::new(sample_rate, frame_size, config.n_mels, config.f_min_hz, f_max),
            dct: mel::dct_table(config.n_mfcc, config.n_mels),
        })
    }

    /// Frame size in samples
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Hop size in samples
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Extract the MFCC sequence of a mono buffer
    ///
    /// Buffers shorter than one frame are zero-padded to a single frame; an
    /// empty buffer yields an empty sequence.
    pub fn extract(&self, samples: &[f32]) -> FeatureSequence {
        if samples.is_empty() {
            return FeatureSequence::default();
        }
        let n_frames = if samples.len() < self.frame_size {
            log::warn!(
                "MFCC input of {} samples is shorter than one frame ({}); zero-padding",
                samples.len(),
                self.frame_size
            );
            1
        } else {
            (samples.len() - self.frame_size) / self.hop + 1
        };
        log::debug!(
            "Extracting MFCC: {} frames, frame={}, hop={}, n_mels={}, n_mfcc={}",
            n_frames,
            self.frame_size,
            self.hop,
            self.filterbank.len(),
            self.dct.len()
        );

        let mut re = vec![0.0f32; self.frame_size];
        let mut im = vec![0.0f32; self.frame_size];
        let mut sequence = FeatureSequence {
            features: Vec::with_capacity(n_frames),
            times: Vec::with_capacity(n_frames),
        };

        for fi in 0..n_frames {
            let start = fi * self.hop;
            let mut prev = 0.0f32;
            for i in 0..self.frame_size {
                let x = samples.get(start + i).copied().unwrap_or(0.0);
                re[i] = (x - self.pre_emphasis * prev) * self.window[i];
                im[i] = 0.0;
                prev = x;
            }

            fft::fft_in_place(&mut re, &mut im);
            let power = fft::power_spectrum(&re, &im);
            let log_energies: Vec<f32> = self
                .filterbank
                .apply(&power)
                .into_iter()
                .map(|e| e.max(LOG_ENERGY_FLOOR).ln())
                .collect();

            sequence.features.push(mel::apply_dct(&log_energies, &self.dct));
            sequence.times.push((start as f64 / self.sample_rate as f64) as f32);
        }

        sequence
    }
}

/// Extract MFCCs with a one-off extractor
///
/// # Arguments
///
/// * `samples` - Mono PCM samples
/// * `sample_rate` - Sample rate in Hz
/// * `frame_size` - Frame size in samples (power of two)
/// * `hop` - Hop size in samples
/// * `config` - Filterbank and cepstrum parameters
///
/// # Errors
///
/// See [`MfccExtractor::new`].
pub fn extract_mfcc(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop: usize,
    config: &MfccConfig,
) -> Result<FeatureSequence, AnalysisError> {
    Ok(MfccExtractor::new(sample_rate, frame_size, hop, config)?.extract(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn tone(freq: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }

    #[test]
    fn test_frame_geometry() {
        assert_eq!(frame_geometry(16000, 100.0, 4.0).unwrap(), (2048, 64));
        assert_eq!(frame_geometry(16000, 1.0, 0.01).unwrap(), (64, 1));
        assert_eq!(frame_geometry(16000, 25.0, 10.0).unwrap(), (512, 160));
    }

    #[test]
    fn test_frame_geometry_rejects_out_of_range_window() {
        assert!(frame_geometry(16000, 1e30, 4.0).is_err());
        assert!(frame_geometry(16000, f32::NAN, 4.0).is_err());
        assert!(frame_geometry(16000, 100.0, 0.0).is_err());
    }

    #[test]
    fn test_frame_geometry_matches_contour_framing() {
        for window_ms in [1.0f32, 3.0, 25.0, 100.0] {
            let config = AnalysisConfig {
                window_ms,
                ..AnalysisConfig::default()
            };
            let (frame, hop) = frame_geometry(16000, window_ms, config.hop_ms).unwrap();
            assert_eq!(frame, config.frame_size(16000), "window {} ms", window_ms);
            assert_eq!(hop, config.hop_samples(16000));
        }
    }

    #[test]
    fn test_frame_count_and_times() {
        let samples = tone(300.0, 1.0, 16000);
        let seq = extract_mfcc(&samples, 16000, 2048, 64, &MfccConfig::default()).unwrap();
        assert_eq!(seq.len(), (16000 - 2048) / 64 + 1);
        assert_eq!(seq.times.len(), seq.len());
        assert_eq!(seq.times[0], 0.0);
        assert!((seq.times[10] - 640.0 / 16000.0).abs() < 1e-7);
        assert!(seq.features.iter().all(|f| f.len() == 12));
    }

    #[test]
    fn test_empty_and_short_input() {
        let config = MfccConfig::default();
        assert!(extract_mfcc(&[], 16000, 512, 160, &config).unwrap().is_empty());

        let short = tone(300.0, 0.01, 16000);
        let seq = extract_mfcc(&short, 16000, 512, 160, &config).unwrap();
        assert_eq!(seq.len(), 1, "a short buffer is padded to one frame");
        assert!(seq.features[0].iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_silence_hits_energy_floor() {
        let config = MfccConfig::default();
        let seq = extract_mfcc(&vec![0.0; 1024], 16000, 512, 256, &config).unwrap();
        let expected_c0 = config.n_mels as f32 * 1e-12f32.ln();
        for frame in &seq.features {
            assert!((frame[0] - expected_c0).abs() < 1e-2, "c0 = {}", frame[0]);
            assert!(frame[1..].iter().all(|c| c.abs() < 1e-2));
        }
    }

    #[test]
    fn test_spectral_envelope_discriminates_tones() {
        let config = MfccConfig::default();
        let low = extract_mfcc(&tone(250.0, 0.2, 16000), 16000, 512, 160, &config).unwrap();
        let low_again = extract_mfcc(&tone(250.0, 0.2, 16000), 16000, 512, 160, &config).unwrap();
        let high = extract_mfcc(&tone(3000.0, 0.2, 16000), 16000, 512, 160, &config).unwrap();

        assert_eq!(low, low_again, "extraction must be deterministic");
        assert!(distance(&low.features[2], &high.features[2]) > 1.0);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let config = MfccConfig::default();
        assert!(MfccExtractor::new(16000, 500, 160, &config).is_err());
        assert!(MfccExtractor::new(16000, 512, 0, &config).is_err());
        assert!(MfccExtractor::new(0, 512, 160, &config).is_err());

        let inverted = MfccConfig {
            f_min_hz: 9000.0,
            ..MfccConfig::default()
        };
        assert!(MfccExtractor::new(16000, 512, 160, &inverted).is_err());
    }
}
