//! Leading/trailing silence trimming
//!
//! Short-time RMS over ~20 ms windows (50% overlap) locates the first and last
//! window whose energy reaches a fraction of the loudest window. The kept
//! region is padded on both sides and clipped to the buffer.
//!
//! Trimming never fails: a silent buffer, a buffer with no window above the
//! threshold, or a kept region shorter than [`MIN_KEPT_SECONDS`] all return
//! the input unchanged.

use std::ops::Range;

use crate::config::AnalysisConfig;

/// Loudest-window RMS below which the whole buffer counts as silent
const SILENCE_FLOOR: f32 = 1e-9;

/// Absolute lower bound on the RMS threshold
const MIN_THRESHOLD: f32 = 1e-6;

/// Trimmed regions shorter than this are discarded in favour of the full buffer
pub const MIN_KEPT_SECONDS: f32 = 0.2;

/// Silence trimming configuration
#[derive(Debug, Clone)]
pub struct SilenceTrimmer {
    /// Threshold as a fraction of the loudest window RMS (default: 0.02)
    pub rms_ratio: f32,

    /// Padding kept around the detected region in milliseconds (default: 60)
    pub pad_ms: f32,
}

impl Default for SilenceTrimmer {
    fn default() -> Self {
        Self {
            rms_ratio: 0.02,
            pad_ms: 60.0,
        }
    }
}

impl From<&AnalysisConfig> for SilenceTrimmer {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            rms_ratio: config.trim_rms_ratio,
            pad_ms: config.trim_pad_ms,
        }
    }
}

impl SilenceTrimmer {
    /// Sample range to keep
    ///
    /// Returns `0..samples.len()` whenever trimming degrades to a no-op.
    pub fn trim_range(&self, samples: &[f32], sample_rate: u32) -> Range<usize> {
        let full = 0..samples.len();
        if samples.is_empty() || sample_rate == 0 {
            return full;
        }

        let sr = sample_rate as f32;
        let win = ((sr * 0.02).round() as usize).max(64);
        let hop = ((win as f32 / 2.0).round() as usize).max(32);

        let rms = window_rms(samples, win, hop);
        let max_rms = rms.iter().copied().fold(0.0f32, f32::max);
        if max_rms <= SILENCE_FLOOR {
            log::debug!("Trim skipped: buffer is silent (max RMS {:.2e})", max_rms);
            return full;
        }

        let threshold = (max_rms * self.rms_ratio).max(MIN_THRESHOLD);
        let first = rms.iter().position(|&r| r >= threshold);
        let last = rms.iter().rposition(|&r| r >= threshold);
        let (first, last) = match (first, last) {
            (Some(first), Some(last)) if last >= first => (first, last),
            _ => return full,
        };

        let pad = ((self.pad_ms.max(0.0) / 1000.0) * sr).round() as usize;
        let start = (first * hop).saturating_sub(pad);
        let end = (last * hop + win + pad).min(samples.len());

        let min_len = (MIN_KEPT_SECONDS * sr).round() as usize;
        if end <= start || end - start < min_len {
            log::debug!(
                "Trim skipped: kept region {} samples is shorter than {} samples",
                end.saturating_sub(start),
                min_len
            );
            return full;
        }

        log::debug!(
            "Trimmed {} samples to [{}, {}) (threshold RMS {:.4})",
            samples.len(),
            start,
            end,
            threshold
        );
        start..end
    }

    /// Trim leading and trailing silence, returning a view into `samples`
    pub fn trim<'a>(&self, samples: &'a [f32], sample_rate: u32) -> &'a [f32] {
        &samples[self.trim_range(samples, sample_rate)]
    }
}

/// Trim leading and trailing silence
///
/// # Arguments
///
/// * `samples` - Mono PCM samples (any amplitude range)
/// * `sample_rate` - Sample rate in Hz
/// * `rms_ratio` - Threshold as a fraction of the loudest window RMS
/// * `pad_ms` - Padding kept on both sides of the detected region
///
/// # Returns
///
/// A sub-slice of `samples`, or all of `samples` when trimming is not possible
pub fn trim_silence(samples: &[f32], sample_rate: u32, rms_ratio: f32, pad_ms: f32) -> &[f32] {
    SilenceTrimmer { rms_ratio, pad_ms }.trim(samples, sample_rate)
}

fn window_rms(samples: &[f32], win: usize, hop: usize) -> Vec<f32> {
    if samples.len() < win {
        return Vec::new();
    }
    (0..=(samples.len() - win) / hop)
        .map(|k| {
            let start = k * hop;
            let sum_sq: f64 = samples[start..start + win]
                .iter()
                .map(|&x| (x as f64) * (x as f64))
                .sum();
            (sum_sq / win as f64).sqrt() as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, seconds: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_trim_empty_and_silent() {
        let trimmer = SilenceTrimmer::default();
        assert!(trimmer.trim(&[], 16000).is_empty());

        let silent = vec![0.0f32; 16000];
        assert_eq!(trimmer.trim_range(&silent, 16000), 0..16000);
    }

    #[test]
    fn test_trim_tone_between_silence() {
        let sr = 16000;
        let mut samples = vec![0.0f32; sr as usize];
        samples.extend(tone(150.0, 0.5, sr, 0.5));
        samples.extend(vec![0.0f32; sr as usize]);

        let range = SilenceTrimmer::default().trim_range(&samples, sr);
        let kept_seconds = (range.end - range.start) as f32 / sr as f32;

        // 0.5 s tone + 2 x 60 ms pad, plus at most one hop of window slack per side
        assert!(
            (kept_seconds - 0.62).abs() < 0.05,
            "Expected ~0.62 s, got {:.3} s",
            kept_seconds
        );
        assert!(range.start >= 16000 - 960 - 320, "start {} reaches into leading silence", range.start);
        assert!(range.end <= 24000 + 960 + 320, "end {} reaches into trailing silence", range.end);
    }

    #[test]
    fn test_trim_too_short_region_is_noop() {
        let sr = 16000;
        let mut samples = vec![0.0f32; sr as usize];
        samples.extend(tone(200.0, 0.05, sr, 0.5));
        samples.extend(vec![0.0f32; sr as usize]);

        let trimmer = SilenceTrimmer {
            rms_ratio: 0.02,
            pad_ms: 0.0,
        };
        assert_eq!(trimmer.trim(&samples, sr).len(), samples.len());
    }

    #[test]
    fn test_trim_shorter_than_one_window() {
        let samples = vec![0.3f32; 10];
        assert_eq!(trim_silence(&samples, 16000, 0.02, 60.0).len(), 10);
    }
}
