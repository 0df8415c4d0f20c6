//! NaN-aware clean-up of log-F0 contours
//!
//! Stages run in a fixed order:
//!
//! 1. Median filter (removes isolated spikes)
//! 2. Jump rejection, threshold tracker only (drops octave slips)
//! 3. Linear fill of short unvoiced gaps
//! 4. Moving average
//!
//! Windowed stages ignore NaN neighbours and emit NaN only when no finite
//! value falls inside the window. Even windows are widened by one.

use crate::config::AnalysisConfig;

/// Post-filter settings resolved for one sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct PostFilter {
    /// Median window in frames
    pub median_window: usize,
    /// Maximum accepted jump in semitones; `None` disables jump rejection
    pub max_jump_semitones: Option<f32>,
    /// Longest bridged gap in frames
    pub max_gap_frames: usize,
    /// Moving-average window in frames
    pub smoothing_window: usize,
}

impl PostFilter {
    /// Resolve post-filter settings from the analysis configuration
    ///
    /// Jump rejection only applies to the threshold tracker; the stabilised
    /// tracker already pays for large steps in its transition cost.
    pub fn from_config(config: &AnalysisConfig, sample_rate: u32) -> Self {
        Self {
            median_window: config.median_window,
            max_jump_semitones: (!config.dp_enabled).then_some(config.max_jump_semitones),
            max_gap_frames: config.gap_fill_frames(sample_rate),
            smoothing_window: config.smoothing_window,
        }
    }

    /// Run all stages on a log-F0 contour
    pub fn apply(&self, contour: &[f32]) -> Vec<f32> {
        let mut out = median_filter(contour, self.median_window);
        if let Some(max_jump) = self.max_jump_semitones {
            out = reject_jumps(&out, max_jump);
        }
        out = fill_short_gaps(&out, self.max_gap_frames);
        moving_average(&out, self.smoothing_window)
    }
}

/// Force a window length to be odd (even lengths grow by one)
pub fn odd_window(window: usize) -> usize {
    if window % 2 == 0 {
        window + 1
    } else {
        window
    }
}

/// Sliding median over finite values (upper median for even counts)
pub fn median_filter(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 {
        return values.to_vec();
    }
    let half = odd_window(window) / 2;
    let mut buf = Vec::with_capacity(2 * half + 1);

    (0..values.len())
        .map(|i| {
            buf.clear();
            buf.extend(neighbourhood(values, i, half).iter().copied().filter(|v| v.is_finite()));
            if buf.is_empty() {
                return f32::NAN;
            }
            buf.sort_by(|a, b| a.total_cmp(b));
            buf[buf.len() / 2]
        })
        .collect()
}

/// Sliding mean over finite values
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 {
        return values.to_vec();
    }
    let half = odd_window(window) / 2;

    (0..values.len())
        .map(|i| {
            let (sum, count) = neighbourhood(values, i, half)
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0f64, 0usize), |(s, c), &v| (s + v as f64, c + 1));
            if count == 0 {
                f32::NAN
            } else {
                (sum / count as f64) as f32
            }
        })
        .collect()
}

/// Signed distance from `from` to `to` in semitones (both natural-log F0)
pub fn semitone_distance(from: f32, to: f32) -> f32 {
    12.0 * (to - from) / std::f32::consts::LN_2
}

/// Invalidate frames that jump more than `max_semitones` from the last accepted frame
///
/// Disabled (returns a copy) when `max_semitones` is non-finite or not positive.
pub fn reject_jumps(values: &[f32], max_semitones: f32) -> Vec<f32> {
    let mut out = values.to_vec();
    if !max_semitones.is_finite() || max_semitones <= 0.0 {
        return out;
    }

    let mut last_accepted: Option<f32> = None;
    for v in out.iter_mut().filter(|v| v.is_finite()) {
        match last_accepted {
            Some(prev) if semitone_distance(prev, *v).abs() > max_semitones => *v = f32::NAN,
            _ => last_accepted = Some(*v),
        }
    }
    out
}

/// Linearly bridge NaN runs of at most `max_gap` frames with finite values on both sides
pub fn fill_short_gaps(values: &[f32], max_gap: usize) -> Vec<f32> {
    let mut out = values.to_vec();
    let n = out.len();
    let mut i = 0;

    while i < n {
        if out[i].is_finite() {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && !out[i].is_finite() {
            i += 1;
        }
        let gap = i - start;

        if gap > max_gap || start == 0 || i == n {
            continue;
        }
        let a = out[start - 1];
        let b = out[i];
        for k in 1..=gap {
            out[start - 1 + k] = a + (b - a) * (k as f32 / (gap + 1) as f32);
        }
    }
    out
}

fn neighbourhood(values: &[f32], center: usize, half: usize) -> &[f32] {
    let lo = center.saturating_sub(half);
    let hi = (center + half + 1).min(values.len());
    &values[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f32 = f32::NAN;

    fn same(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(x, y)| (x.is_nan() && y.is_nan()) || (x - y).abs() < 1e-6)
    }

    #[test]
    fn test_odd_window() {
        assert_eq!(odd_window(0), 1);
        assert_eq!(odd_window(1), 1);
        assert_eq!(odd_window(4), 5);
        assert_eq!(odd_window(7), 7);
    }

    #[test]
    fn test_median_removes_spike_and_skips_nan() {
        let x = [1.0, 1.0, 9.0, 1.0, 1.0, NAN, 1.0];
        let y = median_filter(&x, 3);
        assert!(same(&y, &[1.0; 7]), "{:?}", y);
    }

    #[test]
    fn test_median_all_nan_window_stays_nan() {
        let x = [NAN, NAN, NAN, 2.0];
        let y = median_filter(&x, 3);
        assert!(y[0].is_nan() && y[1].is_nan());
        assert_eq!(y[2], 2.0);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let x = [1.0, NAN, 3.0];
        assert!(same(&median_filter(&x, 1), &x));
        assert!(same(&moving_average(&x, 0), &x));
    }

    #[test]
    fn test_even_window_widened() {
        let x = [0.0, 3.0, 6.0, 9.0, 12.0];
        // Window 2 -> 3
        assert!(same(&moving_average(&x, 2), &moving_average(&x, 3)));
    }

    #[test]
    fn test_moving_average_with_nan() {
        let x = [1.0, NAN, 3.0];
        let y = moving_average(&x, 3);
        assert!(same(&y, &[1.0, 2.0, 3.0]), "{:?}", y);
    }

    #[test]
    fn test_jump_rejection_against_last_accepted() {
        let base = 200f32.ln();
        let octave_up = 400f32.ln();
        let x = [base, octave_up, base + 0.01, NAN, octave_up];
        let y = reject_jumps(&x, 6.0);
        assert_eq!(y[0], base);
        assert!(y[1].is_nan());
        assert_eq!(y[2], base + 0.01);
        assert!(y[4].is_nan());

        assert!(same(&reject_jumps(&x, 0.0), &x));
        assert!(same(&reject_jumps(&x, f32::INFINITY), &x));
    }

    #[test]
    fn test_semitone_distance_octave() {
        assert!((semitone_distance(100f32.ln(), 200f32.ln()) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_gap_fill_linear_and_bounded() {
        let x = [1.0, NAN, NAN, 4.0, NAN, NAN, NAN, 0.0];
        let y = fill_short_gaps(&x, 2);
        assert!(same(&y, &[1.0, 2.0, 3.0, 4.0, NAN, NAN, NAN, 0.0]), "{:?}", y);

        // Edge gaps are never filled
        let edges = [NAN, 1.0, 1.0, NAN];
        assert!(same(&fill_short_gaps(&edges, 10), &edges));

        assert!(same(&fill_short_gaps(&x, 0), &x));
    }

    #[test]
    fn test_apply_order_and_jump_only_for_threshold_tracker() {
        let mut config = AnalysisConfig::default();
        let dp_filter = PostFilter::from_config(&config, 16000);
        assert_eq!(dp_filter.max_jump_semitones, None);
        assert_eq!(dp_filter.max_gap_frames, 8);

        config.dp_enabled = false;
        let threshold_filter = PostFilter::from_config(&config, 16000);
        assert_eq!(threshold_filter.max_jump_semitones, Some(12.0));

        let flat = vec![5.0f32; 20];
        assert!(same(&threshold_filter.apply(&flat), &flat));
        assert!(threshold_filter.apply(&[]).is_empty());
    }
}
