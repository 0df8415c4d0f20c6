//! Contour normalization
//!
//! Z-scores a log-F0 contour over its finite values so that two speakers with
//! different registers can be compared on contour shape alone. Unvoiced (NaN)
//! frames stay NaN.
//!
//! # Example
//!
//! ```
//! use tonal_dsp::preprocessing::normalization::normalize_log_f0;
//!
//! let contour = vec![5.0, f32::NAN, 5.2, 5.4];
//! let z = normalize_log_f0(&contour);
//! assert!(z[1].is_nan());
//! assert!(z[0] < 0.0 && z[3] > 0.0);
//! ```

/// Floor on the variance so flat contours do not blow up
const MIN_VARIANCE: f64 = 1e-6;

/// Mean and standard deviation of the finite values in a contour
///
/// Returns `None` when the contour has no finite value.
pub fn contour_stats(values: &[f32]) -> Option<(f64, f64)> {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;
    for &v in values.iter().filter(|v| v.is_finite()) {
        sum += v as f64;
        sum_sq += (v as f64) * (v as f64);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(MIN_VARIANCE);
    Some((mean, variance.sqrt()))
}

/// Z-score a log-F0 contour over its finite values
///
/// # Arguments
///
/// * `values` - Log-F0 contour, NaN for unvoiced frames
///
/// # Returns
///
/// A new contour of the same length. If no value is finite the input is
/// returned as a copy.
pub fn normalize_log_f0(values: &[f32]) -> Vec<f32> {
    let Some((mean, std)) = contour_stats(values) else {
        log::debug!("Contour has no voiced frames, skipping normalization");
        return values.to_vec();
    };

    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                ((v as f64 - mean) / std) as f32
            } else {
                f32::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zero_mean_unit_std() {
        let contour = vec![4.0, 5.0, 6.0, f32::NAN, 7.0];
        let z = normalize_log_f0(&contour);

        let finite: Vec<f32> = z.iter().copied().filter(|v| v.is_finite()).collect();
        assert_eq!(finite.len(), 4);
        let mean: f32 = finite.iter().sum::<f32>() / 4.0;
        let var: f32 = finite.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5, "mean {}", mean);
        assert!((var - 1.0).abs() < 1e-4, "variance {}", var);
        assert!(z[3].is_nan());
    }

    #[test]
    fn test_normalize_all_unvoiced_is_copy() {
        let contour = vec![f32::NAN; 4];
        let z = normalize_log_f0(&contour);
        assert_eq!(z.len(), 4);
        assert!(z.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_normalize_flat_contour_uses_variance_floor() {
        let z = normalize_log_f0(&[5.3, 5.3, 5.3]);
        assert!(z.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_contour_stats() {
        let (mean, std) = contour_stats(&[1.0, 3.0]).unwrap();
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((std - 1.0).abs() < 1e-12);
        assert!(contour_stats(&[]).is_none());
    }
}
