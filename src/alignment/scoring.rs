//! Similarity metrics between two aligned log-F0 contours
//!
//! The path pairs reference frame `i` with user frame `j`. Every metric looks
//! only at pairs where both values are finite; unvoiced frames are skipped,
//! never imputed.

use crate::analysis::result::ComparisonResult;
use crate::error::AnalysisError;

/// Floor on the Pearson denominator product
const PEARSON_DENOM_FLOOR: f64 = 1e-8;

/// Score a user contour against a reference along an alignment path
///
/// # Arguments
///
/// * `reference` - Reference log-F0 contour (NaN = unvoiced)
/// * `user` - User log-F0 contour
/// * `ref_times` - Frame times of the reference in seconds
/// * `user_times` - Frame times of the user contour in seconds
/// * `path` - `(reference_index, user_index)` pairs from DTW
///
/// # Returns
///
/// Correlation, RMSE, slope agreement and peak shift. Degenerate inputs
/// (empty path, too few voiced pairs) score 0 rather than failing.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if a contour and its time array
/// differ in length.
pub fn evaluate(
    reference: &[f32],
    user: &[f32],
    ref_times: &[f32],
    user_times: &[f32],
    path: &[(usize, usize)],
) -> Result<ComparisonResult, AnalysisError> {
    if reference.len() != ref_times.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "Reference contour has {} frames but {} times",
            reference.len(),
            ref_times.len()
        )));
    }
    if user.len() != user_times.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "User contour has {} frames but {} times",
            user.len(),
            user_times.len()
        )));
    }

    log::debug!(
        "Scoring alignment: {} reference frames, {} user frames, path length {}",
        reference.len(),
        user.len(),
        path.len()
    );

    let pairs = aligned_pairs(reference, user, path);
    Ok(ComparisonResult {
        corr: pearson(&pairs) as f32,
        rmse: rmse(&pairs) as f32,
        slope_match: slope_match(&pairs) as f32,
        peak_shift_ms: peak_shift_ms(reference, ref_times, user_times, path) as f32,
    })
}

/// Values of both contours at each path position (NaN when out of range)
pub fn aligned_pairs(reference: &[f32], user: &[f32], path: &[(usize, usize)]) -> Vec<(f64, f64)> {
    path.iter()
        .map(|&(i, j)| {
            (
                reference.get(i).map_or(f64::NAN, |&v| v as f64),
                user.get(j).map_or(f64::NAN, |&v| v as f64),
            )
        })
        .collect()
}

fn finite_pairs(pairs: &[(f64, f64)]) -> impl Iterator<Item = (f64, f64)> + '_ {
    pairs
        .iter()
        .copied()
        .filter(|(a, b)| a.is_finite() && b.is_finite())
}

/// Pearson correlation over finite pairs; 0 with fewer than two pairs
pub fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let (mut sum_a, mut sum_b, mut sum_aa, mut sum_bb, mut sum_ab) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut count = 0usize;
    for (a, b) in finite_pairs(pairs) {
        sum_a += a;
        sum_b += b;
        sum_aa += a * a;
        sum_bb += b * b;
        sum_ab += a * b;
        count += 1;
    }
    if count < 2 {
        return 0.0;
    }

    let n = count as f64;
    let num = n * sum_ab - sum_a * sum_b;
    let den_a = n * sum_aa - sum_a * sum_a;
    let den_b = n * sum_bb - sum_b * sum_b;
    num / (den_a * den_b).max(PEARSON_DENOM_FLOOR).sqrt()
}

/// Root-mean-square difference over finite pairs; 0 when there are none
pub fn rmse(pairs: &[(f64, f64)]) -> f64 {
    let (sum, count) = finite_pairs(pairs).fold((0.0, 0usize), |(s, c), (a, b)| {
        (s + (a - b) * (a - b), c + 1)
    });
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    }
}

/// Fraction of consecutive aligned steps whose slopes share a sign
///
/// Steps touching a non-finite value are skipped, as are steps where both
/// sides are flat. A flat step against a moving one counts as a mismatch.
pub fn slope_match(pairs: &[(f64, f64)]) -> f64 {
    let mut matches = 0usize;
    let mut count = 0usize;
    for w in pairs.windows(2) {
        let ((a0, b0), (a1, b1)) = (w[0], w[1]);
        if ![a0, a1, b0, b1].iter().all(|v| v.is_finite()) {
            continue;
        }
        let sa = sign(a1 - a0);
        let sb = sign(b1 - b0);
        if sa == 0 && sb == 0 {
            continue;
        }
        if sa == sb {
            matches += 1;
        }
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        matches as f64 / count as f64
    }
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Timing offset of the reference pitch peak in the user's recording, in ms
///
/// The reference's highest finite frame is mapped through the path; the user
/// indices it aligns to are averaged and rounded. Positive means the user's
/// peak comes later. 0 when the reference has no finite frame or the path
/// never touches the peak.
pub fn peak_shift_ms(reference: &[f32], ref_times: &[f32], user_times: &[f32], path: &[(usize, usize)]) -> f64 {
    let mut peak: Option<(usize, f32)> = None;
    for (i, &v) in reference.iter().enumerate() {
        if v.is_finite() && peak.map_or(true, |(_, best)| v > best) {
            peak = Some((i, v));
        }
    }
    let Some((peak_idx, _)) = peak else {
        return 0.0;
    };

    let (sum, count) = path
        .iter()
        .filter(|&&(i, _)| i == peak_idx)
        .fold((0.0f64, 0usize), |(s, c), &(_, j)| (s + j as f64, c + 1));
    if count == 0 {
        return 0.0;
    }

    let user_idx = (sum / count as f64).round() as usize;
    let t_ref = ref_times.get(peak_idx).copied().unwrap_or(0.0) as f64;
    let t_user = user_times.get(user_idx).copied().unwrap_or(0.0) as f64;
    (t_user - t_ref) * 1000.0
}
