//! Banded dynamic time warping
//!
//! Only cells with `|i - j| ≤ band` are evaluated, where
//! `band = max(1, ⌊max(n, m)·band_ratio⌋ + |n - m|)`. Storage is one row of
//! `min(2·band + 1, m)` cells per frame of the first sequence, so memory grows
//! with `n·band` instead of `n·m`.
//!
//! Predecessors are checked diagonal, up `(i-1, j)`, then left `(i, j-1)`;
//! the first strictly smaller accumulated cost wins.
//!
//! An unreachable end cell (or an empty input) is reported as infinite cost
//! with an empty path. Callers treat that as "alignment failed".

use super::DtwResult;
use crate::error::AnalysisError;

#[derive(Clone, Copy, PartialEq)]
enum Step {
    Start,
    Diagonal,
    Up,
    Left,
}

/// Band half-width for sequences of length `n` and `m`
///
/// Capped at `max(n, m)`: a wider band is the full matrix.
pub fn band_width(n: usize, m: usize, band_ratio: f32) -> usize {
    let longest = n.max(m);
    let scaled = (longest as f64 * band_ratio as f64).floor();
    let scaled = if scaled.is_finite() { scaled.max(0.0) as usize } else { 0 };
    scaled.saturating_add(n.abs_diff(m)).min(longest).max(1)
}

/// Cost matrix restricted to the band around the diagonal
struct BandedMatrix {
    band: usize,
    cols: usize,
    width: usize,
    cost: Vec<f64>,
    step: Vec<Step>,
}

impl BandedMatrix {
    fn new(rows: usize, cols: usize, band: usize) -> Self {
        let width = band.saturating_mul(2).saturating_add(1).min(cols);
        Self {
            band,
            cols,
            width,
            cost: vec![f64::INFINITY; rows * width],
            step: vec![Step::Start; rows * width],
        }
    }

    fn row_span(&self, i: usize) -> (usize, usize) {
        (i.saturating_sub(self.band), i.saturating_add(self.band).min(self.cols - 1))
    }

    fn index(&self, i: usize, j: usize) -> Option<usize> {
        let (lo, hi) = self.row_span(i);
        (j >= lo && j <= hi).then(|| i * self.width + (j - lo))
    }

    fn cost_at(&self, i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(f64::INFINITY, |k| self.cost[k])
    }
}

/// Banded DTW over an arbitrary local cost
///
/// `local(i, j)` is the distance between frame `i` of the first sequence and
/// frame `j` of the second.
pub fn banded_dtw<F>(n: usize, m: usize, band_ratio: f32, local: F) -> DtwResult
where
    F: Fn(usize, usize) -> f64,
{
    if n == 0 || m == 0 {
        log::debug!("DTW skipped: empty sequence ({} x {})", n, m);
        return DtwResult::failed();
    }

    let band = band_width(n, m, band_ratio);
    let mut matrix = BandedMatrix::new(n, m, band);
    log::debug!(
        "DTW: {} x {} frames, band={}, {} cells",
        n,
        m,
        band,
        matrix.cost.len()
    );

    for i in 0..n {
        let (lo, hi) = matrix.row_span(i);
        for j in lo..=hi {
            let cell = local(i, j);
            let (best, step) = if i == 0 && j == 0 {
                (0.0, Step::Start)
            } else {
                let mut best = f64::INFINITY;
                let mut step = Step::Start;
                if i > 0 && j > 0 {
                    let v = matrix.cost_at(i - 1, j - 1);
                    if v < best {
                        best = v;
                        step = Step::Diagonal;
                    }
                }
                if i > 0 {
                    let v = matrix.cost_at(i - 1, j);
                    if v < best {
                        best = v;
                        step = Step::Up;
                    }
                }
                if j > 0 {
                    let v = matrix.cost_at(i, j - 1);
                    if v < best {
                        best = v;
                        step = Step::Left;
                    }
                }
                (best, step)
            };

            if let Some(k) = matrix.index(i, j) {
                matrix.cost[k] = best + cell;
                matrix.step[k] = step;
            }
        }
    }

    let cost = matrix.cost_at(n - 1, m - 1);
    if !cost.is_finite() {
        log::warn!("DTW end cell unreachable ({} x {}, band={})", n, m, band);
        return DtwResult::failed();
    }

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    loop {
        path.push((i, j));
        let step = matrix.index(i, j).map_or(Step::Start, |k| matrix.step[k]);
        match step {
            Step::Diagonal => {
                i -= 1;
                j -= 1;
            }
            Step::Up => i -= 1,
            Step::Left => j -= 1,
            Step::Start => break,
        }
    }
    path.reverse();

    DtwResult { cost, path }
}

/// Squared difference with NaN handling
///
/// Both NaN costs 0 (both unvoiced), exactly one NaN costs `nan_cost`.
pub fn scalar_cost(a: f32, b: f32, nan_cost: f32) -> f64 {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => {
            let d = a as f64 - b as f64;
            d * d
        }
        (false, false) => 0.0,
        _ => nan_cost as f64,
    }
}

/// Sum of squared differences over the shared coefficient range
pub fn vector_cost(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// Align two scalar sequences (e.g. log-F0 contours)
///
/// # Arguments
///
/// * `a` - First sequence (indexed by `i` in the path)
/// * `b` - Second sequence (indexed by `j` in the path)
/// * `band_ratio` - Band as a fraction of the longer sequence
/// * `nan_cost` - Cost of aligning a NaN with a finite value
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `band_ratio` is not finite.
pub fn dtw_band(a: &[f32], b: &[f32], band_ratio: f32, nan_cost: f32) -> Result<DtwResult, AnalysisError> {
    check_band_ratio(band_ratio)?;
    Ok(banded_dtw(a.len(), b.len(), band_ratio, |i, j| {
        scalar_cost(a[i], b[j], nan_cost)
    }))
}

/// Align two feature-vector sequences (e.g. MFCC frames)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `band_ratio` is not finite or the
/// vectors do not all share one dimension.
pub fn dtw_band_features(
    a: &[Vec<f32>],
    b: &[Vec<f32>],
    band_ratio: f32,
) -> Result<DtwResult, AnalysisError> {
    check_band_ratio(band_ratio)?;

    if let Some(dim) = a.first().or_else(|| b.first()).map(Vec::len) {
        if let Some((side, pos, len)) = a
            .iter()
            .enumerate()
            .map(|(k, v)| ("first", k, v.len()))
            .chain(b.iter().enumerate().map(|(k, v)| ("second", k, v.len())))
            .find(|&(_, _, len)| len != dim)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "Feature dimension mismatch: frame {} of the {} sequence has {} coefficients, expected {}",
                pos, side, len, dim
            )));
        }
    }

    Ok(banded_dtw(a.len(), b.len(), band_ratio, |i, j| {
        vector_cost(&a[i], &b[j])
    }))
}

fn check_band_ratio(band_ratio: f32) -> Result<(), AnalysisError> {
    if !band_ratio.is_finite() {
        return Err(AnalysisError::InvalidInput(format!(
            "DTW band ratio must be finite, got {}",
            band_ratio
        )));
    }
    Ok(())
}
