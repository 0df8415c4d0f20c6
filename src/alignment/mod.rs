//! Contour alignment and scoring
//!
//! - [`dtw`]: banded DTW over scalar contours or feature-vector sequences
//! - [`scoring`]: correlation, RMSE, slope agreement and peak timing along a path
//! - [`projection`]: resample a reference contour onto the user's timeline

pub mod dtw;
pub mod projection;
pub mod scoring;

/// Monotonic alignment path of `(first_index, second_index)` pairs
pub type AlignmentPath = Vec<(usize, usize)>;

/// Result of a DTW alignment
#[derive(Debug, Clone, PartialEq)]
pub struct DtwResult {
    /// Accumulated cost at the end cell; infinite when alignment failed
    pub cost: f64,

    /// Path from `(0, 0)` to `(n-1, m-1)`; empty when alignment failed
    pub path: AlignmentPath,
}

impl DtwResult {
    /// The "alignment failed" result: infinite cost, empty path
    pub fn failed() -> Self {
        Self {
            cost: f64::INFINITY,
            path: Vec::new(),
        }
    }

    /// True when a finite-cost path was found
    pub fn is_aligned(&self) -> bool {
        self.cost.is_finite() && !self.path.is_empty()
    }
}
