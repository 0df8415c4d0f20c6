//! Feature extraction modules
//!
//! - Pitch tracking: YIN candidates, Viterbi stabilisation, contour post-filter
//! - MFCC: spectral envelope frames for alignment

pub mod mfcc;
pub mod pitch;
