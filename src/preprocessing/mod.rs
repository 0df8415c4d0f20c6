//! Recording preprocessing modules
//!
//! This module contains utilities applied around the pitch tracker:
//! - Channel down-mixing of decoded audio
//! - Silence detection and trimming of a raw recording
//! - Z-score normalization of a finished log-F0 contour

pub mod channel_mixer;
pub mod normalization;
pub mod silence;
