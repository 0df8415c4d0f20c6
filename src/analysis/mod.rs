//! Result types and end-to-end pipelines
//!
//! - Result types shared by every entry point
//! - Run metadata and flags
//! - Recording analysis and reference comparison
//! - Offline reference building

pub mod metadata;
pub mod pipeline;
pub mod reference;
pub mod result;
