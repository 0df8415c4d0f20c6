//! Audio and reference-data I/O for offline tools
//!
//! Audio decoding uses Symphonia; reference records are JSON via serde.

pub mod decoder;
pub mod reference;
