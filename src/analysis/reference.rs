//! Offline reference feature building
//!
//! Reference data is produced once per audio take with a fixed parameter set.
//! The contour goes through exactly the same [`crate::analyze`] path a live
//! recording does, so reference and user contours stay comparable; MFCC
//! frames use the contour's window and hop.

use super::result::ReferenceFeature;
use crate::config::{AnalysisConfig, MfccConfig};
use crate::error::AnalysisError;
use crate::features::mfcc::{frame_geometry, MfccExtractor};

/// Feature type tag stored with MFCC references
pub const FEATURE_TYPE_MFCC: &str = "mfcc";

/// Identifiers attached to a reference record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIds {
    /// Reference item identifier
    pub id: String,
    /// Lookup key of the item
    pub key: String,
    /// Identifier of the audio take
    pub audio_id: String,
}

/// Build the reference record of one audio take
///
/// The whole buffer is analysed (no silence trimming), matching how
/// references are prepared.
///
/// # Arguments
///
/// * `samples` - Mono PCM of the reference take
/// * `sample_rate` - Sample rate in Hz
/// * `ids` - Identifiers to store with the record
/// * `config` - Contour parameters (preset with prior shaping for references)
/// * `mfcc` - Filterbank and cepstrum parameters
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if either configuration is invalid.
pub fn build_reference_feature(
    samples: &[f32],
    sample_rate: u32,
    ids: ReferenceIds,
    config: &AnalysisConfig,
    mfcc: &MfccConfig,
) -> Result<ReferenceFeature, AnalysisError> {
    log::debug!(
        "Building reference {}: {} samples at {} Hz",
        ids.audio_id,
        samples.len(),
        sample_rate
    );

    let contour = crate::analyze(samples, sample_rate, config)?;
    let (frame_size, hop) = frame_geometry(sample_rate, config.window_ms, config.hop_ms)?;
    let features = MfccExtractor::new(sample_rate, frame_size, hop, mfcc)?.extract(samples);

    if features.len() != contour.len() {
        log::debug!(
            "Reference {}: {} MFCC frames vs {} contour frames",
            ids.audio_id,
            features.len(),
            contour.len()
        );
    }

    Ok(ReferenceFeature {
        id: ids.id,
        key: ids.key,
        audio_id: ids.audio_id,
        sample_rate,
        duration: contour.duration,
        hop_ms: config.hop_ms,
        window_ms: config.window_ms,
        feature_type: FEATURE_TYPE_MFCC.to_string(),
        feature_dim: mfcc.n_mfcc,
        features: features.features,
        mfcc: mfcc.clone(),
        times: contour.times,
        f0_log: contour.f0_log,
    })
}
