//! Analysis metadata structures

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

/// Pitch tracker that produced a contour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tracker {
    /// YIN candidates stabilised by a Viterbi path
    YinViterbi,
    /// Per-frame YIN threshold decisions with jump rejection
    YinThreshold,
}

impl Tracker {
    /// Tracker selected by a configuration
    pub fn for_config(config: &AnalysisConfig) -> Self {
        if config.dp_enabled {
            Self::YinViterbi
        } else {
            Self::YinThreshold
        }
    }
}

/// Conditions worth surfacing to whoever displays a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisFlag {
    /// The recording is shorter than one analysis frame
    ShortInput,
    /// Fewer than [`MOSTLY_UNVOICED_RATIO`] of the frames carry a pitch
    MostlyUnvoiced,
    /// No silence could be trimmed, or the trimmed region was too short to keep
    TrimSkipped,
    /// DTW found no path between user and reference features
    AlignmentFailed,
}

/// Voiced ratio below which a contour is flagged [`AnalysisFlag::MostlyUnvoiced`]
pub const MOSTLY_UNVOICED_RATIO: f32 = 0.2;

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Algorithm version
    pub algorithm_version: String,

    /// Tracker used for the contour
    pub tracker: Tracker,

    /// Whether prior/bias shaping of observation costs was on
    pub prior_shaping: bool,

    /// Wall-clock processing time in milliseconds
    pub processing_time_ms: f32,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,
}

impl AnalysisMetadata {
    /// Metadata describing a run with `config`
    pub fn for_config(config: &AnalysisConfig) -> Self {
        Self {
            tracker: Tracker::for_config(config),
            prior_shaping: config.dp_enabled && config.prior_shaping,
            ..Self::default()
        }
    }

    /// Add a flag once
    pub fn flag(&mut self, flag: AnalysisFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            tracker: Tracker::YinViterbi,
            prior_shaping: true,
            processing_time_ms: 0.0,
            flags: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_follows_config() {
        let meta = AnalysisMetadata::for_config(&AnalysisConfig::interactive());
        assert_eq!(meta.tracker, Tracker::YinViterbi);
        assert!(!meta.prior_shaping);

        let legacy = AnalysisConfig {
            dp_enabled: false,
            ..AnalysisConfig::default()
        };
        let meta = AnalysisMetadata::for_config(&legacy);
        assert_eq!(meta.tracker, Tracker::YinThreshold);
        assert!(!meta.prior_shaping);
    }

    #[test]
    fn test_flags_are_deduplicated() {
        let mut meta = AnalysisMetadata::default();
        meta.flag(AnalysisFlag::MostlyUnvoiced);
        meta.flag(AnalysisFlag::MostlyUnvoiced);
        assert_eq!(meta.flags, vec![AnalysisFlag::MostlyUnvoiced]);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"mostly-unvoiced\""));
        assert!(json.contains("\"tracker\":\"yin-viterbi\""));
    }
}
