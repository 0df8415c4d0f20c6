//! Analysis result types

use serde::{Deserialize, Serialize};

use crate::config::MfccConfig;

/// Log-F0 contour of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct F0Result {
    /// Sample rate of the analysed PCM in Hz
    #[serde(rename = "sr")]
    pub sample_rate: u32,

    /// Duration of the analysed PCM in seconds
    pub duration: f32,

    /// Frame start times in seconds (`index · hop / sample_rate`)
    pub times: Vec<f32>,

    /// Natural-log F0 per frame, NaN where unvoiced
    #[serde(with = "nan_as_null")]
    pub f0_log: Vec<f32>,
}

impl F0Result {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.f0_log.len()
    }

    /// True when there are no frames
    pub fn is_empty(&self) -> bool {
        self.f0_log.is_empty()
    }

    /// Fraction of frames with a pitch (0 for an empty contour)
    pub fn voiced_ratio(&self) -> f32 {
        if self.f0_log.is_empty() {
            return 0.0;
        }
        let voiced = self.f0_log.iter().filter(|v| v.is_finite()).count();
        voiced as f32 / self.f0_log.len() as f32
    }

    /// F0 in Hz per frame, NaN where unvoiced
    pub fn f0_hz(&self) -> Vec<f32> {
        self.f0_log.iter().map(|v| v.exp()).collect()
    }
}

/// Similarity of a user contour to a reference contour
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Pearson correlation of aligned voiced frames (-1 to 1)
    pub corr: f32,

    /// Root-mean-square difference of aligned voiced frames
    pub rmse: f32,

    /// Fraction of aligned steps moving in the same direction (0 to 1)
    pub slope_match: f32,

    /// User pitch-peak time minus reference pitch-peak time, in milliseconds
    pub peak_shift_ms: f32,
}

/// Precomputed reference data for one audio item
///
/// Built offline with a fixed parameter set and consumed read-only when a
/// user recording is compared against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceFeature {
    /// Reference item identifier
    pub id: String,

    /// Lookup key of the item (e.g. the syllable or word it voices)
    pub key: String,

    /// Identifier of the audio take
    pub audio_id: String,

    /// Sample rate in Hz
    #[serde(rename = "sr")]
    pub sample_rate: u32,

    /// Duration in seconds
    pub duration: f32,

    /// Hop used for both the F0 contour and MFCC frames
    pub hop_ms: f32,

    /// Window used for both the F0 contour and MFCC frames
    pub window_ms: f32,

    /// Feature kind of `features` (always "mfcc" for now)
    pub feature_type: String,

    /// Dimension of each feature vector
    pub feature_dim: usize,

    /// Feature vectors, one per frame
    pub features: Vec<Vec<f32>>,

    /// Parameters the features were extracted with
    pub mfcc: MfccConfig,

    /// F0 frame times in seconds
    pub times: Vec<f32>,

    /// Log-F0 contour, NaN where unvoiced (`null` in JSON)
    #[serde(with = "nan_as_null")]
    pub f0_log: Vec<f32>,
}

impl ReferenceFeature {
    /// The reference contour as an [`F0Result`]
    pub fn contour(&self) -> F0Result {
        F0Result {
            sample_rate: self.sample_rate,
            duration: self.duration,
            times: self.times.clone(),
            f0_log: self.f0_log.clone(),
        }
    }
}

/// Serialize NaN entries as JSON `null` and read them back as NaN
///
/// JSON has no NaN literal; a plain `f32` field would refuse to round-trip.
pub mod nan_as_null {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Write finite values as numbers, everything else as `null`
    pub fn serialize<S>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&v.is_finite().then_some(*v))?;
        }
        seq.end()
    }

    /// Read numbers and `null`s, mapping `null` to NaN
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<Option<f32>>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reference() -> ReferenceFeature {
        ReferenceFeature {
            id: "ma".to_string(),
            key: "ma3".to_string(),
            audio_id: "ma3-f".to_string(),
            sample_rate: 16000,
            duration: 0.5,
            hop_ms: 4.0,
            window_ms: 100.0,
            feature_type: "mfcc".to_string(),
            feature_dim: 2,
            features: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            mfcc: MfccConfig::default(),
            times: vec![0.0, 0.004, 0.008],
            f0_log: vec![5.0, f32::NAN, 5.1],
        }
    }

    #[test]
    fn test_reference_json_uses_null_for_unvoiced() {
        let json = serde_json::to_string(&sample_reference()).unwrap();
        assert!(json.contains("\"f0Log\":[5.0,null,5.1]"), "{}", json);
        assert!(json.contains("\"audioId\":\"ma3-f\""));
        assert!(json.contains("\"sr\":16000"));
        assert!(json.contains("\"nMels\":24"));
    }

    #[test]
    fn test_reference_json_restores_nan() {
        let json = serde_json::to_string(&sample_reference()).unwrap();
        let back: ReferenceFeature = serde_json::from_str(&json).unwrap();
        assert_eq!(back.f0_log[0], 5.0);
        assert!(back.f0_log[1].is_nan());
        assert_eq!(back.features, sample_reference().features);
        assert_eq!(back.mfcc.f_max_hz, None);
    }

    #[test]
    fn test_reference_contour_carries_timing_and_pitch() {
        let contour = sample_reference().contour();
        assert_eq!(contour.sample_rate, 16000);
        assert_eq!(contour.duration, 0.5);
        assert_eq!(contour.times, vec![0.0, 0.004, 0.008]);
        assert_eq!(contour.len(), 3);
        assert!(contour.f0_log[1].is_nan());
        assert!((contour.voiced_ratio() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_f0_result_helpers() {
        let result = F0Result {
            sample_rate: 16000,
            duration: 0.1,
            times: vec![0.0, 0.004, 0.008, 0.012],
            f0_log: vec![200f32.ln(), f32::NAN, 200f32.ln(), f32::NAN],
        };
        assert_eq!(result.len(), 4);
        assert_eq!(result.voiced_ratio(), 0.5);
        assert!((result.f0_hz()[0] - 200.0).abs() < 1e-3);
        assert!(result.f0_hz()[1].is_nan());
    }

    #[test]
    fn test_comparison_result_default_is_zero() {
        let result = ComparisonResult::default();
        assert_eq!(result.corr, 0.0);
        assert_eq!(result.peak_shift_ms, 0.0);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"slopeMatch\""));
        assert!(json.contains("\"peakShiftMs\""));
    }
}
