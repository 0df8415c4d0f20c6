//! Pitch (F0) contour tracking
//!
//! Two trackers share the YIN front end:
//!
//! - **Threshold** ([`yin::track_threshold`]): per-frame decisions, cheap,
//!   prone to octave errors on breathy or noisy input
//! - **Stabilised** ([`yin::extract_candidates`] + [`viterbi::decode`]):
//!   several candidates per frame plus an unvoiced state, with a Viterbi path
//!   trading observation cost against pitch continuity and voicing switches
//!
//! Both produce a natural-log F0 contour (NaN = unvoiced) that goes through
//! [`postfilter`] before being returned to callers.

pub mod postfilter;
pub mod viterbi;
pub mod yin;

use crate::config::AnalysisConfig;

/// One state of the per-frame state space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Natural-log F0; NaN for the unvoiced state and for empty voiced slots
    pub log_f0: f32,

    /// Observation cost (lower is better)
    pub cost: f32,

    /// True for the single unvoiced state of each frame
    pub is_unvoiced: bool,
}

impl Candidate {
    /// Voiced candidate with a pitch
    pub fn voiced(log_f0: f32, cost: f32) -> Self {
        Self {
            log_f0,
            cost,
            is_unvoiced: false,
        }
    }

    /// Voiced slot with no usable pitch
    pub fn missing() -> Self {
        Self {
            log_f0: f32::NAN,
            cost: yin::MISSING_CANDIDATE_COST,
            is_unvoiced: false,
        }
    }

    /// The unvoiced state
    pub fn unvoiced(cost: f32) -> Self {
        Self {
            log_f0: f32::NAN,
            cost,
            is_unvoiced: true,
        }
    }

    /// Voiced with a finite pitch
    pub fn is_voiced(&self) -> bool {
        !self.is_unvoiced && self.log_f0.is_finite()
    }
}

/// Candidates for every frame, `n_states` per frame, stored frame-major
#[derive(Debug, Clone, Default)]
pub struct CandidateGrid {
    n_states: usize,
    candidates: Vec<Candidate>,
}

impl CandidateGrid {
    /// Empty grid with room for `n_frames` frames of `n_states` candidates
    pub fn with_capacity(n_states: usize, n_frames: usize) -> Self {
        Self {
            n_states,
            candidates: Vec::with_capacity(n_states * n_frames),
        }
    }

    /// Append one frame
    ///
    /// # Panics
    ///
    /// If `frame.len()` differs from the grid's state count.
    pub fn push_frame(&mut self, frame: &[Candidate]) {
        assert_eq!(frame.len(), self.n_states, "candidate count per frame is fixed");
        self.candidates.extend_from_slice(frame);
    }

    /// Candidates per frame
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        if self.n_states == 0 {
            0
        } else {
            self.candidates.len() / self.n_states
        }
    }

    /// Candidates of frame `t`
    pub fn frame(&self, t: usize) -> &[Candidate] {
        &self.candidates[t * self.n_states..(t + 1) * self.n_states]
    }
}

/// Sanitised knobs of the stabilised tracker
#[derive(Debug, Clone, PartialEq)]
pub struct DpSettings {
    /// Voiced candidates per frame (2-6)
    pub top_k: usize,
    /// Weight on squared log-F0 steps
    pub lambda: f32,
    /// Voicing switch cost
    pub u_switch: f32,
    /// Base unvoiced cost in energetic frames
    pub u_penalty: f32,
    /// Apply min-max scaling, priors and biases to observation costs
    pub prior_shaping: bool,
    /// Prior probability of voicing (0.05-0.95)
    pub voiced_prior: f32,
    /// Near-silence multiplier on the RMS gate (>= 1)
    pub near_silence_ratio: f32,
    /// Voiced cost bias near silence
    pub near_silence_voiced_bias: f32,
    /// Unvoiced cost relief near silence
    pub near_silence_unvoiced_bias: f32,
}

impl DpSettings {
    /// Clamp configuration values into their working ranges
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            top_k: config.dp_top_k.clamp(2, 6),
            lambda: non_negative(config.dp_lambda),
            u_switch: non_negative(config.dp_u_switch),
            u_penalty: non_negative(config.dp_u_penalty),
            prior_shaping: config.prior_shaping,
            voiced_prior: if config.voiced_prior.is_finite() {
                config.voiced_prior.clamp(0.05, 0.95)
            } else {
                0.55
            },
            near_silence_ratio: if config.near_silence_ratio.is_finite() {
                config.near_silence_ratio.max(1.0)
            } else {
                1.0
            },
            near_silence_voiced_bias: non_negative(config.near_silence_voiced_bias),
            near_silence_unvoiced_bias: non_negative(config.near_silence_unvoiced_bias),
        }
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Raw (unfiltered) log-F0 contour using the tracker selected by `config`
///
/// `samples` must be at `sample_rate`; the config is assumed validated.
pub fn track_log_f0(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Vec<f32> {
    let params = yin::YinParams::from_config(config, sample_rate);
    if config.dp_enabled {
        let dp = DpSettings::from_config(config);
        let grid = yin::extract_candidates(samples, &params, &dp);
        viterbi::decode(&grid, &dp)
    } else {
        yin::track_threshold(samples, &params)
            .into_iter()
            .map(|f0| if f0.is_finite() && f0 > 0.0 { f0.ln() } else { f32::NAN })
            .collect()
    }
}
