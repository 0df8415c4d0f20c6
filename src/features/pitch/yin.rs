//! YIN difference function, CMND and pitch candidates
//!
//! Each analysis frame of `frame_size` samples (starting at `hop * index`) is
//! reduced to its cumulative mean normalized difference (CMND):
//!
//! 1. Difference function: `d[τ] = Σ (x[i] - x[i+τ])²` for `τ` in `[0, τmax]`
//! 2. CMND: `cmnd[0] = 1`, `cmnd[τ] = d[τ]·τ / (Σ_{k=1..τ} d[k] + ε)`
//!
//! Two consumers sit on top of the CMND:
//!
//! - [`track_threshold`]: the classic tracker. First dip below the threshold,
//!   walked down to its local minimum, with an RMS silence gate in front.
//! - [`extract_candidates`]: every local minimum of the CMND, best `top_k`
//!   kept as voiced candidates, plus one unvoiced candidate whose cost grows
//!   with frame energy. The Viterbi stabiliser picks the path.
//!
//! # Reference
//!
//! de Cheveigné, A., & Kawahara, H. (2002). YIN, a fundamental frequency
//! estimator for speech and music. *JASA*, 111(4), 1917-1930.
//!
//! Mauch, M., & Dixon, S. (2014). pYIN: A fundamental frequency estimator
//! using probabilistic threshold distributions. *ICASSP 2014*.

use super::{Candidate, CandidateGrid, DpSettings};
use crate::config::AnalysisConfig;

/// Guard added to the CMND running sum
const CMND_EPSILON: f64 = 1e-12;

/// Parabola denominators below this are treated as flat
const FLAT_PARABOLA: f64 = 1e-12;

/// Observation cost of an empty or rejected voiced slot
pub const MISSING_CANDIDATE_COST: f32 = 1e3;

/// Unvoiced cost gain per unit of `rms / rms_silence`
const ENERGY_PENALTY_SLOPE: f64 = 0.6;

/// Cap on `rms / rms_silence` in the unvoiced cost
const ENERGY_RATIO_CAP: f64 = 8.0;

/// Voiced cost added at `τmax`, proportionally less at shorter lags
///
/// Dips of equal depth then favour the shortest period, the way the first-dip
/// rule does: an exactly periodic frame dips to ~0 at every multiple of its
/// period.
const LAG_PENALTY: f64 = 1e-3;

/// Frame geometry and pitch band for YIN
#[derive(Debug, Clone)]
pub struct YinParams {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frame size in samples
    pub frame_size: usize,
    /// Hop size in samples
    pub hop: usize,
    /// Lowest accepted F0
    pub f_min_hz: f32,
    /// Highest accepted F0
    pub f_max_hz: f32,
    /// CMND threshold for [`track_threshold`]
    pub threshold: f32,
    /// Frame RMS below which a frame is silent
    pub rms_silence: f32,
}

impl YinParams {
    /// Derive YIN parameters from an analysis configuration
    pub fn from_config(config: &AnalysisConfig, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frame_size: config.frame_size(sample_rate),
            hop: config.hop_samples(sample_rate),
            f_min_hz: config.f_min_hz,
            f_max_hz: config.f_max_hz,
            threshold: config.yin_threshold,
            rms_silence: config.rms_silence,
        }
    }

    /// Lag search range `(τmin, τmax)`
    ///
    /// `τmin = max(2, ⌊sr / fmax⌋)`, `τmax = min(frame_size - 2, ⌊sr / fmin⌋)`.
    pub fn lag_range(&self) -> (usize, usize) {
        let sr = self.sample_rate as f64;
        let tau_min = ((sr / self.f_max_hz as f64).floor() as usize).max(2);
        let tau_max = self
            .frame_size
            .saturating_sub(2)
            .min((sr / self.f_min_hz as f64).floor() as usize);
        (tau_min, tau_max)
    }

    /// Number of complete frames in a buffer of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.frame_size || self.hop == 0 {
            0
        } else {
            (len - self.frame_size) / self.hop + 1
        }
    }

    fn accepts(&self, f0: f64) -> bool {
        f0.is_finite() && f0 >= self.f_min_hz as f64 && f0 <= self.f_max_hz as f64
    }
}

/// Root-mean-square of a frame
pub fn frame_rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

/// YIN difference function for lags `0..=tau_max` (written into `d`)
pub fn difference_function(frame: &[f32], d: &mut [f64]) {
    let n = frame.len();
    if d.is_empty() {
        return;
    }
    d[0] = 0.0;
    for tau in 1..d.len() {
        let lim = n.saturating_sub(tau);
        d[tau] = frame[..lim]
            .iter()
            .zip(&frame[tau..tau + lim])
            .map(|(&a, &b)| {
                let delta = a as f64 - b as f64;
                delta * delta
            })
            .sum();
    }
}

/// Cumulative mean normalized difference of `d` (written into `cmnd`)
pub fn cumulative_mean_normalized(d: &[f64], cmnd: &mut [f64]) {
    if cmnd.is_empty() {
        return;
    }
    cmnd[0] = 1.0;
    let mut running_sum = 0.0;
    for tau in 1..d.len().min(cmnd.len()) {
        running_sum += d[tau];
        cmnd[tau] = d[tau] * tau as f64 / (running_sum + CMND_EPSILON);
    }
}

/// Sub-sample refinement of a CMND minimum by parabolic interpolation
///
/// Neighbours are clamped to `[lo, hi]`; if a neighbour collapses onto the
/// centre or the parabola is flat, the integer lag is returned.
pub fn parabolic_refine(cmnd: &[f64], tau: usize, lo: usize, hi: usize) -> f64 {
    let x1 = tau.saturating_sub(1).max(lo);
    let x3 = (tau + 1).min(hi);
    if x1 == tau || x3 == tau || x3 >= cmnd.len() {
        return tau as f64;
    }

    let (y1, y2, y3) = (cmnd[x1], cmnd[tau], cmnd[x3]);
    let denom = y1 - 2.0 * y2 + y3;
    if denom.abs() < FLAT_PARABOLA {
        return tau as f64;
    }
    tau as f64 + 0.5 * (y1 - y3) / denom
}

/// Reusable per-frame CMND computation
struct CmndFrame {
    d: Vec<f64>,
    cmnd: Vec<f64>,
}

impl CmndFrame {
    fn new(tau_max: usize) -> Self {
        Self {
            d: vec![0.0; tau_max + 1],
            cmnd: vec![0.0; tau_max + 1],
        }
    }

    fn compute(&mut self, frame: &[f32]) -> &[f64] {
        difference_function(frame, &mut self.d);
        cumulative_mean_normalized(&self.d, &mut self.cmnd);
        &self.cmnd
    }
}

/// Threshold YIN tracker
///
/// Frames below the RMS gate are unvoiced without further work. Otherwise the
/// first lag from `τmin` whose CMND drops below the threshold is followed
/// downhill to its local minimum and refined; F0 outside the band is rejected.
///
/// # Returns
///
/// One F0 value in Hz per frame, NaN for unvoiced frames
pub fn track_threshold(samples: &[f32], params: &YinParams) -> Vec<f32> {
    let n_frames = params.frame_count(samples.len());
    let (tau_min, tau_max) = params.lag_range();
    log::debug!(
        "YIN threshold tracking: {} frames, frame={}, hop={}, lags=[{}, {}]",
        n_frames,
        params.frame_size,
        params.hop,
        tau_min,
        tau_max
    );

    let mut out = vec![f32::NAN; n_frames];
    let mut work = CmndFrame::new(tau_max);
    let sr = params.sample_rate as f64;

    for (fi, slot) in out.iter_mut().enumerate() {
        let start = fi * params.hop;
        let frame = &samples[start..start + params.frame_size];

        if frame_rms(frame) < params.rms_silence as f64 {
            continue;
        }

        let cmnd = work.compute(frame);
        let Some(tau) = first_dip(cmnd, tau_min, tau_max, params.threshold as f64) else {
            continue;
        };

        let f0 = sr / parabolic_refine(cmnd, tau, 1, tau_max);
        if params.accepts(f0) {
            *slot = f0 as f32;
        }
    }

    out
}

fn first_dip(cmnd: &[f64], tau_min: usize, tau_max: usize, threshold: f64) -> Option<usize> {
    let mut tau = (tau_min..=tau_max).find(|&tau| cmnd[tau] < threshold)?;
    while tau < tau_max && cmnd[tau + 1] < cmnd[tau] {
        tau += 1;
    }
    Some(tau)
}

/// Local minima of the CMND in `[τmin + 1, τmax - 1]`, best (lowest) first
///
/// A lag is a local minimum when `cmnd[τ] ≤ cmnd[τ-1]` and `cmnd[τ] < cmnd[τ+1]`.
/// Equal values keep ascending lag order.
pub fn cmnd_minima(cmnd: &[f64], tau_min: usize, tau_max: usize) -> Vec<(usize, f64)> {
    let mut minima: Vec<(usize, f64)> = ((tau_min + 1)..tau_max)
        .filter(|&tau| cmnd[tau] <= cmnd[tau - 1] && cmnd[tau] < cmnd[tau + 1])
        .map(|tau| (tau, cmnd[tau]))
        .collect();
    minima.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    minima
}

/// Per-frame voiced/unvoiced candidates for the Viterbi stabiliser
///
/// Every frame gets exactly `top_k + 1` candidates: `top_k` voiced slots
/// ranked by CMND minimum (empty slots carry [`MISSING_CANDIDATE_COST`] and a
/// NaN pitch) followed by the unvoiced candidate. A voiced candidate's cost is
/// its CMND value plus a small lag penalty.
pub fn extract_candidates(samples: &[f32], params: &YinParams, dp: &DpSettings) -> CandidateGrid {
    let n_frames = params.frame_count(samples.len());
    let (tau_min, tau_max) = params.lag_range();
    let top_k = dp.top_k;
    log::debug!(
        "YIN candidate extraction: {} frames, top_k={}, lags=[{}, {}], shaping={}",
        n_frames,
        top_k,
        tau_min,
        tau_max,
        dp.prior_shaping
    );

    let mut grid = CandidateGrid::with_capacity(top_k + 1, n_frames);
    let mut work = CmndFrame::new(tau_max);
    let mut frame_cands = Vec::with_capacity(top_k + 1);
    let sr = params.sample_rate as f64;
    let rms_silence = params.rms_silence as f64;

    for fi in 0..n_frames {
        let start = fi * params.hop;
        let frame = &samples[start..start + params.frame_size];
        let rms = frame_rms(frame);
        let cmnd = work.compute(frame);
        let minima = cmnd_minima(cmnd, tau_min, tau_max);

        frame_cands.clear();
        for k in 0..top_k {
            let voiced = minima.get(k).and_then(|&(tau, value)| {
                let f0 = sr / parabolic_refine(cmnd, tau, 1, tau_max);
                let cost = value + LAG_PENALTY * tau as f64 / tau_max as f64;
                params
                    .accepts(f0)
                    .then(|| Candidate::voiced(f0.ln() as f32, cost as f32))
            });
            frame_cands.push(voiced.unwrap_or_else(Candidate::missing));
        }

        let unvoiced_cost = if rms < rms_silence {
            0.0
        } else {
            let ratio = (rms / (rms_silence + CMND_EPSILON)).min(ENERGY_RATIO_CAP);
            dp.u_penalty as f64 + ENERGY_PENALTY_SLOPE * ratio
        };
        frame_cands.push(Candidate::unvoiced(unvoiced_cost as f32));

        if dp.prior_shaping {
            let near_silence = rms < rms_silence * dp.near_silence_ratio as f64;
            shape_costs(&mut frame_cands, dp, near_silence);
        }

        log::trace!(
            "frame {}: rms={:.4}, {} minima, unvoiced cost {:.3}",
            fi,
            rms,
            minima.len(),
            frame_cands[top_k].cost
        );
        grid.push_frame(&frame_cands);
    }

    grid
}

/// Min-max scale the voiced costs and apply voicing priors and near-silence biases
///
/// Only voiced slots that carry a pitch take part in the scaling; empty slots
/// keep their sentinel cost.
fn shape_costs(cands: &mut [Candidate], dp: &DpSettings, near_silence: bool) {
    let voiced_prior = dp.voiced_prior as f64;
    let prior_voiced_cost = -voiced_prior.max(1e-6).ln();
    let prior_unvoiced_cost = -(1.0 - voiced_prior).max(1e-6).ln();

    let (min_cost, max_cost) = cands
        .iter()
        .filter(|c| c.is_voiced())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.cost as f64), hi.max(c.cost as f64))
        });
    let denom = (max_cost - min_cost).max(1e-6);
    let voiced_bias = if near_silence {
        dp.near_silence_voiced_bias as f64
    } else {
        0.0
    };
    let unvoiced_bias = if near_silence {
        dp.near_silence_unvoiced_bias as f64
    } else {
        0.0
    };

    for cand in cands.iter_mut() {
        if cand.is_unvoiced {
            cand.cost = (cand.cost as f64 + prior_unvoiced_cost - unvoiced_bias) as f32;
        } else if cand.is_voiced() {
            let scaled = (cand.cost as f64 - min_cost) / denom;
            cand.cost = (scaled + prior_voiced_cost + voiced_bias) as f32;
        }
    }
}
