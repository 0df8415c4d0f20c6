//! Viterbi path over per-frame pitch candidates
//!
//! Cost of a path = Σ observation costs + Σ transition costs, where a
//! transition costs `u_switch` when voicing changes, plus `λ·(Δ log F0)²`
//! between two voiced candidates that both carry a pitch.
//!
//! Ties resolve to the lowest state index, both when choosing a predecessor
//! and when choosing the terminal state, so the decoded path is deterministic.

use super::{Candidate, CandidateGrid, DpSettings};

/// Cost of moving from `prev` to `cur`
pub fn transition_cost(prev: &Candidate, cur: &Candidate, dp: &DpSettings) -> f64 {
    let mut cost = 0.0;
    if prev.is_unvoiced != cur.is_unvoiced {
        cost += dp.u_switch as f64;
    }
    if prev.is_voiced() && cur.is_voiced() {
        let step = cur.log_f0 as f64 - prev.log_f0 as f64;
        cost += dp.lambda as f64 * step * step;
    }
    cost
}

/// Minimum-cost state index for every frame
pub fn best_path(grid: &CandidateGrid, dp: &DpSettings) -> Vec<usize> {
    let n_frames = grid.n_frames();
    let n_states = grid.n_states();
    if n_frames == 0 || n_states == 0 {
        return Vec::new();
    }

    let mut prev_cost: Vec<f64> = grid.frame(0).iter().map(|c| c.cost as f64).collect();
    let mut cur_cost = vec![0.0f64; n_states];
    let mut backpointers = vec![0usize; n_frames * n_states];

    for t in 1..n_frames {
        let prev_frame = grid.frame(t - 1);
        let cur_frame = grid.frame(t);
        for (s, cur) in cur_frame.iter().enumerate() {
            let mut best = f64::INFINITY;
            let mut best_prev = 0;
            for (p, prev) in prev_frame.iter().enumerate() {
                let total = prev_cost[p] + transition_cost(prev, cur, dp);
                if total < best {
                    best = total;
                    best_prev = p;
                }
            }
            cur_cost[s] = cur.cost as f64 + best;
            backpointers[t * n_states + s] = best_prev;
        }
        std::mem::swap(&mut prev_cost, &mut cur_cost);
    }

    let mut state = 0;
    for (s, &cost) in prev_cost.iter().enumerate() {
        if cost < prev_cost[state] {
            state = s;
        }
    }

    let mut path = vec![0usize; n_frames];
    for t in (0..n_frames).rev() {
        path[t] = state;
        state = backpointers[t * n_states + state];
    }

    log::debug!(
        "Viterbi: {} frames x {} states, final cost {:.3}",
        n_frames,
        n_states,
        prev_cost[path[n_frames - 1]]
    );
    path
}

/// Decode the log-F0 contour: the chosen candidate's pitch, NaN when unvoiced
pub fn decode(grid: &CandidateGrid, dp: &DpSettings) -> Vec<f32> {
    best_path(grid, dp)
        .into_iter()
        .enumerate()
        .map(|(t, s)| {
            let cand = &grid.frame(t)[s];
            if cand.is_voiced() {
                cand.log_f0
            } else {
                f32::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn settings() -> DpSettings {
        DpSettings::from_config(&AnalysisConfig::default())
    }

    fn grid(frames: &[Vec<Candidate>]) -> CandidateGrid {
        let mut grid = CandidateGrid::with_capacity(frames[0].len(), frames.len());
        for frame in frames {
            grid.push_frame(frame);
        }
        grid
    }

    #[test]
    fn test_empty_grid() {
        let grid = CandidateGrid::default();
        assert!(best_path(&grid, &settings()).is_empty());
        assert!(decode(&grid, &settings()).is_empty());
    }

    #[test]
    fn test_continuity_beats_greedy_octave_jump() {
        let low = 200f32.ln();
        let high = 400f32.ln();
        let frames = vec![
            vec![Candidate::voiced(low, 0.0), Candidate::voiced(high, 0.5), Candidate::unvoiced(2.0)],
            vec![Candidate::voiced(high, 0.0), Candidate::voiced(low, 0.1), Candidate::unvoiced(2.0)],
            vec![Candidate::voiced(low, 0.0), Candidate::voiced(high, 0.5), Candidate::unvoiced(2.0)],
        ];
        let contour = decode(&grid(&frames), &settings());
        assert_eq!(contour, vec![low, low, low]);
    }

    #[test]
    fn test_switch_cost_bridges_short_unvoiced_dip() {
        let f = 180f32.ln();
        let mut frames = vec![vec![Candidate::voiced(f, 0.3), Candidate::unvoiced(0.5)]; 5];
        frames[2][1] = Candidate::unvoiced(0.0);

        let contour = decode(&grid(&frames), &settings());
        assert!(contour.iter().all(|&v| v == f), "{:?}", contour);

        // Without a switch cost the dip is taken
        let free_switch = DpSettings {
            u_switch: 0.0,
            ..settings()
        };
        let contour = decode(&grid(&frames), &free_switch);
        assert!(contour[2].is_nan());
        assert_eq!(contour[1], f);
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let dp = DpSettings {
            lambda: 0.0,
            ..settings()
        };
        let frames = vec![
            vec![Candidate::voiced(5.0, 0.2), Candidate::voiced(5.5, 0.2), Candidate::unvoiced(1.0)];
            3
        ];
        assert_eq!(best_path(&grid(&frames), &dp), vec![0, 0, 0]);
    }

    #[test]
    fn test_missing_slot_decodes_as_unvoiced() {
        let frames = vec![vec![Candidate::missing(), Candidate::unvoiced(2000.0)]];
        let contour = decode(&grid(&frames), &settings());
        assert_eq!(contour.len(), 1);
        assert!(contour[0].is_nan());
    }

    #[test]
    fn test_transition_cost_components() {
        let dp = settings();
        let a = Candidate::voiced(0.0, 0.0);
        let b = Candidate::voiced(0.1, 0.0);
        let u = Candidate::unvoiced(0.0);
        assert!((transition_cost(&a, &b, &dp) - 80.0 * 0.01).abs() < 1e-6);
        assert_eq!(transition_cost(&a, &u, &dp), 0.5);
        assert_eq!(transition_cost(&u, &u, &dp), 0.0);
        assert_eq!(transition_cost(&Candidate::missing(), &a, &dp), 0.0);
    }
}
