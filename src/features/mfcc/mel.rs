//! Window, mel filterbank and DCT tables

/// Hamming window `0.54 - 0.46·cos(2πi / (n-1))`
pub fn hamming(n: usize) -> Vec<f32> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n.saturating_sub(1)) as f64;
    (0..n)
        .map(|i| (0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / denom).cos()) as f32)
        .collect()
}

/// Hz to mel (`2595·log10(1 + hz/700)`)
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Mel to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters, linearly spaced in mel over `[f_min, f_max]`
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build `n_mels` filters for an `n_fft`-point spectrum
    ///
    /// Filter edges are FFT bins `⌊(n_fft + 1)·hz / sr⌋` of `n_mels + 2`
    /// mel-spaced points. Weights rise from the left edge to the centre and
    /// fall to the right edge; bins outside `[0, n_fft/2]` are dropped.
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, f_min_hz: f32, f_max_hz: f32) -> Self {
        let n_bins = n_fft / 2 + 1;
        let mel_min = hz_to_mel(f_min_hz as f64);
        let mel_max = hz_to_mel(f_max_hz as f64);

        let edges: Vec<i64> = (0..n_mels + 2)
            .map(|i| {
                let mel = mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64;
                ((n_fft + 1) as f64 * mel_to_hz(mel) / sample_rate as f64).floor() as i64
            })
            .collect();

        let filters = edges
            .windows(3)
            .map(|w| {
                let (left, center, right) = (w[0], w[1], w[2]);
                let mut filter = vec![0.0f32; n_bins];
                let rise = (center - left).max(1) as f32;
                let fall = (right - center).max(1) as f32;
                for k in left..right {
                    if k < 0 || k as usize >= n_bins {
                        continue;
                    }
                    filter[k as usize] = if k < center {
                        (k - left) as f32 / rise
                    } else {
                        (right - k) as f32 / fall
                    };
                }
                filter
            })
            .collect();

        Self { filters }
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// True when the bank has no filters
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter weights over the spectrum bins
    pub fn filters(&self) -> &[Vec<f32>] {
        &self.filters
    }

    /// Energy captured by each filter from a power spectrum
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|f| f.iter().zip(power).map(|(&w, &p)| w as f64 * p as f64).sum::<f64>() as f32)
            .collect()
    }
}

/// DCT-II basis `cos(π·k·(n + 0.5) / n_mels)`, one row per coefficient, no scaling
pub fn dct_table(n_mfcc: usize, n_mels: usize) -> Vec<Vec<f32>> {
    (0..n_mfcc)
        .map(|k| {
            (0..n_mels)
                .map(|n| {
                    (std::f64::consts::PI * k as f64 * (n as f64 + 0.5) / n_mels as f64).cos() as f32
                })
                .collect()
        })
        .collect()
}

/// Project log mel energies onto the DCT rows
pub fn apply_dct(log_energies: &[f32], table: &[Vec<f32>]) -> Vec<f32> {
    table
        .iter()
        .map(|row| {
            row.iter()
                .zip(log_energies)
                .map(|(&c, &e)| c as f64 * e as f64)
                .sum::<f64>() as f32
        })
        .collect()
}
