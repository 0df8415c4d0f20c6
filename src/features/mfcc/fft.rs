//! In-place iterative radix-2 FFT
//!
//! Bit-reversal permutation followed by `log2(n)` butterfly stages. Frames
//! are small (a few thousand samples) and transformed once each, so the
//! twiddles are generated by recurrence per stage instead of being cached.

/// Forward complex FFT of `(re, im)` in place
///
/// # Panics
///
/// If the buffers differ in length or the length is not a power of two.
pub fn fft_in_place(re: &mut [f32], im: &mut [f32]) {
    let n = re.len();
    assert_eq!(n, im.len(), "real and imaginary buffers must match");
    assert!(n.is_power_of_two(), "FFT length must be a power of two, got {}", n);

    bit_reverse_permute(re, im);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let angle = -2.0 * std::f64::consts::PI / len as f64;
        let (step_sin, step_cos) = angle.sin_cos();

        for block in (0..n).step_by(len) {
            let (mut w_re, mut w_im) = (1.0f64, 0.0f64);
            for j in 0..half {
                let a = block + j;
                let b = a + half;
                let v_re = re[b] as f64 * w_re - im[b] as f64 * w_im;
                let v_im = re[b] as f64 * w_im + im[b] as f64 * w_re;
                let (u_re, u_im) = (re[a] as f64, im[a] as f64);

                re[a] = (u_re + v_re) as f32;
                im[a] = (u_im + v_im) as f32;
                re[b] = (u_re - v_re) as f32;
                im[b] = (u_im - v_im) as f32;

                let next_re = w_re * step_cos - w_im * step_sin;
                w_im = w_re * step_sin + w_im * step_cos;
                w_re = next_re;
            }
        }
        len <<= 1;
    }
}

fn bit_reverse_permute(re: &mut [f32], im: &mut [f32]) {
    let n = re.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }
}

/// Power spectrum `|X[k]|²` over the `n/2 + 1` non-negative frequency bins
pub fn power_spectrum(re: &[f32], im: &[f32]) -> Vec<f32> {
    let n_bins = re.len() / 2 + 1;
    re.iter()
        .zip(im)
        .take(n_bins)
        .map(|(&r, &i)| r * r + i * i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    fn test_signal(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32;
                (0.3 * t).sin() + 0.5 * (1.7 * t).cos() + if i % 7 == 0 { 0.25 } else { -0.1 }
            })
            .collect()
    }

    #[test]
    fn test_impulse_is_flat() {
        let mut re = vec![0.0f32; 16];
        let mut im = vec![0.0f32; 16];
        re[0] = 1.0;
        fft_in_place(&mut re, &mut im);
        for k in 0..16 {
            assert!((re[k] - 1.0).abs() < 1e-6, "bin {} real part {}", k, re[k]);
            assert!(im[k].abs() < 1e-6, "bin {} imag part {}", k, im[k]);
        }
    }

    #[test]
    fn test_matches_rustfft() {
        let n = 512;
        let signal = test_signal(n);

        let mut re = signal.clone();
        let mut im = vec![0.0f32; n];
        fft_in_place(&mut re, &mut im);

        let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

        for k in 0..n {
            assert!(
                (re[k] - buffer[k].re).abs() < 1e-3 && (im[k] - buffer[k].im).abs() < 1e-3,
                "bin {} differs: ({}, {}) vs ({}, {})",
                k,
                re[k],
                im[k],
                buffer[k].re,
                buffer[k].im
            );
        }
    }

    #[test]
    fn test_power_spectrum_of_pure_tone() {
        let n = 64;
        let mut re: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 4.0 * i as f32 / n as f32).cos())
            .collect();
        let mut im = vec![0.0f32; n];
        fft_in_place(&mut re, &mut im);
        let power = power_spectrum(&re, &im);

        assert_eq!(power.len(), n / 2 + 1);
        let peak = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k);
        assert_eq!(peak, Some(4));
        // (n/2)^2 for a unit cosine
        assert!((power[4] - 1024.0).abs() < 1e-2);
    }

    #[test]
    fn test_length_one_is_identity() {
        let mut re = vec![3.0f32];
        let mut im = vec![0.5f32];
        fft_in_place(&mut re, &mut im);
        assert_eq!((re[0], im[0]), (3.0, 0.5));
    }
}
