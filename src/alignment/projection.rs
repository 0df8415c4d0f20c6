//! Reference contour projected onto the user's timeline

/// Resample `reference` onto `user_len` frames through a DTW path
///
/// The path pairs reference frame `i` with user frame `j`. Each user frame
/// receives the mean of the finite reference values aligned to it, or NaN
/// when none are. Path entries outside either contour are ignored.
pub fn project_reference(reference: &[f32], user_len: usize, path: &[(usize, usize)]) -> Vec<f32> {
    let mut sums = vec![0.0f64; user_len];
    let mut counts = vec![0usize; user_len];

    for &(i, j) in path {
        let Some(&value) = reference.get(i) else {
            continue;
        };
        if j < user_len && value.is_finite() {
            sums[j] += value as f64;
            counts[j] += 1;
        }
    }

    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| {
            if count == 0 {
                f32::NAN
            } else {
                (sum / count as f64) as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_path_copies_reference() {
        let reference = [1.0, f32::NAN, 3.0];
        let path = vec![(0, 0), (1, 1), (2, 2)];
        let projected = project_reference(&reference, 3, &path);
        assert_eq!(projected[0], 1.0);
        assert!(projected[1].is_nan());
        assert_eq!(projected[2], 3.0);
    }

    #[test]
    fn test_many_to_one_is_averaged() {
        let reference = [1.0, 2.0, 6.0, 4.0];
        let path = vec![(0, 0), (1, 0), (2, 1), (3, 1), (3, 2)];
        let projected = project_reference(&reference, 3, &path);
        assert_eq!(projected, vec![1.5, 5.0, 4.0]);
    }

    #[test]
    fn test_empty_path_is_all_nan() {
        let projected = project_reference(&[1.0, 2.0], 4, &[]);
        assert_eq!(projected.len(), 4);
        assert!(projected.iter().all(|v| v.is_nan()));
    }
}
