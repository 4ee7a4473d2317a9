use ndarray::ArrayView1;

/// Mean and population standard deviation, or `None` for an empty slice.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let view = ArrayView1::from(values);
    let mean = view.mean()?;
    Some((mean, view.std(0.0)))
}

/// (min, max) of a slice, or `None` when empty.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Consecutive differences.
pub fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn population_std() {
        let (mean, std) = mean_std(&[2.0, 2.0, 2.0, 8.0, 2.0]).unwrap();
        assert_relative_eq!(mean, 3.2, epsilon = 1e-12);
        assert_relative_eq!(std, 2.4, epsilon = 1e-12);
    }

    #[test]
    fn empty_inputs() {
        assert!(mean_std(&[]).is_none());
        assert!(min_max(&[]).is_none());
        assert!(diffs(&[1.0]).is_empty());
    }

    #[test]
    fn min_max_and_diffs() {
        assert_eq!(min_max(&[3.0, -1.0, 7.5]), Some((-1.0, 7.5)));
        assert_eq!(diffs(&[1.0, 3.0, 6.0]), vec![2.0, 3.0]);
    }
}
