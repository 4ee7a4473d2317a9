/// Normalized Gaussian kernel with radius `round(truncate * sigma)`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// 1-D Gaussian low-pass. The edges are padded by repeating the boundary
/// sample so the output has the same length as the input.
pub fn gaussian_smooth(values: &[f64], sigma: f64, truncate: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let kernel = gaussian_kernel(sigma, truncate);
    let radius = (kernel.len() / 2) as isize;
    let last = values.len() as isize - 1;
    (0..values.len() as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = (i + k as isize - radius).clamp(0, last);
                    w * values[j as usize]
                })
                .sum()
        })
        .collect()
}
