//! False discovery rate scores for a ranked list of p-values.

/// Computes the per-rank false discovery rate of ascending p-values.
///
/// The value at 1-based rank `i` of `N` p-values is `p_i * N / i`. No
/// cumulative minimum is taken, so the scores are not forced to be
/// monotonic, and they are not clamped to 1.
///
/// # Panics
///
/// Panics in debug mode if `sorted_p_values` is not sorted in ascending order.
///
/// # Examples
///
/// ```
/// use kmrank_stats::fdr::false_discovery_rates;
///
/// let fdr = false_discovery_rates(&[0.01, 0.03, 0.10]);
/// assert!((fdr[0] - 0.03).abs() < 1e-12);
/// assert!((fdr[1] - 0.045).abs() < 1e-12);
/// assert!((fdr[2] - 0.10).abs() < 1e-12);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn false_discovery_rates(sorted_p_values: &[f64]) -> Vec<f64> {
    debug_assert!(
        sorted_p_values.is_sorted_by(|a, b| a <= b),
        "p-values must be sorted in ascending order"
    );

    let n = sorted_p_values.len() as f64;
    sorted_p_values
        .iter()
        .enumerate()
        .map(|(index, p)| p * n / (index + 1) as f64)
        .collect()
}
