//! Wilson score interval for a binomial proportion.

/// z for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Interval for `count` successes out of `total` trials, clamped to `[0, 1]`.
///
/// `None` when `total` is not positive or either input is not finite.
pub fn wilson_interval(count: f64, total: f64, z: f64) -> Option<(f64, f64)> {
    if !count.is_finite() || !total.is_finite() || total <= 0.0 {
        return None;
    }
    let p = count / total;
    let z2 = z * z;
    let denom = 1.0 + z2 / total;
    let centre = (p + z2 / (2.0 * total)) / denom;
    let half = z * (p * (1.0 - p) / total + z2 / (4.0 * total * total)).max(0.0).sqrt() / denom;
    Some(((centre - half).max(0.0), (centre + half).min(1.0)))
}
