//! Descriptive statistics shared by every stage.
//!
//! All functions are total: degenerate input (empty slices, zero variance)
//! yields 0 rather than NaN.

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population variance.
pub fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64
}

pub fn std_dev(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// Z-score of `x` against `window`. Zero when the window has no spread.
pub fn z_score(x: f64, window: &[f64]) -> f64 {
    let sd = std_dev(window);
    if sd == 0.0 || !sd.is_finite() { return 0.0; }
    (x - mean(window)) / sd
}

/// Pearson correlation `r = Σdxdy / sqrt(Σdx² · Σdy²)` over deviations from
/// the means. Algebraically the raw-sum formula, but stays exact on series
/// sitting on a large offset (epoch seconds, readings near 1e9).
///
/// Only the common prefix of `x` and `y` is used. Returns 0 when the
/// denominator vanishes (e.g. a constant series) and clamps rounding drift
/// into [-1, 1].
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 { return 0.0; }

    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (sxy / denominator).clamp(-1.0, 1.0)
}

/// Value at quantile `q` of an ascending slice (index `floor(q·n)`, clamped).
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() { return 0.0; }
    let idx = (q.clamp(0.0, 1.0) * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
