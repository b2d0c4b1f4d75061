//! # Series Statistics
//!
//! Small numeric helpers shared by the scorers. Every function is total:
//! empty input yields 0 rather than NaN.

/// Arithmetic mean, 0 for an empty slice.
#[must_use]
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation, 0 for fewer than two samples.
#[must_use]
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() <= 1 {
        return 0.0;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// Endpoint-to-endpoint slope `(last - first) / (n - 1)`, 0 for fewer than two samples.
#[must_use]
pub fn endpoint_slope(xs: &[f64]) -> f64 {
    match (xs.first(), xs.last()) {
        (Some(first), Some(last)) if xs.len() >= 2 => (last - first) / (xs.len() - 1) as f64,
        _ => 0.0,
    }
}

/// Clamp into `[0, 1]`. NaN maps to 0.
#[must_use]
pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Round half up (toward positive infinity), so 84.5 -> 85 and -2.5 -> -2.
#[must_use]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Round and clamp a score into `0..=100`. Non-finite input maps to 0.
#[must_use]
pub fn score_0_100(v: f64) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    round_half_up(v).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert!(approx(mean(&[]), 0.0));
        assert!(approx(std_dev(&[]), 0.0));
        assert!(approx(std_dev(&[4.0]), 0.0));
        assert!(approx(endpoint_slope(&[7.0]), 0.0));
    }

    #[test]
    fn population_std_dev() {
        // Classic example: population std of this set is exactly 2.
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(std_dev(&xs), 2.0));
    }

    #[test]
    fn slope_uses_endpoints_only() {
        assert!(approx(endpoint_slope(&[10.0, 50.0, 0.0, 14.0]), 4.0 / 3.0));
    }

    #[test]
    fn rounding_matches_half_up() {
        assert!(approx(round_half_up(84.5), 85.0));
        assert!(approx(round_half_up(84.49), 84.0));
        assert!(approx(round_half_up(-2.5), -2.0));
        assert_eq!(score_0_100(123.0), 100);
        assert_eq!(score_0_100(-5.0), 0);
        assert_eq!(score_0_100(f64::NAN), 0);
    }

    #[test]
    fn clamp01_handles_nan() {
        assert!(approx(clamp01(f64::NAN), 0.0));
        assert!(approx(clamp01(2.0), 1.0));
        assert!(approx(clamp01(-1.0), 0.0));
    }
}
