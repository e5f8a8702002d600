//! Velocity kernels
//!
//! Shifting, windowed differentiation and noise estimation over gaze traces.
//! Missing samples are represented as NaN and propagate through every kernel
//! except [`median_standard_deviation`], which skips them.

use super::geometry::ViewingGeometry;

/// Shift a sequence by `n` positions, filling vacated slots with NaN.
///
/// Positive `n` moves values towards higher indices (`out[i] = seq[i - n]`),
/// negative `n` towards lower indices.
pub fn shift(seq: &[f64], n: isize) -> Vec<f64> {
    let len = seq.len();
    let mut shifted = vec![f64::NAN; len];
    let offset = n.unsigned_abs();
    if offset >= len {
        return shifted;
    }

    if n >= 0 {
        shifted[offset..].copy_from_slice(&seq[..len - offset]);
    } else {
        shifted[..len - offset].copy_from_slice(&seq[offset..]);
    }
    shifted
}

/// Windowed finite-difference velocity estimate (units per sample).
///
/// Generalises Engbert & Kliegl's moving average of differences to a window
/// of `window` samples on each side:
///
/// ```text
/// v[i] = Σ_{k=1..n} (x[i+k] − x[i−k]) / (n·(n+1))
/// ```
///
/// The first and last `window` slots are NaN.
pub fn numerical_derivative(seq: &[f64], window: usize) -> crate::Result<Vec<f64>> {
    if window == 0 {
        return Err(crate::Error::Config(
            "derivation window size must be at least 1".to_string(),
        ));
    }
    if seq.len() < 2 * window {
        return Err(crate::Error::InvalidInput(format!(
            "sequence of length {} is shorter than 2 * window (={})",
            seq.len(),
            2 * window
        )));
    }

    let normalizer = (window * (window + 1)) as f64;
    let mut numerator = vec![0.0; seq.len()];
    for k in 1..=window as isize {
        let ahead = shift(seq, -k);
        let behind = shift(seq, k);
        for (acc, (a, b)) in numerator.iter_mut().zip(ahead.iter().zip(behind.iter())) {
            *acc += a - b;
        }
    }

    Ok(numerator.into_iter().map(|n| n / normalizer).collect())
}

/// Median of the finite values in `values`; NaN when there are none
fn nan_median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));

    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}

/// Robust dispersion estimate: `sqrt(median((x - median(x))^2))`.
///
/// NaN entries are ignored; an all-NaN sequence yields NaN.
pub fn median_standard_deviation(seq: &[f64]) -> f64 {
    let median = nan_median(seq);
    if median.is_nan() {
        return f64::NAN;
    }
    let squared_deviations: Vec<f64> = seq.iter().map(|v| (v - median).powi(2)).collect();
    nan_median(&squared_deviations).sqrt()
}

/// Sample-to-sample angular velocity (degrees/second).
///
/// Index 0 has no predecessor and is NaN, as is any sample adjacent to a
/// missing one.
pub fn angular_velocity(
    x: &[f64],
    y: &[f64],
    sampling_rate: f64,
    geometry: &ViewingGeometry,
) -> crate::Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(crate::Error::LengthMismatch(format!(
            "x has {} samples but y has {}",
            x.len(),
            y.len()
        )));
    }
    if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
        return Err(crate::Error::InvalidInput(format!(
            "sampling rate must be positive and finite, got {}",
            sampling_rate
        )));
    }

    let prev_x = shift(x, 1);
    let prev_y = shift(y, 1);
    let velocities = (0..x.len())
        .map(|i| geometry.visual_angle((prev_x[i], prev_y[i]), (x[i], y[i])) * sampling_rate)
        .collect();
    Ok(velocities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_positive() {
        let seq: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let shifted = shift(&seq, 1);

        assert!(shifted[0].is_nan());
        for i in 1..seq.len() {
            assert_eq!(shifted[i], seq[i - 1]);
        }
    }

    #[test]
    fn test_shift_negative() {
        let seq: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let shifted = shift(&seq, -2);

        for i in 0..seq.len() - 2 {
            assert_eq!(shifted[i], seq[i + 2]);
        }
        assert!(shifted[6].is_nan());
        assert!(shifted[7].is_nan());
    }

    #[test]
    fn test_shift_beyond_length() {
        let seq = vec![1.0, 2.0, 3.0];
        assert!(shift(&seq, 3).iter().all(|v| v.is_nan()));
        assert!(shift(&seq, -5).iter().all(|v| v.is_nan()));
        assert_eq!(shift(&seq, 0), seq);
    }

    #[test]
    fn test_derivative_of_linear_ramp() {
        // x = 2i has slope 2 per sample everywhere the window fits
        let seq: Vec<f64> = (0..20).map(|i| 2.0 * i as f64).collect();
        let v = numerical_derivative(&seq, 3).unwrap();

        assert_eq!(v.len(), seq.len());
        for (i, value) in v.iter().enumerate() {
            if i < 3 || i >= 17 {
                assert!(value.is_nan(), "edge slot {} should be NaN", i);
            } else {
                assert!((value - 2.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_derivative_window_two_matches_engbert() {
        let seq = vec![0.0, 1.0, 4.0, 9.0, 16.0, 25.0];
        let v = numerical_derivative(&seq, 2).unwrap();
        // (x3 + x4 - x1 - x0) / 6 at i = 2
        assert!((v[2] - (9.0 + 16.0 - 1.0 - 0.0) / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_too_short() {
        let seq = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(matches!(
            numerical_derivative(&seq, 3),
            Err(crate::Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_derivative_zero_window() {
        assert!(matches!(
            numerical_derivative(&[1.0, 2.0], 0),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_median_standard_deviation_ignores_outlier() {
        let seq = vec![1.0, 2.0, 3.0, 4.0, 1000.0];
        // median = 3, squared deviations = [4, 1, 0, 1, 994009], median = 1
        assert!((median_standard_deviation(&seq) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_standard_deviation_skips_nan() {
        let seq = vec![f64::NAN, 1.0, 2.0, 3.0, f64::NAN];
        // median = 2, squared deviations = [1, 0, 1], median = 1
        assert!((median_standard_deviation(&seq) - 1.0).abs() < 1e-12);
        assert!(median_standard_deviation(&[f64::NAN, f64::NAN]).is_nan());
        assert!(median_standard_deviation(&[]).is_nan());
    }

    #[test]
    fn test_median_standard_deviation_constant() {
        assert_eq!(median_standard_deviation(&[5.0; 10]), 0.0);
    }

    #[test]
    fn test_angular_velocity_constant_motion() {
        let geometry = ViewingGeometry::default();
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0; 10];
        let v = angular_velocity(&x, &y, 500.0, &geometry).unwrap();

        let expected = geometry.visual_angle((0.0, 0.0), (1.0, 0.0)) * 500.0;
        assert!(v[0].is_nan());
        for value in &v[1..] {
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_angular_velocity_validation() {
        let geometry = ViewingGeometry::default();
        assert!(angular_velocity(&[1.0, 2.0], &[1.0], 500.0, &geometry).is_err());
        assert!(angular_velocity(&[1.0], &[1.0], 0.0, &geometry).is_err());
        assert!(angular_velocity(&[1.0], &[1.0], f64::NAN, &geometry).is_err());
    }
}
