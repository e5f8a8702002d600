//! Engbert & Kliegl saccade detection
//!
//! A sample is a saccade candidate when its 2-D velocity leaves the ellipse
//! spanned by λ times the robust noise level of each axis:
//!
//! ```text
//! (vx / (λ·σx))² + (vy / (λ·σy))² > 1
//! ```

use super::runs::RunFilter;
use super::EventDetector;
use crate::events::types::EventType;
use crate::signal::samples::GazeSamples;
use crate::signal::velocity::{median_standard_deviation, numerical_derivative};
use tracing::debug;

/// Velocity-threshold saccade detector with an adaptive noise floor
#[derive(Debug, Clone, PartialEq)]
pub struct EngbertSaccadeDetector {
    filter: RunFilter,
    derivation_window_size: usize,
    lambda_noise_threshold: f64,
}

impl EngbertSaccadeDetector {
    pub const DEFAULT_DERIVATION_WINDOW_SIZE: usize = 3;
    pub const DEFAULT_LAMBDA_NOISE_THRESHOLD: f64 = 5.0;

    pub fn new(
        filter: RunFilter,
        derivation_window_size: usize,
        lambda_noise_threshold: f64,
    ) -> crate::Result<Self> {
        if derivation_window_size == 0 {
            return Err(crate::Error::Config(
                "derivation window size must be at least 1".to_string(),
            ));
        }
        if !lambda_noise_threshold.is_finite() || lambda_noise_threshold <= 0.0 {
            return Err(crate::Error::Config(format!(
                "lambda noise threshold must be positive and finite, got {}",
                lambda_noise_threshold
            )));
        }
        Ok(Self {
            filter,
            derivation_window_size,
            lambda_noise_threshold,
        })
    }

    pub fn derivation_window_size(&self) -> usize {
        self.derivation_window_size
    }

    pub fn lambda_noise_threshold(&self) -> f64 {
        self.lambda_noise_threshold
    }

    /// Raw per-sample candidates for a pair of coordinate traces
    pub fn candidates(&self, x: &[f64], y: &[f64]) -> crate::Result<Vec<bool>> {
        if x.len() != y.len() {
            return Err(crate::Error::LengthMismatch(format!(
                "x has {} samples but y has {}",
                x.len(),
                y.len()
            )));
        }
        let vx = numerical_derivative(x, self.derivation_window_size)?;
        let vy = numerical_derivative(y, self.derivation_window_size)?;
        let sd_x = median_standard_deviation(&vx);
        let sd_y = median_standard_deviation(&vy);
        debug!(sd_x, sd_y, lambda = self.lambda_noise_threshold, "Engbert noise levels");

        let term = |v: f64, sd: f64| {
            if v == 0.0 {
                0.0
            } else {
                (v / (sd * self.lambda_noise_threshold)).powi(2)
            }
        };

        Ok(vx
            .iter()
            .zip(&vy)
            .map(|(&vx, &vy)| {
                if vx.is_nan() || vy.is_nan() {
                    return false;
                }
                // a zero noise floor puts any movement infinitely far out
                term(vx, sd_x) + term(vy, sd_y) > 1.0
            })
            .collect())
    }
}

impl EventDetector for EngbertSaccadeDetector {
    fn event_type(&self) -> EventType {
        EventType::Saccade
    }

    fn run_filter(&self) -> &RunFilter {
        &self.filter
    }

    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        self.candidates(&samples.x, &samples.y)
    }
}
