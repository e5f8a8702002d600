//! Fixation detectors
//!
//! - I-VT: slow samples (angular velocity under a fixed threshold)
//! - I-DT: windows whose spatial spread stays under a dispersion threshold

use super::runs::RunFilter;
use super::EventDetector;
use crate::events::types::EventType;
use crate::signal::geometry::ViewingGeometry;
use crate::signal::samples::GazeSamples;
use crate::signal::velocity::angular_velocity;

fn require_positive(name: &str, value: f64) -> crate::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(crate::Error::Config(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Velocity-threshold identification
#[derive(Debug, Clone, PartialEq)]
pub struct IvtFixationDetector {
    filter: RunFilter,
    /// Maximum angular velocity of a fixation sample (deg/s)
    velocity_threshold: f64,
    geometry: ViewingGeometry,
}

impl IvtFixationDetector {
    pub const DEFAULT_VELOCITY_THRESHOLD: f64 = 20.0;

    pub fn new(filter: RunFilter, velocity_threshold: f64, geometry: ViewingGeometry) -> crate::Result<Self> {
        require_positive("velocity threshold", velocity_threshold)?;
        geometry.validate()?;
        Ok(Self {
            filter,
            velocity_threshold,
            geometry,
        })
    }

    pub fn velocity_threshold(&self) -> f64 {
        self.velocity_threshold
    }
}

impl EventDetector for IvtFixationDetector {
    fn event_type(&self) -> EventType {
        EventType::Fixation
    }

    fn run_filter(&self) -> &RunFilter {
        &self.filter
    }

    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        let velocities = angular_velocity(&samples.x, &samples.y, self.filter.sampling_rate, &self.geometry)?;
        // NaN compares false
        Ok(velocities.iter().map(|&v| v <= self.velocity_threshold).collect())
    }
}

/// Dispersion-threshold identification
#[derive(Debug, Clone, PartialEq)]
pub struct IdtFixationDetector {
    filter: RunFilter,
    /// Maximum `(max x - min x) + (max y - min y)` of a window (px)
    dispersion_threshold: f64,
}

/// Running bounding box of a window of gaze samples
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn of(x: &[f64], y: &[f64]) -> Option<Self> {
        let mut bounds = Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (&xi, &yi) in x.iter().zip(y) {
            bounds = bounds.extended(xi, yi)?;
        }
        Some(bounds)
    }

    /// `None` when the point is missing; missing samples break a window
    fn extended(self, x: f64, y: f64) -> Option<Self> {
        if x.is_nan() || y.is_nan() {
            return None;
        }
        Some(Self {
            min_x: self.min_x.min(x),
            max_x: self.max_x.max(x),
            min_y: self.min_y.min(y),
            max_y: self.max_y.max(y),
        })
    }

    fn dispersion(&self) -> f64 {
        (self.max_x - self.min_x) + (self.max_y - self.min_y)
    }
}

impl IdtFixationDetector {
    pub const DEFAULT_DISPERSION_THRESHOLD: f64 = 45.0;

    pub fn new(filter: RunFilter, dispersion_threshold: f64) -> crate::Result<Self> {
        require_positive("dispersion threshold", dispersion_threshold)?;
        Ok(Self {
            filter,
            dispersion_threshold,
        })
    }

    pub fn dispersion_threshold(&self) -> f64 {
        self.dispersion_threshold
    }

    /// Initial window length (samples)
    fn window_size(&self) -> usize {
        self.filter.ms_to_samples(self.filter.min_duration_ms).max(2)
    }
}

impl EventDetector for IdtFixationDetector {
    fn event_type(&self) -> EventType {
        EventType::Fixation
    }

    fn run_filter(&self) -> &RunFilter {
        &self.filter
    }

    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        let (x, y) = (&samples.x, &samples.y);
        let n = x.len().min(y.len());
        let window = self.window_size();
        let mut candidates = vec![false; n];

        let mut start = 0;
        while start + window <= n {
            let end = start + window;
            let bounds = match Bounds::of(&x[start..end], &y[start..end]) {
                Some(b) if b.dispersion() <= self.dispersion_threshold => b,
                _ => {
                    start += 1;
                    continue;
                }
            };

            // grow the window while it stays compact
            let mut end = end;
            let mut bounds = bounds;
            while end < n {
                match bounds.extended(x[end], y[end]) {
                    Some(grown) if grown.dispersion() <= self.dispersion_threshold => {
                        bounds = grown;
                        end += 1;
                    }
                    _ => break,
                }
            }

            candidates[start..end].fill(true);
            start = end;
        }
        Ok(candidates)
    }
}
