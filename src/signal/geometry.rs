//! Screen geometry and visual angles
//!
//! Converts pixel distances on the stimulus screen into degrees of visual
//! angle for a viewer seated at a known distance from the screen center.

use serde::{Deserialize, Serialize};

/// Physical description of the stimulus screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenMonitor {
    /// Screen width (cm)
    pub width_cm: f64,
    /// Screen height (cm)
    pub height_cm: f64,
    /// Resolution as (width, height) in pixels
    pub resolution: (u32, u32),
    /// Refresh rate (Hz)
    pub refresh_rate_hz: f64,
}

impl ScreenMonitor {
    /// Create a monitor description, rejecting non-physical values
    pub fn new(width_cm: f64, height_cm: f64, resolution: (u32, u32), refresh_rate_hz: f64) -> crate::Result<Self> {
        let monitor = Self {
            width_cm,
            height_cm,
            resolution,
            refresh_rate_hz,
        };
        monitor.validate()?;
        Ok(monitor)
    }

    /// Check all dimensions are positive and finite
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("width_cm", self.width_cm),
            ("height_cm", self.height_cm),
            ("refresh_rate_hz", self.refresh_rate_hz),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(crate::Error::Config(format!(
                    "screen {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err(crate::Error::Config(format!(
                "screen resolution must be non-zero, got {:?}",
                self.resolution
            )));
        }
        Ok(())
    }

    /// Approximate size of one pixel (cm), from the screen diagonal
    pub fn pixel_size(&self) -> f64 {
        let diagonal_cm = self.width_cm.hypot(self.height_cm);
        let diagonal_px = (self.resolution.0 as f64).hypot(self.resolution.1 as f64);
        diagonal_cm / diagonal_px
    }
}

impl Default for ScreenMonitor {
    fn default() -> Self {
        Self {
            width_cm: 53.5,
            height_cm: 31.0,
            resolution: (1920, 1080),
            refresh_rate_hz: 60.0,
        }
    }
}

/// Monitor plus the viewer's distance from it.
///
/// Passed explicitly into every computation that needs visual angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewingGeometry {
    /// Distance between the subject's eyes and the screen center (cm)
    pub viewer_distance_cm: f64,
    pub monitor: ScreenMonitor,
}

impl ViewingGeometry {
    pub fn new(monitor: ScreenMonitor, viewer_distance_cm: f64) -> crate::Result<Self> {
        let geometry = Self {
            monitor,
            viewer_distance_cm,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.monitor.validate()?;
        if !self.viewer_distance_cm.is_finite() || self.viewer_distance_cm <= 0.0 {
            return Err(crate::Error::Config(format!(
                "viewer_distance_cm must be positive and finite, got {}",
                self.viewer_distance_cm
            )));
        }
        Ok(())
    }

    /// Visual angle (degrees) between two on-screen pixel positions.
    ///
    /// NaN if either point has a NaN coordinate.
    pub fn visual_angle(&self, p1: (f64, f64), p2: (f64, f64)) -> f64 {
        self.visual_angle_radians(p1, p2).to_degrees()
    }

    /// Visual angle (radians) between two on-screen pixel positions
    pub fn visual_angle_radians(&self, p1: (f64, f64), p2: (f64, f64)) -> f64 {
        let pixel_distance = (p2.0 - p1.0).hypot(p2.1 - p1.1);
        let distance_cm = pixel_distance * self.monitor.pixel_size();
        (distance_cm / self.viewer_distance_cm).atan()
    }
}

impl Default for ViewingGeometry {
    fn default() -> Self {
        Self {
            monitor: ScreenMonitor::default(),
            viewer_distance_cm: 65.0,
        }
    }
}
