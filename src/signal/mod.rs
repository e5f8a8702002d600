//! Numeric kernels, sample streams and screen geometry
//!
//! Pure functions over ordered sample sequences:
//! - Shifting and windowed numerical differentiation
//! - Median-based (robust) standard deviation
//! - Pixel-to-visual-angle conversion and angular velocity

pub mod samples;
pub mod velocity;
pub mod geometry;

pub use geometry::{ScreenMonitor, ViewingGeometry};
pub use samples::GazeSamples;
pub use velocity::{angular_velocity, median_standard_deviation, numerical_derivative, shift};
