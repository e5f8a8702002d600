//! Gaze-to-target proximity
//!
//! Visual angle between the gaze and every target, per sample, and the
//! closest target of each sample.

use super::trial::Target;
use crate::signal::geometry::ViewingGeometry;
use crate::signal::samples::GazeSamples;
use tracing::debug;

/// Closest target to `point` as `(target id, visual angle in degrees)`.
///
/// `None` when there are no targets or the point is missing. Ties go to the
/// target listed first.
pub fn closest_target(point: (f64, f64), targets: &[Target], geometry: &ViewingGeometry) -> Option<(usize, f64)> {
    if point.0.is_nan() || point.1.is_nan() {
        return None;
    }
    targets
        .iter()
        .map(|t| (t.id, geometry.visual_angle(point, t.center())))
        .filter(|(_, angle)| !angle.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (id, angle)| match best {
            Some((_, best_angle)) if best_angle <= angle => best,
            _ => Some((id, angle)),
        })
}

/// Per-sample distances to each target
#[derive(Debug, Clone, PartialEq)]
pub struct SampleProximity {
    target_ids: Vec<usize>,
    /// `distances[k][i]`: visual angle (deg) from sample `i` to the `k`-th
    /// target; infinite for missing gaze
    distances: Vec<Vec<f64>>,
    /// Closest target id of each sample
    pub closest_target: Vec<Option<usize>>,
}

impl SampleProximity {
    pub fn compute(samples: &GazeSamples, targets: &[Target], geometry: &ViewingGeometry) -> crate::Result<Self> {
        if let Some(bad) = targets.iter().find(|t| !t.center_x.is_finite() || !t.center_y.is_finite()) {
            return Err(crate::Error::InvalidInput(format!(
                "target {} has an invalid center ({}, {})",
                bad.id, bad.center_x, bad.center_y
            )));
        }
        if samples.x.len() != samples.y.len() {
            return Err(crate::Error::LengthMismatch(format!(
                "x has {} samples but y has {}",
                samples.x.len(),
                samples.y.len()
            )));
        }

        let distances: Vec<Vec<f64>> = targets
            .iter()
            .map(|t| {
                samples
                    .x
                    .iter()
                    .zip(&samples.y)
                    .map(|(&x, &y)| {
                        let angle = geometry.visual_angle((x, y), t.center());
                        if angle.is_nan() {
                            f64::INFINITY
                        } else {
                            angle
                        }
                    })
                    .collect()
            })
            .collect();

        let closest_target = samples
            .x
            .iter()
            .zip(&samples.y)
            .map(|(&x, &y)| closest_target((x, y), targets, geometry).map(|(id, _)| id))
            .collect::<Vec<_>>();

        debug!(
            targets = targets.len(),
            samples_near_any = closest_target.iter().filter(|c| c.is_some()).count(),
            "Computed target proximity"
        );
        Ok(Self {
            target_ids: targets.iter().map(|t| t.id).collect(),
            distances,
            closest_target,
        })
    }

    pub fn len(&self) -> usize {
        self.closest_target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closest_target.is_empty()
    }

    /// Per-sample distances to one target
    pub fn distances_to(&self, target_id: usize) -> Option<&[f64]> {
        let k = self.target_ids.iter().position(|&id| id == target_id)?;
        Some(&self.distances[k])
    }

    /// Distance (deg) from sample `index` to a target
    pub fn distance(&self, target_id: usize, index: usize) -> Option<f64> {
        self.distances_to(target_id)?.get(index).copied()
    }

    /// Sample indices whose closest target is `target_id`
    pub fn samples_closest_to(&self, target_id: usize) -> Vec<usize> {
        self.closest_target
            .iter()
            .enumerate()
            .filter_map(|(i, c)| (*c == Some(target_id)).then_some(i))
            .collect()
    }
}
