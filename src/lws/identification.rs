//! Target identification from trigger codes
//!
//! The subject identifies a target by marking it and then confirming the
//! mark, which fires a fixed sequence of triggers. An identification counts
//! for a target only if the gaze was within the proximity threshold of it
//! when the sequence started.

use super::proximity::SampleProximity;
use super::trial::LwsTrial;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Positions of every occurrence of `sequence` among the present entries of
/// a sparse array.
///
/// Missing entries are skipped, so the codes of one occurrence may be spread
/// over non-adjacent samples. Returns `(first_index, last_index)` pairs into
/// `values`, in order.
pub fn find_sequences_in_sparse_array(values: &[Option<u16>], sequence: &[u16]) -> Vec<(usize, usize)> {
    if sequence.is_empty() {
        return Vec::new();
    }
    let present: Vec<(usize, u16)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|code| (i, code)))
        .collect();

    present
        .windows(sequence.len())
        .filter(|window| window.iter().map(|(_, code)| code).eq(sequence.iter()))
        .map(|window| (window[0].0, window[window.len() - 1].0))
        .collect()
}

/// When (and from how far) the subject identified a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetIdentification {
    pub target_id: usize,
    /// Start of the first proximal identification sequence (ms)
    pub time_identified: Option<f64>,
    /// End of that sequence (ms)
    pub time_confirmed: Option<f64>,
    /// Gaze-to-target visual angle when it started (deg)
    pub distance_identified: Option<f64>,
}

impl TargetIdentification {
    pub fn never_identified(target_id: usize) -> Self {
        Self {
            target_id,
            time_identified: None,
            time_confirmed: None,
            distance_identified: None,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.time_identified.is_some()
    }
}

/// Identification record of every target, in stimulus order.
///
/// For each target only the samples whose closest target it is are
/// searched; the first identification sequence that started strictly
/// within `proximity_threshold` degrees wins.
pub fn identify_targets(
    trial: &LwsTrial,
    proximity: &SampleProximity,
    proximity_threshold: f64,
    sequence: &[u16],
) -> crate::Result<Vec<TargetIdentification>> {
    if !proximity_threshold.is_finite() || proximity_threshold <= 0.0 {
        return Err(crate::Error::Config(format!(
            "proximity threshold must be positive and finite, got {}",
            proximity_threshold
        )));
    }
    if sequence.is_empty() {
        return Err(crate::Error::Config("identification sequence must not be empty".to_string()));
    }
    let samples = &trial.samples;
    if proximity.len() != samples.len() {
        return Err(crate::Error::LengthMismatch(format!(
            "proximity covers {} samples but the trial has {}",
            proximity.len(),
            samples.len()
        )));
    }

    let mut identifications = Vec::with_capacity(trial.stimulus.num_targets());
    for target in &trial.stimulus.targets {
        let proximal = proximity.samples_closest_to(target.id);
        let triggers: Vec<Option<u16>> = proximal.iter().map(|&i| samples.trigger_at(i)).collect();

        let found = find_sequences_in_sparse_array(&triggers, sequence)
            .into_iter()
            .map(|(first, last)| (proximal[first], proximal[last]))
            .find_map(|(first, last)| {
                let distance = proximity.distance(target.id, first)?;
                (distance < proximity_threshold).then(|| TargetIdentification {
                    target_id: target.id,
                    time_identified: Some(samples.timestamp_ms[first]),
                    time_confirmed: Some(samples.timestamp_ms[last]),
                    distance_identified: Some(distance),
                })
            });

        match found {
            Some(identification) => {
                debug!(
                    target = target.id,
                    time_identified = identification.time_identified,
                    "Target identified"
                );
                identifications.push(identification);
            }
            None => identifications.push(TargetIdentification::never_identified(target.id)),
        }
    }
    Ok(identifications)
}
