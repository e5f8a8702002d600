//! Run segmentation and the shared detector post-filter
//!
//! Raw per-sample candidates become runs of consecutive samples. Runs of the
//! same family separated by a short gap are merged, and merged runs that are
//! too short are discarded.

/// Maximal contiguous blocks of `true` samples as inclusive `(start, end)`
/// index pairs, in ascending order
pub fn find_runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut current: Option<usize> = None;

    for (i, &is_set) in mask.iter().enumerate() {
        match (is_set, current) {
            (true, None) => current = Some(i),
            (false, Some(start)) => {
                runs.push((start, i - 1));
                current = None;
            }
            _ => {}
        }
    }

    // Don't forget a run that reaches the last sample
    if let Some(start) = current {
        runs.push((start, mask.len() - 1));
    }
    runs
}

/// Merge runs whose gap (samples strictly between them) is at most `max_gap`.
/// Touching or overlapping runs always merge.
pub fn merge_runs(runs: &[(usize, usize)], max_gap: usize) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(runs.len());
    for &(start, end) in runs {
        match merged.last_mut() {
            Some(last) if start.saturating_sub(last.1 + 1) <= max_gap => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Timing parameters shared by every detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunFilter {
    /// Sampling rate (Hz)
    pub sampling_rate: f64,
    /// Minimum event duration (ms)
    pub min_duration_ms: f64,
    /// Gaps up to this long (ms) are bridged
    pub inter_event_time_ms: f64,
}

impl RunFilter {
    pub fn new(sampling_rate: f64, min_duration_ms: f64, inter_event_time_ms: f64) -> crate::Result<Self> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(crate::Error::InvalidInput(format!(
                "sampling rate must be positive and finite, got {}",
                sampling_rate
            )));
        }
        if !min_duration_ms.is_finite() || min_duration_ms < 0.0 {
            return Err(crate::Error::Config(format!(
                "minimum duration must be non-negative and finite, got {}",
                min_duration_ms
            )));
        }
        if !inter_event_time_ms.is_finite() || inter_event_time_ms < 0.0 {
            return Err(crate::Error::Config(format!(
                "inter-event time must be non-negative and finite, got {}",
                inter_event_time_ms
            )));
        }
        Ok(Self {
            sampling_rate,
            min_duration_ms,
            inter_event_time_ms,
        })
    }

    /// Convert a duration (ms) to a whole number of samples
    pub fn ms_to_samples(&self, ms: f64) -> usize {
        (ms * self.sampling_rate / 1000.0).round() as usize
    }

    /// Largest gap (in samples) that is still bridged
    pub fn min_samples_between_events(&self) -> usize {
        self.ms_to_samples(self.inter_event_time_ms)
    }

    /// Smallest `end - start` a run may span; at least 1 so every event has
    /// two samples
    pub fn min_samples_within_event(&self) -> usize {
        self.ms_to_samples(self.min_duration_ms).max(1)
    }

    /// Surviving runs after merging and duration filtering
    pub fn filter_runs(&self, candidates: &[bool]) -> Vec<(usize, usize)> {
        let min_span = self.min_samples_within_event();
        merge_runs(&find_runs(candidates), self.min_samples_between_events())
            .into_iter()
            .filter(|(start, end)| end - start >= min_span)
            .collect()
    }

    /// Final mask: `true` only for samples of a surviving run
    pub fn apply(&self, candidates: &[bool]) -> Vec<bool> {
        let mut mask = vec![false; candidates.len()];
        for (start, end) in self.filter_runs(candidates) {
            mask[start..=end].fill(true);
        }
        mask
    }
}
