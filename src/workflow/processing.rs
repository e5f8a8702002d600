//! Trial Processing
//!
//! Runs one trial through detection, event extraction, target
//! identification and LWS classification, and collects the results in a
//! serializable report. Any error aborts the trial; there are no partial
//! reports.

use crate::app::config::Config;
use crate::detection::{detect_all_events, EventMasks};
use crate::events::extraction::EventExtractor;
use crate::events::types::{EventContext, EventSummary, EventType, GazeEvent, GazeEventInfo};
use crate::lws::identification::{identify_targets, TargetIdentification};
use crate::lws::instances::{calculate_lws_rate, LwsClassifier};
use crate::lws::proximity::SampleProximity;
use crate::lws::trial::LwsTrial;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Event counts of a processed trial
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub num_samples: usize,
    pub num_blinks: usize,
    pub num_saccades: usize,
    pub num_fixations: usize,
    /// Outlier events still in the event list
    pub num_outliers: usize,
    pub num_lws_instances: usize,
    pub num_identified_targets: usize,
}

/// Everything computed for one trial
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    pub trial_num: u32,
    pub subject_id: String,
    pub processed_at: DateTime<Utc>,
    pub sampling_rate: f64,
    pub masks: EventMasks,
    pub events: Vec<GazeEvent>,
    /// One label per event: LWS verdict for fixations, `None` otherwise
    pub lws_labels: Vec<Option<bool>>,
    pub identifications: Vec<TargetIdentification>,
    /// LWS instances over all fixations
    pub lws_rate: f64,
    /// LWS instances over target-proximal fixations
    pub proximal_lws_rate: f64,
    pub stats: ProcessingStats,
}

impl TrialReport {
    /// One summary row per event
    pub fn event_summaries(&self) -> Vec<EventSummary> {
        self.events.iter().map(|e| e.summary()).collect()
    }

    /// Fixations labeled as LWS instances
    pub fn lws_fixations(&self) -> impl Iterator<Item = &GazeEvent> {
        self.events
            .iter()
            .zip(&self.lws_labels)
            .filter_map(|(e, label)| (*label == Some(true)).then_some(e))
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Per-trial pipeline with a fixed, validated configuration
#[derive(Debug, Clone)]
pub struct TrialProcessor {
    config: Config,
}

impl TrialProcessor {
    pub fn new(config: Config) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process a trial end to end
    pub fn process(&self, trial: &LwsTrial) -> crate::Result<TrialReport> {
        trial.validate()?;
        let config = &self.config;
        let samples = &trial.samples;
        let targets = &trial.stimulus.targets;
        debug!(trial = %trial.name(), samples = samples.len(), targets = targets.len(), "Processing trial");

        // Step 1: per-sample detection
        let masks = detect_all_events(
            samples,
            &config.detection,
            &config.events,
            &config.geometry,
            trial.sampling_rate,
        )?;

        // Step 2: target proximity of every sample
        let proximity = SampleProximity::compute(samples, targets, &config.geometry)?;

        // Step 3: events
        let extractor = EventExtractor::new(EventContext {
            config: &config.events,
            geometry: &config.geometry,
            sampling_rate: trial.sampling_rate,
            targets,
        });
        let events = extractor.extract_all(&masks, samples, config.events.drop_outliers)?;

        // Step 4: when was each target identified
        let identifications = identify_targets(
            trial,
            &proximity,
            config.lws.proximity_threshold_deg,
            &config.lws.identification_sequence,
        )?;

        // Step 5: LWS classification
        let strip = trial
            .stimulus
            .target_helper_strip
            .unwrap_or_else(|| config.lws.helper_strip());
        let classifier = LwsClassifier::new(
            config.lws.proximity_threshold_deg,
            config.events.saccade_max_duration_ms,
            strip,
            trial.end_time(),
            &identifications,
        )?;
        let lws_labels = classifier.identify_lws_instances(&events);
        let lws_rate = calculate_lws_rate(&events, &lws_labels, None)?;
        let proximal_lws_rate =
            calculate_lws_rate(&events, &lws_labels, Some(config.lws.proximity_threshold_deg))?;

        let count = |event_type: EventType| events.iter().filter(|e| e.event_type() == event_type).count();
        let stats = ProcessingStats {
            num_samples: samples.len(),
            num_blinks: count(EventType::Blink),
            num_saccades: count(EventType::Saccade),
            num_fixations: count(EventType::Fixation),
            num_outliers: events.iter().filter(|e| e.is_outlier()).count(),
            num_lws_instances: lws_labels.iter().filter(|l| **l == Some(true)).count(),
            num_identified_targets: identifications.iter().filter(|i| i.is_identified()).count(),
        };

        if stats.num_fixations == 0 {
            warn!(trial = %trial.name(), "Trial has no fixations; LWS rate is 0");
        }
        info!(
            trial = %trial.name(),
            events = events.len(),
            fixations = stats.num_fixations,
            lws_instances = stats.num_lws_instances,
            lws_rate = %format!("{:.3}", lws_rate),
            "Processed trial"
        );

        Ok(TrialReport {
            trial_num: trial.trial_num,
            subject_id: trial.subject_id.clone(),
            processed_at: Utc::now(),
            sampling_rate: trial.sampling_rate,
            masks,
            events,
            lws_labels,
            identifications,
            lws_rate,
            proximal_lws_rate,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lws::trial::{Rect, Stimulus, Target};
    use crate::signal::samples::GazeSamples;
    use tempfile::TempDir;

    /// 1 s at 500 Hz: fixation on target 0, saccade, fixation nearest to
    /// target 1 but well off it, saccade, fixation on target 0 again
    fn trial(triggers: Vec<Option<u16>>) -> LwsTrial {
        let positions: Vec<(f64, f64)> = (0..500)
            .map(|i| match i {
                0..=149 => (400.0, 400.0),
                150..=159 => (400.0 + 40.0 * (i - 149) as f64, 400.0),
                160..=299 => (800.0, 400.0),
                300..=309 => (800.0 - 40.0 * (i - 299) as f64, 400.0),
                _ => (400.0, 400.0),
            })
            .collect();
        let samples = GazeSamples::from_xy(
            500.0,
            positions.iter().map(|p| p.0).collect(),
            positions.iter().map(|p| p.1).collect(),
        )
        .unwrap()
        .with_triggers(triggers)
        .unwrap();
        let stimulus = Stimulus::new(vec![
            Target::new(0, 400.0, 400.0, "face"),
            Target::new(1, 800.0, 200.0, "animal"),
        ]);
        LwsTrial::new(4, "012", 500.0, stimulus, samples).unwrap()
    }

    #[test]
    fn test_process_trial() {
        let processor = TrialProcessor::new(Config::default()).unwrap();
        let report = processor.process(&trial(vec![None; 500])).unwrap();

        assert_eq!(report.stats.num_samples, 500);
        assert_eq!(report.masks.is_fixation.len(), 500);
        assert_eq!(report.stats.num_fixations, 3);
        assert_eq!(report.stats.num_saccades, 2);
        assert_eq!(report.stats.num_blinks, 0);
        assert_eq!(report.lws_labels.len(), report.events.len());
        assert!(report.events.windows(2).all(|w| w[0].start_time() <= w[1].start_time()));

        // first fixation: on the never-identified target 0, and the next
        // fixation belongs to target 1; the last one runs into the end of the trial
        let fixation_labels: Vec<bool> = report.lws_labels.iter().filter_map(|l| *l).collect();
        assert_eq!(fixation_labels, vec![true, false, false]);
        assert!((report.lws_rate - 1.0 / 3.0).abs() < 1e-12);
        assert!((report.proximal_lws_rate - 0.5).abs() < 1e-12);
        assert_eq!(report.lws_fixations().count(), 1);
        assert_eq!(report.event_summaries().len(), report.events.len());
    }

    #[test]
    fn test_identified_target_is_not_lws() {
        let mut triggers = vec![None; 500];
        triggers[20] = Some(211);
        triggers[30] = Some(221);
        let processor = TrialProcessor::new(Config::default()).unwrap();
        let report = processor.process(&trial(triggers)).unwrap();

        assert_eq!(report.identifications[0].time_identified, Some(40.0));
        assert_eq!(report.stats.num_identified_targets, 1);
        assert_eq!(report.stats.num_lws_instances, 0);
        assert_eq!(report.lws_rate, 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.lws.proximity_threshold_deg = -1.0;
        assert!(TrialProcessor::new(config).is_err());
    }

    #[test]
    fn test_invalid_trial_aborts() {
        let processor = TrialProcessor::new(Config::default()).unwrap();
        let mut bad = trial(vec![None; 500]);
        bad.samples.timestamp_ms[10] = f64::NAN;
        assert!(matches!(processor.process(&bad), Err(crate::Error::InvalidInput(_))));
    }

    #[test]
    fn test_inverted_helper_strip_aborts() {
        let processor = TrialProcessor::new(Config::default()).unwrap();
        let mut bad = trial(vec![None; 500]);
        bad.stimulus.target_helper_strip = Some(Rect::new((1920.0, 1080.0), (0.0, 954.0)));
        assert!(matches!(processor.process(&bad), Err(crate::Error::InvalidInput(_))));
    }

    #[test]
    fn test_report_saves_as_json() {
        let processor = TrialProcessor::new(Config::default()).unwrap();
        let report = processor.process(&trial(vec![None; 500])).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("trial_004.json");
        report.save(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["trial_num"], 4);
        assert_eq!(value["events"][0]["event_type"], "fixation");
        assert!(value["processed_at"].is_string());
        assert_eq!(value["lws_labels"][1], serde_json::Value::Null);
    }
}
