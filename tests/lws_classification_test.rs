//! LWS Classification Integration Tests
//!
//! Full trial processing through the public API:
//! - Trial files written to disk, loaded back and processed
//! - Target identification from trigger sequences
//! - Backward LWS labeling and rates
//! - Report persistence

use gaze_lws::app::config::Config;
use gaze_lws::events::types::GazeEventInfo;
use gaze_lws::lws::trial::{LwsTrial, Rect, Stimulus, Target};
use gaze_lws::workflow::{TrialProcessor, TrialReport};
use gaze_lws::GazeSamples;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

const T0: (f64, f64) = (400.0, 300.0);
const T1: (f64, f64) = (1400.0, 700.0);
const STRIP: (f64, f64) = (960.0, 1000.0);

/// Linear 10-sample move from `from` to `to`, landing on `to` at step 10
fn moving(from: (f64, f64), to: (f64, f64), step: usize) -> (f64, f64) {
    let f = step as f64 / 10.0;
    (from.0 + (to.0 - from.0) * f, from.1 + (to.1 - from.1) * f)
}

/// 2 s at 500 Hz. Fixations on T0 (F1), T1 (F2), T0 again (F3) and in the
/// target-helper strip (F4, running into the end of the trial). The
/// subject identifies T1 while fixating it.
fn visual_search_trial() -> LwsTrial {
    let points: Vec<(f64, f64)> = (0..1000)
        .map(|i| match i {
            0..=199 => T0,
            200..=209 => moving(T0, T1, i - 199),
            210..=399 => T1,
            400..=409 => moving(T1, T0, i - 399),
            410..=599 => T0,
            600..=609 => moving(T0, STRIP, i - 599),
            _ => STRIP,
        })
        .collect();
    let mut triggers = vec![None; 1000];
    triggers[250] = Some(211);
    triggers[260] = Some(221);

    let samples = GazeSamples::from_xy(
        500.0,
        points.iter().map(|p| p.0).collect(),
        points.iter().map(|p| p.1).collect(),
    )
    .unwrap()
    .with_triggers(triggers)
    .unwrap();
    let stimulus = Stimulus::new(vec![
        Target::new(0, T0.0, T0.1, "face"),
        Target::new(1, T1.0, T1.1, "animal"),
    ]);
    LwsTrial::new(3, "007", 500.0, stimulus, samples).unwrap()
}

fn process(trial: &LwsTrial) -> TrialReport {
    TrialProcessor::new(Config::default()).unwrap().process(trial).unwrap()
}

fn fixation_labels(report: &TrialReport) -> Vec<bool> {
    report.lws_labels.iter().filter_map(|l| *l).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_trial_file_roundtrip_and_processing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let trial_path = temp_dir.path().join("S007_T003.json");
    visual_search_trial().save(&trial_path).unwrap();

    let trial = LwsTrial::load(&trial_path).unwrap();
    assert_eq!(trial.name(), "S007_T003");
    assert_eq!(trial.samples.trigger_at(250), Some(211));

    let report = process(&trial);
    assert_eq!(report.stats.num_fixations, 4);
    assert_eq!(report.stats.num_saccades, 3);
    assert_eq!(report.lws_labels.len(), report.events.len());
}

#[test]
fn test_identification_from_trigger_sequence() {
    let report = process(&visual_search_trial());

    let t0 = &report.identifications[0];
    assert_eq!(t0.target_id, 0);
    assert!(!t0.is_identified());

    let t1 = &report.identifications[1];
    assert_eq!(t1.time_identified, Some(500.0));
    assert_eq!(t1.time_confirmed, Some(520.0));
    assert_eq!(t1.distance_identified, Some(0.0));
}

#[test]
fn test_lws_labels_and_rates() {
    let report = process(&visual_search_trial());

    // F1: unidentified T0, then moves to another target -> LWS
    // F2: T1 was identified during the fixation -> not LWS
    // F3: unidentified T0, but the next glance goes to the helper strip -> not LWS
    // F4: cut off by the end of the trial -> not LWS
    assert_eq!(fixation_labels(&report), vec![true, false, false, false]);
    assert_eq!(report.stats.num_lws_instances, 1);
    assert!((report.lws_rate - 0.25).abs() < 1e-12);
    // F4 sits far from both targets and is left out of the proximal rate
    assert!((report.proximal_lws_rate - 1.0 / 3.0).abs() < 1e-12);

    let lws: Vec<_> = report.lws_fixations().collect();
    assert_eq!(lws.len(), 1);
    assert!(lws[0].end_time() < 400.0);
}

#[test]
fn test_stimulus_helper_strip_overrides_config() {
    let mut trial = visual_search_trial();
    trial.stimulus.target_helper_strip = Some(Rect::new((0.0, 0.0), (100.0, 100.0)));
    let report = process(&trial);

    // F4 is no longer in the strip, and it is closest to T1 rather than T0
    assert_eq!(fixation_labels(&report), vec![true, false, true, false]);
    assert!((report.lws_rate - 0.5).abs() < 1e-12);
}

#[test]
fn test_trial_without_gaze_has_no_fixations() {
    let samples = GazeSamples::from_xy(500.0, vec![f64::NAN; 100], vec![f64::NAN; 100]).unwrap();
    let stimulus = Stimulus::new(vec![Target::new(0, T0.0, T0.1, "face")]);
    let trial = LwsTrial::new(9, "007", 500.0, stimulus, samples).unwrap();

    let report = process(&trial);
    assert_eq!(report.stats.num_fixations, 0);
    assert_eq!(report.stats.num_blinks, 1);
    assert_eq!(report.lws_labels, vec![None]);
    assert_eq!(report.lws_rate, 0.0);
    assert_eq!(report.proximal_lws_rate, 0.0);
}

#[test]
fn test_report_written_to_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let report_path = temp_dir.path().join("reports").join("S007_T003_report.json");

    let report = process(&visual_search_trial());
    report.save(&report_path).unwrap();

    let content = std::fs::read_to_string(&report_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["subject_id"], "007");
    assert_eq!(value["stats"]["num_lws_instances"], 1);
    assert_eq!(value["identifications"][1]["time_identified"], 500.0);
    assert_eq!(value["masks"]["is_fixation"].as_array().map(|a| a.len()), Some(1000));
}
