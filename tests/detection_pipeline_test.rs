//! Detection Pipeline Integration Tests
//!
//! Drives the public detection and extraction API end to end:
//! - Configured detectors produce per-family masks
//! - Masks become sorted, non-overlapping event lists
//! - Detector selection and parameter errors surface as typed errors

use gaze_lws::app::config::{Config, DetectionConfig, EventConfig};
use gaze_lws::detection::{build_detector, detect_all_events, DetectorParams, EventDetector};
use gaze_lws::events::extraction::EventExtractor;
use gaze_lws::events::types::{EventContext, EventType, GazeEvent, GazeEventInfo};
use gaze_lws::signal::geometry::ViewingGeometry;
use gaze_lws::GazeSamples;

// ============================================================================
// Helper Functions
// ============================================================================

const SAMPLING_RATE: f64 = 500.0;

/// 2 s at 500 Hz: fixation, a 10-sample saccade, fixation, a 40-sample
/// tracker loss (blink) at 500..540, fixation
fn recording() -> GazeSamples {
    let x: Vec<f64> = (0..1000)
        .map(|i| match i {
            0..=299 => 300.0,
            300..=309 => 300.0 + 50.0 * (i - 299) as f64,
            500..=539 => f64::NAN,
            _ => 800.0,
        })
        .collect();
    let y: Vec<f64> = x.iter().map(|v| if v.is_nan() { f64::NAN } else { 500.0 }).collect();
    GazeSamples::from_xy(SAMPLING_RATE, x, y).unwrap()
}

fn detect_and_extract(samples: &GazeSamples, config: &Config) -> Vec<GazeEvent> {
    let masks = detect_all_events(
        samples,
        &config.detection,
        &config.events,
        &config.geometry,
        SAMPLING_RATE,
    )
    .unwrap();
    let extractor = EventExtractor::new(EventContext {
        config: &config.events,
        geometry: &config.geometry,
        sampling_rate: SAMPLING_RATE,
        targets: &[],
    });
    extractor.extract_all(&masks, samples, config.events.drop_outliers).unwrap()
}

fn count(events: &[GazeEvent], event_type: EventType) -> usize {
    events.iter().filter(|e| e.event_type() == event_type).count()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_default_pipeline_finds_every_event() {
    let samples = recording();
    let events = detect_and_extract(&samples, &Config::default());

    assert_eq!(count(&events, EventType::Blink), 1);
    assert_eq!(count(&events, EventType::Saccade), 1);
    assert_eq!(count(&events, EventType::Fixation), 3);
    assert!(events.windows(2).all(|w| w[0].start_time() <= w[1].start_time()));

    let blink = events.iter().find(|e| e.event_type() == EventType::Blink).unwrap();
    assert_eq!(blink.span().start_index, 500);
    assert_eq!(blink.span().end_index, 539);
    assert_eq!(blink.start_time(), 1000.0);
    assert_eq!(blink.duration(), 78.0);

    let saccade = events.iter().find(|e| e.event_type() == EventType::Saccade).unwrap();
    assert!(saccade.span().indices().contains(&300));
    assert!(saccade.span().indices().contains(&309));
    assert!(!saccade.is_outlier());
}

#[test]
fn test_fixations_avoid_blinks_and_saccades() {
    let samples = recording();
    for fixation_detector in ["ivt", "idt"] {
        let mut config = Config::default();
        config.detection.fixation_detector = Some(fixation_detector.to_string());
        let events = detect_and_extract(&samples, &config);

        let fixations: Vec<&GazeEvent> = events.iter().filter(|e| e.is_fixation()).collect();
        assert_eq!(fixations.len(), 3, "{} fixations", fixation_detector);
        for fixation in fixations {
            let indices = fixation.span().indices();
            assert!(!indices.contains(&305), "{} fixation covers the saccade", fixation_detector);
            assert!(!(500..540).any(|i| indices.contains(&i)), "{} fixation covers the blink", fixation_detector);
            assert!(fixation.duration() >= 55.0);
        }
    }
}

#[test]
fn test_disabled_family_yields_empty_mask() {
    let samples = recording();
    let mut config = Config::default();
    config.detection.saccade_detector = None;
    config.detection.blink_detector = Some("none".to_string());

    let masks = detect_all_events(
        &samples,
        &config.detection,
        &config.events,
        &config.geometry,
        SAMPLING_RATE,
    )
    .unwrap();
    assert!(masks.is_saccade.iter().all(|m| !m));
    assert!(masks.is_blink.iter().all(|m| !m));
    assert!(masks.is_fixation.iter().any(|m| *m));
}

#[test]
fn test_pupil_detector_needs_pupil_channel() {
    let samples = recording();
    let detection = DetectionConfig {
        blink_detector: Some("Pupil Size".to_string()),
        ..DetectionConfig::default()
    };
    let result = detect_all_events(
        &samples,
        &detection,
        &EventConfig::default(),
        &ViewingGeometry::default(),
        SAMPLING_RATE,
    );
    assert!(matches!(result, Err(gaze_lws::Error::InvalidInput(_))));

    let pupil: Vec<f64> = (0..samples.len()).map(|i| if (500..540).contains(&i) { 0.0 } else { 4.2 }).collect();
    let with_pupil = samples.clone().with_pupil_size(pupil).unwrap();
    let masks = detect_all_events(
        &with_pupil,
        &detection,
        &EventConfig::default(),
        &ViewingGeometry::default(),
        SAMPLING_RATE,
    )
    .unwrap();
    assert_eq!(masks.is_blink.iter().filter(|m| **m).count(), 40);
}

#[test]
fn test_factory_errors() {
    let params = DetectorParams::new(SAMPLING_RATE, 5.0, 5.0);
    assert!(matches!(
        build_detector("remodnav", &params),
        Err(gaze_lws::Error::UnknownDetector(_))
    ));
    assert!(matches!(
        build_detector("engbert", &params),
        Err(gaze_lws::Error::MissingParameter { parameter: "derivation_window_size", .. })
    ));
    assert!(matches!(
        build_detector("IVT", &params),
        Err(gaze_lws::Error::MissingParameter { .. })
    ));

    let detector = build_detector("missing data", &params).unwrap();
    assert_eq!(detector.event_type(), EventType::Blink);
    let mask = detector.detect(&recording()).unwrap();
    assert_eq!(mask.iter().filter(|m| **m).count(), 40);
}

#[test]
fn test_detector_rejects_foreign_sampling_rate() {
    let params = DetectorParams::new(0.0, 5.0, 5.0);
    assert!(build_detector("missing_data", &params).is_err());
}
