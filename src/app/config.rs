//! Configuration Management

use crate::events::types::EventType;
use crate::lws::trial::Rect;
use crate::signal::geometry::ViewingGeometry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Detector selection and parameters
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Event outlier thresholds
    #[serde(default)]
    pub events: EventConfig,
    /// Screen and viewer geometry
    #[serde(default)]
    pub geometry: ViewingGeometry,
    /// LWS classification settings
    #[serde(default)]
    pub lws: LwsConfig,
}

/// Detection configuration
///
/// A detector tag of `"none"` (or an absent tag) disables that family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub blink_detector: Option<String>,
    pub saccade_detector: Option<String>,
    pub fixation_detector: Option<String>,
    /// Largest bridged gap between same-family candidate runs (ms)
    pub inter_event_time_ms: f64,
    /// Missing-value sentinel for gaze and pupil data (NaN when unset)
    pub missing_value: Option<f64>,
    /// Engbert derivative half-window (samples)
    pub derivation_window_size: usize,
    /// Engbert noise multiplier λ
    pub lambda_noise_threshold: f64,
    /// I-VT velocity threshold (deg/s)
    pub ivt_velocity_threshold_deg: f64,
    /// I-DT dispersion threshold (px)
    pub idt_dispersion_threshold_px: f64,
}

/// Event outlier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub blink_min_duration_ms: f64,
    pub saccade_min_duration_ms: f64,
    /// Also the largest same-target gap the LWS classifier bridges
    pub saccade_max_duration_ms: f64,
    pub fixation_min_duration_ms: f64,
    /// Fastest sample a fixation may contain (deg/s)
    pub fixation_max_velocity_deg: f64,
    /// Drop outlier events before classification
    pub drop_outliers: bool,
}

/// LWS classification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LwsConfig {
    /// Largest gaze-to-target visual angle still "on" the target (deg)
    pub proximity_threshold_deg: f64,
    /// Trigger sequence marking a target identification
    pub identification_sequence: Vec<u16>,
    /// Target-helper strip, top-left corner (px)
    pub helper_strip_top_left: (f64, f64),
    /// Target-helper strip, bottom-right corner (px)
    pub helper_strip_bottom_right: (f64, f64),
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blink_detector: Some("missing_data".to_string()),
            saccade_detector: Some("engbert".to_string()),
            fixation_detector: Some("ivt".to_string()),
            inter_event_time_ms: 5.0,
            missing_value: None,
            derivation_window_size: 3,
            lambda_noise_threshold: 5.0,
            ivt_velocity_threshold_deg: 20.0,
            idt_dispersion_threshold_px: 45.0,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            blink_min_duration_ms: 50.0,
            saccade_min_duration_ms: 5.0,
            saccade_max_duration_ms: 100.0,
            fixation_min_duration_ms: 55.0,
            fixation_max_velocity_deg: 20.0,
            drop_outliers: false,
        }
    }
}

impl Default for LwsConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_deg: 1.5,
            identification_sequence: vec![211, 221],
            helper_strip_top_left: (0.0, 954.0),
            helper_strip_bottom_right: (1920.0, 1080.0),
        }
    }
}

impl DetectionConfig {
    /// Detector tag for a family; `None` when the family is disabled
    pub fn detector_tag(&self, event_type: EventType) -> Option<&str> {
        let tag = match event_type {
            EventType::Blink => self.blink_detector.as_deref(),
            EventType::Saccade => self.saccade_detector.as_deref(),
            EventType::Fixation => self.fixation_detector.as_deref(),
        }?;
        let tag = tag.trim();
        if tag.is_empty() || tag.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(tag)
        }
    }
}

impl LwsConfig {
    pub fn helper_strip(&self) -> Rect {
        Rect::new(self.helper_strip_top_left, self.helper_strip_bottom_right)
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), crate::Error> {
    if !value.is_finite() || value <= 0.0 {
        return Err(crate::Error::Config(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<(), crate::Error> {
    if !value.is_finite() || value < 0.0 {
        return Err(crate::Error::Config(format!(
            "{} must be non-negative and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let detection = &self.detection;
        for event_type in EventType::ALL {
            if let Some(tag) = detection.detector_tag(event_type) {
                let kind: crate::detection::DetectorKind = tag.parse()?;
                if kind.event_type() != event_type {
                    return Err(crate::Error::Config(format!(
                        "{}_detector `{}` detects {} events",
                        event_type,
                        tag,
                        kind.event_type()
                    )));
                }
            }
        }
        check_non_negative("inter_event_time_ms", detection.inter_event_time_ms)?;
        if detection.derivation_window_size == 0 {
            return Err(crate::Error::Config("derivation_window_size must be > 0".to_string()));
        }
        check_positive("lambda_noise_threshold", detection.lambda_noise_threshold)?;
        check_positive("ivt_velocity_threshold_deg", detection.ivt_velocity_threshold_deg)?;
        check_positive("idt_dispersion_threshold_px", detection.idt_dispersion_threshold_px)?;

        let events = &self.events;
        check_non_negative("blink_min_duration_ms", events.blink_min_duration_ms)?;
        check_non_negative("saccade_min_duration_ms", events.saccade_min_duration_ms)?;
        check_positive("saccade_max_duration_ms", events.saccade_max_duration_ms)?;
        check_non_negative("fixation_min_duration_ms", events.fixation_min_duration_ms)?;
        check_positive("fixation_max_velocity_deg", events.fixation_max_velocity_deg)?;
        if events.saccade_max_duration_ms < events.saccade_min_duration_ms {
            return Err(crate::Error::Config(format!(
                "saccade_max_duration_ms ({}) is below saccade_min_duration_ms ({})",
                events.saccade_max_duration_ms, events.saccade_min_duration_ms
            )));
        }

        self.geometry.validate()?;

        let lws = &self.lws;
        check_positive("proximity_threshold_deg", lws.proximity_threshold_deg)?;
        if lws.identification_sequence.is_empty() {
            return Err(crate::Error::Config("identification_sequence must not be empty".to_string()));
        }
        lws.helper_strip()
            .validate()
            .map_err(|_| crate::Error::Config(format!(
                "helper strip {:?} -> {:?} is not a valid rectangle",
                lws.helper_strip_top_left, lws.helper_strip_bottom_right
            )))?;
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".gaze_lws").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Look up a value by dotted key, e.g. `geometry.monitor.width_cm`
    pub fn get_value(&self, key: &str) -> Result<toml::Value, crate::Error> {
        let root = toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| crate::Error::Config(format!("configuration key '{}' not found", key)))?;
        }
        Ok(current.clone())
    }

    /// Set a value by dotted key.
    ///
    /// `value` is parsed as a TOML value, falling back to a bare string for
    /// string fields. The updated config must still validate; on error `self`
    /// is left unchanged.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), crate::Error> {
        let not_found = || crate::Error::Config(format!("configuration key '{}' not found", key));
        let mut root = toml::Value::try_from(&*self).map_err(|e| crate::Error::Config(e.to_string()))?;

        let parts: Vec<&str> = key.split('.').collect();
        let (leaf, sections) = parts.split_last().ok_or_else(not_found)?;
        let mut table = root.as_table_mut().ok_or_else(not_found)?;
        for section in sections {
            table = table
                .get_mut(*section)
                .and_then(toml::Value::as_table_mut)
                .ok_or_else(not_found)?;
        }
        let parsed = parse_toml_value(value, table.get(*leaf))?;
        table.insert(leaf.to_string(), parsed);

        let updated: Config = root.try_into().map_err(|e| crate::Error::Config(e.to_string()))?;
        updated.validate()?;
        // unset optional fields are absent from the TOML form, so unknown
        // keys only show up after the round trip
        updated.get_value(key)?;
        *self = updated;
        Ok(())
    }
}

/// Parse a command-line value as TOML, coercing integers for float fields
fn parse_toml_value(raw: &str, current: Option<&toml::Value>) -> Result<toml::Value, crate::Error> {
    let parsed = toml::from_str::<toml::Table>(&format!("value = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("value"));
    match (parsed, current) {
        (Some(toml::Value::Integer(i)), Some(toml::Value::Float(_))) => Ok(toml::Value::Float(i as f64)),
        (Some(parsed), _) => Ok(parsed),
        (None, Some(toml::Value::String(_))) => Ok(toml::Value::String(raw.to_string())),
        (None, _) => Err(crate::Error::Config(format!("cannot parse `{}` as a TOML value", raw))),
    }
}
