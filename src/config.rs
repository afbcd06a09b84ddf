//! Tunables for layout, navigation and pruning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};
use crate::input::KeyMap;
use crate::pruning::DEFAULT_GAP_THRESHOLD_MULTIPLIER;
use crate::time::MICROS_PER_SECOND;

/// Key names as understood by [`egui::Key::from_name`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub pan_left: String,
    pub pan_right: String,
    pub zoom_in: String,
    pub zoom_out: String,
    pub jump_prev: String,
    pub jump_next: String,
    pub follow: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pan_left: "A".into(),
            pan_right: "D".into(),
            zoom_in: "W".into(),
            zoom_out: "S".into(),
            jump_prev: "Q".into(),
            jump_next: "E".into(),
            follow: "F".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Row height of an unsplit surface. Split lanes use half of it.
    pub row_height: f32,
    /// Space above depth 0.
    pub top_offset: f32,
    /// Strip reserved for the time axis at the bottom.
    pub axis_height: f32,
    /// Strip reserved for lane labels on the left.
    pub left_margin: f32,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub gap_threshold_multiplier: i64,
    /// Pan step as a fraction of the visible duration.
    pub pan_fraction: f64,
    pub zoom_factor: f64,
    /// Spans narrower than this are neither drawn nor hit-testable.
    pub min_visible_width: f32,
    pub min_span_width: f32,
    pub live_label_min_width: f32,
    pub label_min_width: f32,
    pub live_ticks: usize,
    pub manual_ticks: usize,
    pub units_per_second: i64,
    pub min_height: f32,
    pub keys: KeyBindings,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            row_height: 40.0,
            top_offset: 20.0,
            axis_height: 30.0,
            left_margin: 40.0,
            min_zoom: 0.00001,
            max_zoom: 100.0,
            gap_threshold_multiplier: DEFAULT_GAP_THRESHOLD_MULTIPLIER,
            pan_fraction: 0.15,
            zoom_factor: 1.2,
            min_visible_width: 0.2,
            min_span_width: 1.0,
            live_label_min_width: 30.0,
            label_min_width: 40.0,
            live_ticks: 5,
            manual_ticks: 10,
            units_per_second: MICROS_PER_SECOND,
            min_height: 400.0,
            keys: KeyBindings::default(),
        }
    }
}

impl TimelineConfig {
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Reads and validates a TOML file, including its key names.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|err| TimelineError::io(path, err))?;
        let config = Self::from_toml_str(&content).map_err(|source| TimelineError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        KeyMap::from_bindings(&config.keys)?;
        for problem in config.validate() {
            log::warn!("{}: {problem}", path.display());
        }
        log::info!("loaded timeline configuration from {}", path.display());
        Ok(config)
    }

    /// Values that load but will render oddly. An empty list means the
    /// config is sane.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            problems.push(format!(
                "zoom bounds [{}, {}] are not a positive range",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.zoom_factor <= 1.0 {
            problems.push(format!("zoom_factor {} does not zoom in", self.zoom_factor));
        }
        if self.units_per_second <= 0 {
            problems.push(format!("units_per_second {} must be positive", self.units_per_second));
        }
        if self.row_height < 4.0 {
            problems.push(format!("row_height {} leaves no room for spans", self.row_height));
        }
        if self.gap_threshold_multiplier < 0 {
            problems.push("gap_threshold_multiplier is negative".to_owned());
        }
        problems
    }
}
