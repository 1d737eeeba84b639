//! External control values and the validated detection parameters derived from them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_CELL_SIZE_FLOOR: u32 = 1;
pub const MIN_CELL_SIZE_CEIL: u32 = 1000;
pub const MAX_CELL_SIZE_FLOOR: u32 = 100;
pub const MAX_CELL_SIZE_CEIL: u32 = 20_000;

/// Control values as the user interface exposes them.
///
/// Sensitivities and size sliders live on `[0, 100]`; brightness and the
/// channel gains on `[-100, 100]` with 0 as the neutral position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderSettings {
    pub white_cell_threshold: f64,
    pub red_cell_threshold: f64,
    pub min_cell_size: f64,
    pub max_cell_size: f64,
    pub brightness: f64,
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Default for SliderSettings {
    fn default() -> Self {
        Self {
            white_cell_threshold: 40.0,
            red_cell_threshold: 60.0,
            min_cell_size: 50.0,
            max_cell_size: 25.0,
            brightness: 0.0,
            red: 0.0,
            green: 0.0,
            blue: 0.0,
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    // NaN fails both comparisons, so test for containment rather than exclusion
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl SliderSettings {
    /// Load settings from a JSON document. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check every control against its range and derive the core parameters.
    pub fn validate(&self) -> Result<(ThresholdConfig, Adjustments), ConfigError> {
        let white = check_range("white_cell_threshold", self.white_cell_threshold, 0.0, 100.0)?;
        let red = check_range("red_cell_threshold", self.red_cell_threshold, 0.0, 100.0)?;
        let min_size = check_range("min_cell_size", self.min_cell_size, 0.0, 100.0)?;
        let max_size = check_range("max_cell_size", self.max_cell_size, 0.0, 100.0)?;
        let brightness = check_range("brightness", self.brightness, -100.0, 100.0)?;
        let gain_r = check_range("red", self.red, -100.0, 100.0)?;
        let gain_g = check_range("green", self.green, -100.0, 100.0)?;
        let gain_b = check_range("blue", self.blue, -100.0, 100.0)?;

        let thresholds = ThresholdConfig::new(
            (white / 100.0) as f32,
            (red / 100.0) as f32,
            min_size_from_slider(min_size),
            max_size_from_slider(max_size),
        )?;

        let adjustments = Adjustments {
            brightness: (brightness / 100.0) as f32,
            gain_r: (1.0 + gain_r / 100.0) as f32,
            gain_g: (1.0 + gain_g / 100.0) as f32,
            gain_b: (1.0 + gain_b / 100.0) as f32,
        };

        Ok((thresholds, adjustments))
    }
}

/// `1 + floor(slider / 100 * 999)`, giving `1..=1000`.
pub fn min_size_from_slider(slider: f64) -> u32 {
    MIN_CELL_SIZE_FLOOR + (slider / 100.0 * 999.0).floor() as u32
}

/// `100 + floor(slider / 100 * 19900)`, giving `100..=20000`.
pub fn max_size_from_slider(slider: f64) -> u32 {
    MAX_CELL_SIZE_FLOOR
        + (slider / 100.0 * (MAX_CELL_SIZE_CEIL - MAX_CELL_SIZE_FLOOR) as f64).floor() as u32
}

/// Validated parameters consumed by the detection core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    white_cell_threshold: f32,
    red_cell_threshold: f32,
    min_size: u32,
    max_size: u32,
}

impl ThresholdConfig {
    /// Thresholds must lie in `[0, 1]` and `min_size` must be at least 1.
    /// `min_size > max_size` is allowed and matches no component.
    pub fn new(
        white_cell_threshold: f32,
        red_cell_threshold: f32,
        min_size: u32,
        max_size: u32,
    ) -> Result<Self, ConfigError> {
        check_range("white_cell_threshold", white_cell_threshold as f64, 0.0, 1.0)?;
        check_range("red_cell_threshold", red_cell_threshold as f64, 0.0, 1.0)?;
        if min_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "min_size",
                value: 0.0,
                min: 1.0,
                max: f64::from(u32::MAX),
            });
        }
        Ok(Self {
            white_cell_threshold,
            red_cell_threshold,
            min_size,
            max_size,
        })
    }

    pub fn white_cell_threshold(&self) -> f32 {
        self.white_cell_threshold
    }

    pub fn red_cell_threshold(&self) -> f32 {
        self.red_cell_threshold
    }

    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Inclusive size filter applied to every component.
    pub fn accepts_size(&self, size: usize) -> bool {
        size >= self.min_size as usize && size <= self.max_size as usize
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let (thresholds, _) = SliderSettings::default()
            .validate()
            .unwrap_or_else(|e| panic!("Default slider settings are invalid: {}", e));
        thresholds
    }
}

/// Colour adjustments used by the filters and stage-1 classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    /// `[-1.0, 1.0]`
    pub brightness: f32,
    pub gain_r: f32,
    pub gain_g: f32,
    pub gain_b: f32,
}

impl Adjustments {
    pub fn mean_gain(&self) -> f32 {
        (self.gain_r + self.gain_g + self.gain_b) / 3.0
    }
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            gain_r: 1.0,
            gain_g: 1.0,
            gain_b: 1.0,
        }
    }
}
