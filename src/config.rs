//! Pulse configuration: render parameters, validator thresholds,
//! per-user settings and logging.
//!
//! The whole bundle is read once at startup; `RenderConfig` and
//! `ValidatorConfig` are never mutated after a renderer is built.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::color::Color32;
use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "pulsebar.json";

/// Lava lamp half-cycle when the user hasn't picked a speed
pub const DEFAULT_LAVA_LAMP_SPEED_MS: u64 = 10_000;

/// Dash on/off lengths for the pulse stroke (pixels)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashPattern {
    pub length: f32,
    pub gap: f32,
}

/// Immutable per-session render parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Stride between sampled FFT bins (in bytes of the window)
    pub divisions: usize,

    /// Default pulse color
    pub color: Color32,

    /// Constant pixel offset in the dB -> height mapping
    pub db_fuzz: f32,

    /// Pixels per dB
    pub db_fuzz_factor: f32,

    pub stroke_width: f32,

    /// `None` draws solid strokes
    pub dash: Option<DashPattern>,

    /// Duration handed to the host for its start/stop pulse transitions
    pub transition_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            divisions: 16,
            color: Color32::WHITE,
            db_fuzz: -10.0,
            db_fuzz_factor: 2.0,
            stroke_width: 16.0,
            dash: Some(DashPattern { length: 30.0, gap: 8.0 }),
            transition_ms: 300,
        }
    }
}

impl RenderConfig {
    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    /// Reject parameter bundles the renderer can't work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.divisions < 2 {
            return Err(ConfigError::Invalid(format!(
                "divisions must be >= 2 (got {})",
                self.divisions
            )));
        }
        if !self.db_fuzz.is_finite() || !self.db_fuzz_factor.is_finite() {
            return Err(ConfigError::Invalid("dB fuzz values must be finite".to_string()));
        }
        if self.stroke_width.is_nan() || self.stroke_width <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "stroke_width must be positive (got {})",
                self.stroke_width
            )));
        }
        if let Some(dash) = self.dash {
            if dash.length.is_nan() || dash.length <= 0.0 || dash.gap.is_nan() || dash.gap < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "dash pattern must have a positive length and non-negative gap (got {} / {})",
                    dash.length, dash.gap
                )));
            }
        }
        Ok(())
    }
}

/// Thresholds deciding whether the stream carries audible signal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Summed squared bin magnitude a window must exceed to count as non-silent
    pub energy_threshold: u64,

    /// Consecutive non-silent windows before the stream is declared valid
    pub valid_frames: u32,

    /// Consecutive silent windows before the stream is declared invalid
    pub invalid_frames: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 16,
            valid_frames: 2,
            invalid_frames: 25,
        }
    }
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.valid_frames == 0 || self.invalid_frames == 0 {
            return Err(ConfigError::Invalid(
                "validator frame counts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-user pulse settings as the host reports them at startup.
/// Later changes arrive as controller events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseSettings {
    pub pulse_enabled: bool,
    pub lava_lamp_enabled: bool,
    pub lava_lamp_speed_ms: u64,

    /// Overrides `RenderConfig::color` when set
    pub user_color: Option<Color32>,
}

impl Default for PulseSettings {
    fn default() -> Self {
        Self {
            pulse_enabled: true,
            lava_lamp_enabled: false,
            lava_lamp_speed_ms: DEFAULT_LAVA_LAMP_SPEED_MS,
            user_color: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; RUST_LOG takes precedence
    pub level: String,

    /// Mirror logs into this file as well as stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub render: RenderConfig,
    pub validator: ValidatorConfig,
    pub settings: PulseSettings,
    pub log: LogConfig,
}

impl PulseConfig {
    /// Default location: `<config dir>/pulsebar/pulsebar.json`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "pulsebar", "pulsebar")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PulseConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load an explicit path, or the default path if it exists, or defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.render.validate()?;
        self.validator.validate()?;
        if self.settings.lava_lamp_speed_ms == 0 {
            return Err(ConfigError::Invalid("lava_lamp_speed_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Color the renderer starts with
    pub fn initial_color(&self) -> Color32 {
        self.settings.user_color.unwrap_or(self.render.color)
    }
}
