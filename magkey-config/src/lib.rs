//! Device descriptor of a magkey keyboard.
//!
//! Parses `keyboard.toml`, checks it and turns it into the runtime values
//! `magkey` consumes: a [`MatrixConfig`], the factory [`DeviceDefaults`] and the
//! `const` declarations a board build script writes to `constants.rs`.

use std::path::Path;

use const_gen::*;
use embassy_time::Duration;
use magkey::{ActuationParams, Calibration, DeviceDefaults, MatrixConfig, Options};
use serde_derive::Deserialize;
use serde_inline_default::serde_inline_default;

pub mod error;
mod validation;

pub use error::{ConfigError, ConfigResult};

/// Whole `keyboard.toml`
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardTomlConfig {
    /// Basic keyboard info
    pub keyboard: KeyboardInfo,
    /// Sensor and signal conditioning
    #[serde(default)]
    pub matrix: MatrixTomlConfig,
    /// Calibration seeds written to the factory image
    #[serde(default)]
    pub calibration: CalibrationTomlConfig,
    /// Option flags written to the factory image
    #[serde(default)]
    pub options: OptionsTomlConfig,
    /// Actuation settings every key starts with
    #[serde(default)]
    pub actuation: ActuationTomlConfig,
    /// Default keymap
    pub layout: LayoutTomlConfig,
}

/// Shape of the keyboard
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardInfo {
    pub name: String,
    /// Number of analog keys
    pub keys: usize,
    /// Number of keymap layers in each profile
    pub layers: usize,
    /// Number of stored profiles
    pub profiles: usize,
    /// Advanced-key slots in each profile
    #[serde_inline_default(8)]
    pub advanced_keys: usize,
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixTomlConfig {
    /// ADC resolution in bits
    #[serde_inline_default(12)]
    pub adc_resolution: u8,
    /// Samples grow as the key is released
    #[serde_inline_default(false)]
    pub invert_adc: bool,
    /// EMA smoothing factor is 1 / 2^ema_alpha_exponent
    #[serde_inline_default(4)]
    pub ema_alpha_exponent: u8,
    /// Minimum change before a baseline follows the key
    #[serde_inline_default(5)]
    pub calibration_epsilon: u16,
    #[serde_inline_default(500)]
    pub calibration_duration_ms: u64,
    /// Quiet period before learned bottom-out deltas are saved
    #[serde_inline_default(1000)]
    pub inactivity_timeout_ms: u64,
}

impl Default for MatrixTomlConfig {
    fn default() -> Self {
        Self {
            adc_resolution: 12,
            invert_adc: false,
            ema_alpha_exponent: 4,
            calibration_epsilon: 5,
            calibration_duration_ms: 500,
            inactivity_timeout_ms: 1000,
        }
    }
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationTomlConfig {
    #[serde_inline_default(2400)]
    pub initial_rest_value: u16,
    #[serde_inline_default(550)]
    pub initial_bottom_out_threshold: u16,
}

impl Default for CalibrationTomlConfig {
    fn default() -> Self {
        Self {
            initial_rest_value: 2400,
            initial_bottom_out_threshold: 550,
        }
    }
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsTomlConfig {
    #[serde_inline_default(true)]
    pub save_bottom_out_threshold: bool,
    #[serde_inline_default(false)]
    pub high_polling_rate: bool,
}

impl Default for OptionsTomlConfig {
    fn default() -> Self {
        Self {
            save_bottom_out_threshold: true,
            high_polling_rate: false,
        }
    }
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActuationTomlConfig {
    #[serde_inline_default(128)]
    pub actuation_point: u8,
    /// 0 disables Rapid Trigger
    #[serde_inline_default(0)]
    pub rt_down: u8,
    /// 0 means the same as `rt_down`
    #[serde_inline_default(0)]
    pub rt_up: u8,
    #[serde_inline_default(false)]
    pub continuous: bool,
}

impl Default for ActuationTomlConfig {
    fn default() -> Self {
        Self {
            actuation_point: 128,
            rt_down: 0,
            rt_up: 0,
            continuous: false,
        }
    }
}

impl ActuationTomlConfig {
    pub fn params(&self) -> ActuationParams {
        ActuationParams::new(self.actuation_point, self.rt_down, self.rt_up, self.continuous)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutTomlConfig {
    /// Keycodes, one row of `keys` entries per layer
    pub keymap: Vec<Vec<u8>>,
}

impl KeyboardTomlConfig {
    /// Read, parse and validate `path`
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate a descriptor held in memory
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, path: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParse {
            path: path.to_string(),
            message: e.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its allowed range and the keymap against the keyboard shape
    pub fn validate(&self) -> ConfigResult<()> {
        validation::validate_keyboard(&self.keyboard)?;
        validation::validate_matrix(&self.matrix)?;
        validation::validate_calibration(&self.calibration, self.adc_max())?;
        validation::validate_layout(&self.layout, &self.keyboard)?;
        Ok(())
    }

    /// Largest sample of the configured ADC
    pub fn adc_max(&self) -> u16 {
        ((1u32 << self.matrix.adc_resolution.min(16)) - 1) as u16
    }

    pub fn matrix_config(&self) -> MatrixConfig {
        MatrixConfig {
            adc_max: self.adc_max(),
            invert_adc: self.matrix.invert_adc,
            ema_alpha_exponent: self.matrix.ema_alpha_exponent,
            calibration_epsilon: self.matrix.calibration_epsilon,
            calibration_duration: Duration::from_millis(self.matrix.calibration_duration_ms),
            inactivity_timeout: Duration::from_millis(self.matrix.inactivity_timeout_ms),
        }
    }

    /// Factory defaults for a firmware built with the given dimensions
    pub fn device_defaults<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_ADVANCED_KEYS: usize>(
        &self,
    ) -> ConfigResult<DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>> {
        self.validate()?;
        check_dimension("keyboard.keys", NUM_KEYS, self.keyboard.keys)?;
        check_dimension("keyboard.layers", NUM_LAYERS, self.keyboard.layers)?;
        check_dimension("keyboard.advanced_keys", NUM_ADVANCED_KEYS, self.keyboard.advanced_keys)?;

        let mut defaults = DeviceDefaults::<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>::default();
        defaults.calibration = Calibration {
            initial_rest_value: self.calibration.initial_rest_value,
            initial_bottom_out_threshold: self.calibration.initial_bottom_out_threshold,
        };
        defaults.options = Options::new()
            .with_save_bottom_out_threshold(self.options.save_bottom_out_threshold)
            .with_high_polling_rate(self.options.high_polling_rate);
        defaults.profile.actuation_map = [self.actuation.params(); NUM_KEYS];
        for (layer, row) in self.layout.keymap.iter().enumerate() {
            defaults.profile.keymap[layer].copy_from_slice(row);
        }
        Ok(defaults)
    }

    /// `const` declarations of this device, the content of a generated `constants.rs`
    pub fn constants_rs(&self) -> String {
        let constant_strs = [
            const_declaration!(pub NUM_KEYS = self.keyboard.keys),
            const_declaration!(pub NUM_LAYERS = self.keyboard.layers),
            const_declaration!(pub NUM_PROFILES = self.keyboard.profiles),
            const_declaration!(pub NUM_ADVANCED_KEYS = self.keyboard.advanced_keys),
            const_declaration!(pub ADC_MAX = self.adc_max()),
            const_declaration!(pub INVERT_ADC = self.matrix.invert_adc),
            const_declaration!(pub EMA_ALPHA_EXPONENT = self.matrix.ema_alpha_exponent),
            const_declaration!(pub CALIBRATION_EPSILON = self.matrix.calibration_epsilon),
            const_declaration!(pub CALIBRATION_DURATION_MS = self.matrix.calibration_duration_ms),
            const_declaration!(pub INACTIVITY_TIMEOUT_MS = self.matrix.inactivity_timeout_ms),
            // One `&[u8]` row per layer
            const_array_declaration!(pub DEFAULT_KEYMAP = self.layout.keymap),
        ];

        let header = format!("// Generated from keyboard.toml of {}", self.keyboard.name);
        std::iter::once(header)
            .chain(constant_strs)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn check_dimension(field: &str, expected: usize, found: usize) -> ConfigResult<()> {
    if expected != found {
        return Err(ConfigError::DimensionMismatch {
            field: field.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
