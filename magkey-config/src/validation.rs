// Range checks of the device descriptor

use magkey::matrix::MAX_KEYS;

use crate::error::{ConfigError, ConfigResult};
use crate::{CalibrationTomlConfig, KeyboardInfo, LayoutTomlConfig, MatrixTomlConfig};

pub(crate) fn validate_keyboard(keyboard: &KeyboardInfo) -> ConfigResult<()> {
    if !(1..=MAX_KEYS).contains(&keyboard.keys) {
        return Err(ConfigError::validation(
            "keyboard.keys",
            format!("must be between 1 and {}", MAX_KEYS),
        ));
    }
    if keyboard.layers == 0 {
        return Err(ConfigError::validation("keyboard.layers", "must be at least 1"));
    }
    // Profile indices are stored as u8
    if !(1..=255).contains(&keyboard.profiles) {
        return Err(ConfigError::validation("keyboard.profiles", "must be between 1 and 255"));
    }
    if keyboard.advanced_keys == 0 {
        return Err(ConfigError::validation("keyboard.advanced_keys", "must be at least 1"));
    }
    Ok(())
}

pub(crate) fn validate_matrix(matrix: &MatrixTomlConfig) -> ConfigResult<()> {
    if !(1..=16).contains(&matrix.adc_resolution) {
        return Err(ConfigError::validation(
            "matrix.adc_resolution",
            "must be between 1 and 16 bits",
        ));
    }
    if matrix.ema_alpha_exponent > 15 {
        return Err(ConfigError::validation(
            "matrix.ema_alpha_exponent",
            "must be between 0 and 15",
        ));
    }
    Ok(())
}

pub(crate) fn validate_calibration(calibration: &CalibrationTomlConfig, adc_max: u16) -> ConfigResult<()> {
    if calibration.initial_rest_value > adc_max {
        return Err(ConfigError::validation(
            "calibration.initial_rest_value",
            format!("must not exceed the ADC maximum {}", adc_max),
        ));
    }
    if calibration.initial_bottom_out_threshold > adc_max {
        return Err(ConfigError::validation(
            "calibration.initial_bottom_out_threshold",
            format!("must not exceed the ADC maximum {}", adc_max),
        ));
    }
    Ok(())
}

pub(crate) fn validate_layout(layout: &LayoutTomlConfig, keyboard: &KeyboardInfo) -> ConfigResult<()> {
    if layout.keymap.len() != keyboard.layers {
        return Err(ConfigError::validation(
            "layout.keymap",
            format!("has {} layers, expected {}", layout.keymap.len(), keyboard.layers),
        ));
    }
    for (layer, row) in layout.keymap.iter().enumerate() {
        if row.len() != keyboard.keys {
            return Err(ConfigError::validation(
                "layout.keymap",
                format!("layer {} has {} keys, expected {}", layer, row.len(), keyboard.keys),
            ));
        }
    }
    Ok(())
}
