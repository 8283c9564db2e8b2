use embassy_time::Duration;

use crate::actuation::ActuationParams;
use crate::advanced_key::AdvancedKey;
use crate::storage::{Calibration, Options};

/// Per-device tuning of the analog matrix.
///
/// The shape of the device (key, layer, profile and advanced-key counts) is
/// carried by const generics; everything here is a plain runtime value so a
/// descriptor can be loaded or generated per device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixConfig {
    /// Largest value the sensor can report
    pub adc_max: u16,
    /// Samples grow as the key is released, so they are flipped to `adc_max - raw`
    pub invert_adc: bool,
    /// Smoothing factor of the exponential moving average is `1 / 2^ema_alpha_exponent`
    pub ema_alpha_exponent: u8,
    /// Minimum change of a filtered sample before a baseline follows it
    pub calibration_epsilon: u16,
    /// How long `recalibrate` samples the resting keys
    pub calibration_duration: Duration,
    /// Quiet period after the last bottom-out change before the learned deltas are saved
    pub inactivity_timeout: Duration,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            adc_max: 4095,
            invert_adc: false,
            ema_alpha_exponent: 4,
            calibration_epsilon: 5,
            calibration_duration: Duration::from_millis(500),
            inactivity_timeout: Duration::from_millis(1000),
        }
    }
}

impl MatrixConfig {
    /// Bring the sample into `0..=adc_max` and correct its polarity
    #[inline]
    pub fn condition_raw(&self, raw: u16) -> u16 {
        let raw = raw.min(self.adc_max);
        if self.invert_adc { self.adc_max - raw } else { raw }
    }
}

/// Keymap, actuation map and advanced keys of one profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_ADVANCED_KEYS: usize> {
    pub keymap: [[u8; NUM_KEYS]; NUM_LAYERS],
    pub actuation_map: [ActuationParams; NUM_KEYS],
    pub advanced_keys: [AdvancedKey; NUM_ADVANCED_KEYS],
}

impl<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_ADVANCED_KEYS: usize> Default
    for Profile<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>
{
    fn default() -> Self {
        Self {
            keymap: [[0; NUM_KEYS]; NUM_LAYERS],
            actuation_map: [ActuationParams::default(); NUM_KEYS],
            advanced_keys: [AdvancedKey::empty(); NUM_ADVANCED_KEYS],
        }
    }
}

/// Factory defaults written to the configuration image on first boot or after corruption.
///
/// Every profile starts out as a copy of `profile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDefaults<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_ADVANCED_KEYS: usize> {
    pub calibration: Calibration,
    pub options: Options,
    pub profile: Profile<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>,
}

impl<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_ADVANCED_KEYS: usize> Default
    for DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>
{
    fn default() -> Self {
        Self {
            calibration: Calibration::default(),
            options: Options::new().with_save_bottom_out_threshold(true),
            profile: Profile::default(),
        }
    }
}
