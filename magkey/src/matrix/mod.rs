//! Analog key matrix: per-key signal conditioning and actuation.

mod bitmap;
pub mod filter;
mod key_state;
pub mod rapid_trigger;

use embassy_time::Instant;

pub use bitmap::{KeyBitmap, MAX_KEYS};
pub use key_state::{KeyDirection, KeyState};

use crate::actuation::ActuationParams;
use crate::advanced_key::AdvancedKeyHooks;
use crate::clock::Clock;
use crate::config::MatrixConfig;
use crate::sensor::AnalogSensor;
use crate::storage::{Calibration, Eeconfig, EeconfigError, Options, WearLeveling};

/// Settings the matrix consults on every tick.
///
/// Implemented by [`Eeconfig`], which reads every value live from the
/// configuration image.
pub trait MatrixSettings<const NUM_KEYS: usize> {
    fn calibration(&self) -> Calibration;

    fn options(&self) -> Options;

    /// Learned bottom-out delta of `key`
    fn bottom_out_threshold(&self, key: usize) -> u16;

    /// Actuation parameters of `key` in the active profile
    fn actuation(&self, key: usize) -> ActuationParams;

    /// Persist the learned bottom-out deltas of every key
    fn save_bottom_out_threshold(&mut self, thresholds: &[u16; NUM_KEYS]) -> Result<(), EeconfigError>;
}

impl<
    S: WearLeveling,
    H: AdvancedKeyHooks,
    const NUM_KEYS: usize,
    const NUM_LAYERS: usize,
    const NUM_PROFILES: usize,
    const NUM_ADVANCED_KEYS: usize,
> MatrixSettings<NUM_KEYS> for Eeconfig<S, H, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>
{
    fn calibration(&self) -> Calibration {
        Eeconfig::calibration(self)
    }

    fn options(&self) -> Options {
        Eeconfig::options(self)
    }

    fn bottom_out_threshold(&self, key: usize) -> u16 {
        Eeconfig::bottom_out_threshold(self, key).unwrap_or(0)
    }

    fn actuation(&self, key: usize) -> ActuationParams {
        self.current_actuation(key)
            .or_else(|| self.defaults().profile.actuation_map.get(key).copied())
            .unwrap_or_default()
    }

    fn save_bottom_out_threshold(&mut self, thresholds: &[u16; NUM_KEYS]) -> Result<(), EeconfigError> {
        if self.bottom_out_thresholds() == *thresholds {
            return Ok(());
        }
        self.update_bottom_out_threshold(thresholds)
    }
}

/// Runtime state of every key plus the bookkeeping around it.
pub struct AnalogMatrix<const NUM_KEYS: usize> {
    config: MatrixConfig,
    keys: [KeyState; NUM_KEYS],
    /// Keys evaluated by simple threshold regardless of their actuation settings
    rapid_trigger_disabled: KeyBitmap,
    /// Last time any bottom-out baseline moved
    last_bottom_out_change: Instant,
    /// A bottom-out baseline moved since the deltas were last saved
    bottom_out_dirty: bool,
}

impl<const NUM_KEYS: usize> AnalogMatrix<NUM_KEYS> {
    pub fn new(config: MatrixConfig) -> Self {
        const { assert!(NUM_KEYS <= MAX_KEYS, "too many keys for the key bitmap") };
        Self {
            config,
            keys: [KeyState::default(); NUM_KEYS],
            rapid_trigger_disabled: KeyBitmap::new(),
            last_bottom_out_change: Instant::from_ticks(0),
            bottom_out_dirty: false,
        }
    }

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    pub fn key_state(&self, key: usize) -> Option<&KeyState> {
        self.keys.get(key)
    }

    pub fn key_states(&self) -> &[KeyState; NUM_KEYS] {
        &self.keys
    }

    /// Force `key` onto the simple-threshold rule from the next scan on, or give it back its Rapid Trigger settings
    pub fn set_rapid_trigger_disabled(&mut self, key: usize, disabled: bool) {
        if key >= NUM_KEYS || !self.rapid_trigger_disabled.set(key, disabled) {
            warn!("Ignoring Rapid Trigger toggle for key {}, only {} keys", key, NUM_KEYS);
        }
    }

    pub fn is_rapid_trigger_disabled(&self, key: usize) -> bool {
        self.rapid_trigger_disabled.get(key)
    }

    /// Re-learn the rest baseline of every key.
    ///
    /// Blocks for the configured calibration duration, sampling keys that are
    /// assumed to be released. With `reset_bottom_out_threshold` the learned
    /// bottom-out deltas are zeroed first. Every key ends up inactive and released.
    pub fn recalibrate<A: AnalogSensor, C: Clock, M: MatrixSettings<NUM_KEYS>>(
        &mut self,
        sensor: &mut A,
        clock: &C,
        settings: &mut M,
        reset_bottom_out_threshold: bool,
    ) {
        if reset_bottom_out_threshold {
            if let Err(e) = settings.save_bottom_out_threshold(&[0; NUM_KEYS]) {
                warn!("Resetting bottom-out thresholds failed: {:?}", e);
            }
        }

        let config = self.config;
        let calibration = settings.calibration();
        let initial_rest = calibration.initial_rest_value.min(config.adc_max);
        for (key, state) in self.keys.iter_mut().enumerate() {
            let bottom_out = filter::bottom_out_floor(
                initial_rest,
                calibration.initial_bottom_out_threshold,
                settings.bottom_out_threshold(key),
                config.adc_max,
            );
            *state = KeyState::seeded(initial_rest, bottom_out);
        }

        // Only the rest value is calibrated here, the bottom-out value keeps
        // being learned while scanning.
        let start = clock.now();
        while clock.elapsed(start) < config.calibration_duration {
            sensor.advance();
            for (key, state) in self.keys.iter_mut().enumerate() {
                let raw = config.condition_raw(sensor.sample(key));
                state.filtered = filter::ema(raw, state.filtered, config.ema_alpha_exponent);
                filter::track_rest(state, config.calibration_epsilon);
                state.bottom_out = filter::bottom_out_floor(
                    state.rest,
                    calibration.initial_bottom_out_threshold,
                    settings.bottom_out_threshold(key),
                    config.adc_max,
                );
            }
        }

        for state in self.keys.iter_mut() {
            state.release();
        }
        self.last_bottom_out_change = clock.now();
        self.bottom_out_dirty = false;
        info!("Matrix calibrated, {} keys", NUM_KEYS);
    }

    /// One pass over every key: condition the sample, run the actuation
    /// automaton, then save the learned deltas if the keys have been quiet long enough.
    pub fn scan<A: AnalogSensor, C: Clock, M: MatrixSettings<NUM_KEYS>>(
        &mut self,
        sensor: &mut A,
        clock: &C,
        settings: &mut M,
    ) {
        sensor.advance();

        let config = self.config;
        let calibration = settings.calibration();
        let mut bottom_out_moved = false;
        for (key, state) in self.keys.iter_mut().enumerate() {
            let raw = config.condition_raw(sensor.sample(key));
            state.filtered = filter::ema(raw, state.filtered, config.ema_alpha_exponent);

            filter::track_rest(state, config.calibration_epsilon);
            bottom_out_moved |= filter::track_bottom_out(state, config.calibration_epsilon);
            let floor = filter::bottom_out_floor(
                state.rest,
                calibration.initial_bottom_out_threshold,
                settings.bottom_out_threshold(key),
                config.adc_max,
            );
            state.bottom_out = state.bottom_out.max(floor);

            state.distance = filter::distance(state.filtered, state.rest, state.bottom_out);
            rapid_trigger::update(
                state,
                &settings.actuation(key),
                self.rapid_trigger_disabled.get(key),
            );
        }

        if bottom_out_moved {
            self.last_bottom_out_change = clock.now();
            self.bottom_out_dirty = true;
        }

        if self.bottom_out_dirty
            && settings.options().save_bottom_out_threshold()
            && clock.elapsed(self.last_bottom_out_change) >= config.inactivity_timeout
        {
            self.save_bottom_out_threshold(clock, settings);
        }
    }

    fn save_bottom_out_threshold<C: Clock, M: MatrixSettings<NUM_KEYS>>(&mut self, clock: &C, settings: &mut M) {
        let thresholds: [u16; NUM_KEYS] = core::array::from_fn(|key| self.keys[key].bottom_out_threshold());
        match settings.save_bottom_out_threshold(&thresholds) {
            Ok(()) => {
                debug!("Saved bottom-out thresholds");
                self.bottom_out_dirty = false;
            }
            Err(e) => warn!("Saving bottom-out thresholds failed: {:?}", e),
        }
        // Delay the next attempt
        self.last_bottom_out_change = clock.now();
    }
}
