use crate::advanced_key::AdvancedKeyHooks;
use crate::clock::Clock;
use crate::config::{DeviceDefaults, MatrixConfig};
use crate::matrix::{AnalogMatrix, KeyState};
use crate::sensor::AnalogSensor;
use crate::storage::{Eeconfig, EeconfigError, WearLeveling};

/// Scan driver of an analog keyboard.
///
/// Owns the sensor, the clock, the matrix state and the configuration store.
/// Call [`Keyboard::init`] once at boot, then [`Keyboard::scan`] once per tick
/// and read the results through [`Keyboard::key_states`].
pub struct Keyboard<
    A: AnalogSensor,
    C: Clock,
    S: WearLeveling,
    H: AdvancedKeyHooks,
    const NUM_KEYS: usize,
    const NUM_LAYERS: usize,
    const NUM_PROFILES: usize,
    const NUM_ADVANCED_KEYS: usize,
> {
    sensor: A,
    clock: C,
    matrix: AnalogMatrix<NUM_KEYS>,
    eeconfig: Eeconfig<S, H, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>,
    /// Set once `init` has loaded a valid configuration
    ready: bool,
}

impl<
    A: AnalogSensor,
    C: Clock,
    S: WearLeveling,
    H: AdvancedKeyHooks,
    const NUM_KEYS: usize,
    const NUM_LAYERS: usize,
    const NUM_PROFILES: usize,
    const NUM_ADVANCED_KEYS: usize,
> Keyboard<A, C, S, H, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>
{
    pub fn new(
        sensor: A,
        clock: C,
        store: S,
        hooks: H,
        config: MatrixConfig,
        defaults: DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>,
    ) -> Self {
        Self {
            sensor,
            clock,
            matrix: AnalogMatrix::new(config),
            eeconfig: Eeconfig::new(store, hooks, defaults),
            ready: false,
        }
    }

    /// Load (or restore) the configuration, then calibrate every key.
    ///
    /// Until it succeeds, [`Keyboard::scan`] and [`Keyboard::recalibrate`] do
    /// nothing and every key stays released. May be retried.
    pub fn init(&mut self) -> Result<(), EeconfigError> {
        self.ready = false;
        self.eeconfig.init()?;
        self.ready = true;
        self.recalibrate(false);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Re-learn the rest baselines. Blocks for the configured calibration duration.
    pub fn recalibrate(&mut self, reset_bottom_out_threshold: bool) {
        if !self.ready {
            return;
        }
        self.matrix.recalibrate(
            &mut self.sensor,
            &self.clock,
            &mut self.eeconfig,
            reset_bottom_out_threshold,
        );
    }

    /// Run one tick
    pub fn scan(&mut self) {
        if !self.ready {
            return;
        }
        self.matrix.scan(&mut self.sensor, &self.clock, &mut self.eeconfig);
    }

    pub fn set_rapid_trigger_disabled(&mut self, key: usize, disabled: bool) {
        self.matrix.set_rapid_trigger_disabled(key, disabled);
    }

    pub fn key_state(&self, key: usize) -> Option<&KeyState> {
        self.matrix.key_state(key)
    }

    pub fn key_states(&self) -> &[KeyState; NUM_KEYS] {
        self.matrix.key_states()
    }

    pub fn matrix(&self) -> &AnalogMatrix<NUM_KEYS> {
        &self.matrix
    }

    pub fn eeconfig(&self) -> &Eeconfig<S, H, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS> {
        &self.eeconfig
    }

    pub fn eeconfig_mut(&mut self) -> &mut Eeconfig<S, H, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS> {
        &mut self.eeconfig
    }

    pub fn sensor_mut(&mut self) -> &mut A {
        &mut self.sensor
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
