#![allow(dead_code)]

use core::cell::Cell;

use embassy_time::{Duration, Instant};
use magkey::advanced_key::AdvancedKeys;
use magkey::storage::{EeLayout, RamStore};
use magkey::{ActuationParams, AdvancedKeyHooks, Clock, DeviceDefaults, Keyboard, MatrixConfig, WearLeveling};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const NUM_KEYS: usize = 4;
pub const NUM_LAYERS: usize = 2;
pub const NUM_PROFILES: usize = 3;
pub const NUM_ADVANCED_KEYS: usize = 2;
pub const IMAGE_SIZE: usize = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::SIZE;

/// Raw value of a released key
pub const REST: u16 = 1000;
/// Raw value of a fully pressed key, with the default initial bottom-out threshold
pub const BOTTOM_OUT: u16 = REST + 550;

pub type TestKeyboard =
    Keyboard<TestSensor, StepClock, RamStore<IMAGE_SIZE>, RecordingHooks, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>;

/// Sensor whose samples are set by the test
pub struct TestSensor {
    raw: [u16; NUM_KEYS],
    pub advances: usize,
}

impl TestSensor {
    pub fn new(raw: u16) -> Self {
        Self {
            raw: [raw; NUM_KEYS],
            advances: 0,
        }
    }

    pub fn set(&mut self, key: usize, raw: u16) {
        self.raw[key] = raw;
    }
}

impl magkey::AnalogSensor for TestSensor {
    fn advance(&mut self) {
        self.advances += 1;
    }

    fn sample(&mut self, key: usize) -> u16 {
        self.raw[key]
    }
}

/// Clock that moves forward by `step` every time it is read, and on demand
pub struct StepClock {
    now: Cell<Instant>,
    step: Duration,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Instant::from_ticks(0)),
            step,
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Clear,
    Reload { profile: u8, defined: usize },
}

/// Advanced-key runtime that only records what it was told
#[derive(Default)]
pub struct RecordingHooks {
    pub events: Vec<HookEvent>,
}

impl RecordingHooks {
    pub fn take(&mut self) -> Vec<HookEvent> {
        core::mem::take(&mut self.events)
    }
}

impl AdvancedKeyHooks for RecordingHooks {
    fn clear(&mut self) {
        self.events.push(HookEvent::Clear);
    }

    fn reload(&mut self, profile: u8, keys: AdvancedKeys<'_>) {
        self.events.push(HookEvent::Reload {
            profile,
            defined: keys.defined().count(),
        });
    }
}

pub fn test_config() -> MatrixConfig {
    MatrixConfig {
        // No smoothing, every filtered value equals its raw sample
        ema_alpha_exponent: 0,
        ..Default::default()
    }
}

pub fn test_defaults() -> DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS> {
    let mut defaults = DeviceDefaults::default();
    defaults.profile.keymap = [[4, 5, 6, 7], [30, 31, 32, 33]];
    defaults.profile.actuation_map = [ActuationParams::new(128, 10, 10, false); NUM_KEYS];
    defaults
}

pub fn create_test_keyboard(store: RamStore<IMAGE_SIZE>) -> TestKeyboard {
    Keyboard::new(
        TestSensor::new(REST),
        StepClock::new(Duration::from_millis(1)),
        store,
        RecordingHooks::default(),
        test_config(),
        test_defaults(),
    )
}

/// Keyboard booted from `store` and calibrated with every key at rest
pub fn boot(store: RamStore<IMAGE_SIZE>) -> TestKeyboard {
    let mut keyboard = create_test_keyboard(store);
    keyboard.init().unwrap();
    keyboard
}

/// Copy of the persisted image, as a restarted device would find it
pub fn persisted(keyboard: &TestKeyboard) -> RamStore<IMAGE_SIZE> {
    let image: [u8; IMAGE_SIZE] = keyboard.eeconfig().store().cache().try_into().unwrap();
    RamStore::from_image(image)
}

/// Raw sample a freshly calibrated key maps to `distance`
pub fn raw_for(distance: u8) -> u16 {
    REST + (distance as u32 * (BOTTOM_OUT - REST) as u32).div_ceil(255) as u16
}

/// Set `key` to `raw` and run one scan
pub fn scan_with(keyboard: &mut TestKeyboard, key: usize, raw: u16) {
    keyboard.sensor_mut().set(key, raw);
    keyboard.scan();
}
