//! # magkey
//!
//! Analog (Hall-effect) keyboard matrix processing.
//!
//! The crate turns raw per-key sensor samples into press/release decisions and
//! keeps the calibration and actuation settings those decisions depend on in a
//! versioned, power-loss-safe configuration image.
//!
//! - [`matrix`] - signal conditioning and the per-key actuation automaton
//! - [`storage`] - the persistent configuration image and its mutators
//! - [`keyboard`] - the scan driver that owns everything and runs once per tick
//!
//! Hardware is reached only through the traits in [`sensor`], [`clock`],
//! [`storage::WearLeveling`] and [`advanced_key::AdvancedKeyHooks`].
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod actuation;
pub mod advanced_key;
pub mod clock;
pub mod config;
pub mod keyboard;
pub mod matrix;
pub mod sensor;
pub mod storage;

pub use actuation::ActuationParams;
pub use advanced_key::{AdvancedKey, AdvancedKeyHooks};
pub use clock::{Clock, SystemClock};
pub use config::{DeviceDefaults, MatrixConfig, Profile};
pub use keyboard::Keyboard;
pub use matrix::{AnalogMatrix, KeyDirection, KeyState};
pub use sensor::AnalogSensor;
pub use storage::{Calibration, Eeconfig, EeconfigError, Options, WearLeveling};
