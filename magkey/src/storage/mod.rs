//! Persistent configuration.
//!
//! The configuration lives in one flat little-endian image. The byte layout is
//! described by [`EeLayout`], reads go straight to the backing store's cached
//! view and every change is a single field-sized write, so a power loss can only
//! ever leave a field in its old or its new state.

mod eeconfig;
mod layout;
mod ram_store;

use core::fmt;

pub use eeconfig::{Calibration, EECONFIG_MAGIC_END, EECONFIG_MAGIC_START, EECONFIG_VERSION, Eeconfig, Options};
pub use layout::{EeLayout, Field};
pub use ram_store::{RamStore, RamStoreError};

/// Wear-leveled byte store holding the configuration image.
///
/// Implementations guarantee field-level atomicity: once a write returns, and
/// also after a restart that interrupted it, the written range holds either
/// all of its previous bytes or all of its new bytes.
pub trait WearLeveling {
    type Error;

    /// Cached view of the whole image, reflecting the last completed write
    fn cache(&self) -> &[u8];

    /// Atomically replace `len` bytes at `offset`.
    ///
    /// `fill` receives the staged copy of the range, pre-loaded with the current
    /// contents, and produces the new bytes. Nothing is visible in `cache` until
    /// the write has been committed.
    fn write_with<F: FnOnce(&mut [u8])>(&mut self, offset: usize, len: usize, fill: F) -> Result<(), Self::Error>;

    /// Atomically replace the bytes at `offset` with `data`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Self::Error> {
        self.write_with(offset, data.len(), |buf| buf.copy_from_slice(data))
    }
}

/// Errors returned by the configuration store mutators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EeconfigError {
    /// The profile index is not below the profile count; nothing was changed
    InvalidProfile(u8),
    /// The backing store cannot hold the configuration image
    StoreTooSmall { required: usize, available: usize },
    /// The backing store rejected a write
    Storage,
}

impl fmt::Display for EeconfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EeconfigError::InvalidProfile(p) => write!(f, "profile {} is out of range", p),
            EeconfigError::StoreTooSmall { required, available } => write!(
                f,
                "config image needs {} bytes but the store only has {}",
                required, available
            ),
            EeconfigError::Storage => write!(f, "storage write failed"),
        }
    }
}

impl core::error::Error for EeconfigError {}
