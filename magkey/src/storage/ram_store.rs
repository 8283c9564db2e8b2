use core::fmt;

use super::WearLeveling;

/// Errors of [`RamStore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RamStoreError {
    /// The write does not fit in the store
    OutOfBounds { offset: usize, len: usize },
    /// Writes are currently set to fail
    WriteFailed,
}

impl fmt::Display for RamStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RamStoreError::OutOfBounds { offset, len } => {
                write!(f, "write of {} bytes at {} is out of bounds", len, offset)
            }
            RamStoreError::WriteFailed => write!(f, "write failed"),
        }
    }
}

/// In-memory [`WearLeveling`] store, for hosts without flash and for tests.
///
/// Starts out erased (all `0xFF`). Writes are staged and committed in one step,
/// and can be made to fail on demand.
pub struct RamStore<const SIZE: usize> {
    image: [u8; SIZE],
    fail_writes: bool,
    writes: usize,
}

impl<const SIZE: usize> Default for RamStore<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> RamStore<SIZE> {
    pub fn new() -> Self {
        Self::from_image([0xFF; SIZE])
    }

    /// Store pre-loaded with `image`, as if read back after a restart
    pub fn from_image(image: [u8; SIZE]) -> Self {
        Self {
            image,
            fail_writes: false,
            writes: 0,
        }
    }

    /// Make every following write fail (or succeed again)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of committed writes
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// The raw image, for simulating corruption
    pub fn image_mut(&mut self) -> &mut [u8; SIZE] {
        &mut self.image
    }

    pub fn into_image(self) -> [u8; SIZE] {
        self.image
    }
}

impl<const SIZE: usize> WearLeveling for RamStore<SIZE> {
    type Error = RamStoreError;

    fn cache(&self) -> &[u8] {
        &self.image
    }

    fn write_with<F: FnOnce(&mut [u8])>(&mut self, offset: usize, len: usize, fill: F) -> Result<(), Self::Error> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= SIZE)
            .ok_or(RamStoreError::OutOfBounds { offset, len })?;
        if self.fail_writes {
            return Err(RamStoreError::WriteFailed);
        }

        let mut staged = self.image;
        fill(&mut staged[offset..end]);
        self.image = staged;
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_commits_range() {
        let mut store: RamStore<8> = RamStore::new();
        store.write(2, &[1, 2, 3]).unwrap();
        assert_eq!(store.cache(), &[0xFF, 0xFF, 1, 2, 3, 0xFF, 0xFF, 0xFF]);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_failed_write_leaves_image_untouched() {
        let mut store: RamStore<4> = RamStore::from_image([0; 4]);
        store.set_fail_writes(true);
        assert_eq!(store.write(0, &[9, 9]), Err(RamStoreError::WriteFailed));
        assert_eq!(store.cache(), &[0; 4]);
        assert_eq!(store.writes(), 0);

        assert_eq!(
            store.write(3, &[1, 2]),
            Err(RamStoreError::OutOfBounds { offset: 3, len: 2 })
        );
    }

    #[test]
    fn test_fill_sees_current_contents() {
        let mut store: RamStore<4> = RamStore::from_image([1, 2, 3, 4]);
        store
            .write_with(1, 2, |buf| {
                assert_eq!(buf, &[2, 3]);
                buf[1] = 7;
            })
            .unwrap();
        assert_eq!(store.cache(), &[1, 2, 7, 4]);
    }
}
