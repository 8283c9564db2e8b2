use bitvec::BitArr;
use bitvec::array::BitArray;
use bitvec::order::Lsb0;

/// Maximum number of keys a [`KeyBitmap`] can address
pub const MAX_KEYS: usize = 256;

/// One flag per key index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBitmap {
    bits: BitArr!(for MAX_KEYS, in u32, Lsb0),
}

impl Default for KeyBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBitmap {
    pub const fn new() -> Self {
        Self { bits: BitArray::ZERO }
    }

    /// Set the flag of `key`. Returns `false` if `key` is out of range.
    pub fn set(&mut self, key: usize, value: bool) -> bool {
        if key >= MAX_KEYS {
            return false;
        }
        self.bits.set(key, value);
        true
    }

    pub fn get(&self, key: usize) -> bool {
        self.bits.get(key).is_some_and(|bit| *bit)
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Number of keys whose flag is set
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }
}
