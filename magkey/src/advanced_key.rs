//! Advanced-key definitions and the hooks used to keep the advanced-key runtime in sync.
//!
//! The definitions themselves are opaque to this crate: they are stored per
//! profile and handed to the external advanced-key runtime whenever the active
//! set changes.

/// One advanced-key slot as stored in a profile.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvancedKey {
    pub layer: u8,
    pub key: u8,
    /// Behavior discriminant understood by the advanced-key runtime, 0 marks an empty slot
    pub kind: u8,
    pub payload: [u8; 5],
}

impl AdvancedKey {
    /// Size of one encoded slot in the persistent image
    pub const SIZE: usize = 8;

    pub const fn empty() -> Self {
        Self {
            layer: 0,
            key: 0,
            kind: 0,
            payload: [0; 5],
        }
    }

    pub const fn new(layer: u8, key: u8, kind: u8, payload: [u8; 5]) -> Self {
        Self {
            layer,
            key,
            kind,
            payload,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == 0
    }

    pub(crate) fn write_to(&self, buf: &mut [u8]) {
        buf[0] = self.layer;
        buf[1] = self.key;
        buf[2] = self.kind;
        buf[3..Self::SIZE].copy_from_slice(&self.payload);
    }

    pub(crate) fn read_from(buf: &[u8]) -> Self {
        let mut payload = [0; 5];
        payload.copy_from_slice(&buf[3..Self::SIZE]);
        Self {
            layer: buf[0],
            key: buf[1],
            kind: buf[2],
            payload,
        }
    }
}

/// Borrowed view over the advanced-key slots of one profile, decoded lazily from the config image.
#[derive(Copy, Clone)]
pub struct AdvancedKeys<'a> {
    raw: &'a [u8],
}

impl<'a> AdvancedKeys<'a> {
    pub(crate) fn new(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    /// Number of slots, empty ones included
    pub fn len(&self) -> usize {
        self.raw.len() / AdvancedKey::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<AdvancedKey> {
        let start = idx.checked_mul(AdvancedKey::SIZE)?;
        self.raw
            .get(start..start + AdvancedKey::SIZE)
            .map(AdvancedKey::read_from)
    }

    /// Every slot in order, empty ones included
    pub fn iter(&self) -> impl Iterator<Item = AdvancedKey> + 'a {
        self.raw.chunks_exact(AdvancedKey::SIZE).map(AdvancedKey::read_from)
    }

    /// Only the slots that hold a definition
    pub fn defined(&self) -> impl Iterator<Item = AdvancedKey> + 'a {
        self.iter().filter(|k| !k.is_empty())
    }
}

/// Hooks into the advanced-key runtime.
///
/// The configuration store calls `clear` before it changes the active set of
/// advanced keys and `reload` once the new set is in place.
pub trait AdvancedKeyHooks {
    /// Drop every piece of runtime state derived from the current definitions
    fn clear(&mut self);

    /// Load the definitions of `profile`, which is now the active profile
    fn reload(&mut self, profile: u8, keys: AdvancedKeys<'_>);
}

/// No advanced-key runtime
impl AdvancedKeyHooks for () {
    fn clear(&mut self) {}

    fn reload(&mut self, _profile: u8, _keys: AdvancedKeys<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_skips_empty_slots() {
        let mut raw = [0u8; AdvancedKey::SIZE * 3];
        AdvancedKey::new(1, 12, 2, [1, 2, 3, 4, 5]).write_to(&mut raw[AdvancedKey::SIZE..]);

        let keys = AdvancedKeys::new(&raw);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.iter().count(), 3);
        assert_eq!(keys.defined().count(), 1);
        let defined = keys.get(1).unwrap();
        assert_eq!(defined.layer, 1);
        assert_eq!(defined.key, 12);
        assert_eq!(defined.payload, [1, 2, 3, 4, 5]);
        assert!(keys.get(0).unwrap().is_empty());
        assert!(keys.get(3).is_none());
    }
}
