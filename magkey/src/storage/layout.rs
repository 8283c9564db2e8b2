use core::ops::Range;

use crate::actuation::ActuationParams;
use crate::advanced_key::AdvancedKey;

/// Location of one field in the configuration image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    pub offset: usize,
    pub len: usize,
}

impl Field {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Byte layout of the configuration image for one device shape.
///
/// ```text
/// magic_start              u32
/// version                  u16
/// calibration              u16 initial rest value, u16 initial bottom-out threshold
/// options                  u8
/// current_profile          u8
/// last_non_default_profile u8
/// reserved                 u8
/// bottom_out_threshold     u16 x NUM_KEYS
/// profiles                 NUM_PROFILES x (keymap, actuation map, advanced keys)
/// magic_end                u32
/// ```
pub struct EeLayout<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_PROFILES: usize, const NUM_ADVANCED_KEYS: usize>;

impl<const NUM_KEYS: usize, const NUM_LAYERS: usize, const NUM_PROFILES: usize, const NUM_ADVANCED_KEYS: usize>
    EeLayout<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>
{
    pub const MAGIC_START: Field = Field::new(0, 4);
    pub const VERSION: Field = Field::new(Self::MAGIC_START.end(), 2);
    pub const CALIBRATION: Field = Field::new(Self::VERSION.end(), 4);
    pub const OPTIONS: Field = Field::new(Self::CALIBRATION.end(), 1);
    pub const CURRENT_PROFILE: Field = Field::new(Self::OPTIONS.end(), 1);
    pub const LAST_NON_DEFAULT_PROFILE: Field = Field::new(Self::CURRENT_PROFILE.end(), 1);
    // One reserved byte keeps the u16 array aligned
    pub const BOTTOM_OUT_THRESHOLD: Field = Field::new(Self::LAST_NON_DEFAULT_PROFILE.end() + 1, 2 * NUM_KEYS);

    pub const KEYMAP_SIZE: usize = NUM_LAYERS * NUM_KEYS;
    pub const ACTUATION_MAP_SIZE: usize = ActuationParams::SIZE * NUM_KEYS;
    pub const ADVANCED_KEYS_SIZE: usize = AdvancedKey::SIZE * NUM_ADVANCED_KEYS;
    pub const PROFILE_SIZE: usize = Self::KEYMAP_SIZE + Self::ACTUATION_MAP_SIZE + Self::ADVANCED_KEYS_SIZE;

    pub const PROFILES: Field = Field::new(Self::BOTTOM_OUT_THRESHOLD.end(), NUM_PROFILES * Self::PROFILE_SIZE);
    pub const MAGIC_END: Field = Field::new(Self::PROFILES.end(), 4);

    /// Total image size
    pub const SIZE: usize = Self::MAGIC_END.end();

    /// Learned bottom-out delta of one key
    pub const fn bottom_out_threshold(key: usize) -> Field {
        Field::new(Self::BOTTOM_OUT_THRESHOLD.offset + 2 * key, 2)
    }

    pub const fn profile(profile: usize) -> Field {
        Field::new(Self::PROFILES.offset + profile * Self::PROFILE_SIZE, Self::PROFILE_SIZE)
    }

    pub const fn keymap(profile: usize) -> Field {
        Field::new(Self::profile(profile).offset, Self::KEYMAP_SIZE)
    }

    pub const fn keycode(profile: usize, layer: usize, key: usize) -> Field {
        Field::new(Self::keymap(profile).offset + layer * NUM_KEYS + key, 1)
    }

    pub const fn actuation_map(profile: usize) -> Field {
        Field::new(Self::keymap(profile).end(), Self::ACTUATION_MAP_SIZE)
    }

    pub const fn actuation(profile: usize, key: usize) -> Field {
        Field::new(
            Self::actuation_map(profile).offset + key * ActuationParams::SIZE,
            ActuationParams::SIZE,
        )
    }

    pub const fn advanced_keys(profile: usize) -> Field {
        Field::new(Self::actuation_map(profile).end(), Self::ADVANCED_KEYS_SIZE)
    }
}
