use bitfield_struct::bitfield;
use byteorder::{ByteOrder, LittleEndian};

use super::{EeLayout, EeconfigError, Field, WearLeveling};
use crate::actuation::ActuationParams;
use crate::advanced_key::{AdvancedKey, AdvancedKeyHooks, AdvancedKeys};
use crate::config::{DeviceDefaults, Profile};

/// Marker at the start of a valid image
pub const EECONFIG_MAGIC_START: u32 = 0x4D41_474B;
/// Marker at the end of a valid image
pub const EECONFIG_MAGIC_END: u32 = 0x4B47_414D;
/// Bump whenever the meaning of the image changes
pub const EECONFIG_VERSION: u16 = 1;

/// Calibration seeds used whenever a key's baselines are (re)initialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Rest baseline every key starts from before calibration lowers it
    pub initial_rest_value: u16,
    /// Minimum distance between the rest and bottom-out baselines
    pub initial_bottom_out_threshold: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            initial_rest_value: 2400,
            initial_bottom_out_threshold: 550,
        }
    }
}

impl Calibration {
    const SIZE: usize = 4;

    fn write_to(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(&mut buf[0..2], self.initial_rest_value);
        LittleEndian::write_u16(&mut buf[2..4], self.initial_bottom_out_threshold);
    }

    fn read_from(buf: &[u8]) -> Self {
        Self {
            initial_rest_value: LittleEndian::read_u16(&buf[0..2]),
            initial_bottom_out_threshold: LittleEndian::read_u16(&buf[2..4]),
        }
    }
}

/// Global option flags.
#[bitfield(u8, order = Msb, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct Options {
    /// Persist the learned bottom-out deltas after a period of inactivity
    #[bits(1)]
    pub save_bottom_out_threshold: bool,
    /// Ask the transport for the high polling rate
    #[bits(1)]
    pub high_polling_rate: bool,
    #[bits(6)]
    _reserved: u8,
}

/// Versioned, multi-profile configuration store.
///
/// All reads come from the backing store's cached image, so a write is visible
/// to the next scan. Every mutator performs single-field writes only.
pub struct Eeconfig<
    S: WearLeveling,
    H: AdvancedKeyHooks,
    const NUM_KEYS: usize,
    const NUM_LAYERS: usize,
    const NUM_PROFILES: usize,
    const NUM_ADVANCED_KEYS: usize,
> {
    store: S,
    hooks: H,
    defaults: DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>,
}

impl<
    S: WearLeveling,
    H: AdvancedKeyHooks,
    const NUM_KEYS: usize,
    const NUM_LAYERS: usize,
    const NUM_PROFILES: usize,
    const NUM_ADVANCED_KEYS: usize,
> Eeconfig<S, H, NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>
{
    const MAGIC_START: Field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::MAGIC_START;
    const VERSION: Field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::VERSION;
    const CALIBRATION: Field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::CALIBRATION;
    const OPTIONS: Field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::OPTIONS;
    const CURRENT_PROFILE: Field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::CURRENT_PROFILE;
    const LAST_NON_DEFAULT_PROFILE: Field =
        EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::LAST_NON_DEFAULT_PROFILE;
    const BOTTOM_OUT_THRESHOLD: Field =
        EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::BOTTOM_OUT_THRESHOLD;
    const MAGIC_END: Field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::MAGIC_END;

    /// Size of the configuration image in bytes
    pub const IMAGE_SIZE: usize = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::SIZE;

    fn profile_field(profile: usize) -> Field {
        EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::profile(profile)
    }

    fn keymap_field(profile: usize) -> Field {
        EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::keymap(profile)
    }

    fn actuation_map_field(profile: usize) -> Field {
        EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::actuation_map(profile)
    }

    fn advanced_keys_field(profile: usize) -> Field {
        EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::advanced_keys(profile)
    }

    /// Create the store. Nothing is read until [`Eeconfig::init`] runs, and no
    /// reader may be used before `init` has returned `Ok`.
    pub fn new(store: S, hooks: H, defaults: DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>) -> Self {
        Self { store, hooks, defaults }
    }

    /// Validate the image in the backing store, restoring factory defaults if it is not trustworthy.
    ///
    /// Once this returns `Ok`, the cached image is valid.
    pub fn init(&mut self) -> Result<(), EeconfigError> {
        let available = self.store.cache().len();
        if available < Self::IMAGE_SIZE {
            error!(
                "Config store holds {} bytes, the image needs {}",
                available,
                Self::IMAGE_SIZE
            );
            return Err(EeconfigError::StoreTooSmall {
                required: Self::IMAGE_SIZE,
                available,
            });
        }

        if self.is_valid() {
            info!("Config loaded, current profile: {}", self.current_profile());
            self.reload_advanced_keys();
            Ok(())
        } else {
            warn!("Config image is invalid, restoring factory defaults");
            self.reset()
        }
    }

    /// Whether the cached image carries both magic markers, the current version and in-range profile indices
    pub fn is_valid(&self) -> bool {
        let Some(image) = self.store.cache().get(..Self::IMAGE_SIZE) else {
            return false;
        };
        LittleEndian::read_u32(&image[Self::MAGIC_START.range()]) == EECONFIG_MAGIC_START
            && LittleEndian::read_u32(&image[Self::MAGIC_END.range()]) == EECONFIG_MAGIC_END
            && LittleEndian::read_u16(&image[Self::VERSION.range()]) == EECONFIG_VERSION
            && (image[Self::CURRENT_PROFILE.offset] as usize) < NUM_PROFILES
            && (image[Self::LAST_NON_DEFAULT_PROFILE.offset] as usize) < NUM_PROFILES
    }

    /// Replace the whole image with the factory defaults in a single write
    pub fn reset(&mut self) -> Result<(), EeconfigError> {
        self.hooks.clear();
        let defaults = &self.defaults;
        let result = self
            .store
            .write_with(0, Self::IMAGE_SIZE, |image| Self::fill_factory_image(defaults, image))
            .map_err(|_| {
                error!("Writing the factory config failed");
                EeconfigError::Storage
            });
        self.reload_advanced_keys();
        result
    }

    /// Make `profile` the active profile
    pub fn set_current_profile(&mut self, profile: u8) -> Result<(), EeconfigError> {
        Self::check_profile(profile)?;

        self.hooks.clear();
        let mut result = self.write_field(Self::CURRENT_PROFILE, &[profile]);
        if result.is_ok() && profile != 0 {
            result = self.write_field(Self::LAST_NON_DEFAULT_PROFILE, &[profile]);
        }
        self.reload_advanced_keys();
        debug!("Current profile: {}", self.current_profile());

        result
    }

    /// Switch between the default profile and the last non-default one
    pub fn toggle_profile(&mut self) -> Result<(), EeconfigError> {
        let target = if self.current_profile() == 0 {
            self.last_non_default_profile()
        } else {
            0
        };
        self.set_current_profile(target)
    }

    pub fn update_keymap(&mut self, profile: u8, keymap: &[[u8; NUM_KEYS]; NUM_LAYERS]) -> Result<(), EeconfigError> {
        Self::check_profile(profile)?;
        self.write_field_with(Self::keymap_field(profile as usize), |buf| {
            Self::encode_keymap(keymap, buf)
        })
    }

    /// Write the actuation map of `profile`. A write to the active profile takes effect on the next scan.
    pub fn update_actuation_map(
        &mut self,
        profile: u8,
        actuation_map: &[ActuationParams; NUM_KEYS],
    ) -> Result<(), EeconfigError> {
        Self::check_profile(profile)?;
        self.write_field_with(Self::actuation_map_field(profile as usize), |buf| {
            Self::encode_actuation_map(actuation_map, buf)
        })
    }

    /// Write the advanced keys of `profile`.
    ///
    /// If `profile` is active, the advanced-key runtime is cleared before and
    /// reloaded after the write.
    pub fn update_advanced_keys(
        &mut self,
        profile: u8,
        advanced_keys: &[AdvancedKey; NUM_ADVANCED_KEYS],
    ) -> Result<(), EeconfigError> {
        Self::check_profile(profile)?;

        let active = profile == self.current_profile();
        if active {
            self.hooks.clear();
        }
        let result = self.write_field_with(Self::advanced_keys_field(profile as usize), |buf| {
            Self::encode_advanced_keys(advanced_keys, buf)
        });
        if active {
            self.reload_advanced_keys();
        }

        result
    }

    /// Write a whole profile in one field write
    pub fn update_profile(
        &mut self,
        profile: u8,
        data: &Profile<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>,
    ) -> Result<(), EeconfigError> {
        Self::check_profile(profile)?;

        let active = profile == self.current_profile();
        if active {
            self.hooks.clear();
        }
        let result = self.write_field_with(Self::profile_field(profile as usize), |buf| {
            Self::encode_profile(data, profile as usize, buf)
        });
        if active {
            self.reload_advanced_keys();
        }

        result
    }

    pub fn update_calibration(&mut self, calibration: Calibration) -> Result<(), EeconfigError> {
        let mut buf = [0; Calibration::SIZE];
        calibration.write_to(&mut buf);
        self.write_field(Self::CALIBRATION, &buf)
    }

    pub fn update_options(&mut self, options: Options) -> Result<(), EeconfigError> {
        self.write_field(Self::OPTIONS, &[options.into_bits()])
    }

    /// Persist all learned bottom-out deltas in one write
    pub fn update_bottom_out_threshold(&mut self, thresholds: &[u16; NUM_KEYS]) -> Result<(), EeconfigError> {
        self.write_field_with(Self::BOTTOM_OUT_THRESHOLD, |buf| {
            for (key, threshold) in thresholds.iter().enumerate() {
                LittleEndian::write_u16(&mut buf[2 * key..2 * key + 2], *threshold);
            }
        })
    }

    pub fn version(&self) -> u16 {
        LittleEndian::read_u16(&self.store.cache()[Self::VERSION.range()])
    }

    pub fn current_profile(&self) -> u8 {
        self.store.cache()[Self::CURRENT_PROFILE.offset]
    }

    pub fn last_non_default_profile(&self) -> u8 {
        self.store.cache()[Self::LAST_NON_DEFAULT_PROFILE.offset]
    }

    pub fn calibration(&self) -> Calibration {
        Calibration::read_from(&self.store.cache()[Self::CALIBRATION.range()])
    }

    pub fn options(&self) -> Options {
        Options::from_bits(self.store.cache()[Self::OPTIONS.offset])
    }

    /// Learned bottom-out delta of `key`
    pub fn bottom_out_threshold(&self, key: usize) -> Option<u16> {
        if key >= NUM_KEYS {
            return None;
        }
        let field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::bottom_out_threshold(key);
        self.store.cache().get(field.range()).map(LittleEndian::read_u16)
    }

    pub fn bottom_out_thresholds(&self) -> [u16; NUM_KEYS] {
        core::array::from_fn(|key| self.bottom_out_threshold(key).unwrap_or(0))
    }

    pub fn keycode(&self, profile: u8, layer: usize, key: usize) -> Option<u8> {
        if profile as usize >= NUM_PROFILES || layer >= NUM_LAYERS || key >= NUM_KEYS {
            return None;
        }
        let field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::keycode(profile as usize, layer, key);
        Some(self.store.cache()[field.offset])
    }

    pub fn actuation(&self, profile: u8, key: usize) -> Option<ActuationParams> {
        if profile as usize >= NUM_PROFILES || key >= NUM_KEYS {
            return None;
        }
        let field = EeLayout::<NUM_KEYS, NUM_LAYERS, NUM_PROFILES, NUM_ADVANCED_KEYS>::actuation(profile as usize, key);
        self.store.cache().get(field.range()).map(ActuationParams::read_from)
    }

    /// Actuation parameters of `key` in the active profile.
    ///
    /// `None` for an out-of-range key, or while the image holds no valid current profile.
    pub fn current_actuation(&self, key: usize) -> Option<ActuationParams> {
        let profile = *self.store.cache().get(Self::CURRENT_PROFILE.offset)?;
        self.actuation(profile, key)
    }

    pub fn advanced_keys(&self, profile: u8) -> Option<AdvancedKeys<'_>> {
        if profile as usize >= NUM_PROFILES {
            return None;
        }
        let field = Self::advanced_keys_field(profile as usize);
        Some(AdvancedKeys::new(&self.store.cache()[field.range()]))
    }

    pub fn defaults(&self) -> &DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS> {
        &self.defaults
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct access to the backing store, bypassing the image layout
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Give back the backing store and the hooks
    pub fn into_parts(self) -> (S, H) {
        (self.store, self.hooks)
    }

    fn check_profile(profile: u8) -> Result<(), EeconfigError> {
        if profile as usize >= NUM_PROFILES {
            warn!("Profile {} is out of range, {} profiles available", profile, NUM_PROFILES);
            return Err(EeconfigError::InvalidProfile(profile));
        }
        Ok(())
    }

    fn reload_advanced_keys(&mut self) {
        let cache = self.store.cache();
        let Some(&profile) = cache.get(Self::CURRENT_PROFILE.offset) else {
            return;
        };
        if profile as usize >= NUM_PROFILES {
            return;
        }
        if let Some(raw) = cache.get(Self::advanced_keys_field(profile as usize).range()) {
            self.hooks.reload(profile, AdvancedKeys::new(raw));
        }
    }

    fn write_field(&mut self, field: Field, data: &[u8]) -> Result<(), EeconfigError> {
        self.write_field_with(field, |buf| buf.copy_from_slice(data))
    }

    fn write_field_with<F: FnOnce(&mut [u8])>(&mut self, field: Field, fill: F) -> Result<(), EeconfigError> {
        self.store.write_with(field.offset, field.len, fill).map_err(|_| {
            error!("Config write of {} bytes at offset {} failed", field.len, field.offset);
            EeconfigError::Storage
        })
    }

    fn fill_factory_image(defaults: &DeviceDefaults<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>, image: &mut [u8]) {
        // Learned deltas and the reserved byte start out as zero
        image.fill(0);
        LittleEndian::write_u32(&mut image[Self::MAGIC_START.range()], EECONFIG_MAGIC_START);
        LittleEndian::write_u16(&mut image[Self::VERSION.range()], EECONFIG_VERSION);
        defaults.calibration.write_to(&mut image[Self::CALIBRATION.range()]);
        image[Self::OPTIONS.offset] = defaults.options.into_bits();
        image[Self::CURRENT_PROFILE.offset] = 0;
        image[Self::LAST_NON_DEFAULT_PROFILE.offset] = 0;
        for profile in 0..NUM_PROFILES {
            let field = Self::profile_field(profile);
            Self::encode_profile(&defaults.profile, profile, &mut image[field.range()]);
        }
        LittleEndian::write_u32(&mut image[Self::MAGIC_END.range()], EECONFIG_MAGIC_END);
    }

    /// `buf` covers exactly the profile slot of `profile`
    fn encode_profile(
        data: &Profile<NUM_KEYS, NUM_LAYERS, NUM_ADVANCED_KEYS>,
        profile: usize,
        buf: &mut [u8],
    ) {
        let base = Self::profile_field(profile).offset;
        let relative = |field: Field| field.offset - base..field.end() - base;
        Self::encode_keymap(&data.keymap, &mut buf[relative(Self::keymap_field(profile))]);
        Self::encode_actuation_map(&data.actuation_map, &mut buf[relative(Self::actuation_map_field(profile))]);
        Self::encode_advanced_keys(&data.advanced_keys, &mut buf[relative(Self::advanced_keys_field(profile))]);
    }

    fn encode_keymap(keymap: &[[u8; NUM_KEYS]; NUM_LAYERS], buf: &mut [u8]) {
        for (layer, keys) in keymap.iter().enumerate() {
            buf[layer * NUM_KEYS..(layer + 1) * NUM_KEYS].copy_from_slice(keys);
        }
    }

    fn encode_actuation_map(actuation_map: &[ActuationParams; NUM_KEYS], buf: &mut [u8]) {
        for (key, params) in actuation_map.iter().enumerate() {
            params.write_to(&mut buf[key * ActuationParams::SIZE..(key + 1) * ActuationParams::SIZE]);
        }
    }

    fn encode_advanced_keys(advanced_keys: &[AdvancedKey; NUM_ADVANCED_KEYS], buf: &mut [u8]) {
        for (idx, key) in advanced_keys.iter().enumerate() {
            key.write_to(&mut buf[idx * AdvancedKey::SIZE..(idx + 1) * AdvancedKey::SIZE]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RamStore;

    const KEYS: usize = 3;
    const LAYERS: usize = 2;
    const PROFILES: usize = 3;
    const ADVANCED_KEYS: usize = 2;
    const SIZE: usize = EeLayout::<KEYS, LAYERS, PROFILES, ADVANCED_KEYS>::SIZE;

    #[derive(Default)]
    struct CountingHooks {
        clears: usize,
        reloads: usize,
        profile: Option<u8>,
        defined: usize,
    }

    impl AdvancedKeyHooks for CountingHooks {
        fn clear(&mut self) {
            self.clears += 1;
            self.profile = None;
            self.defined = 0;
        }

        fn reload(&mut self, profile: u8, keys: AdvancedKeys<'_>) {
            self.reloads += 1;
            self.profile = Some(profile);
            self.defined = keys.defined().count();
        }
    }

    type TestEeconfig = Eeconfig<RamStore<SIZE>, CountingHooks, KEYS, LAYERS, PROFILES, ADVANCED_KEYS>;

    fn defaults() -> DeviceDefaults<KEYS, LAYERS, ADVANCED_KEYS> {
        let mut defaults = DeviceDefaults::default();
        defaults.profile.keymap = [[4, 5, 6], [30, 31, 32]];
        defaults.profile.actuation_map = [ActuationParams::new(100, 20, 0, false); KEYS];
        defaults
    }

    fn booted(store: RamStore<SIZE>) -> TestEeconfig {
        let mut eeconfig = Eeconfig::new(store, CountingHooks::default(), defaults());
        eeconfig.init().unwrap();
        eeconfig
    }

    fn reboot(eeconfig: TestEeconfig) -> TestEeconfig {
        let (store, _) = eeconfig.into_parts();
        booted(RamStore::from_image(store.into_image()))
    }

    #[test]
    fn test_first_boot_writes_factory_image() {
        let eeconfig = booted(RamStore::new());

        assert!(eeconfig.is_valid());
        assert_eq!(eeconfig.store().writes(), 1);
        assert_eq!(eeconfig.version(), EECONFIG_VERSION);
        assert_eq!(eeconfig.current_profile(), 0);
        assert_eq!(eeconfig.last_non_default_profile(), 0);
        assert_eq!(eeconfig.calibration(), Calibration::default());
        assert!(eeconfig.options().save_bottom_out_threshold());
        assert_eq!(eeconfig.bottom_out_thresholds(), [0; KEYS]);
        for profile in 0..PROFILES as u8 {
            assert_eq!(eeconfig.keycode(profile, 1, 2), Some(32));
            assert_eq!(eeconfig.actuation(profile, 0), Some(ActuationParams::new(100, 20, 0, false)));
        }
        assert_eq!(eeconfig.hooks().clears, 1);
        assert_eq!(eeconfig.hooks().profile, Some(0));
    }

    #[test]
    fn test_valid_image_is_kept() {
        let mut eeconfig = booted(RamStore::new());
        eeconfig
            .update_calibration(Calibration {
                initial_rest_value: 2000,
                initial_bottom_out_threshold: 600,
            })
            .unwrap();
        eeconfig.update_bottom_out_threshold(&[700, 0, 650]).unwrap();
        eeconfig.set_current_profile(2).unwrap();

        let eeconfig = reboot(eeconfig);
        assert_eq!(eeconfig.store().writes(), 0);
        assert_eq!(eeconfig.calibration().initial_rest_value, 2000);
        assert_eq!(eeconfig.bottom_out_thresholds(), [700, 0, 650]);
        assert_eq!(eeconfig.current_profile(), 2);
        assert_eq!(eeconfig.hooks().clears, 0);
        assert_eq!(eeconfig.hooks().profile, Some(2));
    }

    #[test]
    fn test_corrupt_image_is_reset() {
        let eeconfig = booted(RamStore::new());
        let (store, _) = eeconfig.into_parts();

        let mut image = store.into_image();
        image[SIZE - 1] ^= 0x01;
        let eeconfig = booted(RamStore::from_image(image));
        assert!(eeconfig.is_valid());
        assert_eq!(eeconfig.store().writes(), 1);

        let mut image = eeconfig.into_parts().0.into_image();
        image[EeLayout::<KEYS, LAYERS, PROFILES, ADVANCED_KEYS>::VERSION.offset] = 0x7F;
        let eeconfig = booted(RamStore::from_image(image));
        assert_eq!(eeconfig.version(), EECONFIG_VERSION);
        assert_eq!(eeconfig.store().writes(), 1);

        let mut image = eeconfig.into_parts().0.into_image();
        image[EeLayout::<KEYS, LAYERS, PROFILES, ADVANCED_KEYS>::CURRENT_PROFILE.offset] = PROFILES as u8;
        let eeconfig = booted(RamStore::from_image(image));
        assert_eq!(eeconfig.current_profile(), 0);
        assert_eq!(eeconfig.store().writes(), 1);
    }

    #[test]
    fn test_store_too_small() {
        let mut eeconfig: Eeconfig<RamStore<16>, (), KEYS, LAYERS, PROFILES, ADVANCED_KEYS> =
            Eeconfig::new(RamStore::new(), (), defaults());
        assert_eq!(
            eeconfig.init(),
            Err(EeconfigError::StoreTooSmall {
                required: SIZE,
                available: 16
            })
        );
        assert_eq!(eeconfig.store().writes(), 0);
    }

    #[test]
    fn test_profile_bounds() {
        let mut eeconfig = booted(RamStore::new());
        let writes = eeconfig.store().writes();

        assert_eq!(
            eeconfig.set_current_profile(PROFILES as u8),
            Err(EeconfigError::InvalidProfile(PROFILES as u8))
        );
        assert_eq!(
            eeconfig.update_keymap(PROFILES as u8, &[[0; KEYS]; LAYERS]),
            Err(EeconfigError::InvalidProfile(PROFILES as u8))
        );
        assert_eq!(
            eeconfig.update_advanced_keys(200, &[AdvancedKey::empty(); ADVANCED_KEYS]),
            Err(EeconfigError::InvalidProfile(200))
        );
        assert_eq!(eeconfig.store().writes(), writes);
        assert_eq!(eeconfig.keycode(PROFILES as u8, 0, 0), None);
        assert_eq!(eeconfig.keycode(0, LAYERS, 0), None);
        assert_eq!(eeconfig.actuation(0, KEYS), None);
        assert!(eeconfig.advanced_keys(PROFILES as u8).is_none());
    }

    #[test]
    fn test_key_readers_stop_at_last_key() {
        let mut eeconfig = booted(RamStore::new());
        eeconfig.update_bottom_out_threshold(&[700, 0, 650]).unwrap();

        assert_eq!(eeconfig.bottom_out_threshold(KEYS - 1), Some(650));
        assert_eq!(eeconfig.bottom_out_threshold(KEYS), None);
        assert_eq!(eeconfig.current_actuation(KEYS - 1), Some(ActuationParams::new(100, 20, 0, false)));
        assert_eq!(eeconfig.current_actuation(KEYS), None);
    }

    #[test]
    fn test_readers_after_failed_factory_write() {
        let mut store = RamStore::<SIZE>::new();
        store.set_fail_writes(true);
        let mut eeconfig: TestEeconfig = Eeconfig::new(store, CountingHooks::default(), defaults());

        assert_eq!(eeconfig.init(), Err(EeconfigError::Storage));
        assert!(!eeconfig.is_valid());
        // The erased image names no existing profile
        assert_eq!(eeconfig.current_actuation(0), None);
        assert_eq!(eeconfig.hooks().profile, None);
    }

    #[test]
    fn test_toggle_profile() {
        let mut eeconfig = booted(RamStore::new());
        // Nothing non-default selected yet
        eeconfig.toggle_profile().unwrap();
        assert_eq!(eeconfig.current_profile(), 0);

        eeconfig.set_current_profile(1).unwrap();
        assert_eq!(eeconfig.last_non_default_profile(), 1);
        eeconfig.toggle_profile().unwrap();
        assert_eq!(eeconfig.current_profile(), 0);
        assert_eq!(eeconfig.last_non_default_profile(), 1);
        eeconfig.toggle_profile().unwrap();
        assert_eq!(eeconfig.current_profile(), 1);
    }

    #[test]
    fn test_actuation_follows_current_profile() {
        let mut eeconfig = booted(RamStore::new());
        let mut map = [ActuationParams::threshold(50); KEYS];
        map[1] = ActuationParams::new(60, 5, 8, true);
        eeconfig.update_actuation_map(1, &map).unwrap();

        assert_eq!(eeconfig.current_actuation(1), Some(ActuationParams::new(100, 20, 0, false)));
        eeconfig.set_current_profile(1).unwrap();
        assert_eq!(eeconfig.current_actuation(1), Some(ActuationParams::new(60, 5, 8, true)));
        assert_eq!(eeconfig.current_actuation(0), Some(ActuationParams::threshold(50)));
    }

    #[test]
    fn test_advanced_keys_reload_only_for_active_profile() {
        let mut eeconfig = booted(RamStore::new());
        let (clears, reloads) = (eeconfig.hooks().clears, eeconfig.hooks().reloads);

        let keys = [AdvancedKey::new(0, 1, 3, [0; 5]), AdvancedKey::empty()];
        eeconfig.update_advanced_keys(1, &keys).unwrap();
        assert_eq!(eeconfig.hooks().clears, clears);
        assert_eq!(eeconfig.hooks().reloads, reloads);

        eeconfig.update_advanced_keys(0, &keys).unwrap();
        assert_eq!(eeconfig.hooks().clears, clears + 1);
        assert_eq!(eeconfig.hooks().reloads, reloads + 1);
        assert_eq!(eeconfig.hooks().defined, 1);

        let stored = eeconfig.advanced_keys(1).unwrap();
        assert_eq!(stored.get(0), Some(keys[0]));
        assert_eq!(stored.defined().count(), 1);
    }

    #[test]
    fn test_update_profile_writes_every_part() {
        let mut eeconfig = booted(RamStore::new());
        let profile = Profile {
            keymap: [[1, 2, 3], [7, 8, 9]],
            actuation_map: [ActuationParams::threshold(10); KEYS],
            advanced_keys: [AdvancedKey::new(1, 2, 1, [9; 5]); ADVANCED_KEYS],
        };
        let writes = eeconfig.store().writes();
        eeconfig.update_profile(2, &profile).unwrap();
        assert_eq!(eeconfig.store().writes(), writes + 1);

        assert_eq!(eeconfig.keycode(2, 1, 0), Some(7));
        assert_eq!(eeconfig.actuation(2, 2), Some(ActuationParams::threshold(10)));
        assert_eq!(eeconfig.advanced_keys(2).unwrap().defined().count(), ADVANCED_KEYS);
        // Neighbours untouched
        assert_eq!(eeconfig.keycode(1, 1, 0), Some(30));
        assert_eq!(eeconfig.keycode(0, 0, 2), Some(6));
    }

    #[test]
    fn test_failed_write_keeps_old_value() {
        let mut eeconfig = booted(RamStore::new());
        eeconfig.update_keymap(0, &[[9, 9, 9], [8, 8, 8]]).unwrap();

        eeconfig.store.set_fail_writes(true);
        assert_eq!(
            eeconfig.update_keymap(0, &[[1, 1, 1], [1, 1, 1]]),
            Err(EeconfigError::Storage)
        );
        assert_eq!(eeconfig.set_current_profile(1), Err(EeconfigError::Storage));
        assert_eq!(eeconfig.keycode(0, 0, 0), Some(9));
        assert_eq!(eeconfig.current_profile(), 0);
        // The runtime is reloaded even though the switch failed
        assert_eq!(eeconfig.hooks().profile, Some(0));
        assert!(eeconfig.is_valid());
    }

    #[test]
    fn test_options_round_trip() {
        let mut eeconfig = booted(RamStore::new());
        let options = Options::new().with_high_polling_rate(true);
        eeconfig.update_options(options).unwrap();
        let eeconfig = reboot(eeconfig);
        assert_eq!(eeconfig.options(), options);
        assert!(!eeconfig.options().save_bottom_out_threshold());
    }
}
