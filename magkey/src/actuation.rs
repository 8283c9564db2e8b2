/// Per-key actuation settings, owned by a profile.
///
/// Distances are on the normalized `0..=255` travel scale produced by the
/// signal conditioner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuationParams {
    /// Distance at which the key registers as pressed
    pub actuation_point: u8,
    /// Rapid Trigger press sensitivity, 0 disables Rapid Trigger for the key
    pub rt_down: u8,
    /// Rapid Trigger release sensitivity, 0 means "same as `rt_down`"
    pub rt_up: u8,
    /// Continuous Rapid Trigger: the reset point is the top of the travel instead of the actuation point
    pub continuous: bool,
}

impl Default for ActuationParams {
    fn default() -> Self {
        Self::new(128, 0, 0, false)
    }
}

impl ActuationParams {
    /// Size of one encoded entry in the persistent image
    pub const SIZE: usize = 4;

    pub const fn new(actuation_point: u8, rt_down: u8, rt_up: u8, continuous: bool) -> Self {
        Self {
            actuation_point,
            rt_down,
            rt_up,
            continuous,
        }
    }

    /// Simple-threshold actuation at `actuation_point`
    pub const fn threshold(actuation_point: u8) -> Self {
        Self::new(actuation_point, 0, 0, false)
    }

    pub fn rapid_trigger_enabled(&self) -> bool {
        self.rt_down != 0
    }

    /// Distance at or below which a Rapid Trigger key falls back to inactive
    pub fn reset_point(&self) -> u8 {
        if self.continuous { 0 } else { self.actuation_point }
    }

    /// Release sensitivity with the "0 follows `rt_down`" rule applied
    pub fn effective_rt_up(&self) -> u8 {
        if self.rt_up == 0 { self.rt_down } else { self.rt_up }
    }

    pub(crate) fn write_to(&self, buf: &mut [u8]) {
        buf[0] = self.actuation_point;
        buf[1] = self.rt_down;
        buf[2] = self.rt_up;
        buf[3] = self.continuous as u8;
    }

    pub(crate) fn read_from(buf: &[u8]) -> Self {
        Self {
            actuation_point: buf[0],
            rt_down: buf[1],
            rt_up: buf[2],
            continuous: buf[3] != 0,
        }
    }
}
