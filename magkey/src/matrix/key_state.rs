/// Phase of the Rapid Trigger automaton.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyDirection {
    /// Above the reset point, or evaluated by simple threshold
    #[default]
    Inactive,
    /// Travelling down, the key is pressed
    Pressing,
    /// Travelling up, the key is released
    Releasing,
}

/// Runtime state of one analog key.
///
/// Invariant: `bottom_out >= rest`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyState {
    /// Smoothed sample
    pub filtered: u16,
    /// Filtered value of the fully released key
    pub rest: u16,
    /// Filtered value of the fully pressed key
    pub bottom_out: u16,
    /// Normalized travel, 0 at rest and 255 at bottom-out
    pub distance: u8,
    pub direction: KeyDirection,
    /// Most extreme distance since the last direction reversal
    pub extremum: u8,
    pub pressed: bool,
}

impl KeyState {
    /// Fresh state sitting at `rest`
    pub(crate) fn seeded(rest: u16, bottom_out: u16) -> Self {
        Self {
            filtered: rest,
            rest,
            bottom_out: bottom_out.max(rest),
            ..Default::default()
        }
    }

    /// Forget the actuation history, leaving the key inactive and released
    pub(crate) fn release(&mut self) {
        self.distance = 0;
        self.direction = KeyDirection::Inactive;
        self.extremum = 0;
        self.pressed = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Learned span between rest and bottom-out
    pub fn bottom_out_threshold(&self) -> u16 {
        self.bottom_out.saturating_sub(self.rest)
    }
}
