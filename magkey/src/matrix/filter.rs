//! Signal conditioning: smoothing, baseline tracking and travel normalization.

use super::KeyState;

/// Largest normalized distance
pub const DISTANCE_MAX: u8 = u8::MAX;

/// Exponential moving average with alpha = 1 / 2^exponent.
///
/// The exponent is capped at 15 so the product fits in `u32`.
#[inline]
pub fn ema(raw: u16, filtered: u16, exponent: u8) -> u16 {
    let exponent = exponent.min(15) as u32;
    ((raw as u32 + filtered as u32 * ((1u32 << exponent) - 1)) >> exponent) as u16
}

/// Lowest bottom-out baseline allowed for a key resting at `rest`
#[inline]
pub fn bottom_out_floor(rest: u16, initial_threshold: u16, learned_threshold: u16, adc_max: u16) -> u16 {
    let floor = rest as u32 + initial_threshold.max(learned_threshold) as u32;
    floor.min(adc_max as u32).max(rest as u32) as u16
}

/// Follow the key down to a lower rest value once it moved at least `epsilon` below it
#[inline]
pub fn track_rest(state: &mut KeyState, epsilon: u16) {
    if state.filtered < state.rest && state.filtered as u32 + epsilon as u32 <= state.rest as u32 {
        state.rest = state.filtered;
    }
}

/// Follow the key up to a deeper bottom-out value once it moved at least
/// `epsilon` past it. Returns whether the baseline moved.
#[inline]
pub fn track_bottom_out(state: &mut KeyState, epsilon: u16) -> bool {
    if state.filtered > state.bottom_out && state.filtered as u32 >= state.bottom_out as u32 + epsilon as u32 {
        state.bottom_out = state.filtered;
        true
    } else {
        false
    }
}

/// Map `filtered` from `[rest, bottom_out]` onto `0..=DISTANCE_MAX`.
///
/// Non-decreasing in `filtered`, clamped outside the calibrated range.
#[inline]
pub fn distance(filtered: u16, rest: u16, bottom_out: u16) -> u8 {
    if filtered <= rest {
        0
    } else if filtered >= bottom_out {
        DISTANCE_MAX
    } else {
        ((filtered - rest) as u32 * DISTANCE_MAX as u32 / (bottom_out - rest) as u32) as u8
    }
}
