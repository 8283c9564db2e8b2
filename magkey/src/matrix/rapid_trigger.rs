//! Per-key actuation automaton.
//!
//! With Rapid Trigger off a key is pressed exactly when its distance reaches
//! the actuation point. With Rapid Trigger on, a key that is already past the
//! actuation point re-fires on every direction reversal of at least the
//! configured sensitivity, measured from the extremum reached since the last
//! reversal.

use super::{KeyDirection, KeyState};
use crate::actuation::ActuationParams;

/// Advance the automaton of one key for the distance already stored in `state`.
///
/// O(1), allocation-free and fully determined by the distance, `params`,
/// `rapid_trigger_disabled` and the previous state.
pub fn update(state: &mut KeyState, params: &ActuationParams, rapid_trigger_disabled: bool) {
    let distance = state.distance;

    if rapid_trigger_disabled || !params.rapid_trigger_enabled() {
        state.direction = KeyDirection::Inactive;
        state.extremum = 0;
        state.pressed = distance >= params.actuation_point;
        return;
    }

    // Widen so `distance + sensitivity` cannot wrap
    let d = distance as u16;
    let extremum = state.extremum as u16;
    let reset_point = params.reset_point();
    let rt_down = params.rt_down as u16;
    let rt_up = params.effective_rt_up() as u16;

    match state.direction {
        KeyDirection::Inactive => {
            if distance > params.actuation_point {
                state.extremum = distance;
                state.direction = KeyDirection::Pressing;
                state.pressed = true;
            } else {
                state.pressed = false;
            }
        }
        KeyDirection::Pressing => {
            if distance <= reset_point {
                state.extremum = distance;
                state.direction = KeyDirection::Inactive;
                state.pressed = false;
            } else if d + rt_up < extremum {
                state.extremum = distance;
                state.direction = KeyDirection::Releasing;
                state.pressed = false;
            } else if distance > state.extremum {
                state.extremum = distance;
            }
        }
        KeyDirection::Releasing => {
            if distance <= reset_point {
                state.extremum = distance;
                state.direction = KeyDirection::Inactive;
                state.pressed = false;
            } else if extremum + rt_down < d {
                state.extremum = distance;
                state.direction = KeyDirection::Pressing;
                state.pressed = true;
            } else if distance < state.extremum {
                state.extremum = distance;
            }
        }
    }
}
