//! Per-tick input snapshots.
//!
//! The controller never polls devices. Whatever produces input (keyboard,
//! gamepad, AI, replay) writes a [`ControlInput`] once per tick and the
//! locomotion and camera systems read the resulting [`InputSnapshot`].
//! Jump edge detection is handled here so callers only ever report the
//! held state of the button.

use bevy::prelude::*;

/// Immutable record of one tick's input.
///
/// `move_axes` is raw and undamped: each axis is -1, 0 or 1 (`x` strafes,
/// `y` is forward). `look` is a continuous delta. `jump_pressed` is
/// edge-triggered: true only on the tick the button went down.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    /// Raw movement axes: x = strafe (-1/0/1), y = forward (-1/0/1).
    pub move_axes: Vec2,
    /// Look delta (radians): x = horizontal, y = vertical.
    pub look: Vec2,
    /// True only on the tick the jump button transitioned to pressed.
    pub jump_pressed: bool,
    /// True only on the tick the fire button transitioned to pressed.
    pub fire_pressed: bool,
    /// True while the fire button is held.
    pub fire_held: bool,
}

impl InputSnapshot {
    /// Check whether any movement input is active this tick.
    pub fn is_moving(&self) -> bool {
        self.move_axes != Vec2::ZERO
    }
}

/// Component feeding input snapshots to a controlled character.
///
/// Call [`ControlInput::begin_tick`] exactly once per simulation tick with
/// the current device state. Button edges are derived from the previous
/// tick's held state, so the same source can be a keyboard, a gamepad or a
/// recorded sequence.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use third_person_controller::prelude::*;
///
/// let mut input = ControlInput::default();
/// input.begin_tick(Vec2::new(0.0, 1.0), Vec2::ZERO, true, false);
/// assert!(input.current.jump_pressed);
///
/// // Holding the button does not re-trigger the edge.
/// input.begin_tick(Vec2::new(0.0, 1.0), Vec2::ZERO, true, false);
/// assert!(!input.current.jump_pressed);
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ControlInput {
    /// The snapshot consumed by this tick's systems.
    pub current: InputSnapshot,
    /// Scale applied to incoming look deltas (for stick vs mouse sources).
    pub look_multiplier: Vec2,
    jump_held_prev: bool,
    fire_held_prev: bool,
}

impl ControlInput {
    /// Create a control input with a custom look multiplier.
    pub fn with_look_multiplier(multiplier: Vec2) -> Self {
        Self {
            look_multiplier: multiplier,
            ..default()
        }
    }

    /// Build this tick's snapshot from raw device state.
    ///
    /// Movement axes are clamped to the -1..=1 grid; look deltas are scaled
    /// by the configured multiplier (identity when unset).
    pub fn begin_tick(&mut self, move_axes: Vec2, look: Vec2, jump_held: bool, fire_held: bool) {
        let multiplier = if self.look_multiplier == Vec2::ZERO {
            Vec2::ONE
        } else {
            self.look_multiplier
        };

        self.current = InputSnapshot {
            move_axes: move_axes.clamp(Vec2::splat(-1.0), Vec2::splat(1.0)),
            look: look * multiplier,
            jump_pressed: jump_held && !self.jump_held_prev,
            fire_pressed: fire_held && !self.fire_held_prev,
            fire_held,
        };
        self.jump_held_prev = jump_held;
        self.fire_held_prev = fire_held;
    }

    /// Clear the current snapshot without touching edge-tracking state.
    pub fn clear(&mut self) {
        self.current = InputSnapshot::default();
    }
}
