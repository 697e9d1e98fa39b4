//! State marker components.
//!
//! These components mirror the locomotion machine's state for queries that
//! only care about a broad condition. They are added and removed by the
//! marker sync system each tick; they carry no authority of their own.

use bevy::prelude::*;

use crate::machine::LocomotionState;

/// Marker component indicating the character is in a grounded state
/// (Idle or Walk).
///
/// Mutually exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is in an airborne state
/// (Jump, DoubleJump or Fall).
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component present while the character is wall sliding.
///
/// Carries the wall contact normal recorded when the slide began.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct OnWall {
    /// Normal of the wall surface.
    pub normal: Vec3,
}

impl Default for OnWall {
    fn default() -> Self {
        Self { normal: Vec3::X }
    }
}

/// Which markers a locomotion state maps to.
pub(crate) fn markers_for(state: LocomotionState) -> (bool, bool, bool) {
    let grounded = matches!(state, LocomotionState::Idle | LocomotionState::Walk);
    let airborne = matches!(
        state,
        LocomotionState::Jump | LocomotionState::DoubleJump | LocomotionState::Fall
    );
    let on_wall = state == LocomotionState::WallSlide;
    (grounded, airborne, on_wall)
}
