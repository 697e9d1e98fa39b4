//! Core controller systems.
//!
//! Backend-agnostic fixed-update systems: facing update, the locomotion
//! tick, body integration and marker sync. They assume the physics backend
//! has already refreshed each character's [`SurfaceState`] this tick.
//! Ordering is arranged by the plugin: sensors run first, then locomotion,
//! then integration, then the camera.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::input::ControlInput;
use crate::machine::{LocomotionMachine, TickContext};
use crate::orientation::{CharacterOrientation, FacingController};
use crate::state::{markers_for, Airborne, Grounded, OnWall};
use crate::surface::SurfaceState;

/// Fixed timestep with a fallback for schedules driven without time setup.
pub(crate) fn fixed_delta(time: &Time<Fixed>) -> f32 {
    let dt = time.delta_secs();
    if dt > 0.0 { dt } else { 1.0 / 60.0 }
}

/// Integrate look input into the facing controller.
///
/// Runs before the locomotion tick so the tick's desired-movement direction
/// uses this tick's look direction.
pub fn update_facing(
    fixed_time: Res<Time<Fixed>>,
    frame_time: Res<Time<Virtual>>,
    mut query: Query<(
        &MovementConfig,
        &ControlInput,
        &CharacterOrientation,
        &LocomotionMachine,
        &mut FacingController,
    )>,
) {
    let dt = fixed_delta(&fixed_time);
    let frame_dt = frame_time.delta_secs();

    for (config, input, orientation, machine, mut facing) in &mut query {
        facing.update(
            config,
            &input.current,
            orientation.up(),
            machine.velocity(),
            dt,
            frame_dt,
        );
    }
}

/// Run the locomotion state machine for every controlled character.
pub fn tick_locomotion(
    fixed_time: Res<Time<Fixed>>,
    mut query: Query<(
        &MovementConfig,
        &ControlInput,
        &SurfaceState,
        &CharacterOrientation,
        &FacingController,
        &mut LocomotionMachine,
        &mut Transform,
    )>,
) {
    let dt = fixed_delta(&fixed_time);

    for (config, input, surface, orientation, facing, mut machine, mut transform) in &mut query {
        let ctx = TickContext {
            config,
            input: &input.current,
            surface,
            up: orientation.up(),
            look: facing.look_direction,
            dt,
        };
        let previous = machine.state();

        let mut position = transform.translation;
        let (_, state) = machine.tick(&ctx, &mut position);
        transform.translation = position;

        if state != previous {
            debug!("locomotion {previous:?} -> {state:?}");
        }
    }
}

/// Move the body by the machine's velocity and apply the smoothed facing.
pub fn integrate_body(
    fixed_time: Res<Time<Fixed>>,
    mut query: Query<(&LocomotionMachine, &FacingController, &mut Transform)>,
) {
    let dt = fixed_delta(&fixed_time);

    for (machine, facing, mut transform) in &mut query {
        transform.translation += machine.velocity() * dt;
        transform.rotation = facing.facing;
    }
}

/// Keep the broad state markers in sync with the machine.
pub fn sync_state_markers(
    mut commands: Commands,
    query: Query<(Entity, &LocomotionMachine)>,
) {
    for (entity, machine) in &query {
        let (grounded, airborne, on_wall) = markers_for(machine.state());
        let mut entity = commands.entity(entity);

        if grounded {
            entity.insert(Grounded);
        } else {
            entity.remove::<Grounded>();
        }
        if airborne {
            entity.insert(Airborne);
        } else {
            entity.remove::<Airborne>();
        }
        if on_wall {
            entity.insert(OnWall {
                normal: machine.wall_normal(),
            });
        } else {
            entity.remove::<OnWall>();
        }
    }
}
