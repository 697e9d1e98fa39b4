//! Rapier 3D physics backend implementation.
//!
//! This module provides the sensor and camera systems for Bevy Rapier 3D.
//! Enable with the `rapier3d` feature.
//!
//! Detection is raycast-based: a downward ground probe, a ring of short
//! horizontal contact probes plus a ceiling probe, and the ledge probe.
//! All casts exclude the probing body itself and any sensor colliders.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::{contact_probe_directions, ledge_probe_ray, PhysicsBackend};
use crate::camera::{CameraPose, CameraRigState, CameraTarget};
use crate::config::{CameraConfig, MovementConfig};
use crate::input::ControlInput;
use crate::machine::LocomotionMachine;
use crate::orientation::{CharacterOrientation, FacingController};
use crate::surface::{GroundContact, LedgeHit, RayHit, SurfaceState};
use crate::ControllerSet;

/// Extra reach of the ground probe beyond the maintain tolerance, so the
/// probe still reports ground that is about to come back into tolerance.
const GROUND_PROBE_PAD: f32 = 1.0;

/// Reach of the wall/ceiling contact probes from the body origin.
const CONTACT_PROBE_RANGE: f32 = 0.6;

/// Rapier 3D physics backend for the third-person controller.
pub struct Rapier3dBackend;

impl PhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }
}

/// Plugin that sets up the Rapier-specific controller systems.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            rapier_surface_detection.in_set(ControllerSet::Sensors),
        );
        app.add_systems(
            FixedUpdate,
            rapier_camera_update.in_set(ControllerSet::Camera),
        );
    }
}

/// Refresh every character's surface snapshot from Rapier raycasts.
pub fn rapier_surface_detection(
    rapier_context: ReadRapierContext,
    mut query: Query<(
        Entity,
        &GlobalTransform,
        &MovementConfig,
        &CharacterOrientation,
        &FacingController,
        &mut SurfaceState,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, orientation, facing, mut surface) in &mut query {
        let position = transform.translation();
        let up = orientation.up();
        let look = facing.look_direction;

        surface.clear();
        surface.up = up;
        surface.wall_threshold = config.slope_limit.cos();

        let filter = QueryFilter::default()
            .exclude_rigid_body(entity)
            .exclude_sensors();

        let ground_range = config.maintain_tolerance + GROUND_PROBE_PAD;
        if let Some((_, hit)) =
            context.cast_ray_and_get_normal(position, -up, ground_range, true, filter)
        {
            surface.ground = Some(GroundContact {
                distance: hit.time_of_impact,
                normal: hit.normal,
                point: hit.point,
                walkable: hit.normal.dot(up) > config.slope_limit.cos(),
            });
        }

        for direction in contact_probe_directions(up, look) {
            if let Some((_, hit)) =
                context.cast_ray_and_get_normal(position, direction, CONTACT_PROBE_RANGE, true, filter)
            {
                surface.contacts.push(hit.normal);
            }
        }
        if let Some((_, hit)) =
            context.cast_ray_and_get_normal(position, up, CONTACT_PROBE_RANGE, true, filter)
        {
            surface.contacts.push(hit.normal);
        }

        let (origin, direction, range) = ledge_probe_ray(config, position, up, look);
        if let Some((_, hit)) = context.cast_ray_and_get_normal(origin, direction, range, true, filter)
        {
            surface.ledge = Some(LedgeHit {
                point: hit.point,
                normal: hit.normal,
            });
        }
    }
}

/// Update every camera rig against its target, casting occlusion rays
/// through Rapier.
pub fn rapier_camera_update(
    rapier_context: ReadRapierContext,
    frame_time: Res<Time<Virtual>>,
    mut rigs: Query<(
        &CameraConfig,
        &CameraTarget,
        &mut CameraRigState,
        &mut CameraPose,
        &mut Transform,
    )>,
    players: Query<(
        &GlobalTransform,
        &CharacterOrientation,
        &FacingController,
        &ControlInput,
        &LocomotionMachine,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let frame_dt = frame_time.delta_secs();

    for (config, target, mut rig, mut pose, mut transform) in &mut rigs {
        let Ok((player_transform, orientation, facing, input, machine)) = players.get(target.0)
        else {
            continue;
        };

        let filter = QueryFilter::default()
            .exclude_rigid_body(target.0)
            .exclude_sensors();
        let caster = |origin: Vec3, direction: Vec3, max_distance: f32| {
            context
                .cast_ray_and_get_normal(origin, direction, max_distance, true, filter)
                .map(|(hit_entity, hit)| RayHit {
                    distance: hit.time_of_impact,
                    point: hit.point,
                    normal: hit.normal,
                    entity: Some(hit_entity),
                })
        };

        *pose = rig.update(
            config,
            player_transform.translation(),
            orientation.up(),
            facing.look_direction,
            input.current.look.y,
            machine.entered_ground(),
            frame_dt,
            &caster,
        );
        transform.translation = pose.position;
        transform.rotation = pose.rotation;
    }
}
