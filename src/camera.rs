//! Trailing camera controller.
//!
//! Computes the camera pose following a point above the player. The
//! accepted follow height is decoupled from the raw target height so small
//! terrain bumps do not jitter the camera: the height anchor only accepts a
//! new raw height when the delta is large, when the player (re)grounds, or
//! when the camera has fallen far below the player, and the accepted height
//! eases toward the anchor at a fixed rate. The trailing distance is
//! clamped by the occlusion resolver and eased with critically-damped
//! smoothing whose time constant scales with the size of the required
//! correction, so large corrections settle fast and small ones stay calm.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::config::CameraConfig;
use crate::occlusion::OcclusionMemory;
use crate::orientation::look_rotation;
use crate::surface::RayHit;

/// Links a camera rig entity to the character it follows.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CameraTarget(pub Entity);

impl Default for CameraTarget {
    fn default() -> Self {
        Self(Entity::PLACEHOLDER)
    }
}

/// Final camera pose, written once per tick after occlusion resolution.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CameraPose {
    /// World position of the camera.
    pub position: Vec3,
    /// World rotation of the camera.
    pub rotation: Quat,
    /// Opacity the followed character should be rendered with: 1 fully
    /// visible, 0 hidden. Drops as the camera closes in on the target.
    pub fade: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fade: 1.0,
        }
    }
}

/// Critically damped approach of `current` toward `target`.
///
/// `velocity` carries the smoothing rate across calls. The result never
/// overshoots the target.
fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = (output - target) / dt;
    }
    output
}

/// Smoothed state of the trailing camera rig.
///
/// Owns the camera position, the smoothed trailing distance, the
/// accumulated pitch and the occlusion memory. One rig follows one player.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CameraRigState {
    /// Persisted occlusion probe state.
    pub memory: OcclusionMemory,
    position: Vec3,
    distance: f32,
    distance_velocity: f32,
    pitch: f32,
    accepted_height: f32,
    height_anchor: f32,
    initialized: bool,
}

impl Default for CameraRigState {
    fn default() -> Self {
        Self {
            memory: OcclusionMemory::default(),
            position: Vec3::ZERO,
            distance: 3.0,
            distance_velocity: 0.0,
            pitch: 0.0,
            accepted_height: 0.0,
            height_anchor: 0.0,
            initialized: false,
        }
    }
}

impl CameraRigState {
    /// Current camera position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Current smoothed trailing distance.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Accumulated pitch (radians), clamped to +-90 degrees.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// The follow height currently accepted by the smoothing logic.
    pub fn accepted_height(&self) -> f32 {
        self.accepted_height
    }

    /// Advance the rig by one tick and produce the camera pose.
    ///
    /// `look_direction` is the player's planar look direction, `look_pitch`
    /// this tick's vertical look delta (radians), `newly_grounded` whether
    /// the player transitioned onto ground this tick. `caster` is the
    /// occlusion raycaster; a miss means no occluder.
    pub fn update<F>(
        &mut self,
        config: &CameraConfig,
        player_position: Vec3,
        up: Vec3,
        look_direction: Vec3,
        look_pitch: f32,
        newly_grounded: bool,
        frame_dt: f32,
        caster: &F,
    ) -> CameraPose
    where
        F: Fn(Vec3, Vec3, f32) -> Option<RayHit>,
    {
        let mut target = player_position + up * config.height;
        let raw_height = target.dot(up);

        if !self.initialized {
            self.accepted_height = raw_height;
            self.height_anchor = raw_height;
            self.initialized = true;
        }

        let camera_height = self.position.dot(up);
        let player_height = player_position.dot(up);
        if (self.accepted_height - raw_height).abs() > config.height_snap_threshold
            || newly_grounded
            || camera_height < player_height * config.drop_catch_factor
        {
            self.height_anchor = raw_height;
        }

        let ease = (config.height_ease_rate * frame_dt).clamp(0.0, 1.0);
        self.accepted_height += (self.height_anchor - self.accepted_height) * ease;
        target += up * (self.accepted_height - raw_height);

        self.pitch = (self.pitch + look_pitch).clamp(-FRAC_PI_2, FRAC_PI_2);
        let rotation = look_rotation(look_direction, up) * Quat::from_rotation_x(self.pitch);
        let forward = rotation * Vec3::NEG_Z;

        let mut destination = target - forward * self.distance;
        let mut target_distance = config.distance;
        let mut smooth_range = config.idle_smooth_range;

        let resolved = self.memory.resolve(
            config,
            destination,
            rotation,
            target,
            config.min_offset,
            config.distance,
            caster,
        );
        if resolved < config.distance {
            target_distance = resolved;
            smooth_range = (resolved - self.distance).abs();
            destination = target - forward * resolved.min(self.distance);
        }

        self.distance = smooth_damp(
            self.distance,
            target_distance,
            &mut self.distance_velocity,
            smooth_range * frame_dt,
            frame_dt,
        );
        self.position = destination;

        let fade_distance = target.distance(self.position) * config.fade_scale;
        let fade = if fade_distance < config.fade_cutoff {
            0.0
        } else {
            fade_distance.min(1.0)
        };

        CameraPose {
            position: self.position,
            rotation,
            fade,
        }
    }
}
