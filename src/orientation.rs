//! Up-axis handling and facing control.
//!
//! Characters walk relative to a configurable "up" direction rather than a
//! fixed world axis, so every planar/vertical decomposition in the crate
//! goes through [`CharacterOrientation`]. [`FacingController`] owns the
//! look direction driven by horizontal look input and the smoothed visual
//! facing derived from the movement direction; both survive gravity
//! reorientation via [`FacingController::rotate_gravity`].

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::input::InputSnapshot;

/// Defines the local coordinate system for a character.
///
/// The orientation is a single `up` vector; planar directions are derived
/// perpendicular to it. Reassigning `up` at runtime supports non-planetary
/// gravity (walls, ceilings, spherical worlds).
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CharacterOrientation {
    up: Vec3,
}

impl Default for CharacterOrientation {
    fn default() -> Self {
        Self { up: Vec3::Y }
    }
}

impl CharacterOrientation {
    /// Create an orientation with the given up direction.
    ///
    /// The vector is normalized; a zero-length input falls back to `Vec3::Y`.
    pub fn new(up: Vec3) -> Self {
        let normalized = up.normalize_or_zero();
        Self {
            up: if normalized == Vec3::ZERO {
                Vec3::Y
            } else {
                normalized
            },
        }
    }

    /// Get the up direction.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Get the down direction.
    #[inline]
    pub fn down(&self) -> Vec3 {
        -self.up
    }

    /// Set the up direction. Zero-length inputs are ignored.
    pub fn set_up(&mut self, up: Vec3) {
        let normalized = up.normalize_or_zero();
        if normalized != Vec3::ZERO {
            self.up = normalized;
        }
    }

    /// Component of `v` perpendicular to up.
    #[inline]
    pub fn planar(&self, v: Vec3) -> Vec3 {
        v - self.vertical(v)
    }

    /// Component of `v` along up.
    #[inline]
    pub fn vertical(&self, v: Vec3) -> Vec3 {
        self.up * v.dot(self.up)
    }

    /// Split `v` into (planar, vertical) components.
    #[inline]
    pub fn split(&self, v: Vec3) -> (Vec3, Vec3) {
        let vertical = self.vertical(v);
        (v - vertical, vertical)
    }
}

/// Rotation that points `-Z` along `forward` with `up` as the vertical
/// reference. Degenerate inputs (zero forward, forward parallel to up)
/// yield the identity.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let back = -forward.normalize_or_zero();
    if back == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let right = up.cross(back).normalize_or_zero();
    if right == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let up_ortho = back.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up_ortho, back))
}

/// Owns the look direction and the smoothed visual facing.
///
/// The look direction is rotated around the up axis by horizontal look
/// input, scaled by the ratio of simulation-tick delta to frame delta so a
/// sub-stepped physics tick does not change the effective look rate. The
/// visual facing eases toward the horizontal movement direction by
/// spherical interpolation; when there is no horizontal velocity the target
/// holds its last value.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct FacingController {
    /// Current planar look direction, controlled by the camera.
    pub look_direction: Vec3,
    /// Smoothed rotation applied to the character's visual transform.
    pub facing: Quat,
    target_rotation: Quat,
}

impl Default for FacingController {
    fn default() -> Self {
        Self::new(Vec3::NEG_Z)
    }
}

impl FacingController {
    /// Create a facing controller with an initial look direction.
    pub fn new(look_direction: Vec3) -> Self {
        let look = look_rotation(look_direction, Vec3::Y);
        Self {
            look_direction,
            facing: look,
            target_rotation: look,
        }
    }

    /// The rotation the facing is currently easing toward.
    pub fn target_rotation(&self) -> Quat {
        self.target_rotation
    }

    /// Advance the look direction and the smoothed facing by one tick.
    ///
    /// `dt` is the simulation tick delta; `frame_dt` the render frame delta
    /// the look input was sampled over.
    pub fn update(
        &mut self,
        config: &MovementConfig,
        input: &InputSnapshot,
        up: Vec3,
        velocity: Vec3,
        dt: f32,
        frame_dt: f32,
    ) {
        let ratio = if frame_dt > 0.0 { dt / frame_dt } else { 1.0 };
        self.look_direction =
            Quat::from_axis_angle(up, -input.look.x * ratio) * self.look_direction;

        let planar = velocity - up * velocity.dot(up);
        if planar.length_squared() > 1e-6 {
            self.target_rotation = look_rotation(planar, up);
        }

        if config.locked_facing && input.fire_held {
            self.facing = look_rotation(self.look_direction, up);
        } else {
            let t = (config.turn_smoothing * frame_dt).clamp(0.0, 1.0);
            self.facing = self.facing.slerp(self.target_rotation, t);
        }
    }

    /// Reproject the look direction after a gravity reorientation.
    ///
    /// Applies the rotation that maps `old_up` onto `new_up`, so two calls
    /// with inverse rotations restore the original look direction.
    pub fn rotate_gravity(&mut self, old_up: Vec3, new_up: Vec3) {
        self.look_direction = Quat::from_rotation_arc(old_up, new_up) * self.look_direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_default_is_world_up() {
        let orientation = CharacterOrientation::default();
        assert_eq!(orientation.up(), Vec3::Y);
        assert_eq!(orientation.down(), Vec3::NEG_Y);
    }

    #[test]
    fn orientation_new_normalizes_input() {
        let orientation = CharacterOrientation::new(Vec3::new(0.0, 10.0, 0.0));
        assert!((orientation.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn orientation_rejects_zero_up() {
        let mut orientation = CharacterOrientation::new(Vec3::ZERO);
        assert_eq!(orientation.up(), Vec3::Y);

        orientation.set_up(Vec3::ZERO);
        assert_eq!(orientation.up(), Vec3::Y);
    }

    #[test]
    fn split_reassembles_the_vector() {
        let orientation = CharacterOrientation::new(Vec3::new(1.0, 1.0, 0.0));
        let v = Vec3::new(3.0, -2.0, 5.0);
        let (planar, vertical) = orientation.split(v);
        assert!((planar + vertical - v).length() < 1e-5);
        assert!(planar.dot(orientation.up()).abs() < 1e-5);
        assert!(vertical.cross(orientation.up()).length() < 1e-5);
    }

    #[test]
    fn look_rotation_identity_for_default_axes() {
        let rotation = look_rotation(Vec3::NEG_Z, Vec3::Y);
        assert!(rotation.angle_between(Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn look_rotation_points_forward() {
        let rotation = look_rotation(Vec3::X, Vec3::Y);
        let forward = rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn look_rotation_degenerate_inputs_are_identity() {
        assert_eq!(look_rotation(Vec3::ZERO, Vec3::Y), Quat::IDENTITY);
        assert_eq!(look_rotation(Vec3::Y, Vec3::Y), Quat::IDENTITY);
    }

    #[test]
    fn look_input_rotates_around_up() {
        let config = MovementConfig::default();
        let mut facing = FacingController::default();
        let input = InputSnapshot {
            look: Vec2::new(std::f32::consts::FRAC_PI_2, 0.0),
            ..default()
        };

        facing.update(&config, &input, Vec3::Y, Vec3::ZERO, 1.0 / 60.0, 1.0 / 60.0);

        // Same tick and frame delta: the full input angle is applied.
        assert!((facing.look_direction.length() - 1.0).abs() < 1e-5);
        assert!(facing.look_direction.y.abs() < 1e-5);
        assert!((facing.look_direction.dot(Vec3::NEG_Z)).abs() < 1e-5);
    }

    #[test]
    fn look_rate_scales_with_tick_ratio() {
        let config = MovementConfig::default();
        let input = InputSnapshot {
            look: Vec2::new(1.0, 0.0),
            ..default()
        };

        let mut full = FacingController::default();
        full.update(&config, &input, Vec3::Y, Vec3::ZERO, 1.0 / 60.0, 1.0 / 60.0);

        let mut half = FacingController::default();
        half.update(&config, &input, Vec3::Y, Vec3::ZERO, 1.0 / 120.0, 1.0 / 60.0);

        let full_angle = full.look_direction.angle_between(Vec3::NEG_Z);
        let half_angle = half.look_direction.angle_between(Vec3::NEG_Z);
        assert!((full_angle - 2.0 * half_angle).abs() < 1e-4);
    }

    #[test]
    fn target_holds_without_horizontal_velocity() {
        let config = MovementConfig::default();
        let mut facing = FacingController::default();
        let input = InputSnapshot::default();

        facing.update(
            &config,
            &input,
            Vec3::Y,
            Vec3::new(1.0, 0.0, 0.0),
            1.0 / 60.0,
            1.0 / 60.0,
        );
        let target = facing.target_rotation();

        // Purely vertical velocity must not steal the target.
        facing.update(
            &config,
            &input,
            Vec3::Y,
            Vec3::new(0.0, -3.0, 0.0),
            1.0 / 60.0,
            1.0 / 60.0,
        );
        assert!(facing.target_rotation().angle_between(target) < 1e-5);
    }

    #[test]
    fn locked_facing_follows_look_direction() {
        let config = MovementConfig::default().with_locked_facing(true);
        let mut facing = FacingController::new(Vec3::X);
        let input = InputSnapshot {
            fire_held: true,
            ..default()
        };

        facing.update(
            &config,
            &input,
            Vec3::Y,
            Vec3::new(0.0, 0.0, 5.0),
            1.0 / 60.0,
            1.0 / 60.0,
        );
        let forward = facing.facing * Vec3::NEG_Z;
        assert!((forward - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn rotate_gravity_round_trips() {
        let mut facing = FacingController::new(Vec3::new(0.6, 0.0, -0.8));
        let original = facing.look_direction;

        facing.rotate_gravity(Vec3::Y, Vec3::X);
        facing.rotate_gravity(Vec3::X, Vec3::Y);

        assert!((facing.look_direction - original).length() < 1e-5);
    }
}
