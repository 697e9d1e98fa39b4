//! Controller configuration components.
//!
//! This module defines the tunable parameters for the locomotion state
//! machine and the trailing camera. All values are plain numbers with
//! defaults; nothing here is computed at runtime. Out-of-range values are
//! rejected up front by [`MovementConfig::validate`] and
//! [`CameraConfig::validate`] so the simulation never has to guard against
//! NaNs mid-tick.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, PI};

use bevy::prelude::*;
use thiserror::Error;

/// A configuration value was outside its legal range.
///
/// Returned by the `validate()` methods at configuration-load time. The
/// simulation itself never produces these; a config that validated once is
/// valid for the lifetime of the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter that must be strictly positive was zero or negative.
    #[error("`{name}` must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    /// A parameter fell outside its closed legal interval.
    #[error("`{name}` must be within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Two parameters that must be ordered relative to each other were not.
    #[error("`{smaller}` ({smaller_value}) must be less than `{larger}` ({larger_value})")]
    Misordered {
        smaller: &'static str,
        smaller_value: f32,
        larger: &'static str,
        larger_value: f32,
    },
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn in_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Tunable parameters for the locomotion state machine.
///
/// Defaults produce a responsive platformer feel: a ~3 unit jump apex,
/// snappy walk acceleration and a heavy 1.4x fall.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MovementConfig {
    // === Walking ===
    /// Maximum walking speed (units/second).
    pub walk_speed: f32,
    /// Rate at which walking velocity approaches the desired velocity
    /// (units/second^2).
    pub walk_acceleration: f32,
    /// Deceleration toward rest while idle (units/second^2).
    pub idle_deceleration: f32,

    // === Jumping ===
    /// Maximum height attained by a jump. The launch impulse is derived as
    /// `sqrt(2 * jump_height * gravity)`.
    pub jump_height: f32,
    /// Airborne steering acceleration base rate (units/second^2).
    pub jump_acceleration: f32,
    /// Multiplier on `jump_acceleration` while airborne under jump states.
    pub jump_control: f32,

    // === Gravity ===
    /// Gravity magnitude along the down direction (units/second^2).
    pub gravity: f32,
    /// Gravity multiplier applied in the Fall state.
    pub fall_gravity_multiplier: f32,
    /// Fraction of gravity applied while sliding down a wall.
    pub wall_slide_gravity_factor: f32,

    // === Wall interaction ===
    /// Launch speed along the wall normal when jumping off a wall slide.
    pub wall_launch_speed: f32,

    // === Edge climbing ===
    /// Forward offset of the ledge probe origin from the body position.
    pub edge_probe_forward: f32,
    /// Upward offset of the ledge probe origin from the body position.
    pub edge_probe_height: f32,
    /// Downward range of the ledge probe ray.
    pub edge_probe_range: f32,
    /// Minimum alignment (dot with up) of the probed surface normal for a
    /// ledge to count as climbable.
    pub edge_normal_threshold: f32,
    /// Vertical offset below the ledge point the body snaps to when arming
    /// a climb.
    pub climb_offset: f32,
    /// Distance to the climb target at which the climb completes.
    pub climb_finish_distance: f32,

    // === Ground tolerances ===
    /// Tolerance for acquiring ground when airborne (strict).
    pub acquire_tolerance: f32,
    /// Tolerance for maintaining ground once grounded (loose). Larger than
    /// `acquire_tolerance` so uneven terrain does not flicker the grounded
    /// state.
    pub maintain_tolerance: f32,
    /// Steepest slope angle (radians) that still counts as walkable ground.
    pub slope_limit: f32,

    // === Facing ===
    /// Smoothing rate for easing the visual facing toward the movement
    /// direction (1/second).
    pub turn_smoothing: f32,
    /// When enabled, holding the fire input locks the facing to the look
    /// direction instead of the movement direction.
    pub locked_facing: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 6.0,
            walk_acceleration: 30.0,
            idle_deceleration: 10.0,

            jump_height: 3.0,
            jump_acceleration: 5.0,
            jump_control: 3.0,

            gravity: 25.0,
            fall_gravity_multiplier: 1.4,
            wall_slide_gravity_factor: 0.1,

            wall_launch_speed: 8.0,

            edge_probe_forward: 0.8,
            edge_probe_height: 2.2,
            edge_probe_range: 0.5,
            edge_normal_threshold: 0.5,
            climb_offset: 1.2,
            climb_finish_distance: 0.3,

            acquire_tolerance: 0.01,
            maintain_tolerance: 0.5,
            slope_limit: FRAC_PI_3,

            turn_smoothing: 20.0,
            locked_facing: false,
        }
    }
}

impl MovementConfig {
    /// Initial vertical speed of a jump reaching `jump_height`.
    #[inline]
    pub fn jump_speed(&self) -> f32 {
        (2.0 * self.jump_height * self.gravity).sqrt()
    }

    /// Steering acceleration while airborne.
    #[inline]
    pub fn air_acceleration(&self) -> f32 {
        self.jump_acceleration * self.jump_control
    }

    /// Builder: set walking speed and acceleration.
    pub fn with_walk(mut self, speed: f32, acceleration: f32) -> Self {
        self.walk_speed = speed;
        self.walk_acceleration = acceleration;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set gravity magnitude.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set the wall launch speed.
    pub fn with_wall_launch_speed(mut self, speed: f32) -> Self {
        self.wall_launch_speed = speed;
        self
    }

    /// Builder: enable the locked-facing mode.
    pub fn with_locked_facing(mut self, locked: bool) -> Self {
        self.locked_facing = locked;
        self
    }

    /// Check every parameter against its legal range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("walk_speed", self.walk_speed)?;
        positive("walk_acceleration", self.walk_acceleration)?;
        positive("idle_deceleration", self.idle_deceleration)?;
        positive("jump_height", self.jump_height)?;
        positive("jump_acceleration", self.jump_acceleration)?;
        positive("jump_control", self.jump_control)?;
        positive("gravity", self.gravity)?;
        positive("fall_gravity_multiplier", self.fall_gravity_multiplier)?;
        positive("wall_launch_speed", self.wall_launch_speed)?;
        positive("turn_smoothing", self.turn_smoothing)?;
        positive("edge_probe_range", self.edge_probe_range)?;
        positive("climb_finish_distance", self.climb_finish_distance)?;
        in_range(
            "wall_slide_gravity_factor",
            self.wall_slide_gravity_factor,
            0.0,
            1.0,
        )?;
        in_range("edge_normal_threshold", self.edge_normal_threshold, 0.0, 1.0)?;
        in_range("slope_limit", self.slope_limit, 0.0, FRAC_PI_2)?;
        positive("acquire_tolerance", self.acquire_tolerance)?;
        positive("maintain_tolerance", self.maintain_tolerance)?;
        if self.acquire_tolerance >= self.maintain_tolerance {
            return Err(ConfigError::Misordered {
                smaller: "acquire_tolerance",
                smaller_value: self.acquire_tolerance,
                larger: "maintain_tolerance",
                larger_value: self.maintain_tolerance,
            });
        }
        Ok(())
    }
}

/// Perspective parameters of the camera, used to place the near-clip
/// corner rays for occlusion probing.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct CameraLens {
    /// Vertical field of view (radians).
    pub fov_y: f32,
    /// Viewport width / height.
    pub aspect: f32,
    /// Near clip plane distance.
    pub near: f32,
}

impl Default for CameraLens {
    fn default() -> Self {
        Self {
            fov_y: FRAC_PI_3,
            aspect: 16.0 / 9.0,
            near: 0.3,
        }
    }
}

impl CameraLens {
    /// Half-extents of the near-clip rectangle.
    pub fn near_half_extents(&self) -> Vec2 {
        let half_height = self.near * (self.fov_y * 0.5).tan();
        Vec2::new(half_height * self.aspect, half_height)
    }
}

/// Tunable parameters for the trailing camera and its occlusion resolver.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CameraConfig {
    /// Height of the follow target above the player position, along up.
    pub height: f32,
    /// Desired trailing distance behind the follow target.
    pub distance: f32,
    /// Closest offset the occlusion resolver pulls candidate positions
    /// toward the target when probing.
    pub min_offset: f32,
    /// Hard floor on the resolved camera distance.
    pub floor_distance: f32,

    /// Fraction of the measured occluder depth the camera settles at.
    pub occlusion_damping: f32,
    /// Per-tick easing fraction when the resolved distance grows while the
    /// same face is still occluding.
    pub expand_hysteresis: f32,

    /// Vertical delta beyond which the accepted target height snaps
    /// immediately instead of easing.
    pub height_snap_threshold: f32,
    /// Easing rate of the accepted target height (1/second).
    pub height_ease_rate: f32,
    /// The accepted height also snaps when the camera has dropped below
    /// this fraction of the player's height along up.
    pub drop_catch_factor: f32,

    /// Fade factor per unit of camera-target distance.
    pub fade_scale: f32,
    /// Fade values below this cut to fully transparent.
    pub fade_cutoff: f32,

    /// Smoothing range used for the trailing distance when no occlusion is
    /// adjusting it.
    pub idle_smooth_range: f32,

    /// Perspective parameters for near-clip corner placement.
    pub lens: CameraLens,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            height: 2.0,
            distance: 5.0,
            min_offset: 0.18,
            floor_distance: 0.2,

            occlusion_damping: 0.6,
            expand_hysteresis: 0.08,

            height_snap_threshold: 3.3,
            height_ease_rate: 2.0,
            drop_catch_factor: 0.8,

            fade_scale: 0.5,
            fade_cutoff: 0.35,

            idle_smooth_range: 15.0,

            lens: CameraLens::default(),
        }
    }
}

impl CameraConfig {
    /// Builder: set the follow height.
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Builder: set the desired trailing distance.
    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance;
        self
    }

    /// Builder: set the lens parameters.
    pub fn with_lens(mut self, lens: CameraLens) -> Self {
        self.lens = lens;
        self
    }

    /// Check every parameter against its legal range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("height", self.height)?;
        positive("distance", self.distance)?;
        positive("min_offset", self.min_offset)?;
        positive("floor_distance", self.floor_distance)?;
        positive("height_snap_threshold", self.height_snap_threshold)?;
        positive("height_ease_rate", self.height_ease_rate)?;
        positive("idle_smooth_range", self.idle_smooth_range)?;
        in_range("occlusion_damping", self.occlusion_damping, 0.0, 1.0)?;
        in_range("expand_hysteresis", self.expand_hysteresis, 0.0, 1.0)?;
        in_range("drop_catch_factor", self.drop_catch_factor, 0.0, 1.0)?;
        in_range("fade_cutoff", self.fade_cutoff, 0.0, 1.0)?;
        positive("fade_scale", self.fade_scale)?;
        positive("lens.near", self.lens.near)?;
        positive("lens.aspect", self.lens.aspect)?;
        in_range("lens.fov_y", self.lens.fov_y, 0.01, PI - 0.01)?;
        if self.min_offset >= self.distance {
            return Err(ConfigError::Misordered {
                smaller: "min_offset",
                smaller_value: self.min_offset,
                larger: "distance",
                larger_value: self.distance,
            });
        }
        if self.floor_distance >= self.distance {
            return Err(ConfigError::Misordered {
                smaller: "floor_distance",
                smaller_value: self.floor_distance,
                larger: "distance",
                larger_value: self.distance,
            });
        }
        Ok(())
    }
}
