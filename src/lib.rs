//! # `third_person_controller`
//!
//! A third-person character locomotion state machine with camera occlusion
//! avoidance and physics backend abstraction.
//!
//! This crate provides a tick-driven, deterministic controller core that:
//! - Runs an eight-state locomotion machine (idle/walk/jump/double-jump/
//!   fall/wall-slide/climb) over a per-tick input snapshot and a surface
//!   query snapshot
//! - Walks relative to a configurable up-axis, so gravity can be
//!   reoriented at runtime
//! - Trails the player with a camera whose follow height is smoothed
//!   against terrain noise and whose distance is clamped by a multi-ray
//!   occlusion resolver
//! - Abstracts the physics engine behind a backend trait (Rapier 3D
//!   included behind the `rapier3d` feature)
//!
//! ## Architecture
//!
//! Each fixed-update tick runs four phases in order:
//! 1. **Sensors** (backend): refresh every character's
//!    [`SurfaceState`](surface::SurfaceState) with ground, contact and
//!    ledge probes
//! 2. **Locomotion**: facing update, then the state machine tick, then
//!    marker sync
//! 3. **Integration**: `position += velocity * dt` and the smoothed facing
//!    written to the body transform
//! 4. **Camera** (backend): trailing rig update with occlusion raycasts
//!
//! The locomotion and camera cores are plain structs with no engine
//! dependencies beyond math types; they can be driven directly for tests
//! or headless simulation via [`backend::ScriptedBackend`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use third_person_controller::prelude::*;
//!
//! App::new()
//!     .add_plugins(MinimalPlugins)
//!     .add_plugins(ThirdPersonControllerPlugin::<ScriptedBackend>::default())
//!     .run();
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod camera;
pub mod config;
pub mod input;
pub mod machine;
pub mod occlusion;
pub mod orientation;
pub mod state;
pub mod surface;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier3d;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{PhysicsBackend, ScriptedBackend};
    pub use crate::camera::{CameraPose, CameraRigState, CameraTarget};
    pub use crate::config::{CameraConfig, CameraLens, ConfigError, MovementConfig};
    pub use crate::input::{ControlInput, InputSnapshot};
    pub use crate::machine::{LocomotionMachine, LocomotionState, TickContext};
    pub use crate::occlusion::OcclusionMemory;
    pub use crate::orientation::{CharacterOrientation, FacingController};
    pub use crate::state::{Airborne, Grounded, OnWall};
    pub use crate::surface::{GroundContact, LedgeHit, RayHit, SurfaceState};
    pub use crate::{ControllerSet, ThirdPersonControllerPlugin};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier3d::Rapier3dBackend;
}

/// Phases of the controller's fixed-update pipeline, run in declaration
/// order. Backends add their sensor systems to `Sensors` and their camera
/// update to `Camera`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Surface probing (backend-provided).
    Sensors,
    /// Facing update, locomotion tick, marker sync.
    Locomotion,
    /// Velocity integration onto the body transform.
    Integration,
    /// Trailing camera update (backend-provided).
    Camera,
}

/// Main plugin for the third-person controller.
///
/// Generic over a physics backend `B` which provides surface sensing and
/// camera occlusion raycasts.
///
/// # Examples
///
/// With the Rapier 3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use third_person_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(ThirdPersonControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct ThirdPersonControllerPlugin<B: backend::PhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::PhysicsBackend> Default for ThirdPersonControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::PhysicsBackend> Plugin for ThirdPersonControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::MovementConfig>();
        app.register_type::<config::CameraConfig>();
        app.register_type::<input::ControlInput>();
        app.register_type::<surface::SurfaceState>();
        app.register_type::<orientation::CharacterOrientation>();
        app.register_type::<orientation::FacingController>();
        app.register_type::<machine::LocomotionMachine>();
        app.register_type::<camera::CameraRigState>();
        app.register_type::<camera::CameraPose>();
        app.register_type::<camera::CameraTarget>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::OnWall>();

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Sensors,
                ControllerSet::Locomotion,
                ControllerSet::Integration,
                ControllerSet::Camera,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::update_facing,
                systems::tick_locomotion,
                systems::sync_state_markers,
            )
                .chain()
                .in_set(ControllerSet::Locomotion),
        );
        app.add_systems(
            FixedUpdate,
            systems::integrate_body.in_set(ControllerSet::Integration),
        );
    }
}
