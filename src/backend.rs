//! Physics backend abstraction.
//!
//! The crate never talks to a physics engine directly. A backend supplies
//! a plugin whose systems refresh each character's
//! [`SurfaceState`](crate::surface::SurfaceState) before the locomotion
//! tick (ground probe, contact ring, ledge probe) and drive the camera rig
//! with a raycaster for occlusion resolution. The probe geometry helpers
//! here keep those sensors consistent across backends.

use bevy::prelude::*;

use crate::config::MovementConfig;

/// Trait for physics backend implementations.
///
/// A backend's plugin is installed by
/// [`ThirdPersonControllerPlugin`](crate::ThirdPersonControllerPlugin) and
/// is expected to add its sensor systems to
/// [`ControllerSet::Sensors`](crate::ControllerSet::Sensors) and its camera
/// update to [`ControllerSet::Camera`](crate::ControllerSet::Camera).
///
/// For an example implementation, see the `rapier3d` module's
/// `Rapier3dBackend` (enabled with the `rapier3d` feature).
pub trait PhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Backend that installs no sensors at all.
///
/// Surface states are whatever the application (or a test) writes into
/// them, which makes simulation runs fully scripted and deterministic.
pub struct ScriptedBackend;

impl PhysicsBackend for ScriptedBackend {
    fn plugin() -> impl Plugin {
        NoOpBackendPlugin
    }
}

/// The ledge probe ray for a body at `position` facing `look`:
/// `(origin, direction, range)`.
///
/// Cast downward from a point in front of and above the body; a walkable
/// hit within range marks a climbable edge.
pub fn ledge_probe_ray(
    config: &MovementConfig,
    position: Vec3,
    up: Vec3,
    look: Vec3,
) -> (Vec3, Vec3, f32) {
    let origin = position + look * config.edge_probe_forward + up * config.edge_probe_height;
    (origin, -up, config.edge_probe_range)
}

/// Horizontal probe directions for gathering wall contacts: a ring of
/// eight directions around `up`, starting at `look`.
pub fn contact_probe_directions(up: Vec3, look: Vec3) -> [Vec3; 8] {
    let mut directions = [Vec3::ZERO; 8];
    let step = std::f32::consts::TAU / directions.len() as f32;
    for (i, direction) in directions.iter_mut().enumerate() {
        *direction = Quat::from_axis_angle(up, step * i as f32) * look;
    }
    directions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledge_probe_matches_configured_offsets() {
        let config = MovementConfig::default();
        let position = Vec3::new(1.0, 2.0, 3.0);
        let (origin, direction, range) =
            ledge_probe_ray(&config, position, Vec3::Y, Vec3::NEG_Z);

        let expected = position
            + Vec3::NEG_Z * config.edge_probe_forward
            + Vec3::Y * config.edge_probe_height;
        assert!((origin - expected).length() < 1e-5);
        assert_eq!(direction, Vec3::NEG_Y);
        assert_eq!(range, config.edge_probe_range);
    }

    #[test]
    fn contact_ring_stays_planar() {
        let directions = contact_probe_directions(Vec3::Y, Vec3::NEG_Z);
        for direction in directions {
            assert!(direction.dot(Vec3::Y).abs() < 1e-5);
            assert!((direction.length() - 1.0).abs() < 1e-5);
        }
        // First direction is the look direction itself.
        assert!((directions[0] - Vec3::NEG_Z).length() < 1e-5);
    }
}
