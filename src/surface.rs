//! Surface query snapshots.
//!
//! The ground/wall sweep primitive is external to this crate: a physics
//! backend probes the world once per tick and records what it found in a
//! [`SurfaceState`]. The locomotion machine then treats that snapshot as a
//! pure query interface. A raycast that misses is a valid "nothing there"
//! answer, never an error.

use bevy::prelude::*;

/// Result of a single raycast against the collidable world.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// World position of the hit point.
    pub point: Vec3,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// Entity that was hit (if known).
    pub entity: Option<Entity>,
}

impl RayHit {
    /// Create a hit result without an entity.
    pub fn new(distance: f32, point: Vec3, normal: Vec3) -> Self {
        Self {
            distance,
            point,
            normal,
            entity: None,
        }
    }
}

/// Ground found beneath the body this tick.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct GroundContact {
    /// Distance from the body origin to the ground surface, along down.
    pub distance: f32,
    /// Ground surface normal.
    pub normal: Vec3,
    /// Ground contact point in world space.
    pub point: Vec3,
    /// Whether the surface is within the slope limit.
    pub walkable: bool,
}

/// A climbable ledge found by the forward-and-down probe.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct LedgeHit {
    /// Point on top of the ledge, used as the climb target.
    pub point: Vec3,
    /// Surface normal at the probe hit.
    pub normal: Vec3,
}

/// Per-tick snapshot of the external ground/wall query.
///
/// Populated by the physics backend before the locomotion machine runs,
/// consumed read-only for the rest of the tick.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct SurfaceState {
    /// Up direction the probes were taken against.
    pub up: Vec3,
    /// Ground beneath the body, if any was found within probe range.
    pub ground: Option<GroundContact>,
    /// Normals of every active contact this tick (walls, ceilings, ground).
    pub contacts: Vec<Vec3>,
    /// Climbable ledge found in front of the body, if any.
    pub ledge: Option<LedgeHit>,
    /// Contacts with `|normal . up|` below this are treated as walls.
    pub wall_threshold: f32,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::airborne(Vec3::Y)
    }
}

impl SurfaceState {
    /// Snapshot with nothing under or around the body.
    pub fn airborne(up: Vec3) -> Self {
        Self {
            up,
            ground: None,
            contacts: Vec::new(),
            ledge: None,
            wall_threshold: 0.5,
        }
    }

    /// Snapshot standing on flat walkable ground at the given distance.
    pub fn grounded(up: Vec3, distance: f32) -> Self {
        Self {
            ground: Some(GroundContact {
                distance,
                normal: up,
                point: Vec3::ZERO,
                walkable: true,
            }),
            ..Self::airborne(up)
        }
    }

    /// Builder: add an active contact normal.
    pub fn with_contact(mut self, normal: Vec3) -> Self {
        self.contacts.push(normal);
        self
    }

    /// Builder: record a climbable ledge.
    pub fn with_ledge(mut self, point: Vec3, normal: Vec3) -> Self {
        self.ledge = Some(LedgeHit { point, normal });
        self
    }

    /// Whether the body touches walkable ground within `tolerance`.
    ///
    /// `strict` additionally requires the surface to be within the slope
    /// limit; the loose variant only checks proximity, which gives the
    /// grounded state hysteresis on uneven terrain.
    pub fn is_grounded(&self, strict: bool, tolerance: f32) -> bool {
        match self.ground {
            Some(ground) => ground.distance <= tolerance && (!strict || ground.walkable),
            None => false,
        }
    }

    /// Contact normal of a wall blocking movement along `direction`, or
    /// `None` when the way is clear.
    pub fn wall_contact(&self, direction: Vec3) -> Option<Vec3> {
        if direction == Vec3::ZERO {
            return None;
        }
        self.contacts
            .iter()
            .copied()
            .find(|normal| {
                normal.dot(direction) < -0.01 && normal.dot(self.up).abs() < self.wall_threshold
            })
    }

    /// Whether any contact pushes straight down (a ceiling, or the ground
    /// seen from below).
    pub fn ceiling_contact(&self) -> bool {
        self.contacts
            .iter()
            .any(|normal| (*normal + self.up).length_squared() < 1e-5)
    }

    /// Reset every probe result, keeping the up axis and thresholds.
    pub fn clear(&mut self) {
        self.ground = None;
        self.contacts.clear();
        self.ledge = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airborne_is_not_grounded() {
        let surface = SurfaceState::airborne(Vec3::Y);
        assert!(!surface.is_grounded(true, 0.01));
        assert!(!surface.is_grounded(false, 0.5));
    }

    #[test]
    fn grounded_within_tolerance() {
        let surface = SurfaceState::grounded(Vec3::Y, 0.3);
        assert!(!surface.is_grounded(true, 0.01));
        assert!(surface.is_grounded(false, 0.5));
    }

    #[test]
    fn strict_requires_walkable() {
        let mut surface = SurfaceState::grounded(Vec3::Y, 0.0);
        assert!(surface.is_grounded(true, 0.01));

        surface.ground.as_mut().unwrap().walkable = false;
        assert!(!surface.is_grounded(true, 0.01));
        assert!(surface.is_grounded(false, 0.01));
    }

    #[test]
    fn wall_contact_opposes_movement() {
        let surface = SurfaceState::airborne(Vec3::Y).with_contact(Vec3::NEG_X);

        // Moving into the wall reports its normal.
        assert_eq!(surface.wall_contact(Vec3::X), Some(Vec3::NEG_X));
        // Moving away or sideways does not.
        assert_eq!(surface.wall_contact(Vec3::NEG_X), None);
        assert_eq!(surface.wall_contact(Vec3::Z), None);
        // Zero direction never matches.
        assert_eq!(surface.wall_contact(Vec3::ZERO), None);
    }

    #[test]
    fn ground_normal_is_not_a_wall() {
        let surface = SurfaceState::airborne(Vec3::Y).with_contact(Vec3::Y);
        // A floor contact opposes downward movement but is not a wall.
        assert_eq!(surface.wall_contact(Vec3::NEG_Y), None);
    }

    #[test]
    fn ceiling_contact_matches_only_inverted_up() {
        let surface = SurfaceState::airborne(Vec3::Y).with_contact(Vec3::NEG_Y);
        assert!(surface.ceiling_contact());

        let surface = SurfaceState::airborne(Vec3::Y).with_contact(Vec3::X);
        assert!(!surface.ceiling_contact());
    }

    #[test]
    fn clear_keeps_axis() {
        let mut surface = SurfaceState::grounded(Vec3::Z, 0.0)
            .with_contact(Vec3::X)
            .with_ledge(Vec3::ONE, Vec3::Z);
        surface.clear();
        assert_eq!(surface.up, Vec3::Z);
        assert!(surface.ground.is_none());
        assert!(surface.contacts.is_empty());
        assert!(surface.ledge.is_none());
    }
}
