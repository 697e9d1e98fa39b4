//! Camera occlusion resolution.
//!
//! Given the camera's candidate position and its follow target, the
//! resolver probes the collidable world along the camera's near-clip
//! rectangle and computes the closest allowable trailing distance that
//! keeps geometry out of the frustum. Raycasting is abstracted behind a
//! closure so the resolver runs against a physics backend or synthetic
//! test geometry alike; a ray that misses means "no occluder there".
//!
//! Two candidate distances are tracked per tick:
//!
//! - `edge_collide`: for each near-rectangle edge that an occluder cuts, a
//!   representative point on the occluding surface is estimated (midpoint
//!   of the entry hit and either a reverse-direction hit or the far
//!   corner), then a secondary ray from a pulled-in camera position toward
//!   that point measures how far the camera must come in to clear it.
//! - `corner_collide`: each corner is probed independently from the
//!   pulled-in position; when all four corners report the same surface
//!   normal the occluder is one flat face and this cheaper measure wins,
//!   avoiding over-correction from redundant edge samples.
//!
//! The ray that produced the best measurement is persisted in
//! [`OcclusionMemory`] and replayed (translated by camera and target
//! motion) on ticks where the edges report nothing, keeping the resolved
//! distance continuous while the rig moves along the same occluder. The
//! memory is reset only when neither an edge nor a corner detects anything.

use bevy::prelude::*;

use crate::config::CameraConfig;
use crate::surface::RayHit;

/// A ray that measured the current occluder, kept across ticks.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct PersistedRay {
    /// Origin of the measuring ray.
    pub origin: Vec3,
    /// Point on the occluder the ray was aimed at.
    pub center: Vec3,
    /// Camera position the measurement was taken from.
    pub camera_position: Vec3,
    /// Target position the measurement was taken against.
    pub target_position: Vec3,
}

/// Sticky occlusion state carried across ticks.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct OcclusionMemory {
    /// Last known measuring ray, if an occluder has been seen.
    pub ray: Option<PersistedRay>,
    distance: f32,
}

impl Default for OcclusionMemory {
    fn default() -> Self {
        Self {
            ray: None,
            distance: f32::INFINITY,
        }
    }
}

impl OcclusionMemory {
    /// The smoothed occluder distance; infinite while nothing occludes.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Whether no occluder is currently being tracked.
    pub fn is_clear(&self) -> bool {
        self.ray.is_none() && self.distance.is_infinite()
    }

    /// Forget the tracked occluder.
    pub fn clear(&mut self) {
        self.ray = None;
        self.distance = f32::INFINITY;
    }

    /// Compute the closest allowable camera distance this tick.
    ///
    /// `camera_position` is the unclamped candidate position,
    /// `camera_rotation` its orientation (near-clip corners are placed from
    /// it), and `max_distance` the desired trailing distance. Returns
    /// `max_distance` when the path is clear, otherwise the damped,
    /// hysteresis-smoothed occluder distance clamped to the configured
    /// floor. Repeated calls against static geometry converge.
    pub fn resolve<F>(
        &mut self,
        config: &CameraConfig,
        camera_position: Vec3,
        camera_rotation: Quat,
        target_position: Vec3,
        min_offset: f32,
        max_distance: f32,
        caster: &F,
    ) -> f32
    where
        F: Fn(Vec3, Vec3, f32) -> Option<RayHit>,
    {
        let forward = camera_rotation * Vec3::NEG_Z;
        let right = camera_rotation * Vec3::X;
        let up = camera_rotation * Vec3::Y;

        let near_center = camera_position + forward * config.lens.near;
        let half = config.lens.near_half_extents();
        // Perimeter order: top-left, top-right, bottom-right, bottom-left.
        let corners = [
            near_center - right * half.x + up * half.y,
            near_center + right * half.x + up * half.y,
            near_center + right * half.x - up * half.y,
            near_center - right * half.x - up * half.y,
        ];

        let nearest_position = target_position - forward * min_offset;
        let reach = max_distance * 2.0;

        let mut edge_collide = f32::INFINITY;
        let mut corner_collide = f32::INFINITY;
        let mut edge_hit = false;
        let mut corner_hit = false;
        let mut corner_normals: [Option<Vec3>; 4] = [None; 4];

        // Secondary measurement: pull the camera in toward the target and
        // ray toward the estimated occluder point.
        let measure = |memory: &mut Self, aim: Vec3, best: &mut f32| {
            let origin = nearest_position + (aim - camera_position);
            let Some(direction) = (aim - origin).try_normalize() else {
                return;
            };
            if let Some(hit) = caster(origin, direction, reach) {
                if hit.distance < *best {
                    *best = hit.distance;
                    memory.ray = Some(PersistedRay {
                        origin,
                        center: aim,
                        camera_position,
                        target_position,
                    });
                }
            }
        };

        for (i, &start) in corners.iter().enumerate() {
            let end = corners[(i + 1) % corners.len()];
            let edge = end - start;
            let edge_length = edge.length();
            let edge_direction = edge / edge_length;

            if let Some(entry) = caster(start, edge_direction, edge_length) {
                edge_hit = true;

                match caster(end, -edge_direction, edge_length) {
                    Some(reverse) => {
                        measure(self, (entry.point + reverse.point) * 0.5, &mut edge_collide);
                    }
                    None => {
                        // Occluder extends past this edge's far corner.
                        measure(self, (entry.point + end) * 0.5, &mut edge_collide);
                        measure(self, end, &mut edge_collide);
                    }
                }
            }

            // Independent corner-versus-body probe.
            let origin = nearest_position + (start - camera_position);
            if let Some(direction) = (start - origin).try_normalize() {
                if let Some(hit) = caster(origin, direction, reach) {
                    corner_hit = true;
                    if hit.distance < corner_collide {
                        corner_collide = hit.distance;
                    }
                    corner_normals[i] = Some(hit.normal);
                }
            }
        }

        // No fresh edge hit: replay the persisted ray, translated by how
        // far the camera and target have moved since it was recorded.
        if !edge_hit {
            if let Some(ray) = self.ray {
                let aim = ray.center + (camera_position - ray.camera_position);
                let origin = ray.origin + (target_position - ray.target_position);
                if let Some(direction) = (aim - origin).try_normalize() {
                    if let Some(hit) = caster(origin, direction, reach) {
                        if hit.distance < edge_collide {
                            edge_collide = hit.distance;
                        }
                    }
                }
            }
        }

        if !edge_hit && !corner_hit {
            self.clear();
        }

        let edge_collide = edge_collide * config.occlusion_damping;
        let corner_collide = corner_collide * config.occlusion_damping;

        let same_face = corner_normals[0].is_some()
            && corner_normals.iter().all(|normal| match (normal, corner_normals[0]) {
                (Some(n), Some(first)) => (*n - first).length_squared() < 1e-6,
                _ => false,
            });

        if same_face {
            let measured = edge_collide.min(corner_collide);
            if measured.is_finite() && measured > self.distance {
                self.distance += (measured - self.distance) * config.expand_hysteresis;
            } else {
                self.distance = measured;
            }
        } else {
            self.distance = self.distance.min(edge_collide).min(corner_collide);
        }

        if self.distance < config.floor_distance {
            self.distance = config.floor_distance;
        }

        self.distance.min(max_distance)
    }
}
