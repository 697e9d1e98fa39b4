//! Locomotion state machine.
//!
//! [`LocomotionMachine`] owns the character's velocity and locomotion
//! state. Once per tick it consumes the input snapshot and the surface
//! query snapshot, runs the active state's update, and performs at most one
//! transition. Transitions are direct calls, not deferred messages: the old
//! state's exit, the new state's enter and the new state's update all run
//! inside the same tick, so state-entry effects (the jump impulse, the wall
//! launch) are visible in that tick's velocity.
//!
//! Machine-local bookkeeping (jump counter, wall contact normal, climb
//! target, ground assist flags) lives here, scoped to the machine rather
//! than spread across the owning entity.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::input::InputSnapshot;
use crate::surface::SurfaceState;

/// The closed set of locomotion states. Exactly one is active at a time.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionState {
    /// Standing on ground, decelerating to rest.
    Idle,
    /// Moving on ground under player control.
    Walk,
    /// Rising from a jump.
    Jump,
    /// Rising from the second, airborne jump.
    DoubleJump,
    /// Airborne and descending.
    Fall,
    /// Pressed against a wall, sliding down slowly.
    WallSlide,
    /// Hanging at a ledge, waiting for the climb to be confirmed.
    Climb,
    /// Pulling up onto the ledge.
    Climbing,
}

/// Assists the external body controller applies while grounded.
///
/// Airborne states switch both off so the body is neither snapped to the
/// ground nor slope-corrected mid-air; entering Idle re-enables them.
#[derive(Reflect, Debug, Clone, Copy)]
pub struct GroundAssist {
    /// Ground clamping (sticking the body to the walked surface).
    pub clamping: bool,
    /// Slope-limit correction.
    pub slope_limit: bool,
}

impl Default for GroundAssist {
    fn default() -> Self {
        Self {
            clamping: true,
            slope_limit: true,
        }
    }
}

impl GroundAssist {
    fn disabled() -> Self {
        Self {
            clamping: false,
            slope_limit: false,
        }
    }
}

/// Everything a locomotion tick reads.
///
/// The surface snapshot is the external ground/wall query for this tick;
/// `up` is the current gravity-up direction and `look` the planar look
/// direction movement input is relative to.
pub struct TickContext<'a> {
    pub config: &'a MovementConfig,
    pub input: &'a InputSnapshot,
    pub surface: &'a SurfaceState,
    pub up: Vec3,
    pub look: Vec3,
    pub dt: f32,
}

impl TickContext<'_> {
    /// Desired movement direction local to the look direction.
    ///
    /// Zero when there is no movement input or the axes cancel out; the
    /// normalization never produces NaN.
    pub fn local_movement(&self) -> Vec3 {
        let right = self.look.cross(self.up);
        (right * self.input.move_axes.x + self.look * self.input.move_axes.y).normalize_or_zero()
    }

    fn planar(&self, v: Vec3) -> Vec3 {
        v - self.vertical(v)
    }

    fn vertical(&self, v: Vec3) -> Vec3 {
        self.up * v.dot(self.up)
    }
}

fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance < 1e-8 {
        target
    } else {
        current + delta / distance * max_delta
    }
}

/// The locomotion state machine.
///
/// Call [`tick`](Self::tick) exactly once per simulation tick. For a fixed
/// input/surface sequence and a fixed `dt` the produced state and velocity
/// trajectories are identical run to run.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct LocomotionMachine {
    state: LocomotionState,
    velocity: Vec3,
    jump_count: u8,
    wall_normal: Vec3,
    climb_target: Vec3,
    assist: GroundAssist,
    entered_ground: bool,
}

impl Default for LocomotionMachine {
    fn default() -> Self {
        Self {
            state: LocomotionState::Idle,
            velocity: Vec3::ZERO,
            jump_count: 0,
            wall_normal: Vec3::ZERO,
            climb_target: Vec3::ZERO,
            assist: GroundAssist::default(),
            entered_ground: false,
        }
    }
}

impl LocomotionMachine {
    /// Create a machine starting in Idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active state.
    #[inline]
    pub fn state(&self) -> LocomotionState {
        self.state
    }

    /// The velocity vector owned by the machine.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Jumps performed since the last Idle or WallSlide reset.
    #[inline]
    pub fn jump_count(&self) -> u8 {
        self.jump_count
    }

    /// Wall contact normal recorded when entering WallSlide; zero outside
    /// the slide.
    #[inline]
    pub fn wall_normal(&self) -> Vec3 {
        self.wall_normal
    }

    /// Ground assist flags for the external body controller.
    #[inline]
    pub fn assist(&self) -> GroundAssist {
        self.assist
    }

    /// Whether this tick transitioned the machine into a grounded state.
    #[inline]
    pub fn entered_ground(&self) -> bool {
        self.entered_ground
    }

    /// Advance the machine by one tick.
    ///
    /// Runs the active state's update; if it requests a transition, the old
    /// state exits, the new state enters and the new state's update also
    /// runs, all within this tick. A transition requested by that second
    /// update is deferred to the next tick, so at most one transition
    /// happens per tick.
    ///
    /// `position` is mutated only by the climb states (the snap on arming
    /// and the pull-up interpolation); everything else moves the body
    /// through the returned velocity.
    pub fn tick(
        &mut self,
        ctx: &TickContext,
        position: &mut Vec3,
    ) -> (Vec3, LocomotionState) {
        let was_grounded = self.is_grounded_state();
        if let Some(next) = self.update_state(ctx, position) {
            self.exit_state(self.state);
            self.state = next;
            self.enter_state(ctx, position, next);
            let _ = self.update_state(ctx, position);
        }
        self.entered_ground = self.is_grounded_state() && !was_grounded;
        (self.velocity, self.state)
    }

    fn update_state(&mut self, ctx: &TickContext, position: &mut Vec3) -> Option<LocomotionState> {
        match self.state {
            LocomotionState::Idle => self.update_idle(ctx),
            LocomotionState::Walk => self.update_walk(ctx),
            LocomotionState::Jump => self.update_jump(ctx),
            LocomotionState::DoubleJump => self.update_double_jump(ctx),
            LocomotionState::Fall => self.update_fall(ctx),
            LocomotionState::WallSlide => self.update_wall_slide(ctx),
            LocomotionState::Climb => self.update_climb(ctx),
            LocomotionState::Climbing => self.update_climbing(ctx, position),
        }
    }

    fn enter_state(&mut self, ctx: &TickContext, position: &mut Vec3, state: LocomotionState) {
        match state {
            LocomotionState::Idle => {
                self.assist = GroundAssist::default();
                self.jump_count = 0;
            }
            LocomotionState::Walk => {}
            LocomotionState::Jump => {
                self.assist = GroundAssist::disabled();
                self.jump_count = 1;
                self.velocity += ctx.up * ctx.config.jump_speed();
            }
            LocomotionState::DoubleJump => {
                self.jump_count = 2;
                self.velocity = ctx.planar(self.velocity) + ctx.up * ctx.config.jump_speed();
            }
            LocomotionState::Fall => {
                self.assist = GroundAssist::disabled();
            }
            LocomotionState::WallSlide => {
                self.assist = GroundAssist::disabled();
                self.velocity = Vec3::ZERO;
                self.jump_count = 0;
            }
            LocomotionState::Climb => {
                let lift = (self.climb_target - *position).dot(ctx.up) - ctx.config.climb_offset;
                *position += ctx.up * lift;
                self.velocity = Vec3::ZERO;
            }
            LocomotionState::Climbing => {}
        }
    }

    fn exit_state(&mut self, state: LocomotionState) {
        if state == LocomotionState::WallSlide {
            self.wall_normal = Vec3::ZERO;
        }
    }

    fn is_grounded_state(&self) -> bool {
        matches!(self.state, LocomotionState::Idle | LocomotionState::Walk)
    }

    fn acquiring_ground(&self, ctx: &TickContext) -> bool {
        ctx.surface.is_grounded(true, ctx.config.acquire_tolerance)
    }

    fn maintaining_ground(&self, ctx: &TickContext) -> bool {
        ctx.surface.is_grounded(false, ctx.config.maintain_tolerance)
    }

    /// Check the ledge probe and, if the surface is climbable, record its
    /// hit point as the climb target.
    fn on_edge(&mut self, ctx: &TickContext) -> bool {
        if let Some(ledge) = ctx.surface.ledge {
            if ledge.normal.dot(ctx.up) > ctx.config.edge_normal_threshold {
                self.climb_target = ledge.point;
                return true;
            }
        }
        false
    }

    fn update_idle(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        if ctx.input.jump_pressed {
            return Some(LocomotionState::Jump);
        }
        if !self.maintaining_ground(ctx) {
            return Some(LocomotionState::Fall);
        }
        if ctx.input.is_moving() {
            return Some(LocomotionState::Walk);
        }

        self.velocity = move_towards(
            self.velocity,
            Vec3::ZERO,
            ctx.config.idle_deceleration * ctx.dt,
        );
        None
    }

    fn update_walk(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        if ctx.input.jump_pressed {
            return Some(LocomotionState::Jump);
        }
        if !self.maintaining_ground(ctx) {
            return Some(LocomotionState::Fall);
        }
        if !ctx.input.is_moving() {
            return Some(LocomotionState::Idle);
        }

        self.velocity = move_towards(
            self.velocity,
            ctx.local_movement() * ctx.config.walk_speed,
            ctx.config.walk_acceleration * ctx.dt,
        );
        None
    }

    fn update_jump(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        let local = ctx.local_movement();
        let (mut planar, mut vertical) = (ctx.planar(self.velocity), ctx.vertical(self.velocity));
        planar = move_towards(
            planar,
            local * ctx.config.walk_speed,
            ctx.config.air_acceleration() * ctx.dt,
        );

        if vertical.dot(ctx.up) < 0.0 && self.acquiring_ground(ctx) {
            self.velocity = planar;
            return Some(LocomotionState::Idle);
        }

        let damped = ctx.surface.ceiling_contact();
        if damped {
            vertical = Vec3::ZERO;
        } else if vertical.dot(ctx.up) <= 0.0 {
            return Some(LocomotionState::Fall);
        }

        if ctx.input.jump_pressed {
            return Some(LocomotionState::DoubleJump);
        }

        if let Some(normal) = ctx.surface.wall_contact(local) {
            self.wall_normal = normal;
            return Some(LocomotionState::WallSlide);
        }

        if self.on_edge(ctx) {
            return Some(LocomotionState::Climb);
        }

        vertical -= ctx.up * ctx.config.gravity * ctx.dt;
        self.velocity = planar + vertical;
        None
    }

    fn update_double_jump(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        let local = ctx.local_movement();
        let (mut planar, mut vertical) = (ctx.planar(self.velocity), ctx.vertical(self.velocity));
        planar = move_towards(
            planar,
            local * ctx.config.walk_speed,
            ctx.config.air_acceleration() * ctx.dt,
        );

        if vertical.dot(ctx.up) < 0.0 && self.acquiring_ground(ctx) {
            self.velocity = planar;
            return Some(LocomotionState::Idle);
        }

        if let Some(normal) = ctx.surface.wall_contact(local) {
            self.wall_normal = normal;
            return Some(LocomotionState::WallSlide);
        }

        if ctx.surface.ceiling_contact() {
            vertical = Vec3::ZERO;
        }

        // The double jump is already maximal, so the apex hands off to Fall
        // exactly when the vertical component has been consumed.
        if vertical.dot(ctx.up) == 0.0 {
            return Some(LocomotionState::Fall);
        }

        if self.on_edge(ctx) {
            return Some(LocomotionState::Climb);
        }

        vertical -= ctx.up * ctx.config.gravity * ctx.dt;
        self.velocity = planar + vertical;
        None
    }

    fn update_fall(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        let local = ctx.local_movement();
        let (mut planar, mut vertical) = (ctx.planar(self.velocity), ctx.vertical(self.velocity));
        planar = move_towards(
            planar,
            local * ctx.config.walk_speed,
            ctx.config.air_acceleration() * ctx.dt,
        );

        if self.acquiring_ground(ctx) {
            self.velocity = ctx.planar(self.velocity);
            return Some(LocomotionState::Idle);
        }

        if ctx.input.jump_pressed && self.jump_count < 2 {
            return Some(LocomotionState::DoubleJump);
        }

        if let Some(normal) = ctx.surface.wall_contact(local) {
            self.wall_normal = normal;
            return Some(LocomotionState::WallSlide);
        }

        // With input, horizontal control falls back to the walk rate.
        if ctx.input.is_moving() {
            let eased = move_towards(
                self.velocity,
                local * ctx.config.walk_speed,
                ctx.config.walk_acceleration * ctx.dt,
            );
            planar = ctx.planar(eased);
        }

        if self.on_edge(ctx) {
            return Some(LocomotionState::Climb);
        }

        vertical -= ctx.up * ctx.config.gravity * ctx.config.fall_gravity_multiplier * ctx.dt;
        self.velocity = planar + vertical;
        None
    }

    fn update_wall_slide(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        let local = ctx.local_movement();
        if !ctx.input.is_moving() || self.wall_normal.dot(local) > 0.0 {
            return Some(LocomotionState::Fall);
        }

        let (planar, vertical) = (ctx.planar(self.velocity), ctx.vertical(self.velocity));
        if vertical.dot(ctx.up) < 0.0 && self.acquiring_ground(ctx) {
            self.velocity = planar;
            return Some(LocomotionState::Idle);
        }

        if ctx.input.jump_pressed {
            self.velocity = self.wall_normal * ctx.config.wall_launch_speed;
            return Some(LocomotionState::Jump);
        }

        self.velocity -=
            ctx.up * ctx.config.gravity * ctx.config.wall_slide_gravity_factor * ctx.dt;
        None
    }

    fn update_climb(&mut self, ctx: &TickContext) -> Option<LocomotionState> {
        if ctx.input.jump_pressed {
            return Some(LocomotionState::Climbing);
        }
        None
    }

    fn update_climbing(
        &mut self,
        ctx: &TickContext,
        position: &mut Vec3,
    ) -> Option<LocomotionState> {
        let t = (ctx.config.walk_speed * ctx.dt).clamp(0.0, 1.0);
        *position = position.lerp(self.climb_target, t);
        if position.distance(self.climb_target) < ctx.config.climb_finish_distance {
            return Some(LocomotionState::Idle);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ctx<'a>(
        config: &'a MovementConfig,
        input: &'a InputSnapshot,
        surface: &'a SurfaceState,
    ) -> TickContext<'a> {
        TickContext {
            config,
            input,
            surface,
            up: Vec3::Y,
            look: Vec3::NEG_Z,
            dt: DT,
        }
    }

    #[test]
    fn machine_starts_idle() {
        let machine = LocomotionMachine::new();
        assert_eq!(machine.state(), LocomotionState::Idle);
        assert_eq!(machine.velocity(), Vec3::ZERO);
        assert_eq!(machine.jump_count(), 0);
    }

    #[test]
    fn local_movement_is_look_relative() {
        let config = MovementConfig::default();
        let surface = SurfaceState::grounded(Vec3::Y, 0.0);
        let input = InputSnapshot {
            move_axes: Vec2::new(0.0, 1.0),
            ..default()
        };
        let ctx = ctx(&config, &input, &surface);
        assert!((ctx.local_movement() - Vec3::NEG_Z).length() < 1e-5);

        let input = InputSnapshot {
            move_axes: Vec2::new(1.0, 0.0),
            ..default()
        };
        let ctx = TickContext { input: &input, ..ctx };
        let right = Vec3::NEG_Z.cross(Vec3::Y);
        assert!((ctx.local_movement() - right.normalize()).length() < 1e-5);
    }

    #[test]
    fn local_movement_degenerate_input_is_zero() {
        let config = MovementConfig::default();
        let surface = SurfaceState::airborne(Vec3::Y);
        let input = InputSnapshot::default();
        let ctx = ctx(&config, &input, &surface);
        assert_eq!(ctx.local_movement(), Vec3::ZERO);
    }

    #[test]
    fn idle_decelerates_to_rest() {
        let config = MovementConfig::default();
        let surface = SurfaceState::grounded(Vec3::Y, 0.0);
        let input = InputSnapshot::default();

        let mut machine = LocomotionMachine::new();
        machine.velocity = Vec3::new(0.05, 0.0, 0.0);
        let mut position = Vec3::ZERO;

        let (velocity, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(state, LocomotionState::Idle);
        assert!(velocity.length() < 0.05);

        let (velocity, _) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(velocity, Vec3::ZERO);
    }

    #[test]
    fn jump_enter_adds_impulse_not_replaces() {
        let config = MovementConfig::default();
        let surface = SurfaceState::grounded(Vec3::Y, 0.0);
        let input = InputSnapshot {
            jump_pressed: true,
            ..default()
        };

        let mut machine = LocomotionMachine::new();
        machine.velocity = Vec3::new(2.0, 0.0, 0.0);
        let mut position = Vec3::ZERO;

        let (velocity, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(state, LocomotionState::Jump);
        assert_eq!(machine.jump_count(), 1);
        // Planar carry-over survives the impulse.
        assert!(velocity.x > 0.0);
        assert!(velocity.y > 0.0);
        assert!(!machine.assist().clamping);
        assert!(!machine.assist().slope_limit);
    }

    #[test]
    fn wall_slide_enter_resets_jump_count_and_velocity() {
        let config = MovementConfig::default();
        let surface = SurfaceState::airborne(Vec3::Y).with_contact(Vec3::X);
        let input = InputSnapshot {
            move_axes: Vec2::new(-1.0, 0.0),
            ..default()
        };

        let mut machine = LocomotionMachine::new();
        machine.state = LocomotionState::Fall;
        machine.jump_count = 2;
        machine.velocity = Vec3::new(-4.0, -6.0, 0.0);
        let mut position = Vec3::ZERO;

        let (_, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(state, LocomotionState::WallSlide);
        assert_eq!(machine.jump_count(), 0);
        assert_eq!(machine.wall_normal(), Vec3::X);
        // Velocity was zeroed on entry; the same-tick slide update only
        // adds the damped gravity step.
        let expected = -config.gravity * config.wall_slide_gravity_factor * DT;
        assert!((machine.velocity().y - expected).abs() < 1e-5);
    }

    #[test]
    fn wall_slide_exit_clears_contact_normal() {
        let config = MovementConfig::default();
        let surface = SurfaceState::airborne(Vec3::Y);
        let input = InputSnapshot::default();

        let mut machine = LocomotionMachine::new();
        machine.state = LocomotionState::WallSlide;
        machine.wall_normal = Vec3::X;
        let mut position = Vec3::ZERO;

        // No movement input: steering away from the wall, slide ends.
        let (_, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(state, LocomotionState::Fall);
        assert_eq!(machine.wall_normal(), Vec3::ZERO);
    }

    #[test]
    fn climb_enter_snaps_to_ledge_height() {
        let config = MovementConfig::default();
        let ledge_point = Vec3::new(0.0, 3.0, -1.0);
        let surface = SurfaceState::airborne(Vec3::Y).with_ledge(ledge_point, Vec3::Y);
        let input = InputSnapshot::default();

        let mut machine = LocomotionMachine::new();
        machine.state = LocomotionState::Fall;
        machine.velocity = Vec3::new(0.0, 1.0, 0.0);
        let mut position = Vec3::new(0.0, 1.0, 0.0);

        let (velocity, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(state, LocomotionState::Climb);
        assert_eq!(velocity, Vec3::ZERO);
        assert!((position.y - (ledge_point.y - config.climb_offset)).abs() < 1e-5);
    }

    #[test]
    fn shallow_ledge_normal_is_not_climbable() {
        let config = MovementConfig::default();
        // Normal at ~72 degrees from vertical: below the 0.5 alignment bar.
        let normal = Vec3::new(0.95, 0.3, 0.0).normalize();
        let surface = SurfaceState::airborne(Vec3::Y).with_ledge(Vec3::ONE, normal);
        let input = InputSnapshot::default();

        let mut machine = LocomotionMachine::new();
        machine.state = LocomotionState::Fall;
        let mut position = Vec3::ZERO;

        let (_, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        assert_eq!(state, LocomotionState::Fall);
    }

    #[test]
    fn climbing_interpolates_and_finishes() {
        let config = MovementConfig::default();
        let surface = SurfaceState::airborne(Vec3::Y);
        let input = InputSnapshot::default();

        let mut machine = LocomotionMachine::new();
        machine.state = LocomotionState::Climbing;
        machine.climb_target = Vec3::new(0.0, 2.0, -1.0);
        let mut position = Vec3::ZERO;

        let mut ticks = 0;
        while machine.state() != LocomotionState::Idle && ticks < 600 {
            machine.tick(&ctx(&config, &input, &surface), &mut position);
            ticks += 1;
        }
        assert_eq!(machine.state(), LocomotionState::Idle);
        assert!(position.distance(machine.climb_target) < config.climb_finish_distance);
        assert!(ticks > 1, "pull-up should take multiple ticks");
    }

    #[test]
    fn ceiling_contact_damps_vertical_before_gravity() {
        let config = MovementConfig::default();
        let surface = SurfaceState::airborne(Vec3::Y).with_contact(Vec3::NEG_Y);
        let input = InputSnapshot::default();

        let mut machine = LocomotionMachine::new();
        machine.state = LocomotionState::Jump;
        machine.jump_count = 1;
        machine.velocity = Vec3::new(0.0, 5.0, 0.0);
        let mut position = Vec3::ZERO;

        let (velocity, state) = machine.tick(&ctx(&config, &input, &surface), &mut position);
        // Vertical impulse wiped, one gravity step applied, no transition
        // until next tick.
        assert_eq!(state, LocomotionState::Jump);
        assert!((velocity.y + config.gravity * DT).abs() < 1e-5);
    }
}
