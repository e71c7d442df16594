//! Trajectory resimulation.
//!
//! A trail is built once, when its projectile is fired, by replaying the
//! projectile's whole flight ahead of real time with the same stepping
//! function the simulation uses. The step size and the worst-case segment
//! count come from a [`SegmentBudget`] computed once per launcher.

use glam::Vec3;

use crate::config::TrailConfig;
use crate::error::ConfigError;
use crate::projectile::{Launcher, ProjectileState, Stepper};

/// Buffer sizing derived from the launcher constants.
///
/// Uses the closed-form range bound `v0 * T + 0.5 * |g| * T^2` rather than
/// the real arc length. It only sizes buffers; a resimulated path may be
/// shorter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentBudget {
    max_path_length: f32,
    max_segments: u32,
    dt: f32,
    lifetime: f32,
}

impl SegmentBudget {
    pub fn new(
        starting_velocity: f32,
        lifetime: f32,
        gravity: Vec3,
        segment_length: f32,
    ) -> Result<Self, ConfigError> {
        if !(segment_length.is_finite() && segment_length > 0.0) {
            return Err(ConfigError::InvalidBudget(format!(
                "segment length must be positive, got {}",
                segment_length
            )));
        }
        if !(lifetime.is_finite() && lifetime > 0.0) {
            return Err(ConfigError::InvalidBudget(format!(
                "lifetime must be positive, got {}",
                lifetime
            )));
        }

        let max_path_length =
            starting_velocity * lifetime + (gravity.length() * lifetime * lifetime) * 0.5;
        if !(max_path_length.is_finite() && max_path_length > 0.0) {
            return Err(ConfigError::InvalidBudget(format!(
                "projectile never travels (max path length {})",
                max_path_length
            )));
        }

        let max_segments = (max_path_length / segment_length).ceil() as u32;
        let dt = lifetime / max_segments as f32;

        Ok(Self {
            max_path_length,
            max_segments,
            dt,
            lifetime,
        })
    }

    pub fn for_launcher(launcher: &Launcher, config: &TrailConfig) -> Result<Self, ConfigError> {
        Self::new(
            launcher.starting_velocity,
            launcher.lifetime,
            launcher.gravity,
            config.segment_length,
        )
    }

    #[inline]
    pub fn max_path_length(&self) -> f32 {
        self.max_path_length
    }

    /// Upper bound on segments any trail can emit.
    #[inline]
    pub fn max_segments(&self) -> u32 {
        self.max_segments
    }

    /// Resimulation step in seconds.
    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    #[inline]
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }
}

/// One sampled point on a resimulated path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    /// Unit travel direction.
    pub direction: Vec3,
    /// Simulation seconds since launch.
    pub time: f32,
}

/// Iterator over the waypoints of one resimulated flight.
///
/// Yields the launch point at `t = 0` followed by exactly
/// `max_segments` steps at `t = i * dt`. Stepping by an integer counter
/// keeps the sample count fixed regardless of float drift.
pub struct TrajectorySampler<'a, S: Stepper> {
    stepper: &'a S,
    position: Vec3,
    velocity: Vec3,
    direction: Vec3,
    dt: f32,
    next_step: u32,
    steps: u32,
}

impl<'a, S: Stepper> TrajectorySampler<'a, S> {
    pub fn new(stepper: &'a S, budget: &SegmentBudget, initial: &ProjectileState) -> Self {
        // A projectile launched at rest starts by falling.
        let direction = initial
            .velocity
            .try_normalize()
            .or_else(|| stepper.gravity().try_normalize())
            .unwrap_or(Vec3::Z);

        Self {
            stepper,
            position: initial.position,
            velocity: initial.velocity,
            direction,
            dt: budget.dt(),
            next_step: 0,
            steps: budget.max_segments(),
        }
    }
}

impl<S: Stepper> Iterator for TrajectorySampler<'_, S> {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Waypoint> {
        if self.next_step > self.steps {
            return None;
        }
        if self.next_step > 0 {
            self.stepper
                .step(&mut self.position, &mut self.velocity, self.dt);
            // Zero velocity has no direction; keep the previous one.
            if let Some(direction) = self.velocity.try_normalize() {
                self.direction = direction;
            }
        }

        let waypoint = Waypoint {
            position: self.position,
            direction: self.direction,
            time: self.next_step as f32 * self.dt,
        };
        self.next_step += 1;
        Some(waypoint)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.steps + 1).saturating_sub(self.next_step) as usize;
        (remaining, Some(remaining))
    }
}

impl<S: Stepper> ExactSizeIterator for TrajectorySampler<'_, S> {}
