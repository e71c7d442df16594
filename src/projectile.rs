//! Projectile-side inputs: kinematic state, launcher constants and the
//! stepping function used to resimulate a flight path.
//!
//! The projectile simulation itself lives outside this crate. Trails only
//! need to know where a projectile started, how it is integrated, and how
//! long it lives.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Kinematic state of one projectile as reported by the simulation source.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProjectileState {
    /// World-space position.
    pub position: Vec3,
    /// World-space velocity.
    pub velocity: Vec3,
    /// Seconds since the projectile was fired.
    pub elapsed_lifetime: f32,
}

impl ProjectileState {
    /// State of a freshly fired projectile.
    pub fn launched(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            elapsed_lifetime: 0.0,
        }
    }

    /// Same projectile, `elapsed_lifetime` seconds into its flight.
    pub fn at_lifetime(mut self, elapsed_lifetime: f32) -> Self {
        self.elapsed_lifetime = elapsed_lifetime;
        self
    }
}

/// Deterministic integrator under constant external acceleration.
///
/// Must return the same result for the same inputs every time: trails are
/// resimulated ahead of real time and have to line up with the live
/// projectile.
pub trait Stepper {
    /// Advance `position` and `velocity` by `dt` seconds.
    fn step(&self, position: &mut Vec3, velocity: &mut Vec3, dt: f32);

    /// The constant acceleration this stepper integrates.
    fn gravity(&self) -> Vec3;
}

/// Exact constant-acceleration integration.
///
/// Matches the closed form the instanced shader evaluates
/// (`p0 + v0 * t + 0.5 * g * t^2`), so CPU and GPU paths agree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ballistic {
    pub gravity: Vec3,
}

impl Ballistic {
    /// Standard Earth gravity along -Y.
    pub const EARTH: Ballistic = Ballistic {
        gravity: Vec3::new(0.0, -9.8, 0.0),
    };

    pub fn new(gravity: Vec3) -> Self {
        Self { gravity }
    }
}

impl Default for Ballistic {
    fn default() -> Self {
        Self::EARTH
    }
}

impl Stepper for Ballistic {
    #[inline]
    fn step(&self, position: &mut Vec3, velocity: &mut Vec3, dt: f32) {
        *position += *velocity * dt + 0.5 * self.gravity * dt * dt;
        *velocity += self.gravity * dt;
    }

    #[inline]
    fn gravity(&self) -> Vec3 {
        self.gravity
    }
}

/// Constants of the weapon that fires the projectiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Launcher {
    /// Size of the slot range `[0, max_projectile_count)`.
    pub max_projectile_count: usize,
    /// Muzzle speed in units per second.
    pub starting_velocity: f32,
    /// Fixed flight duration in seconds.
    pub lifetime: f32,
    /// Constant acceleration acting on every projectile.
    pub gravity: Vec3,
}

impl Launcher {
    /// Stepper matching this launcher's gravity.
    pub fn ballistic(&self) -> Ballistic {
        Ballistic::new(self.gravity)
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            max_projectile_count: 256,
            starting_velocity: 100.0,
            lifetime: 3.0,
            gravity: Ballistic::EARTH.gravity,
        }
    }
}
