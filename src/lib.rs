//! # Projectile Trails
//!
//! Ribbon trails for ballistic projectiles, built once at launch and animated
//! entirely by time afterwards.
//!
//! When a projectile is fired, its full flight is pre-simulated at a fixed
//! step, reduced to the points where the path actually bends, and turned
//! into a ribbon mesh. Meshes come from a pool keyed by segment count, so a
//! steady stream of projectiles stops allocating once the pool has warmed
//! up.
//!
//! ## Quick Start
//!
//! ```ignore
//! use projectile_trails::prelude::*;
//!
//! let launcher = Launcher::default();
//! let mut trails = TrailRegistry::new(&launcher, TrailConfig::default())?;
//!
//! let state = ProjectileState::launched(Vec3::ZERO, Vec3::new(0.0, 40.0, 90.0));
//! trails.created(0, &state, now)?;
//!
//! for (slot, buffer) in trails.draw_list() {
//!     // upload or draw `buffer`
//! }
//!
//! trails.removed(0)?;
//! ```
//!
//! ## Strategies
//!
//! | Strategy | Type | Per projectile |
//! |----------|------|----------------|
//! | Per-trail meshes | [`TrailRegistry`] | one pooled [`TrailGeometryBuffer`] |
//! | Shared instanced mesh | [`InstancedTrailBatch`] | one transform + one kinematics row |
//!
//! Both react to the same three lifecycle events (`created`, `moved`,
//! `removed`), either called directly or fed through an [`EventLog`].
//!
//! ## Rendering
//!
//! The [`gpu`] module draws either strategy with wgpu. The CPU side has no
//! GPU dependency and can be driven headless.

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gpu;
pub mod instanced;
pub mod pool;
pub mod projectile;
pub mod registry;
pub mod ribbon;
pub mod sampler;
pub mod shader;
pub mod sparse_set;
pub mod time;

pub use bytemuck;
pub use config::TrailConfig;
pub use error::{ConfigError, GpuError, TrailError};
pub use events::{EventLog, TrailEvent, TrailListener};
pub use geometry::{BufferId, TrailGeometryBuffer, TrailVertex};
pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use instanced::{InstancedDraw, InstancedParams, InstancedTrailBatch};
pub use pool::{MeshBufferPool, PoolStats};
pub use projectile::{Ballistic, Launcher, ProjectileState, Stepper};
pub use registry::{TrailDrawParams, TrailRegistry};
pub use ribbon::{Ribbon, RibbonBuilder};
pub use sampler::{SegmentBudget, TrajectorySampler, Waypoint};
pub use shader::{param_table, InstancedUniforms, RibbonUniforms, ShaderParam, ShaderVariant};
pub use sparse_set::{SparseDenseIndex, SwapRemove};
pub use time::TrailClock;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use projectile_trails::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::TrailConfig;
    pub use crate::error::{ConfigError, TrailError};
    pub use crate::events::{EventLog, TrailEvent, TrailListener};
    pub use crate::instanced::InstancedTrailBatch;
    pub use crate::projectile::{Ballistic, Launcher, ProjectileState, Stepper};
    pub use crate::registry::TrailRegistry;
    pub use crate::{Vec2, Vec3, Vec4};
}
