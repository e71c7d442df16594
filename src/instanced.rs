//! One shared mesh drawn with GPU instancing.
//!
//! Instead of building a ribbon per projectile, [`InstancedTrailBatch`]
//! builds one strip up front, long enough for the longest possible flight,
//! and lets the vertex shader bend it. Each instance only carries where the
//! projectile started, its launch velocity and how long it has been flying;
//! the shader reconstructs every point from `p0 + v0 * t + 0.5 * g * t^2`.
//!
//! Per-instance data lives in packed arrays kept contiguous by a
//! [`SparseDenseIndex`], so `transforms()[..len]` and `kinematics()[..len]`
//! can be handed to an instanced draw as-is with `len` as the instance count.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::config::TrailConfig;
use crate::error::{ConfigError, TrailError};
use crate::events::TrailListener;
use crate::geometry::{vertex_count, TrailGeometryBuffer};
use crate::projectile::{Launcher, ProjectileState};
use crate::sampler::SegmentBudget;
use crate::sparse_set::SparseDenseIndex;

/// Shader parameters shared by every instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstancedParams {
    pub width: f32,
    pub trail_offset: f32,
    /// Seconds after which a trail fades.
    pub show_time: f32,
    /// Full flight time of a projectile.
    pub lifetime: f32,
    pub gravity: Vec3,
}

/// Everything one instanced draw call needs.
#[derive(Clone, Copy, Debug)]
pub struct InstancedDraw<'a> {
    pub mesh: &'a TrailGeometryBuffer,
    /// Launch transform per instance.
    pub transforms: &'a [Mat4],
    /// xyz = launch velocity, w = elapsed lifetime.
    pub kinematics: &'a [Vec4],
    pub instance_count: u32,
    pub params: InstancedParams,
}

/// Packed per-instance state for the shared-mesh strategy.
pub struct InstancedTrailBatch {
    mesh: TrailGeometryBuffer,
    index: SparseDenseIndex,
    transforms: Box<[Mat4]>,
    kinematics: Box<[Vec4]>,
    params: InstancedParams,
    budget: SegmentBudget,
}

impl InstancedTrailBatch {
    pub fn new(launcher: &Launcher, config: &TrailConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let budget = SegmentBudget::for_launcher(launcher, config)?;
        let capacity = launcher.max_projectile_count;

        log::debug!(
            "instanced trails: {} instances sharing a {}-segment strip",
            capacity,
            budget.max_segments()
        );

        Ok(Self {
            mesh: shared_strip(&budget),
            index: SparseDenseIndex::new(capacity),
            transforms: vec![Mat4::ZERO; capacity].into_boxed_slice(),
            kinematics: vec![Vec4::ZERO; capacity].into_boxed_slice(),
            params: InstancedParams {
                width: config.width,
                trail_offset: config.trail_offset,
                show_time: config.show_time,
                lifetime: launcher.lifetime,
                gravity: launcher.gravity,
            },
            budget,
        })
    }

    /// Append a new instance for `slot`.
    pub fn created(&mut self, slot: usize, state: &ProjectileState) -> Result<(), TrailError> {
        let row = self.index.insert(slot)?;
        self.transforms[row] = Mat4::from_translation(state.position);
        self.kinematics[row] = state.velocity.extend(0.0);
        Ok(())
    }

    /// Advance the elapsed time of `slot`. Launch data is left alone.
    pub fn moved(&mut self, slot: usize, state: &ProjectileState) -> Result<(), TrailError> {
        let row = self
            .index
            .row(slot)
            .ok_or(TrailError::SlotNotActive(slot))?;
        self.kinematics[row].w = state.elapsed_lifetime;
        Ok(())
    }

    /// Drop the instance of `slot`, filling its row with the last one.
    pub fn removed(&mut self, slot: usize) -> Result<(), TrailError> {
        let swap = self.index.remove(slot)?;
        if let Some(from) = swap.moved_from {
            self.transforms[swap.row] = self.transforms[from];
            self.kinematics[swap.row] = self.kinematics[from];
        }

        let vacated = self.index.len();
        self.transforms[vacated] = Mat4::ZERO;
        self.kinematics[vacated] = Vec4::ZERO;
        Ok(())
    }

    /// Drop every instance.
    pub fn clear(&mut self) {
        let len = self.index.len();
        self.transforms[..len].fill(Mat4::ZERO);
        self.kinematics[..len].fill(Vec4::ZERO);
        self.index.clear();
    }

    /// Arguments for this frame's instanced draw.
    pub fn draw_batch(&self) -> InstancedDraw<'_> {
        let len = self.index.len();
        InstancedDraw {
            mesh: &self.mesh,
            transforms: &self.transforms[..len],
            kinematics: &self.kinematics[..len],
            instance_count: len as u32,
            params: self.params,
        }
    }

    /// Number of packed instances.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.index.contains(slot)
    }

    /// Packed row of `slot`.
    pub fn row(&self, slot: usize) -> Option<usize> {
        self.index.row(slot)
    }

    /// `(transform, kinematics)` of `slot`.
    pub fn instance(&self, slot: usize) -> Option<(Mat4, Vec4)> {
        self.index
            .row(slot)
            .map(|row| (self.transforms[row], self.kinematics[row]))
    }

    /// Point `sim_time` seconds along the path of `slot`, evaluated the way
    /// the vertex shader does.
    pub fn trail_point(&self, slot: usize, sim_time: f32) -> Option<Vec3> {
        let (transform, kinematics) = self.instance(slot)?;
        let origin = transform.w_axis.truncate();
        let velocity = kinematics.truncate();
        Some(origin + velocity * sim_time + 0.5 * self.params.gravity * sim_time * sim_time)
    }

    pub fn mesh(&self) -> &TrailGeometryBuffer {
        &self.mesh
    }

    pub fn params(&self) -> &InstancedParams {
        &self.params
    }

    pub fn budget(&self) -> &SegmentBudget {
        &self.budget
    }
}

/// Strip sized for the longest flight. `uv.x` is the simulation time of
/// each boundary, `uv.y` the side sign (-1 left, +1 right).
fn shared_strip(budget: &SegmentBudget) -> TrailGeometryBuffer {
    let segments = budget.max_segments();
    let mut mesh = TrailGeometryBuffer::new(segments);

    let mut uvs = vec![Vec2::ZERO; vertex_count(segments)];
    for (i, pair) in uvs.chunks_exact_mut(2).enumerate() {
        let t = i as f32 * budget.dt();
        pair[0] = Vec2::new(t, -1.0);
        pair[1] = Vec2::new(t, 1.0);
    }
    mesh.write_uvs(&uvs);
    mesh.set_visible(true);
    mesh
}

impl TrailListener for InstancedTrailBatch {
    fn on_created(
        &mut self,
        slot: usize,
        state: &ProjectileState,
        _time: f32,
    ) -> Result<(), TrailError> {
        self.created(slot, state)
    }

    fn on_moved(&mut self, slot: usize, state: &ProjectileState) -> Result<(), TrailError> {
        self.moved(slot, state)
    }

    fn on_removed(&mut self, slot: usize, _state: &ProjectileState) -> Result<(), TrailError> {
        self.removed(slot)
    }
}
