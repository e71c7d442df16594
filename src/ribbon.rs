//! Ribbon tessellation with angle-based decimation.
//!
//! The builder walks a resimulated trajectory and keeps only the waypoints
//! where the path actually bends. Long, nearly straight flights collapse to
//! a handful of segments, which is what keeps segment counts small and pool
//! reuse high.
//!
//! Every emitted waypoint becomes a left/right vertex pair at the same
//! position. Widening happens in the vertex shader: each vertex carries its
//! travel direction and a side sign, so no camera-facing math runs on the
//! CPU.

use glam::{Vec2, Vec3, Vec4};

use crate::geometry::{vertex_count, TrailGeometryBuffer};
use crate::projectile::{ProjectileState, Stepper};
use crate::sampler::{SegmentBudget, TrajectorySampler, Waypoint};

/// Angle between two directions in degrees, 0 when either is degenerate.
pub fn angle_degrees(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < 1e-15 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Builds ribbon vertices into scratch storage sized for the worst case.
///
/// Scratch arrays are allocated once in [`RibbonBuilder::new`]; building a
/// trail never allocates.
pub struct RibbonBuilder {
    budget: SegmentBudget,
    min_angle: f32,
    positions: Box<[Vec3]>,
    directions: Box<[Vec4]>,
    uvs: Box<[Vec2]>,
    len: usize,
}

/// A finished ribbon borrowed from the builder's scratch storage.
#[derive(Debug)]
pub struct Ribbon<'a> {
    pub segment_count: u32,
    pub positions: &'a [Vec3],
    pub directions: &'a [Vec4],
    pub uvs: &'a [Vec2],
}

impl Ribbon<'_> {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Copy into a buffer with the same segment count and show it.
    pub fn write_to(&self, buffer: &mut TrailGeometryBuffer) {
        debug_assert_eq!(buffer.segment_count(), self.segment_count);
        buffer.write_vertices(self.positions, self.directions, self.uvs);
        buffer.set_visible(true);
    }
}

impl RibbonBuilder {
    /// `min_angle` is the decimation threshold in degrees.
    pub fn new(budget: SegmentBudget, min_angle: f32) -> Self {
        let capacity = vertex_count(budget.max_segments());
        Self {
            budget,
            min_angle,
            positions: vec![Vec3::ZERO; capacity].into_boxed_slice(),
            directions: vec![Vec4::ZERO; capacity].into_boxed_slice(),
            uvs: vec![Vec2::ZERO; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn budget(&self) -> &SegmentBudget {
        &self.budget
    }

    pub fn min_angle(&self) -> f32 {
        self.min_angle
    }

    /// Resimulate `initial` and tessellate it.
    ///
    /// `creation_time` is the session-local time the trail was created at;
    /// it is added to each waypoint's simulation time to form `uv.x`.
    /// Returns `None` when decimation leaves no segments, in which case the
    /// caller must not request a buffer.
    pub fn build<S: Stepper>(
        &mut self,
        stepper: &S,
        initial: &ProjectileState,
        creation_time: f32,
    ) -> Option<Ribbon<'_>> {
        self.len = 0;

        let mut samples = TrajectorySampler::new(stepper, &self.budget, initial);
        let first = samples.next()?;
        self.emit(&first, creation_time);

        let mut last_direction = first.direction;
        let mut pending: Option<Waypoint> = None;
        for waypoint in samples {
            if angle_degrees(last_direction, waypoint.direction) < self.min_angle {
                pending = Some(waypoint);
                continue;
            }
            last_direction = waypoint.direction;
            pending = None;
            self.emit(&waypoint, creation_time);
        }

        if self.len == 2 {
            return None;
        }
        // Close the ribbon at the end of the flight.
        if let Some(last) = pending {
            self.emit(&last, creation_time);
        }

        let len = self.len;
        Some(Ribbon {
            segment_count: (len / 2 - 1) as u32,
            positions: &self.positions[..len],
            directions: &self.directions[..len],
            uvs: &self.uvs[..len],
        })
    }

    fn emit(&mut self, waypoint: &Waypoint, creation_time: f32) {
        let i = self.len;
        let d = waypoint.direction;
        let uv_x = creation_time + waypoint.time;

        self.positions[i] = waypoint.position;
        self.positions[i + 1] = waypoint.position;
        self.directions[i] = d.extend(-1.0);
        self.directions[i + 1] = d.extend(1.0);
        self.uvs[i] = Vec2::new(uv_x, 0.0);
        self.uvs[i + 1] = Vec2::new(uv_x, 1.0);
        self.len += 2;
    }
}
