//! Ribbon geometry buffers.
//!
//! A [`TrailGeometryBuffer`] holds the vertex and index arrays for a ribbon
//! of a fixed number of segments. Arrays are boxed slices: they are sized
//! once at creation and can never grow or shrink afterwards, which is what
//! lets the pool hand the same buffer to a different trail with the same
//! segment count.
//!
//! # Layout
//!
//! ```text
//!  0---2---4---6     each waypoint boundary contributes a left (even) and
//!  | \ | \ | \ |     right (odd) vertex; segment i is the quad
//!  1---3---5---7     (2i, 2i+2, 2i+1), (2i+1, 2i+2, 2i+3)
//! ```

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a geometry buffer.
///
/// Survives trips through the pool, so it identifies the allocation rather
/// than the trail currently using it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        BufferId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Vertices needed for a ribbon of `segment_count` segments.
#[inline]
pub const fn vertex_count(segment_count: u32) -> usize {
    2 + 2 * segment_count as usize
}

/// Indices needed for a ribbon of `segment_count` segments.
#[inline]
pub const fn index_count(segment_count: u32) -> usize {
    6 * segment_count as usize
}

/// Write the quad-strip winding into `indices`.
///
/// `indices.len()` must be a multiple of 6; one quad is written per six
/// entries.
pub fn write_strip_indices(indices: &mut [u32]) {
    for (quad, tri) in indices.chunks_exact_mut(6).enumerate() {
        let v = (quad * 2) as u32;
        tri.copy_from_slice(&[v, v + 2, v + 1, v + 1, v + 2, v + 3]);
    }
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TrailVertex {
    pub position: [f32; 3],
    /// x = animation time, y = side.
    pub uv: [f32; 2],
    /// xyz = travel direction, w = side sign for widening.
    pub direction: [f32; 4],
}

/// Vertex/index storage for one ribbon.
#[derive(Debug)]
pub struct TrailGeometryBuffer {
    id: BufferId,
    segment_count: u32,
    positions: Box<[Vec3]>,
    directions: Box<[Vec4]>,
    uvs: Box<[Vec2]>,
    indices: Box<[u32]>,
    visible: bool,
    revision: u32,
}

impl TrailGeometryBuffer {
    /// Allocate a hidden buffer for exactly `segment_count` segments, with
    /// the winding pattern already in place.
    pub fn new(segment_count: u32) -> Self {
        let vertices = vertex_count(segment_count);
        let mut indices = vec![0u32; index_count(segment_count)].into_boxed_slice();
        write_strip_indices(&mut indices);

        Self {
            id: BufferId::next(),
            segment_count,
            positions: vec![Vec3::ZERO; vertices].into_boxed_slice(),
            directions: vec![Vec4::ZERO; vertices].into_boxed_slice(),
            uvs: vec![Vec2::ZERO; vertices].into_boxed_slice(),
            indices,
            visible: false,
            revision: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn segment_count(&self) -> u32 {
        self.segment_count
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn directions(&self) -> &[Vec4] {
        &self.directions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Whether the backing visual is currently shown.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Bumped on every vertex write. Renderers compare it against what they
    /// last uploaded.
    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Overwrite every vertex. Slice lengths must equal [`Self::vertex_count`].
    pub(crate) fn write_vertices(&mut self, positions: &[Vec3], directions: &[Vec4], uvs: &[Vec2]) {
        self.positions.copy_from_slice(positions);
        self.directions.copy_from_slice(directions);
        self.uvs.copy_from_slice(uvs);
        self.revision = self.revision.wrapping_add(1);
    }

    /// Overwrite only the UV channel.
    pub(crate) fn write_uvs(&mut self, uvs: &[Vec2]) {
        self.uvs.copy_from_slice(uvs);
        self.revision = self.revision.wrapping_add(1);
    }

    /// Interleave into `out`, which must hold [`Self::vertex_count`] entries.
    pub fn write_interleaved(&self, out: &mut [TrailVertex]) {
        for (i, v) in out.iter_mut().enumerate() {
            *v = TrailVertex {
                position: self.positions[i].to_array(),
                uv: self.uvs[i].to_array(),
                direction: self.directions[i].to_array(),
            };
        }
    }

    /// Interleaved copy of all vertices.
    pub fn interleaved(&self) -> Vec<TrailVertex> {
        let mut out = vec![TrailVertex::default(); self.vertex_count()];
        self.write_interleaved(&mut out);
        out
    }
}
