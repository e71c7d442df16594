//! Per-trail ribbon rendering.
//!
//! Every pooled [`TrailGeometryBuffer`] gets a GPU twin keyed by its
//! [`BufferId`]. The index buffer is written once since the winding never
//! changes; vertices are re-uploaded only when the CPU revision moves, which
//! happens once per trail creation.

use std::collections::HashMap;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use super::{create_pipeline, create_uniform_buffer, vertex_layout, RenderTarget};
use crate::geometry::{BufferId, TrailGeometryBuffer, TrailVertex};
use crate::projectile::Stepper;
use crate::registry::TrailRegistry;
use crate::shader::{param_table, ribbon_shader, RibbonUniforms, ShaderParam, ShaderVariant};

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    revision: Option<u32>,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, buffer: &TrailGeometryBuffer) -> Self {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Vertex Buffer"),
            size: (buffer.vertex_count() * std::mem::size_of::<TrailVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Trail Index Buffer"),
            contents: bytemuck::cast_slice(buffer.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: buffer.index_count() as u32,
            revision: None,
        }
    }
}

/// Draws every active trail of a [`TrailRegistry`].
pub struct TrailMeshRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    meshes: HashMap<BufferId, GpuMesh>,
    scratch: Vec<TrailVertex>,
}

impl TrailMeshRenderer {
    pub fn new(device: &wgpu::Device, target: RenderTarget, color: glam::Vec3) -> Self {
        let uniform_buffer =
            create_uniform_buffer(device, "Trail Uniform Buffer", &RibbonUniforms::zeroed());
        let (pipeline, bind_group) = create_pipeline(
            device,
            "Trail Ribbon Pipeline",
            &ribbon_shader(color),
            &uniform_buffer,
            &[vertex_layout()],
            target,
        );

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            meshes: HashMap::new(),
            scratch: Vec::new(),
        }
    }

    /// Upload uniforms and any trail geometry rebuilt since the last call.
    pub fn prepare<S: Stepper>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        registry: &TrailRegistry<S>,
        uniforms: &RibbonUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        for (_, buffer) in registry.draw_list() {
            let mesh = self
                .meshes
                .entry(buffer.id())
                .or_insert_with(|| GpuMesh::new(device, buffer));
            if mesh.revision == Some(buffer.revision()) {
                continue;
            }

            self.scratch.resize(buffer.vertex_count(), TrailVertex::default());
            buffer.write_interleaved(&mut self.scratch);
            queue.write_buffer(&mesh.vertex_buffer, 0, bytemuck::cast_slice(&self.scratch));
            mesh.revision = Some(buffer.revision());
        }
    }

    /// Patch only the animation clock, leaving the rest of the block as is.
    pub fn set_time(&self, queue: &wgpu::Queue, time: f32) {
        if let Some(offset) = param_table().offset(ShaderVariant::Ribbon, ShaderParam::Time) {
            queue.write_buffer(&self.uniform_buffer, offset as u64, bytemuck::bytes_of(&time));
        }
    }

    /// Record one indexed draw per active trail.
    pub fn draw<S: Stepper>(&self, pass: &mut wgpu::RenderPass<'_>, registry: &TrailRegistry<S>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);

        for (slot, buffer) in registry.draw_list() {
            let Some(mesh) = self.meshes.get(&buffer.id()) else {
                log::warn!("trail in slot {} drawn before prepare", slot);
                continue;
            };
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    /// Number of GPU meshes created so far.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Drop every GPU mesh, e.g. after the registry's pool was cleared.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}
