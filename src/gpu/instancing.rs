//! Instanced rendering of an [`InstancedTrailBatch`].
//!
//! The shared strip is uploaded once. Instance buffers are sized for the
//! batch capacity and only the packed prefix is rewritten each frame.

use bytemuck::Zeroable;
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use super::{
    create_pipeline, create_uniform_buffer, kinematics_layout, transform_layout, vertex_layout,
    RenderTarget,
};
use crate::instanced::InstancedTrailBatch;
use crate::shader::{instanced_shader, param_table, InstancedUniforms, ShaderParam, ShaderVariant};

/// Draws every instance of an [`InstancedTrailBatch`] in one call.
pub struct InstancedTrailRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    transform_buffer: wgpu::Buffer,
    kinematics_buffer: wgpu::Buffer,
    instance_count: u32,
}

impl InstancedTrailRenderer {
    pub fn new(
        device: &wgpu::Device,
        target: RenderTarget,
        batch: &InstancedTrailBatch,
        color: glam::Vec3,
    ) -> Self {
        let uniform_buffer = create_uniform_buffer(
            device,
            "Instanced Trail Uniform Buffer",
            &InstancedUniforms::zeroed(),
        );
        let (pipeline, bind_group) = create_pipeline(
            device,
            "Instanced Trail Pipeline",
            &instanced_shader(color),
            &uniform_buffer,
            &[vertex_layout(), transform_layout(), kinematics_layout()],
            target,
        );

        let mesh = batch.mesh();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instanced Trail Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.interleaved()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instanced Trail Index Buffer"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        // At least one element so an empty batch still binds valid buffers.
        let capacity = batch.capacity().max(1) as u64;
        let transform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instanced Trail Transforms"),
            size: capacity * std::mem::size_of::<Mat4>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let kinematics_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instanced Trail Kinematics"),
            size: capacity * std::mem::size_of::<Vec4>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
            transform_buffer,
            kinematics_buffer,
            instance_count: 0,
        }
    }

    /// Upload uniforms and the packed instance arrays.
    pub fn prepare(
        &mut self,
        queue: &wgpu::Queue,
        batch: &InstancedTrailBatch,
        uniforms: &InstancedUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let draw = batch.draw_batch();
        self.instance_count = draw.instance_count;
        if draw.instance_count == 0 {
            return;
        }
        queue.write_buffer(&self.transform_buffer, 0, bytemuck::cast_slice(draw.transforms));
        queue.write_buffer(&self.kinematics_buffer, 0, bytemuck::cast_slice(draw.kinematics));
    }

    /// Patch only the animation clock.
    pub fn set_time(&self, queue: &wgpu::Queue, time: f32) {
        if let Some(offset) = param_table().offset(ShaderVariant::Instanced, ShaderParam::Time) {
            queue.write_buffer(&self.uniform_buffer, offset as u64, bytemuck::bytes_of(&time));
        }
    }

    /// Instances uploaded by the last [`prepare`](Self::prepare).
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, self.transform_buffer.slice(..));
        pass.set_vertex_buffer(2, self.kinematics_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..self.instance_count);
    }
}
