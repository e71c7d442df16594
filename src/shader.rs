//! WGSL generation for both trail strategies.
//!
//! Uniform structs are described once, in a process-wide parameter table
//! built on first use. The table drives both the WGSL struct declarations
//! and the byte offsets the backend uses to patch single parameters, so the
//! CPU and shader layouts cannot drift apart.
//!
//! Conventions:
//! - per-trail meshes: `uv.y` is 0 (left) / 1 (right), side sign in
//!   `direction.w`
//! - instanced mesh: `uv.x` is simulation time along the path, `uv.y` is
//!   the side sign -1 / +1

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::mem::{offset_of, size_of};
use std::sync::OnceLock;

use crate::instanced::InstancedParams;
use crate::registry::TrailDrawParams;

/// Uniform block of the per-trail ribbon shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RibbonUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub time: f32,
    pub width: f32,
    pub trail_offset: f32,
    pub start_time: f32,
    pub _pad: f32,
}

impl RibbonUniforms {
    pub fn new(
        view_proj: Mat4,
        camera_position: Vec3,
        time: f32,
        params: &TrailDrawParams,
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.to_array(),
            time,
            width: params.width,
            trail_offset: params.trail_offset,
            start_time: params.start_time,
            _pad: 0.0,
        }
    }
}

/// Uniform block of the instanced shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstancedUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub time: f32,
    pub gravity: [f32; 3],
    pub width: f32,
    pub trail_offset: f32,
    pub show_time: f32,
    pub lifetime: f32,
    pub _pad: f32,
}

impl InstancedUniforms {
    pub fn new(
        view_proj: Mat4,
        camera_position: Vec3,
        time: f32,
        params: &InstancedParams,
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.to_array(),
            time,
            gravity: params.gravity.to_array(),
            width: params.width,
            trail_offset: params.trail_offset,
            show_time: params.show_time,
            lifetime: params.lifetime,
            _pad: 0.0,
        }
    }
}

/// Which uniform block a parameter belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderVariant {
    Ribbon,
    Instanced,
}

/// Named shader parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderParam {
    ViewProj,
    CameraPosition,
    Time,
    Width,
    TrailOffset,
    StartTime,
    Gravity,
    ShowTime,
    Lifetime,
}

/// Location of one parameter inside a uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamEntry {
    pub param: ShaderParam,
    pub name: &'static str,
    pub wgsl_type: &'static str,
    /// Byte offset inside the uniform block.
    pub offset: u32,
    /// Byte size, without trailing padding.
    pub size: u32,
}

/// Read-only lookup of every uniform parameter, per variant.
#[derive(Debug)]
pub struct ParamTable {
    ribbon: Vec<ParamEntry>,
    instanced: Vec<ParamEntry>,
}

macro_rules! entry {
    ($ty:ty, $param:ident, $field:ident, $wgsl:literal, $size:literal) => {
        ParamEntry {
            param: ShaderParam::$param,
            name: stringify!($field),
            wgsl_type: $wgsl,
            offset: offset_of!($ty, $field) as u32,
            size: $size,
        }
    };
}

/// The process-wide parameter table, built on first call.
pub fn param_table() -> &'static ParamTable {
    static TABLE: OnceLock<ParamTable> = OnceLock::new();
    TABLE.get_or_init(|| ParamTable {
        ribbon: vec![
            entry!(RibbonUniforms, ViewProj, view_proj, "mat4x4<f32>", 64),
            entry!(RibbonUniforms, CameraPosition, camera_position, "vec3<f32>", 12),
            entry!(RibbonUniforms, Time, time, "f32", 4),
            entry!(RibbonUniforms, Width, width, "f32", 4),
            entry!(RibbonUniforms, TrailOffset, trail_offset, "f32", 4),
            entry!(RibbonUniforms, StartTime, start_time, "f32", 4),
        ],
        instanced: vec![
            entry!(InstancedUniforms, ViewProj, view_proj, "mat4x4<f32>", 64),
            entry!(InstancedUniforms, CameraPosition, camera_position, "vec3<f32>", 12),
            entry!(InstancedUniforms, Time, time, "f32", 4),
            entry!(InstancedUniforms, Gravity, gravity, "vec3<f32>", 12),
            entry!(InstancedUniforms, Width, width, "f32", 4),
            entry!(InstancedUniforms, TrailOffset, trail_offset, "f32", 4),
            entry!(InstancedUniforms, ShowTime, show_time, "f32", 4),
            entry!(InstancedUniforms, Lifetime, lifetime, "f32", 4),
        ],
    })
}

impl ParamTable {
    pub fn entries(&self, variant: ShaderVariant) -> &[ParamEntry] {
        match variant {
            ShaderVariant::Ribbon => &self.ribbon,
            ShaderVariant::Instanced => &self.instanced,
        }
    }

    pub fn get(&self, variant: ShaderVariant, param: ShaderParam) -> Option<&ParamEntry> {
        self.entries(variant).iter().find(|e| e.param == param)
    }

    /// Look a parameter up by its WGSL field name.
    pub fn find(&self, variant: ShaderVariant, name: &str) -> Option<&ParamEntry> {
        self.entries(variant).iter().find(|e| e.name == name)
    }

    pub fn offset(&self, variant: ShaderVariant, param: ShaderParam) -> Option<u32> {
        self.get(variant, param).map(|e| e.offset)
    }

    /// Size of the uniform block in bytes.
    pub fn block_size(variant: ShaderVariant) -> usize {
        match variant {
            ShaderVariant::Ribbon => size_of::<RibbonUniforms>(),
            ShaderVariant::Instanced => size_of::<InstancedUniforms>(),
        }
    }

    /// WGSL declaration of the uniform block, padded to the Rust size.
    pub fn wgsl_struct(&self, variant: ShaderVariant, name: &str) -> String {
        let entries = self.entries(variant);
        let mut out = format!("struct {} {{\n", name);
        for e in entries {
            out.push_str(&format!("    {}: {},\n", e.name, e.wgsl_type));
        }

        let used = entries.last().map_or(0, |e| (e.offset + e.size) as usize);
        let pad_words = (Self::block_size(variant) - used) / 4;
        for i in 0..pad_words {
            out.push_str(&format!("    _pad{}: f32,\n", i));
        }
        out.push_str("};\n");
        out
    }
}

fn wgsl_vec3(v: Vec3) -> String {
    format!("vec3<f32>({:?}, {:?}, {:?})", v.x, v.y, v.z)
}

/// Shader for per-trail meshes.
///
/// Vertices are widened sideways, facing the camera, by half the trail
/// width times the side sign in `direction.w`. Parts of the ribbon the
/// projectile has not reached yet are discarded.
pub fn ribbon_shader(color: Vec3) -> String {
    let uniforms = param_table().wgsl_struct(ShaderVariant::Ribbon, "TrailUniforms");
    let color = wgsl_vec3(color);
    format!(
        r#"{uniforms}
@group(0) @binding(0)
var<uniform> uniforms: TrailUniforms;

struct VertexInput {{
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) direction: vec4<f32>,
}};

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) age: f32,
}};

fn widen(base: vec3<f32>, dir: vec3<f32>) -> vec3<f32> {{
    let to_camera = normalize(uniforms.camera_position - base);
    let side = cross(dir, to_camera);
    let side_len = length(side);
    if side_len < 0.00001 {{
        return vec3<f32>(0.0, 1.0, 0.0);
    }}
    return side / side_len;
}}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {{
    var out: VertexOutput;

    let dir = in.direction.xyz;
    let base = in.position - dir * uniforms.trail_offset;
    let world = base + widen(base, dir) * in.direction.w * uniforms.width * 0.5;

    out.clip_position = uniforms.view_proj * vec4<f32>(world, 1.0);
    out.uv = in.uv;
    // Seconds since the projectile passed this vertex
    out.age = (uniforms.time - uniforms.start_time) - in.uv.x;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    if in.age < 0.0 {{
        discard;
    }}
    let edge = 1.0 - abs(in.uv.y * 2.0 - 1.0);
    let alpha = smoothstep(0.0, 0.5, edge);
    return vec4<f32>({color}, alpha);
}}
"#
    )
}

/// Shader for the shared instanced strip.
///
/// Each vertex is placed on the instance's ballistic arc at the simulation
/// time stored in `uv.x`. Vertices ahead of the projectile collapse onto its
/// current position; vertices older than `show_time` fade out.
pub fn instanced_shader(color: Vec3) -> String {
    let uniforms = param_table().wgsl_struct(ShaderVariant::Instanced, "InstancedUniforms");
    let color = wgsl_vec3(color);
    format!(
        r#"{uniforms}
@group(0) @binding(0)
var<uniform> uniforms: InstancedUniforms;

struct VertexInput {{
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) direction: vec4<f32>,
}};

struct InstanceInput {{
    @location(3) transform_0: vec4<f32>,
    @location(4) transform_1: vec4<f32>,
    @location(5) transform_2: vec4<f32>,
    @location(6) transform_3: vec4<f32>,
    // xyz = launch velocity, w = elapsed lifetime
    @location(7) kinematics: vec4<f32>,
}};

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) side: f32,
    @location(1) fade: f32,
}};

@vertex
fn vs_main(in: VertexInput, inst: InstanceInput) -> VertexOutput {{
    var out: VertexOutput;

    let transform = mat4x4<f32>(
        inst.transform_0,
        inst.transform_1,
        inst.transform_2,
        inst.transform_3
    );
    let elapsed = inst.kinematics.w;
    let v0 = inst.kinematics.xyz;
    let t = min(in.uv.x, elapsed);

    let local = v0 * t + 0.5 * uniforms.gravity * t * t;
    var base = (transform * vec4<f32>(local, 1.0)).xyz;

    let velocity = v0 + uniforms.gravity * t;
    let speed = length(velocity);
    var dir = vec3<f32>(0.0, 0.0, 1.0);
    if speed > 0.00001 {{
        dir = velocity / speed;
    }}
    base = base - dir * uniforms.trail_offset;

    let to_camera = normalize(uniforms.camera_position - base);
    var side = cross(dir, to_camera);
    let side_len = length(side);
    if side_len > 0.00001 {{
        side = side / side_len;
    }} else {{
        side = vec3<f32>(0.0, 1.0, 0.0);
    }}

    let world = base + side * in.uv.y * uniforms.width * 0.5;
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 1.0);
    out.side = in.uv.y;

    let age = elapsed - t;
    let alive = step(elapsed, uniforms.lifetime);
    out.fade = clamp(1.0 - age / max(uniforms.show_time, 0.0001), 0.0, 1.0) * alive;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    if in.fade <= 0.0 {{
        discard;
    }}
    let edge = 1.0 - abs(in.side);
    let alpha = smoothstep(0.0, 0.5, edge) * in.fade;
    return vec4<f32>({color}, alpha);
}}
"#
    )
}
