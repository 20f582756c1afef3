use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use prism_assets::{PrimitiveData, Vertex};
use wgpu::util::DeviceExt;

/// Per-node transform, bound in the model slot. Mirrors `ModelUniforms` in common.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    // Transpose(Inverse(Model)), so non-uniform scale keeps normals perpendicular.
    pub normal: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn from_matrix(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// Layout of `prism_assets::Vertex` for the shared vertex shader.
pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3, // position
            },
            wgpu::VertexAttribute {
                offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3, // normal
            },
            wgpu::VertexAttribute {
                offset: (mem::size_of::<[f32; 3]>() * 2) as wgpu::BufferAddress,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2, // uv
            },
        ],
    }
}

pub struct GpuPrimitive {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    /// Index into the scene's material list, already resolved to the default when absent.
    pub material: usize,
}

impl GpuPrimitive {
    pub fn upload(device: &wgpu::Device, data: &PrimitiveData, material: usize) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Primitive Vertex Buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Primitive Index Buffer"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            material,
        }
    }
}

pub struct GpuMesh {
    pub primitives: Vec<GpuPrimitive>,
}

/// One placed mesh instance: its transform uniform and the bind group exposing it.
pub struct GpuNode {
    pub mesh: usize,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl GpuNode {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, transform: Mat4, mesh: usize) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Uniform Buffer"),
            contents: bytemuck::bytes_of(&ModelUniforms::from_matrix(transform)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            mesh,
            uniform_buffer,
            bind_group,
        }
    }
}
