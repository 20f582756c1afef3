//! GPU copy of a `SceneData`, drawn by every geometry pass through `iterate`.

use prism_assets::{MaterialData, SceneData, TextureData};

use crate::{
    binding::{sampler_entry, texture_entry, uniform_entry},
    context::GpuContext,
    error::RenderError,
    material::GpuMaterial,
    mesh::{GpuMesh, GpuNode, GpuPrimitive},
    texture::GpuTexture,
};

/// Layouts of the model and material slots, shared by every geometry pipeline.
pub struct SceneLayouts {
    pub model: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        Self { model, material }
    }
}

pub struct GpuScene {
    layouts: SceneLayouts,
    nodes: Vec<GpuNode>,
    meshes: Vec<GpuMesh>,
    // The last entry is the default material.
    materials: Vec<GpuMaterial>,
    _textures: Vec<GpuTexture>,
    _sampler: wgpu::Sampler,
}

impl GpuScene {
    pub fn upload(ctx: &GpuContext, data: &SceneData) -> Result<Self, RenderError> {
        let scene = ctx.create_checked("scene resources", |device| {
            let layouts = SceneLayouts::new(device);

            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("Diffuse Sampler"),
                address_mode_u: wgpu::AddressMode::Repeat,
                address_mode_v: wgpu::AddressMode::Repeat,
                address_mode_w: wgpu::AddressMode::Repeat,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });

            let mut textures: Vec<GpuTexture> = data
                .textures
                .iter()
                .map(|t| GpuTexture::from_data(device, &ctx.queue, t))
                .collect();
            let white = textures.len();
            textures.push(GpuTexture::from_data(
                device,
                &ctx.queue,
                &TextureData::solid("Default White", [255, 255, 255, 255]),
            ));

            let default_material = MaterialData::default();
            let materials: Vec<GpuMaterial> = data
                .materials
                .iter()
                .chain(std::iter::once(&default_material))
                .map(|m| {
                    let texture = m.diffuse_texture.filter(|&i| i < white).unwrap_or(white);
                    GpuMaterial::new(device, &layouts.material, m, &textures[texture].view, &sampler)
                })
                .collect();
            let default_index = materials.len() - 1;

            let meshes = data
                .meshes
                .iter()
                .map(|mesh| GpuMesh {
                    primitives: mesh
                        .primitives
                        .iter()
                        .filter(|p| !p.indices.is_empty())
                        .map(|p| {
                            let material = p.material.filter(|&i| i < default_index).unwrap_or(default_index);
                            GpuPrimitive::upload(device, p, material)
                        })
                        .collect(),
                })
                .collect();

            let nodes = data
                .nodes
                .iter()
                .filter(|node| node.mesh < data.meshes.len())
                .map(|node| GpuNode::new(device, &layouts.model, node.world_transform, node.mesh))
                .collect();

            Self {
                layouts,
                nodes,
                meshes,
                materials,
                _textures: textures,
                _sampler: sampler,
            }
        })?;

        log::info!(
            "Uploaded scene: {} nodes, {} meshes, {} materials, {} triangles",
            scene.nodes.len(),
            scene.meshes.len(),
            scene.materials.len(),
            data.triangle_count()
        );

        Ok(scene)
    }

    pub fn layouts(&self) -> &SceneLayouts {
        &self.layouts
    }

    /// Walks node -> material -> primitive. `per_material` only fires when the
    /// material differs from the one bound last.
    pub fn iterate<C>(
        &self,
        target: &mut C,
        mut per_node: impl FnMut(&mut C, &wgpu::BindGroup),
        mut per_material: impl FnMut(&mut C, &wgpu::BindGroup),
        mut per_primitive: impl FnMut(&mut C, &GpuPrimitive),
    ) {
        let mut bound_material = None;

        for node in &self.nodes {
            per_node(target, &node.bind_group);

            for primitive in &self.meshes[node.mesh].primitives {
                if bound_material != Some(primitive.material) {
                    per_material(target, &self.materials[primitive.material].bind_group);
                    bound_material = Some(primitive.material);
                }
                per_primitive(target, primitive);
            }
        }
    }
}
