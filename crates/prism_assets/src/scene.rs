use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Clone, Debug)]
pub struct TextureData {
    pub name: String,
    /// Tightly packed RGBA8, sRGB encoded.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    pub fn solid(name: &str, rgba: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            pixels: rgba.to_vec(),
            width: 1,
            height: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MaterialData {
    pub base_color: [f32; 4],
    /// Index into `SceneData::textures`.
    pub diffuse_texture: Option<usize>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            diffuse_texture: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PrimitiveData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into `SceneData::materials`; `None` uses the default material.
    pub material: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub primitives: Vec<PrimitiveData>,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    /// Hierarchy already flattened.
    pub world_transform: Mat4,
    pub mesh: usize,
}

/// CPU-side scene, ready for upload.
#[derive(Clone, Debug, Default)]
pub struct SceneData {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub textures: Vec<TextureData>,
    pub nodes: Vec<SceneNode>,
}

impl SceneData {
    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(|m| m.primitives.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|node| self.meshes[node.mesh].primitives.iter())
            .map(|p| p.indices.len() / 3)
            .sum()
    }
}
