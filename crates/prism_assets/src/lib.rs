pub mod error;
pub mod gltf_parser;
pub mod procedural;
pub mod scene;

pub use error::AssetError;
pub use gltf_parser::parse_gltf;
pub use procedural::demo_scene;
pub use scene::{MaterialData, MeshData, PrimitiveData, SceneData, SceneNode, TextureData, Vertex};

/// Loads a glTF scene, or builds the procedural demo scene when no path is given.
pub fn load_scene(path: Option<&str>) -> Result<SceneData, AssetError> {
    match path {
        Some(path) => parse_gltf(path),
        None => {
            log::info!("No scene path configured; using the procedural demo scene");
            Ok(demo_scene())
        }
    }
}
