mod binding;
pub mod camera;
pub mod cluster;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod programs;
pub mod renderer;
pub mod scene;
pub mod shaders;
pub mod texture;

pub use camera::{CameraBuffer, CameraUniforms};
pub use cluster::{ClusterDims, ClusterGrid, ClusterParams, ClusterSettings};
pub use context::GpuContext;
pub use diagnostics::{OccupancyReadback, OccupancyStats};
pub use error::RenderError;
pub use light::{LightSet, LightSettings, MAX_LIGHTS};
pub use programs::{ActiveProgram, FrameContext, GpuProgram, RenderMode};
pub use renderer::{Renderer, RendererSettings};
pub use scene::GpuScene;
