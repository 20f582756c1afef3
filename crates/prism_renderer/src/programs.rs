pub mod clustered_deferred_program;
pub mod forward_plus_program;
pub mod naive_program;

use std::{fmt, str::FromStr};

pub use clustered_deferred_program::ClusteredDeferredProgram;
pub use forward_plus_program::ForwardPlusProgram;
pub use naive_program::NaiveProgram;

use crate::{
    binding::{storage_entry, uniform_entry},
    camera::CameraBuffer,
    cluster::ClusterGrid,
    context::GpuContext,
    error::RenderError,
    light::LightSet,
    mesh::vertex_layout,
    scene::{GpuScene, SceneLayouts},
    shaders::{self, BIND_GROUP_MATERIAL, BIND_GROUP_MODEL, CLEAR_COLOR},
    texture::TextureHelper,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    #[default]
    Naive,
    ForwardPlus,
    ClusteredDeferred,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Naive, RenderMode::ForwardPlus, RenderMode::ClusteredDeferred];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Naive => "naive",
            RenderMode::ForwardPlus => "forward+",
            RenderMode::ClusteredDeferred => "clustered deferred",
        }
    }

    /// Whether the mode consumes the cluster grid.
    pub fn is_clustered(&self) -> bool {
        !matches!(self, RenderMode::Naive)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown render mode '{0}' (expected naive, forward+ or clustered deferred)")]
pub struct ParseRenderModeError(pub String);

impl FromStr for RenderMode {
    type Err = ParseRenderModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(RenderMode::Naive),
            "forward+" | "forward-plus" | "forwardplus" => Ok(RenderMode::ForwardPlus),
            "clustered deferred" | "clustered-deferred" | "deferred" => Ok(RenderMode::ClusteredDeferred),
            _ => Err(ParseRenderModeError(s.to_string())),
        }
    }
}

/// Shared state a program needs at construction.
pub struct ProgramInit<'a> {
    pub gpu: &'a GpuContext,
    pub scene_layouts: &'a SceneLayouts,
    pub camera: &'a CameraBuffer,
    pub lights: &'a LightSet,
    pub clusters: &'a ClusterGrid,
    pub size: (u32, u32),
}

/// Everything one frame's draw touches. The encoder is submitted by the caller.
pub struct FrameContext<'a> {
    pub gpu: &'a GpuContext,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub target: &'a wgpu::TextureView,
    pub size: (u32, u32),
    pub camera: &'a CameraBuffer,
    pub lights: &'a LightSet,
    pub clusters: &'a mut ClusterGrid,
    pub scene: &'a GpuScene,
}

pub trait GpuProgram: Sized {
    const MODE: RenderMode;

    /// Compiles shaders and creates pipelines, layouts and size-dependent targets.
    fn new(init: &ProgramInit) -> Result<Self, RenderError>;

    /// Records this frame's passes into `frame.encoder`.
    fn draw(&mut self, frame: &mut FrameContext) -> Result<(), RenderError>;

    /// Releases the program's GPU resources.
    fn teardown(self) {
        log::debug!("Tearing down {} program", Self::MODE);
    }
}

/// The single program slot owned by the frame driver.
pub enum ActiveProgram {
    Naive(NaiveProgram),
    ForwardPlus(ForwardPlusProgram),
    ClusteredDeferred(ClusteredDeferredProgram),
}

impl ActiveProgram {
    pub fn new(mode: RenderMode, init: &ProgramInit) -> Result<Self, RenderError> {
        Ok(match mode {
            RenderMode::Naive => ActiveProgram::Naive(NaiveProgram::new(init)?),
            RenderMode::ForwardPlus => ActiveProgram::ForwardPlus(ForwardPlusProgram::new(init)?),
            RenderMode::ClusteredDeferred => ActiveProgram::ClusteredDeferred(ClusteredDeferredProgram::new(init)?),
        })
    }

    pub fn mode(&self) -> RenderMode {
        match self {
            ActiveProgram::Naive(_) => RenderMode::Naive,
            ActiveProgram::ForwardPlus(_) => RenderMode::ForwardPlus,
            ActiveProgram::ClusteredDeferred(_) => RenderMode::ClusteredDeferred,
        }
    }

    pub fn draw(&mut self, frame: &mut FrameContext) -> Result<(), RenderError> {
        match self {
            ActiveProgram::Naive(p) => p.draw(frame),
            ActiveProgram::ForwardPlus(p) => p.draw(frame),
            ActiveProgram::ClusteredDeferred(p) => p.draw(frame),
        }
    }

    pub fn teardown(self) {
        match self {
            ActiveProgram::Naive(p) => p.teardown(),
            ActiveProgram::ForwardPlus(p) => p.teardown(),
            ActiveProgram::ClusteredDeferred(p) => p.teardown(),
        }
    }

    /// How many times the program has rebuilt its cluster bindings; zero for naive.
    pub fn scene_binding_rebuilds(&self) -> u64 {
        match self {
            ActiveProgram::Naive(_) => 0,
            ActiveProgram::ForwardPlus(p) => p.scene_binding_rebuilds(),
            ActiveProgram::ClusteredDeferred(p) => p.scene_binding_rebuilds(),
        }
    }
}

pub(crate) fn clear_color() -> wgpu::Color {
    wgpu::Color {
        r: CLEAR_COLOR[0] as f64,
        g: CLEAR_COLOR[1] as f64,
        b: CLEAR_COLOR[2] as f64,
        a: 1.0,
    }
}

/// Scene slot for the clustered programs: camera, lights, params, counts, indices.
///
/// The bind group references the cluster buffers, so it is rebuilt whenever the
/// grid's generation moves on and reused otherwise.
pub(crate) struct ClusteredSceneBindings {
    pub layout: wgpu::BindGroupLayout,
    cached: Option<(u64, wgpu::BindGroup)>,
    rebuilds: u64,
}

impl ClusteredSceneBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Clustered Scene Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT), // camera
                storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),                       // light set
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),                             // params
                storage_entry(3, wgpu::ShaderStages::FRAGMENT, true),                       // counts
                storage_entry(4, wgpu::ShaderStages::FRAGMENT, true),                       // indices
            ],
        });

        Self {
            layout,
            cached: None,
            rebuilds: 0,
        }
    }

    pub fn refresh(
        &mut self,
        device: &wgpu::Device,
        camera: &CameraBuffer,
        lights: &LightSet,
        clusters: &ClusterGrid,
    ) -> wgpu::BindGroup {
        if let Some((generation, bind_group)) = &self.cached {
            if *generation == clusters.generation() {
                return bind_group.clone();
            }
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Clustered Scene Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: clusters.params_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: clusters.counts_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: clusters.indices_buffer().as_entire_binding(),
                },
            ],
        });

        self.rebuilds += 1;
        log::debug!("Rebuilt clustered scene bindings for generation {}", clusters.generation());
        self.cached = Some((clusters.generation(), bind_group.clone()));
        bind_group
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

/// Geometry pipeline over the shared vertex shader: depth-tested, back faces culled.
/// Slot order is scene, model, material.
pub(crate) fn geometry_pipeline(
    device: &wgpu::Device,
    label: &str,
    scene_layout: &wgpu::BindGroupLayout,
    scene_layouts: &SceneLayouts,
    fragment_src: &str,
    targets: &[Option<wgpu::ColorTargetState>],
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[scene_layout, &scene_layouts.model, &scene_layouts.material],
        push_constant_ranges: &[],
    });

    let vertex = shaders::create_module(device, "shared vertex shader", shaders::NAIVE_VERT_SRC);
    let fragment = shaders::create_module(device, label, fragment_src);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vertex,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            buffers: &[vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            targets,
        }),
        depth_stencil: Some(wgpu::DepthStencilState {
            format: TextureHelper::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

/// One indexed draw per primitive, binding model and material slots on the way.
pub(crate) fn draw_scene(pass: &mut wgpu::RenderPass<'_>, scene: &GpuScene) {
    scene.iterate(
        pass,
        |pass, node| pass.set_bind_group(BIND_GROUP_MODEL, node, &[]),
        |pass, material| pass.set_bind_group(BIND_GROUP_MATERIAL, material, &[]),
        |pass, primitive| {
            pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
            pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..primitive.index_count, 0, 0..1);
        },
    );
}

pub(crate) fn depth_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassDepthStencilAttachment<'_> {
    wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_round_trip() {
        for mode in RenderMode::ALL {
            assert_eq!(mode.to_string().parse::<RenderMode>(), Ok(mode));
        }
    }

    #[test]
    fn mode_parsing_accepts_aliases() {
        assert_eq!("Forward+".parse(), Ok(RenderMode::ForwardPlus));
        assert_eq!(" clustered-deferred ".parse(), Ok(RenderMode::ClusteredDeferred));
        assert!("raytraced".parse::<RenderMode>().is_err());
    }

    #[test]
    fn only_naive_skips_clustering() {
        assert!(!RenderMode::Naive.is_clustered());
        assert!(RenderMode::ForwardPlus.is_clustered());
        assert!(RenderMode::ClusteredDeferred.is_clustered());
    }
}
