//! Owns the clustered lighting core and the active program, and exposes the
//! entry points the frame driver and the debug panel call into.

use prism_assets::SceneData;

use crate::{
    camera::{CameraBuffer, CameraUniforms},
    cluster::{ClusterGrid, ClusterSettings},
    context::GpuContext,
    diagnostics::{OccupancyReadback, OccupancyStats},
    error::RenderError,
    light::{LightSet, LightSettings},
    programs::{ActiveProgram, FrameContext, ProgramInit, RenderMode},
    scene::GpuScene,
};

#[derive(Debug, Clone, Default)]
pub struct RendererSettings {
    pub lights: LightSettings,
    pub clusters: ClusterSettings,
    pub mode: RenderMode,
}

pub struct Renderer {
    camera: CameraBuffer,
    lights: LightSet,
    clusters: ClusterGrid,
    scene: GpuScene,
    program: ActiveProgram,
    size: (u32, u32),
}

impl Renderer {
    pub fn new(
        ctx: &GpuContext,
        scene: &SceneData,
        settings: &RendererSettings,
        camera: CameraUniforms,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let camera = CameraBuffer::new(&ctx.device, camera);
        let lights = LightSet::new(ctx, &settings.lights)?;
        let clusters = ClusterGrid::new(ctx, &lights, &camera, settings.clusters, width, height)?;
        let scene = GpuScene::upload(ctx, scene)?;

        let program = ActiveProgram::new(
            settings.mode,
            &ProgramInit {
                gpu: ctx,
                scene_layouts: scene.layouts(),
                camera: &camera,
                lights: &lights,
                clusters: &clusters,
                size: (width, height),
            },
        )?;
        log::info!("Render mode: {}", settings.mode);

        Ok(Self {
            camera,
            lights,
            clusters,
            scene,
            program,
            size: (width, height),
        })
    }

    /// Advances light motion to `time` seconds. Call once per frame before `draw`.
    pub fn on_frame(&self, ctx: &GpuContext, time: f32) {
        self.lights.advance(ctx, time);
    }

    /// Records the active program into `encoder`, targeting `target` at `width`x`height`.
    pub fn draw(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.size = (width, height);
        let mut frame = FrameContext {
            gpu: ctx,
            encoder,
            target,
            size: (width, height),
            camera: &self.camera,
            lights: &self.lights,
            clusters: &mut self.clusters,
            scene: &self.scene,
        };
        self.program.draw(&mut frame)
    }

    /// `draw` on a fresh encoder, submitted immediately.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        target: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        self.draw(ctx, &mut encoder, target, width, height)?;
        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Swaps the active program. The new one is built before the old one is torn down.
    pub fn set_mode(&mut self, ctx: &GpuContext, mode: RenderMode) -> Result<(), RenderError> {
        if mode == self.program.mode() {
            return Ok(());
        }

        let next = ActiveProgram::new(
            mode,
            &ProgramInit {
                gpu: ctx,
                scene_layouts: self.scene.layouts(),
                camera: &self.camera,
                lights: &self.lights,
                clusters: &self.clusters,
                size: self.size,
            },
        )?;
        let previous = std::mem::replace(&mut self.program, next);
        log::info!("Render mode: {} -> {}", previous.mode(), mode);
        previous.teardown();
        Ok(())
    }

    pub fn mode(&self) -> RenderMode {
        self.program.mode()
    }

    pub fn program(&self) -> &ActiveProgram {
        &self.program
    }

    pub fn set_active_lights(&mut self, queue: &wgpu::Queue, n: u32) -> u32 {
        self.lights.set_active_count(queue, n)
    }

    pub fn active_lights(&self) -> u32 {
        self.lights.active_count()
    }

    pub fn camera_mut(&mut self) -> &mut CameraBuffer {
        &mut self.camera
    }

    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    pub fn clusters(&self) -> &ClusterGrid {
        &self.clusters
    }

    /// Blocking. Diagnostic use only, never from the per-frame path.
    pub fn read_occupancy_stats(&self, ctx: &GpuContext) -> Result<OccupancyStats, RenderError> {
        self.clusters.read_occupancy_stats(ctx)
    }

    pub fn request_occupancy(&self, ctx: &GpuContext) -> OccupancyReadback {
        OccupancyReadback::request(ctx, &self.clusters)
    }
}
