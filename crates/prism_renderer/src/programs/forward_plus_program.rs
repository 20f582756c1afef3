use wgpu::RenderPipeline;

use crate::{
    error::RenderError,
    programs::{
        ClusteredSceneBindings, FrameContext, GpuProgram, ProgramInit, RenderMode, clear_color, depth_attachment,
        draw_scene, geometry_pipeline,
    },
    shaders::{self, BIND_GROUP_SCENE},
    texture::TextureHelper,
};

/// Single geometry pass; each fragment shades with its cluster's light list.
pub struct ForwardPlusProgram {
    pipeline: RenderPipeline,
    scene_bindings: ClusteredSceneBindings,
    depth: wgpu::TextureView,
    size: (u32, u32),
}

impl ForwardPlusProgram {
    pub fn scene_binding_rebuilds(&self) -> u64 {
        self.scene_bindings.rebuilds()
    }
}

impl GpuProgram for ForwardPlusProgram {
    const MODE: RenderMode = RenderMode::ForwardPlus;

    fn new(init: &ProgramInit) -> Result<Self, RenderError> {
        init.gpu.create_checked("forward+ program", |device| {
            let scene_bindings = ClusteredSceneBindings::new(device);

            let pipeline = geometry_pipeline(
                device,
                "Forward+ Render Pipeline",
                &scene_bindings.layout,
                init.scene_layouts,
                shaders::FORWARD_PLUS_FRAG_SRC,
                &[Some(wgpu::ColorTargetState {
                    format: init.gpu.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            );

            let (width, height) = init.size;
            Self {
                pipeline,
                scene_bindings,
                depth: TextureHelper::create_depth_texture(device, width, height, "Forward+ Depth Texture"),
                size: init.size,
            }
        })
    }

    fn draw(&mut self, frame: &mut FrameContext) -> Result<(), RenderError> {
        let (width, height) = frame.size;
        if frame.size != self.size {
            self.depth = TextureHelper::create_depth_texture(&frame.gpu.device, width, height, "Forward+ Depth Texture");
            self.size = frame.size;
        }

        // A resize must land in the buffers and the bindings before anything reads them.
        frame.clusters.rebuild_if_needed(frame.gpu, width, height)?;
        let scene_bind_group = self
            .scene_bindings
            .refresh(&frame.gpu.device, frame.camera, frame.lights, frame.clusters);

        frame.clusters.assign(frame.encoder, frame.lights.active_count());

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Forward+ Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame.target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color()),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(depth_attachment(&self.depth)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(BIND_GROUP_SCENE, &scene_bind_group, &[]);
        draw_scene(&mut render_pass, frame.scene);

        Ok(())
    }
}
