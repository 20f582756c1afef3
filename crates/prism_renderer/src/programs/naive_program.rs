use wgpu::RenderPipeline;

use crate::{
    binding::{storage_entry, uniform_entry},
    error::RenderError,
    programs::{FrameContext, GpuProgram, ProgramInit, RenderMode, clear_color, depth_attachment, draw_scene, geometry_pipeline},
    shaders::{self, BIND_GROUP_SCENE},
    texture::TextureHelper,
};

/// Baseline forward renderer: every fragment loops over every active light.
pub struct NaiveProgram {
    pipeline: RenderPipeline,
    scene_bind_group: wgpu::BindGroup,
    depth: wgpu::TextureView,
    size: (u32, u32),
}

impl GpuProgram for NaiveProgram {
    const MODE: RenderMode = RenderMode::Naive;

    fn new(init: &ProgramInit) -> Result<Self, RenderError> {
        init.gpu.create_checked("naive program", |device| {
            let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Naive Scene Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT), // camera
                    storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),                       // light set
                    uniform_entry(2, wgpu::ShaderStages::FRAGMENT),                             // params
                ],
            });

            // None of these buffers is ever reallocated, so one bind group lasts.
            let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Naive Scene Bind Group"),
                layout: &scene_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: init.camera.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: init.lights.buffer().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: init.clusters.params_buffer().as_entire_binding(),
                    },
                ],
            });

            let pipeline = geometry_pipeline(
                device,
                "Naive Render Pipeline",
                &scene_layout,
                init.scene_layouts,
                shaders::NAIVE_FRAG_SRC,
                &[Some(wgpu::ColorTargetState {
                    format: init.gpu.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            );

            let (width, height) = init.size;
            Self {
                pipeline,
                scene_bind_group,
                depth: TextureHelper::create_depth_texture(device, width, height, "Naive Depth Texture"),
                size: init.size,
            }
        })
    }

    fn draw(&mut self, frame: &mut FrameContext) -> Result<(), RenderError> {
        if frame.size != self.size {
            let (width, height) = frame.size;
            self.depth = TextureHelper::create_depth_texture(&frame.gpu.device, width, height, "Naive Depth Texture");
            self.size = frame.size;
        }

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Naive Render Pass"),
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
        render_pass.set_bind_group(BIND_GROUP_SCENE, &self.scene_bind_group, &[]);
        draw_scene(&mut render_pass, frame.scene);

        Ok(())
    }
}
