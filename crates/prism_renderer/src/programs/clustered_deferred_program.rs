use wgpu::RenderPipeline;

use crate::{
    binding::{sampler_entry, texture_entry},
    error::RenderError,
    programs::{
        ClusteredSceneBindings, FrameContext, GpuProgram, ProgramInit, RenderMode, clear_color, depth_attachment,
        draw_scene, geometry_pipeline,
    },
    shaders::{self, BIND_GROUP_GBUFFER, BIND_GROUP_SCENE},
    texture::GBuffer,
};

/// Geometry pass into the G-buffer, then a fullscreen pass shading each pixel
/// from its cluster's light list.
pub struct ClusteredDeferredProgram {
    gbuffer_pipeline: RenderPipeline,
    fullscreen_pipeline: RenderPipeline,
    scene_bindings: ClusteredSceneBindings,

    gbuffer_layout: wgpu::BindGroupLayout,
    gbuffer_sampler: wgpu::Sampler,
    gbuffer: GBuffer,
    gbuffer_bind_group: wgpu::BindGroup,
}

impl ClusteredDeferredProgram {
    pub fn scene_binding_rebuilds(&self) -> u64 {
        self.scene_bindings.rebuilds()
    }

    fn create_gbuffer_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        gbuffer: &GBuffer,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("G-Buffer Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.position),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.normal),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.albedo),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn resize_targets(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.gbuffer = GBuffer::new(device, width, height);
        self.gbuffer_bind_group =
            Self::create_gbuffer_bind_group(device, &self.gbuffer_layout, &self.gbuffer, &self.gbuffer_sampler);
        log::debug!("Recreated G-buffer at {width}x{height}");
    }
}

impl GpuProgram for ClusteredDeferredProgram {
    const MODE: RenderMode = RenderMode::ClusteredDeferred;

    fn new(init: &ProgramInit) -> Result<Self, RenderError> {
        init.gpu.create_checked("clustered deferred program", |device| {
            let scene_bindings = ClusteredSceneBindings::new(device);

            let gbuffer_pipeline = geometry_pipeline(
                device,
                "G-Buffer Render Pipeline",
                &scene_bindings.layout,
                init.scene_layouts,
                shaders::CLUSTERED_DEFERRED_FRAG_SRC,
                &[
                    Some(GBuffer::POSITION_FORMAT.into()),
                    Some(GBuffer::NORMAL_FORMAT.into()),
                    Some(GBuffer::ALBEDO_FORMAT.into()),
                ],
            );

            let gbuffer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("G-Buffer Bind Group Layout"),
                entries: &[
                    texture_entry(0, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(2, wgpu::ShaderStages::FRAGMENT),
                    sampler_entry(3, wgpu::ShaderStages::FRAGMENT),
                ],
            });

            let gbuffer_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("G-Buffer Sampler"),
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            });

            let fullscreen_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Deferred Fullscreen Pipeline Layout"),
                bind_group_layouts: &[&scene_bindings.layout, &gbuffer_layout],
                push_constant_ranges: &[],
            });

            let vertex = shaders::create_module(
                device,
                "deferred fullscreen vertex shader",
                shaders::CLUSTERED_DEFERRED_FULLSCREEN_VERT_SRC,
            );
            let fragment = shaders::create_module(
                device,
                "deferred fullscreen fragment shader",
                shaders::CLUSTERED_DEFERRED_FULLSCREEN_FRAG_SRC,
            );

            let fullscreen_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some("Deferred Fullscreen Pipeline"),
                layout: Some(&fullscreen_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: init.gpu.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                depth_stencil: None,
                primitive: wgpu::PrimitiveState::default(),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

            let (width, height) = init.size;
            let gbuffer = GBuffer::new(device, width, height);
            let gbuffer_bind_group = Self::create_gbuffer_bind_group(device, &gbuffer_layout, &gbuffer, &gbuffer_sampler);

            Self {
                gbuffer_pipeline,
                fullscreen_pipeline,
                scene_bindings,
                gbuffer_layout,
                gbuffer_sampler,
                gbuffer,
                gbuffer_bind_group,
            }
        })
    }

    fn draw(&mut self, frame: &mut FrameContext) -> Result<(), RenderError> {
        let (width, height) = frame.size;
        if frame.size != self.gbuffer.size {
            self.resize_targets(&frame.gpu.device, width, height);
        }

        frame.clusters.rebuild_if_needed(frame.gpu, width, height)?;
        let scene_bind_group = self
            .scene_bindings
            .refresh(&frame.gpu.device, frame.camera, frame.lights, frame.clusters);

        frame.clusters.assign(frame.encoder, frame.lights.active_count());

        let gbuffer_clear = wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        };

        {
            let mut gbuffer_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("G-Buffer Pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.gbuffer.position,
                        depth_slice: None,
                        resolve_target: None,
                        ops: gbuffer_clear,
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.gbuffer.normal,
                        depth_slice: None,
                        resolve_target: None,
                        ops: gbuffer_clear,
                    }),
                    Some(wgpu::RenderPassColorAttachment {
                        view: &self.gbuffer.albedo,
                        depth_slice: None,
                        resolve_target: None,
                        ops: gbuffer_clear,
                    }),
                ],
                depth_stencil_attachment: Some(depth_attachment(&self.gbuffer.depth)),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            gbuffer_pass.set_pipeline(&self.gbuffer_pipeline);
            gbuffer_pass.set_bind_group(BIND_GROUP_SCENE, &scene_bind_group, &[]);
            draw_scene(&mut gbuffer_pass, frame.scene);
        }

        // The G-buffer pass has ended; its targets are readable from here on.
        let mut fullscreen_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Deferred Fullscreen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame.target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color()),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        fullscreen_pass.set_pipeline(&self.fullscreen_pipeline);
        fullscreen_pass.set_bind_group(BIND_GROUP_SCENE, &scene_bind_group, &[]);
        fullscreen_pass.set_bind_group(BIND_GROUP_GBUFFER, &self.gbuffer_bind_group, &[]);
        fullscreen_pass.draw(0..3, 0..1);

        Ok(())
    }
}
