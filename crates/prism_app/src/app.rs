//! The frame driver: owns the window surface, the renderer and the debug panel,
//! and runs one frame per redraw.

use std::sync::Arc;

use anyhow::Context;
use prism_core::{Camera, FlyCameraController, Input, RendererConfig, Time, Transform};
use prism_debug::{DebugPanel, EguiState, PanelAction, PanelState};
use prism_renderer::{
    CameraUniforms, ClusterSettings, GpuContext, LightSettings, OccupancyReadback, RenderMode, Renderer,
    RendererSettings,
};
use prism_window::WindowApp;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::benchmark::{Benchmark, BenchmarkHistory};

struct Graphics {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    ctx: GpuContext,
    renderer: Renderer,
    egui: EguiState,
}

pub struct PrismApp {
    config: RendererConfig,
    initial_mode: RenderMode,
    exit_after_benchmark: bool,

    graphics: Option<Graphics>,
    failed: bool,

    time: Time,
    input: Input,
    camera: Camera,
    camera_transform: Transform,
    controller: FlyCameraController,

    panel: DebugPanel,
    panel_state: PanelState,
    benchmark: Option<Benchmark>,
    benchmark_history: BenchmarkHistory,
    occupancy: Option<OccupancyReadback>,
}

impl PrismApp {
    pub fn new(config: RendererConfig, mode: RenderMode, run_benchmark: bool) -> Self {
        let camera = Camera {
            fov: config.camera.fov_y_degrees.to_radians(),
            near: config.camera.near,
            far: config.camera.far,
        };
        let camera_transform = Transform::from_translation(config.camera.position)
            .looking_at(config.camera.look_at, glam::Vec3::Y);
        let controller = FlyCameraController::new(config.camera.move_speed);
        let benchmark = run_benchmark.then(|| Benchmark::new(config.benchmark.frames, config.benchmark.warmup_frames));

        let mut panel_state = PanelState::new(config.active_lights, mode);
        panel_state.benchmark_running = benchmark.is_some();

        Self {
            initial_mode: mode,
            exit_after_benchmark: run_benchmark,
            graphics: None,
            failed: false,
            time: Time::default(),
            input: Input::default(),
            camera,
            camera_transform,
            controller,
            panel: DebugPanel::new(),
            panel_state,
            benchmark,
            benchmark_history: BenchmarkHistory::default(),
            occupancy: None,
            config,
        }
    }

    fn renderer_settings(&self) -> RendererSettings {
        RendererSettings {
            lights: LightSettings {
                active_count: self.config.active_lights,
                intensity: self.config.light_intensity,
                bounds_min: self.config.light_bounds_min,
                bounds_max: self.config.light_bounds_max,
                seed: self.config.seed,
            },
            clusters: ClusterSettings {
                near: self.camera.near,
                far: self.camera.far,
                light_radius: self.config.light_radius,
            },
            mode: self.initial_mode,
        }
    }

    fn create_graphics(&self, window: Arc<Window>) -> anyhow::Result<Graphics> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        let ctx = pollster::block_on(GpuContext::request(
            &instance,
            Some(&surface),
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ))?;

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let caps = surface.get_capabilities(&ctx.adapter);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: ctx.color_format,
            width,
            height,
            present_mode: if self.config.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);

        let scene = prism_assets::load_scene(self.config.scene.as_deref()).context("loading scene")?;
        let camera = CameraUniforms::from_camera(&self.camera, &self.camera_transform, width, height);
        let renderer = Renderer::new(&ctx, &scene, &self.renderer_settings(), camera, width, height)?;
        let egui = EguiState::new(&ctx.device, ctx.color_format, &window);

        Ok(Graphics {
            window,
            surface,
            surface_config,
            ctx,
            renderer,
            egui,
        })
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                if code == KeyCode::F1 && !event.repeat {
                    self.panel.toggle();
                }
                self.input.press(code);
            }
            ElementState::Released => self.input.release(code),
        }
    }

    fn apply_actions(&mut self, actions: Vec<PanelAction>) {
        let Some(gfx) = self.graphics.as_mut() else {
            return;
        };

        for action in actions {
            match action {
                PanelAction::SetActiveLights(n) => {
                    self.panel_state.active_lights = gfx.renderer.set_active_lights(&gfx.ctx.queue, n);
                }
                PanelAction::SetMode(mode) => match gfx.renderer.set_mode(&gfx.ctx, mode) {
                    Ok(()) => self.panel_state.mode = mode,
                    Err(err) => log::error!("Failed to switch to {mode}: {err}"),
                },
                PanelAction::RunBenchmark => {
                    log::info!("Starting benchmark ({})", gfx.renderer.mode());
                    self.benchmark = Some(Benchmark::new(
                        self.config.benchmark.frames,
                        self.config.benchmark.warmup_frames,
                    ));
                    self.panel_state.benchmark_running = true;
                }
                PanelAction::CountClusters => {
                    if self.occupancy.is_none() {
                        self.occupancy = Some(gfx.renderer.request_occupancy(&gfx.ctx));
                    }
                }
            }
        }
    }

    fn poll_occupancy(&mut self) {
        let (Some(gfx), Some(readback)) = (self.graphics.as_ref(), self.occupancy.as_mut()) else {
            return;
        };
        match readback.poll(&gfx.ctx) {
            None => {}
            Some(Ok(stats)) => {
                log::info!("{stats}");
                self.panel_state.last_occupancy = Some(stats.to_string());
                self.occupancy = None;
            }
            Some(Err(err)) => {
                log::warn!("Cluster occupancy readback failed: {err}");
                self.occupancy = None;
            }
        }
    }

    /// Post-frame hook. Returns false when the app should exit.
    fn after_frame(&mut self) -> bool {
        let Some(benchmark) = self.benchmark.as_mut() else {
            return true;
        };
        let Some(fps) = benchmark.on_frame(self.time.frame_timestamp_ms()) else {
            return true;
        };

        self.benchmark = None;
        self.benchmark_history.record(fps);
        let average = self.benchmark_history.average_fps().unwrap_or(fps);
        log::info!(
            "Benchmark complete: {fps:.2} fps ({} mode, {} lights); average over {} runs: {average:.2}",
            self.panel_state.mode,
            self.panel_state.active_lights,
            self.benchmark_history.runs()
        );
        self.panel_state.benchmark_running = false;
        self.panel_state.last_benchmark = Some(format!("Average FPS: {average:.2}"));

        !self.exit_after_benchmark
    }

    fn frame(&mut self) -> anyhow::Result<bool> {
        self.time.update();
        self.panel_state.fps = if self.time.delta_seconds() > 0.0 {
            1.0 / self.time.delta_seconds()
        } else {
            0.0
        };

        let Some(gfx) = self.graphics.as_mut() else {
            return Ok(true);
        };

        let (width, height) = (gfx.surface_config.width, gfx.surface_config.height);
        self.controller
            .update(&mut self.camera_transform, &mut self.input, self.time.delta_seconds());
        gfx.renderer
            .camera_mut()
            .update(&gfx.ctx.queue, &self.camera, &self.camera_transform, width, height);

        gfx.renderer.on_frame(&gfx.ctx, self.time.elapsed_seconds());

        let frame = match gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gfx.surface.configure(&gfx.ctx.device, &gfx.surface_config);
                return Ok(true);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Surface timeout; skipping frame");
                return Ok(true);
            }
            Err(err) => return Err(err).context("acquiring the next surface texture"),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gfx.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        gfx.renderer.draw(&gfx.ctx, &mut encoder, &view, width, height)?;

        let mut actions = Vec::new();
        let panel = &self.panel;
        let panel_state = &self.panel_state;
        gfx.egui.render(
            &gfx.ctx.device,
            &gfx.ctx.queue,
            &mut encoder,
            &gfx.window,
            &view,
            [width, height],
            |ctx| actions = panel.show(ctx, panel_state),
        );

        gfx.ctx.queue.submit(std::iter::once(encoder.finish()));
        gfx.window.pre_present_notify();
        frame.present();

        self.apply_actions(actions);
        self.poll_occupancy();
        Ok(self.after_frame())
    }
}

impl WindowApp for PrismApp {
    fn init(&mut self, window: Arc<Window>) {
        match self.create_graphics(window) {
            Ok(graphics) => {
                log::info!("Renderer ready ({} mode)", graphics.renderer.mode());
                self.graphics = Some(graphics);
            }
            Err(err) => {
                log::error!("Failed to initialise the renderer: {err:#}");
                self.failed = true;
            }
        }
    }

    fn window_event(&mut self, window: &Window, event: &WindowEvent) {
        if let Some(gfx) = self.graphics.as_mut() {
            if gfx.egui.on_window_event(window, event) {
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => self.input.set_look_held(*state == ElementState::Pressed),
            WindowEvent::Focused(false) => self.input = Input::default(),
            _ => {}
        }
    }

    fn device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.accumulate_mouse(delta.0 as f32, delta.1 as f32);
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(gfx) = self.graphics.as_mut() {
            gfx.surface_config.width = size.width;
            gfx.surface_config.height = size.height;
            gfx.surface.configure(&gfx.ctx.device, &gfx.surface_config);
            log::debug!("Surface resized to {}x{}", size.width, size.height);
        }
    }

    fn redraw(&mut self) -> bool {
        if self.failed {
            return false;
        }
        match self.frame() {
            Ok(keep_running) => keep_running,
            Err(err) => {
                log::error!("Frame failed: {err:#}");
                false
            }
        }
    }
}
