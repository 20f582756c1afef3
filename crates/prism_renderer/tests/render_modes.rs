mod common;

use common::gpu;
use glam::Vec3;
use prism_core::{Camera, Transform};
use prism_renderer::{
    CameraUniforms, ClusterSettings, GpuContext, LightSettings, RenderMode, Renderer, RendererSettings,
};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 144;

struct Offscreen {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl Offscreen {
    /// `width * 4` must be a multiple of the 256-byte copy row alignment.
    fn new(ctx: &GpuContext, width: u32, height: u32) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Color Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ctx.color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    fn read(&self, ctx: &GpuContext) -> Vec<u8> {
        let size = (self.width * self.height * 4) as u64;
        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Test Color Readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.width * 4),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = std::sync::mpsc::channel();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.wait_idle().unwrap();
        rx.recv().unwrap().unwrap();

        let pixels = staging.slice(..).get_mapped_range().to_vec();
        staging.unmap();
        pixels
    }
}

fn demo_renderer(ctx: &GpuContext, mode: RenderMode) -> Renderer {
    let camera = Camera::default();
    let transform = Transform::from_xyz(-10.0, 4.0, 0.0).looking_at(Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
    let settings = RendererSettings {
        lights: LightSettings {
            active_count: 300,
            intensity: 1.0,
            ..Default::default()
        },
        clusters: ClusterSettings {
            near: camera.near,
            far: camera.far,
            light_radius: 2.0,
        },
        mode,
    };

    Renderer::new(
        ctx,
        &prism_assets::demo_scene(),
        &settings,
        CameraUniforms::from_camera(&camera, &transform, WIDTH, HEIGHT),
        WIDTH,
        HEIGHT,
    )
    .unwrap()
}

fn render(ctx: &GpuContext, renderer: &mut Renderer, target: &Offscreen) -> Vec<u8> {
    renderer.render(ctx, &target.view, target.width, target.height).unwrap();
    target.read(ctx)
}

fn assert_images_match(a: &[u8], b: &[u8], what: &str) {
    assert_eq!(a.len(), b.len());
    let diffs: Vec<u8> = a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).collect();
    let mean = diffs.iter().map(|&d| d as f64).sum::<f64>() / diffs.len() as f64;
    let large = diffs.iter().filter(|&&d| d > 8).count();

    assert!(mean < 1.0, "{what}: mean channel difference {mean:.3}");
    assert!(
        large * 100 < diffs.len(),
        "{what}: {large} of {} channels differ by more than 8",
        diffs.len()
    );
}

#[test]
fn switching_modes_keeps_the_lighting() {
    let Some(ctx) = gpu("switching_modes_keeps_the_lighting") else {
        return;
    };

    let target = Offscreen::new(&ctx, WIDTH, HEIGHT);
    let mut renderer = demo_renderer(&ctx, RenderMode::ForwardPlus);
    renderer.on_frame(&ctx, 2.0);

    let forward = render(&ctx, &mut renderer, &target);

    renderer.set_mode(&ctx, RenderMode::ClusteredDeferred).unwrap();
    assert_eq!(renderer.mode(), RenderMode::ClusteredDeferred);
    let deferred = render(&ctx, &mut renderer, &target);

    renderer.set_mode(&ctx, RenderMode::Naive).unwrap();
    let naive = render(&ctx, &mut renderer, &target);

    // Clear color (0.02, 0.02, 0.025) in a unorm target.
    let background = [5u8, 5, 6];
    let covered = forward
        .chunks(4)
        .filter(|px| px[..3].iter().zip(&background).any(|(a, b)| a.abs_diff(*b) > 2))
        .count();
    assert!(covered > (WIDTH * HEIGHT / 10) as usize, "the scene should cover the frame");

    assert_images_match(&forward, &deferred, "forward+ vs clustered deferred");
    assert_images_match(&forward, &naive, "forward+ vs naive");
}

/// Renders twice at the initial size, then twice into a square target, checking
/// that the grid reallocates once and the program rebinds once. Returns the
/// square frame.
fn render_across_resize(ctx: &GpuContext, mode: RenderMode) -> Vec<u8> {
    let wide = Offscreen::new(ctx, WIDTH, HEIGHT);
    let square = Offscreen::new(ctx, 128, 128);
    let mut renderer = demo_renderer(ctx, mode);
    renderer.on_frame(ctx, 2.0);

    render(ctx, &mut renderer, &wide);
    render(ctx, &mut renderer, &wide);
    assert_eq!(renderer.program().scene_binding_rebuilds(), 1, "{mode}");
    assert_eq!(renderer.clusters().reallocation_count(), 0, "{mode}");

    // Different aspect ratio, different total: one reallocation, one rebind.
    render(ctx, &mut renderer, &square);
    let pixels = render(ctx, &mut renderer, &square);
    assert_eq!(renderer.clusters().reallocation_count(), 1, "{mode}");
    assert_eq!(renderer.program().scene_binding_rebuilds(), 2, "{mode}");

    let stats = renderer.read_occupancy_stats(ctx).unwrap();
    assert_eq!(stats.total_clusters, 16 * 16 * 24, "{mode}");
    pixels
}

#[test]
fn resize_rebuilds_scene_bindings_once() {
    let Some(ctx) = gpu("resize_rebuilds_scene_bindings_once") else {
        return;
    };

    let forward = render_across_resize(&ctx, RenderMode::ForwardPlus);
    let deferred = render_across_resize(&ctx, RenderMode::ClusteredDeferred);
    assert_images_match(&forward, &deferred, "forward+ vs clustered deferred after resize");
    ctx.wait_idle().unwrap();
}

#[test]
fn active_count_is_clamped() {
    let Some(ctx) = gpu("active_count_is_clamped") else {
        return;
    };

    let mut renderer = demo_renderer(&ctx, RenderMode::Naive);
    assert_eq!(renderer.set_active_lights(&ctx.queue, 0), 1);
    assert_eq!(renderer.set_active_lights(&ctx.queue, 10_000), prism_renderer::MAX_LIGHTS);
    assert_eq!(renderer.active_lights(), prism_renderer::MAX_LIGHTS);
}
