mod common;

use common::{HEIGHT, WIDTH, cluster_settings, gpu, origin_camera};
use glam::{Mat4, Vec3};
use prism_renderer::{
    CameraBuffer, ClusterGrid, LightSet, LightSettings, MAX_LIGHTS, shaders::MAX_LIGHTS_PER_CLUSTER,
};

fn light_settings(active_count: u32) -> LightSettings {
    LightSettings {
        active_count,
        ..Default::default()
    }
}

/// World position at the centre of cluster (x, y, z) for the origin camera.
fn cluster_center(grid: &ClusterGrid, proj: Mat4, x: u32, y: u32, z: u32) -> Vec3 {
    let params = grid.params();
    let dims = grid.dims();
    let ndc_x = (x as f32 + 0.5) / dims.x as f32 * 2.0 - 1.0;
    let ndc_y = (y as f32 + 0.5) / dims.y as f32 * 2.0 - 1.0;
    let depth = ((z as f32 + 0.5 - params.slice_bias) / params.slice_scale).exp();
    Vec3::new(
        ndc_x * depth / proj.x_axis.x,
        ndc_y * depth / proj.y_axis.y,
        -depth,
    )
}

fn run_assignment(ctx: &prism_renderer::GpuContext, grid: &ClusterGrid, lights: &LightSet) {
    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Test Assignment Encoder"),
    });
    grid.assign(&mut encoder, lights.active_count());
    ctx.queue.submit(std::iter::once(encoder.finish()));
}

#[test]
fn single_light_fills_exactly_its_cluster() {
    let Some(ctx) = gpu("single_light_fills_exactly_its_cluster") else {
        return;
    };

    let uniforms = origin_camera(WIDTH, HEIGHT);
    let camera = CameraBuffer::new(&ctx.device, uniforms);
    let lights = LightSet::new(&ctx, &light_settings(1)).unwrap();
    let grid = ClusterGrid::new(&ctx, &lights, &camera, cluster_settings(0.01), WIDTH, HEIGHT).unwrap();

    let proj = Mat4::from_cols_array_2d(&uniforms.proj);
    let position = cluster_center(&grid, proj, 5, 3, 10);
    lights.write_light(&ctx.queue, 0, position, Vec3::ONE);

    run_assignment(&ctx, &grid, &lights);
    let counts = grid.read_counts(&ctx).unwrap();

    let expected = grid.dims().flat_index(5, 3, 10) as usize;
    assert_eq!(counts.len(), grid.total() as usize);
    assert_eq!(counts[expected], 1);
    for (c, &count) in counts.iter().enumerate() {
        if c != expected {
            assert_eq!(count, 0, "cluster {c} should be empty");
        }
    }

    let stats = grid.read_occupancy_stats(&ctx).unwrap();
    assert_eq!(stats.sum, 1);
    assert_eq!(stats.max, 1);
    assert_eq!(stats.empty, grid.total() - 1);
}

#[test]
fn crowded_cluster_saturates_at_capacity() {
    let Some(ctx) = gpu("crowded_cluster_saturates_at_capacity") else {
        return;
    };

    let crowd = MAX_LIGHTS_PER_CLUSTER + 5;
    let uniforms = origin_camera(WIDTH, HEIGHT);
    let camera = CameraBuffer::new(&ctx.device, uniforms);
    let lights = LightSet::new(&ctx, &light_settings(crowd)).unwrap();
    let grid = ClusterGrid::new(&ctx, &lights, &camera, cluster_settings(0.01), WIDTH, HEIGHT).unwrap();

    let proj = Mat4::from_cols_array_2d(&uniforms.proj);
    let position = cluster_center(&grid, proj, 8, 4, 12);
    for i in 0..crowd {
        lights.write_light(&ctx.queue, i, position, Vec3::ONE);
    }

    run_assignment(&ctx, &grid, &lights);
    let counts = grid.read_counts(&ctx).unwrap();

    let crowded = grid.dims().flat_index(8, 4, 12) as usize;
    assert_eq!(counts[crowded], MAX_LIGHTS_PER_CLUSTER);
    assert_eq!(counts.iter().map(|&c| c as u64).sum::<u64>(), MAX_LIGHTS_PER_CLUSTER as u64);

    let stats = grid.read_occupancy_stats(&ctx).unwrap();
    assert_eq!(stats.max, MAX_LIGHTS_PER_CLUSTER);
    assert_eq!(stats.overflowed, 0);
}

#[test]
fn counts_never_exceed_capacity_with_every_light_active() {
    let Some(ctx) = gpu("counts_never_exceed_capacity_with_every_light_active") else {
        return;
    };

    let camera = CameraBuffer::new(&ctx.device, origin_camera(WIDTH, HEIGHT));
    let lights = LightSet::new(
        &ctx,
        &LightSettings {
            active_count: MAX_LIGHTS,
            bounds_min: Vec3::new(-3.0, -2.0, -12.0),
            bounds_max: Vec3::new(3.0, 2.0, -2.0),
            ..Default::default()
        },
    )
    .unwrap();
    let grid = ClusterGrid::new(&ctx, &lights, &camera, cluster_settings(2.0), WIDTH, HEIGHT).unwrap();

    for time in [0.0, 3.5, 12.0] {
        lights.advance(&ctx, time);
        run_assignment(&ctx, &grid, &lights);
        let counts = grid.read_counts(&ctx).unwrap();
        assert!(counts.iter().all(|&c| c <= MAX_LIGHTS_PER_CLUSTER));
        assert_eq!(*counts.iter().max().unwrap(), MAX_LIGHTS_PER_CLUSTER, "dense volume should saturate somewhere");
    }
}

#[test]
fn rebuild_is_idempotent_and_reallocates_once_per_total_change() {
    let Some(ctx) = gpu("rebuild_is_idempotent_and_reallocates_once_per_total_change") else {
        return;
    };

    let camera = CameraBuffer::new(&ctx.device, origin_camera(WIDTH, HEIGHT));
    let lights = LightSet::new(&ctx, &light_settings(20)).unwrap();
    let mut grid = ClusterGrid::new(&ctx, &lights, &camera, cluster_settings(2.0), WIDTH, HEIGHT).unwrap();
    let generation = grid.generation();

    assert!(!grid.rebuild_if_needed(&ctx, WIDTH, HEIGHT).unwrap());
    assert!(!grid.rebuild_if_needed(&ctx, WIDTH, HEIGHT).unwrap());
    assert_eq!(grid.generation(), generation);

    // Same aspect ratio, same total: only the viewport in the params moves.
    assert!(!grid.rebuild_if_needed(&ctx, 1920, 1080).unwrap());
    assert_eq!(grid.params().viewport, [1920.0, 1080.0]);
    assert_eq!(grid.reallocation_count(), 0);

    assert!(grid.rebuild_if_needed(&ctx, 800, 800).unwrap());
    assert!(!grid.rebuild_if_needed(&ctx, 800, 800).unwrap());
    assert_eq!(grid.total(), 16 * 16 * 24);
    assert_eq!(grid.generation(), generation + 1);
    assert_eq!(grid.reallocation_count(), 1);

    // Minimised windows are ignored.
    assert!(!grid.rebuild_if_needed(&ctx, 0, 0).unwrap());
    assert_eq!(grid.total(), 16 * 16 * 24);
}

#[test]
fn gpu_counts_match_host_reference() {
    let Some(ctx) = gpu("gpu_counts_match_host_reference") else {
        return;
    };

    let uniforms = origin_camera(WIDTH, HEIGHT);
    let camera = CameraBuffer::new(&ctx.device, uniforms);
    let positions = [
        Vec3::new(0.0, 0.0, -5.0),
        Vec3::new(1.0, 0.5, -7.5),
        Vec3::new(-2.0, -1.0, -15.0),
        Vec3::new(4.0, 2.0, -30.0),
        Vec3::new(0.0, 0.0, 3.0),
    ];
    let lights = LightSet::new(&ctx, &light_settings(positions.len() as u32)).unwrap();
    let grid = ClusterGrid::new(&ctx, &lights, &camera, cluster_settings(1.5), WIDTH, HEIGHT).unwrap();
    for (i, &p) in positions.iter().enumerate() {
        lights.write_light(&ctx.queue, i as u32, p, Vec3::ONE);
    }

    run_assignment(&ctx, &grid, &lights);
    let counts = grid.read_counts(&ctx).unwrap();

    let (expected, _) = prism_renderer::cluster::reference::assign_lights(
        &grid.params(),
        Mat4::from_cols_array_2d(&uniforms.view),
        Mat4::from_cols_array_2d(&uniforms.proj),
        &positions,
    );
    let mismatched = counts.iter().zip(&expected).filter(|(a, b)| a != b).count();
    // Slice boundaries can land on either side of a rounding difference.
    assert!(mismatched <= 8, "{mismatched} clusters differ from the host reference");
}
