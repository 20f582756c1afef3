#![allow(dead_code)]

use glam::{Mat4, Vec3};
use prism_renderer::{CameraUniforms, ClusterSettings, GpuContext};

pub const WIDTH: u32 = 1280;
pub const HEIGHT: u32 = 720;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

/// A headless device, or `None` (with a note) when the machine has no adapter.
pub fn gpu(test: &str) -> Option<GpuContext> {
    match GpuContext::headless(wgpu::TextureFormat::Rgba8Unorm) {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            println!("Skipping {test}: could not create a GPU device ({err}).");
            None
        }
    }
}

/// Camera at the origin looking down -Z, so view space equals world space.
pub fn origin_camera(width: u32, height: u32) -> CameraUniforms {
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    let proj = Mat4::perspective_rh(45f32.to_radians(), width as f32 / height as f32, NEAR, FAR);
    CameraUniforms::new(view, proj, width, height, NEAR, FAR)
}

pub fn cluster_settings(light_radius: f32) -> ClusterSettings {
    ClusterSettings {
        near: NEAR,
        far: FAR,
        light_radius,
    }
}
