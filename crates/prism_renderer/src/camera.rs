use glam::Mat4;
use prism_core::{Camera, Transform};
use wgpu::util::DeviceExt;

/// Mirrors `CameraUniforms` in common.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub near: f32,
    pub far: f32,
}

impl CameraUniforms {
    pub fn new(view: Mat4, proj: Mat4, width: u32, height: u32, near: f32, far: f32) -> Self {
        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            viewport: [width.max(1) as f32, height.max(1) as f32],
            near,
            far,
        }
    }

    pub fn from_camera(camera: &Camera, transform: &Transform, width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Self::new(
            camera.compute_view_matrix(transform),
            camera.compute_projection_matrix(aspect),
            width,
            height,
            camera.near,
            camera.far,
        )
    }
}

/// The camera's uniform buffer. Owned by the frame driver, read by the core.
pub struct CameraBuffer {
    pub buffer: wgpu::Buffer,
}

impl CameraBuffer {
    pub fn new(device: &wgpu::Device, initial: CameraUniforms) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self { buffer }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, uniforms: CameraUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: &Camera, transform: &Transform, width: u32, height: u32) {
        self.write(queue, CameraUniforms::from_camera(camera, transform, width, height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_matches_wgsl() {
        // 3 mat4x4f + vec2f + 2 f32, already a multiple of 16
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 208);
    }

    #[test]
    fn zero_sized_viewport_is_clamped() {
        let u = CameraUniforms::from_camera(&Camera::default(), &Transform::default(), 0, 0);
        assert_eq!(u.viewport, [1.0, 1.0]);
        assert!(u.proj[0][0].is_finite());
    }
}
