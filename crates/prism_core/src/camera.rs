use glam::{Mat4, Quat, Vec3};

use crate::{
    input::{Input, KeyCode},
    transform::Transform,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Perspective projection with a [0, 1] depth range.
    pub fn compute_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    /// World -> view, the inverse of the camera's transform.
    pub fn compute_view_matrix(&self, transform: &Transform) -> Mat4 {
        let eye = transform.translation;
        Mat4::look_at_rh(eye, eye + transform.forward(), transform.up())
    }
}

/// WASD + QE fly camera, mouse look while the right button is held.
#[derive(Clone, Debug)]
pub struct FlyCameraController {
    pub move_speed: f32,
    pub sensitivity: f32,
}

impl Default for FlyCameraController {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            sensitivity: 0.002,
        }
    }
}

impl FlyCameraController {
    pub fn new(move_speed: f32) -> Self {
        Self {
            move_speed,
            ..Default::default()
        }
    }

    pub fn update(&self, transform: &mut Transform, input: &mut Input, delta_seconds: f32) {
        let (dx, dy) = input.take_mouse_delta();
        if dx != 0.0 || dy != 0.0 {
            let yaw_q = Quat::from_rotation_y(-dx * self.sensitivity);
            let pitch_q = Quat::from_rotation_x(-dy * self.sensitivity);
            transform.rotation = (yaw_q * transform.rotation * pitch_q).normalize();
        }

        let speed = self.move_speed * delta_seconds;
        let forward = transform.forward();
        let right = transform.right();

        let mut motion = Vec3::ZERO;
        if input.is_pressed(KeyCode::KeyW) {
            motion += forward;
        }
        if input.is_pressed(KeyCode::KeyS) {
            motion -= forward;
        }
        if input.is_pressed(KeyCode::KeyD) {
            motion += right;
        }
        if input.is_pressed(KeyCode::KeyA) {
            motion -= right;
        }
        if input.is_pressed(KeyCode::KeyE) {
            motion += Vec3::Y;
        }
        if input.is_pressed(KeyCode::KeyQ) {
            motion -= Vec3::Y;
        }

        transform.translation += motion * speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let camera = Camera::default();
        let transform = Transform::from_xyz(0.0, 2.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y);
        let view = camera.compute_view_matrix(&transform);
        let eye_in_view = view.transform_point3(transform.translation);
        assert_relative_eq!(eye_in_view.length(), 0.0, epsilon = 1e-5);

        // The look-at target sits straight ahead on -Z.
        let target = view.transform_point3(Vec3::ZERO);
        assert_relative_eq!(target.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target.y, 0.0, epsilon = 1e-5);
        assert!(target.z < 0.0);
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth() {
        let camera = Camera {
            near: 0.5,
            far: 50.0,
            ..Default::default()
        };
        let proj = camera.compute_projection_matrix(1.0);
        let near = proj.project_point3(Vec3::new(0.0, 0.0, -0.5));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, -50.0));
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn controller_moves_along_forward() {
        let controller = FlyCameraController::new(2.0);
        let mut transform = Transform::default();
        let mut input = Input::default();
        input.press(KeyCode::KeyW);
        controller.update(&mut transform, &mut input, 0.5);
        assert_relative_eq!(transform.translation.z, -1.0, epsilon = 1e-6);
    }
}
