use std::collections::HashSet;

pub use winit::keyboard::KeyCode;

/// Keyboard and mouse state sampled by the frame driver.
#[derive(Default)]
pub struct Input {
    pressed: HashSet<KeyCode>,
    look_held: bool,
    mouse_delta: (f32, f32),
}

impl Input {
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    pub fn set_look_held(&mut self, held: bool) {
        self.look_held = held;
        if !held {
            self.mouse_delta = (0.0, 0.0);
        }
    }

    pub fn look_held(&self) -> bool {
        self.look_held
    }

    pub fn accumulate_mouse(&mut self, dx: f32, dy: f32) {
        if self.look_held {
            self.mouse_delta.0 += dx;
            self.mouse_delta.1 += dy;
        }
    }

    /// Returns and clears the mouse motion gathered since the last call.
    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }
}
