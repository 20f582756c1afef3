use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

pub use winit;

/// What the runner needs from the application it drives.
pub trait WindowApp {
    /// Called once, when the first window exists.
    fn init(&mut self, window: Arc<Window>);

    /// Every window event before the runner's own handling.
    fn window_event(&mut self, _window: &Window, _event: &WindowEvent) {}

    /// Raw device motion (mouse look).
    fn device_event(&mut self, _event: &DeviceEvent) {}

    fn resize(&mut self, size: PhysicalSize<u32>);

    /// One frame. Returning `false` stops the event loop.
    fn redraw(&mut self) -> bool;
}

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Prism".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

// The state machine that holds the app while waiting for the OS
struct PrismRunner<A: WindowApp> {
    app: A,
    settings: WindowSettings,
    window: Option<Arc<Window>>,
}

impl<A: WindowApp> PrismRunner<A> {
    fn new(app: A, settings: WindowSettings) -> Self {
        Self {
            app,
            settings,
            window: None,
        }
    }
}

impl<A: WindowApp> ApplicationHandler for PrismRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(PhysicalSize::new(self.settings.width, self.settings.height));

        match event_loop.create_window(attributes) {
            Ok(window) => {
                let window = Arc::new(window);
                self.app.init(window.clone());
                self.window = Some(window);
            }
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.app.device_event(&event);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        self.app.window_event(&window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested; stopping");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.app.resize(size);
            }
            WindowEvent::RedrawRequested => {
                if !self.app.redraw() {
                    event_loop.exit();
                    return;
                }
                window.request_redraw();
            }
            _ => (),
        }
    }
}

pub fn run_prism_app<A: WindowApp>(app: A, settings: WindowSettings) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;

    // Poll keeps the loop spinning even without OS events, which is what a renderer wants.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = PrismRunner::new(app, settings);
    event_loop.run_app(&mut runner)
}
