pub mod camera;
pub mod config;
pub mod input;
pub mod time;
pub mod transform;

pub use camera::{Camera, FlyCameraController};
pub use config::{BenchmarkConfig, CameraConfig, ConfigError, RendererConfig};
pub use input::Input;
pub use time::Time;
pub use transform::Transform;
