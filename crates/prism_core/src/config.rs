use std::{fs, path::Path};

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub look_at: Vec3,
    pub move_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(-10.0, 4.0, 0.0),
            look_at: Vec3::new(0.0, 3.0, 0.0),
            move_speed: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub frames: u32,
    pub warmup_frames: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            frames: 300,
            warmup_frames: 10,
        }
    }
}

/// Runtime settings, loaded from JSON. Every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub vsync: bool,
    pub scene: Option<String>,
    pub render_mode: String,
    pub active_lights: u32,
    pub light_radius: f32,
    pub light_intensity: f32,
    pub light_bounds_min: Vec3,
    pub light_bounds_max: Vec3,
    pub seed: u64,
    pub camera: CameraConfig,
    pub benchmark: BenchmarkConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            vsync: true,
            scene: None,
            render_mode: "naive".to_string(),
            active_lights: 20,
            light_radius: 2.0,
            light_intensity: 0.1,
            light_bounds_min: Vec3::new(-14.0, 0.0, -6.0),
            light_bounds_max: Vec3::new(14.0, 12.0, 6.0),
            seed: 0x5eed,
            camera: CameraConfig::default(),
            benchmark: BenchmarkConfig::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config = Self::from_json(&text, &display)?;
        log::info!("Loaded renderer config from {display}");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = RendererConfig::from_json("{}", "inline").unwrap();
        assert_eq!(config, RendererConfig::default());
    }

    #[test]
    fn partial_object_overrides_only_given_fields() {
        let config = RendererConfig::from_json(
            r#"{ "active_lights": 500, "render_mode": "forward+", "benchmark": { "frames": 120 } }"#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.active_lights, 500);
        assert_eq!(config.render_mode, "forward+");
        assert_eq!(config.benchmark.frames, 120);
        assert_eq!(config.benchmark.warmup_frames, 10);
        assert_eq!(config.window_width, 1280);
    }

    #[test]
    fn malformed_json_reports_origin() {
        let err = RendererConfig::from_json("{ nope", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
