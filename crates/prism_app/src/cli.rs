use std::path::PathBuf;

use clap::Parser;
use prism_core::RendererConfig;

/// Clustered lighting demo: naive, Forward+ and clustered deferred shading.
#[derive(Debug, Parser)]
#[command(name = "prism", version, about)]
pub struct Cli {
    /// JSON renderer config; every field is optional.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// glTF scene to load instead of the procedural demo scene.
    #[arg(long)]
    pub scene: Option<String>,

    /// Render mode: "naive", "forward+" or "clustered deferred".
    #[arg(long)]
    pub mode: Option<String>,

    /// Active light count (1..=5000).
    #[arg(long)]
    pub lights: Option<u32>,

    /// Run one benchmark after startup, log the result and exit.
    #[arg(long)]
    pub benchmark: bool,
}

impl Cli {
    /// Loads the config file (or defaults) and lays the flags over it.
    pub fn resolve_config(&self) -> Result<RendererConfig, prism_core::ConfigError> {
        let mut config = match &self.config {
            Some(path) => RendererConfig::load(path)?,
            None => RendererConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut RendererConfig) {
        if let Some(scene) = &self.scene {
            config.scene = Some(scene.clone());
        }
        if let Some(mode) = &self.mode {
            config.render_mode = mode.clone();
        }
        if let Some(lights) = self.lights {
            config.active_lights = lights;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::parse_from(["prism", "--mode", "forward+", "--lights", "500", "--benchmark"]);
        let mut config = RendererConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.render_mode, "forward+");
        assert_eq!(config.active_lights, 500);
        assert_eq!(config.scene, None);
        assert!(cli.benchmark);
    }

    #[test]
    fn no_flags_keep_defaults() {
        let cli = Cli::parse_from(["prism"]);
        assert_eq!(cli.resolve_config().unwrap(), RendererConfig::default());
    }
}
