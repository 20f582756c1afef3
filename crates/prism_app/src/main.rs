mod app;
mod benchmark;
mod cli;

use clap::Parser;
use prism_renderer::RenderMode;
use prism_window::{WindowSettings, run_prism_app};

use crate::{app::PrismApp, cli::Cli};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,prism=info")).init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let mode: RenderMode = config.render_mode.parse()?;

    log::info!(
        "Starting prism: {} mode, {} lights, scene {}",
        mode,
        config.active_lights,
        config.scene.as_deref().unwrap_or("<procedural>")
    );

    let settings = WindowSettings {
        title: "Prism".to_string(),
        width: config.window_width,
        height: config.window_height,
    };

    run_prism_app(PrismApp::new(config, mode, cli.benchmark), settings)?;
    Ok(())
}
