//! Runtime controls: active light count, render mode, benchmark and cluster count.

mod egui_state;

pub use egui_state::EguiState;

use prism_renderer::{MAX_LIGHTS, RenderMode};

/// What the panel shows. The frame driver keeps it in sync with the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub active_lights: u32,
    pub mode: RenderMode,
    pub benchmark_running: bool,
    pub last_benchmark: Option<String>,
    pub last_occupancy: Option<String>,
    pub fps: f32,
}

impl PanelState {
    pub fn new(active_lights: u32, mode: RenderMode) -> Self {
        Self {
            active_lights,
            mode,
            benchmark_running: false,
            last_benchmark: None,
            last_occupancy: None,
            fps: 0.0,
        }
    }
}

/// A request raised by the panel, applied by the frame driver after the UI pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    SetActiveLights(u32),
    SetMode(RenderMode),
    RunBenchmark,
    CountClusters,
}

#[derive(Default)]
pub struct DebugPanel {
    pub visible: bool,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self { visible: true }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::debug!("Debug panel visible: {}", self.visible);
    }

    /// Draws the panel and returns the requests the user made this frame.
    pub fn show(&self, ctx: &egui::Context, state: &PanelState) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        if !self.visible {
            return actions;
        }

        egui::Window::new("Prism").resizable(false).show(ctx, |ui| {
            ui.label(format!("{:.1} fps", state.fps));
            ui.separator();

            let mut active_lights = state.active_lights;
            let slider = ui.add(egui::Slider::new(&mut active_lights, 1..=MAX_LIGHTS).text("Active lights"));
            if slider.changed() && active_lights != state.active_lights {
                actions.push(PanelAction::SetActiveLights(active_lights));
            }

            let mut mode = state.mode;
            egui::ComboBox::from_label("Render mode")
                .selected_text(mode.as_str())
                .show_ui(ui, |ui| {
                    for candidate in RenderMode::ALL {
                        ui.selectable_value(&mut mode, candidate, candidate.as_str());
                    }
                });
            if mode != state.mode {
                actions.push(PanelAction::SetMode(mode));
            }

            ui.separator();

            let benchmark = ui.add_enabled(!state.benchmark_running, egui::Button::new("Run Benchmark"));
            if benchmark.clicked() {
                actions.push(PanelAction::RunBenchmark);
            }
            if state.benchmark_running {
                ui.label("Benchmark running...");
            } else if let Some(result) = &state.last_benchmark {
                ui.label(result);
            }

            if ui
                .add_enabled(state.mode.is_clustered(), egui::Button::new("Count # of Clusters"))
                .clicked()
            {
                actions.push(PanelAction::CountClusters);
            }
            if let Some(occupancy) = &state.last_occupancy {
                ui.label(occupancy);
            }
        });

        actions
    }
}
