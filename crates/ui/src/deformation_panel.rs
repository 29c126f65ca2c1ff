//! Deformation field controls UI panel.
//!
//! Provides an egui window with:
//! - Enable toggle and a reset button
//! - Live sliders for the filter, accumulation and throttle tunables
//! - Capture mode and kernel execution selectors
//! - Overlay visibility and opacity
//! - Running counters from `DeformationStats`
//! - Keybind (F3) to toggle the panel

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use deformation::kernel::KernelExecution;
use deformation::orchestrator::SkipReason;
use deformation::{
    CaptureMode, DeformationConfig, DeformationField, DeformationStats, FieldPhase,
    ResetDeformation,
};
use rendering::DeformationOverlay;

// =============================================================================
// Resources
// =============================================================================

/// Whether the deformation panel is visible.
#[derive(Resource)]
pub struct DeformationPanelVisible(pub bool);

impl Default for DeformationPanelVisible {
    fn default() -> Self {
        Self(true)
    }
}

// =============================================================================
// Systems
// =============================================================================

/// F3 toggles the panel.
pub fn deformation_panel_keybind(
    keys: Res<ButtonInput<KeyCode>>,
    mut visible: ResMut<DeformationPanelVisible>,
) {
    if keys.just_pressed(KeyCode::F3) {
        visible.0 = !visible.0;
    }
}

/// Renders the deformation controls window.
#[allow(clippy::too_many_arguments)]
pub fn deformation_panel_ui(
    mut contexts: EguiContexts,
    mut visible: ResMut<DeformationPanelVisible>,
    mut config: ResMut<DeformationConfig>,
    mut overlay: ResMut<DeformationOverlay>,
    field: Res<DeformationField>,
    stats: Res<DeformationStats>,
    mut resets: EventWriter<ResetDeformation>,
) {
    if !visible.0 {
        return;
    }

    // Edit a copy so untouched frames don't trip change detection.
    let mut edited = config.clone();
    let mut overlay_edit = overlay.clone();
    let mut reset_clicked = false;

    let mut open = true;
    egui::Window::new("Deformation")
        .open(&mut open)
        .resizable(false)
        .default_width(280.0)
        .show(contexts.ctx_mut(), |ui| {
            ui.spacing_mut().item_spacing.y = 6.0;

            ui.heading(format!(
                "{} (gen {})",
                phase_label(field.phase()),
                field.generation()
            ));
            if let Some(anchor) = field.anchor() {
                ui.label(format!(
                    "Origin texel: {}, {}",
                    anchor.origin_texel.x, anchor.origin_texel.y
                ));
            }

            ui.horizontal(|ui| {
                ui.checkbox(&mut edited.enabled, "Enabled");
                if ui.button("Reset field").clicked() {
                    reset_clicked = true;
                }
            });

            ui.separator();

            // --- Kernel tunables ---
            ui.label("Accumulation:");
            ui.add(
                egui::Slider::new(&mut edited.accumulation_rate, 0.0..=500.0)
                    .text("rate /s"),
            );
            ui.add(egui::Slider::new(&mut edited.accumulation_cap, 0.1..=500.0).text("cap"));
            ui.add(egui::Slider::new(&mut edited.decay_rate, 0.0..=100.0).text("decay /s"));
            ui.add(
                egui::Slider::new(&mut edited.non_uniform_exponent, 0.0..=8.0)
                    .text("exponent"),
            );
            ui.add(
                egui::Slider::new(&mut edited.contact_threshold, 0.0..=50.0)
                    .text("contact threshold"),
            );

            ui.label("Temporal filter:");
            let mut instant = edited.temporal_filter_factor.is_infinite();
            if ui.checkbox(&mut instant, "Instant").changed() {
                edited.temporal_filter_factor = if instant { f32::INFINITY } else { 2.0 };
            }
            if !instant {
                ui.add(
                    egui::Slider::new(&mut edited.temporal_filter_factor, 0.0..=30.0)
                        .text("factor /s"),
                );
            }

            ui.separator();

            // --- Scheduling ---
            ui.label("Scheduling:");
            ui.add(
                egui::Slider::new(&mut edited.min_update_interval, 0.0..=1.0)
                    .text("min interval s"),
            );
            ui.add(
                egui::Slider::new(&mut edited.capture_timeout_secs, 0.05..=5.0)
                    .text("capture timeout s"),
            );
            ui.horizontal(|ui| {
                ui.selectable_value(&mut edited.capture_mode, CaptureMode::Async, "Async");
                ui.selectable_value(&mut edited.capture_mode, CaptureMode::Inline, "Inline");
                ui.separator();
                ui.selectable_value(
                    &mut edited.kernel_execution,
                    KernelExecution::Parallel,
                    "Parallel",
                );
                ui.selectable_value(
                    &mut edited.kernel_execution,
                    KernelExecution::Serial,
                    "Serial",
                );
            });
            ui.checkbox(&mut edited.compute_normals, "Compute normals");

            ui.separator();

            // --- Overlay ---
            ui.checkbox(&mut overlay_edit.visible, "Show overlay");
            ui.add(egui::Slider::new(&mut overlay_edit.opacity, 0.0..=1.0).text("opacity"));

            ui.separator();

            // --- Stats ---
            egui::Grid::new("deformation_stats")
                .num_columns(2)
                .show(ui, |ui| {
                    ui.label("Updates");
                    ui.label(stats.updates_applied.to_string());
                    ui.end_row();
                    ui.label("Skipped frames");
                    ui.label(stats.frames_skipped.to_string());
                    ui.end_row();
                    ui.label("Failed / timed out");
                    ui.label(format!(
                        "{} / {}",
                        stats.failed_captures, stats.timed_out_captures
                    ));
                    ui.end_row();
                    ui.label("Resets / restarts");
                    ui.label(format!("{} / {}", stats.resets, stats.restarts));
                    ui.end_row();
                    ui.label("Last skip");
                    ui.label(skip_label(stats.last_skip));
                    ui.end_row();
                    ui.label("Max depth");
                    ui.label(format!("{:.2}", stats.max_depth));
                    ui.end_row();
                    ui.label("Deformed texels");
                    ui.label(stats.deformed_texels.to_string());
                    ui.end_row();
                });
        });

    if !open {
        visible.0 = false;
    }
    if reset_clicked {
        resets.send(ResetDeformation);
    }
    if edited != *config {
        match edited.validate() {
            Ok(()) => *config = edited,
            Err(e) => warn!("Rejected deformation config edit: {e}"),
        }
    }
    if overlay_edit.visible != overlay.visible || overlay_edit.opacity != overlay.opacity {
        *overlay = overlay_edit;
    }
}

/// Short label for the field's lifecycle phase.
fn phase_label(phase: FieldPhase) -> &'static str {
    match phase {
        FieldPhase::Uninitialized => "Uninitialized",
        FieldPhase::AwaitingFirstCapture => "Waiting for capture",
        FieldPhase::Steady => "Running",
        FieldPhase::ResetRequested => "Resetting",
        FieldPhase::Cleared => "Cleared",
    }
}

fn skip_label(reason: Option<SkipReason>) -> &'static str {
    match reason {
        None => "-",
        Some(SkipReason::Disabled) => "disabled",
        Some(SkipReason::Inactive) => "no anchor",
        Some(SkipReason::Throttled) => "throttled",
        Some(SkipReason::CapturePending) => "capture pending",
        Some(SkipReason::CaptureFailed) => "capture failed",
        Some(SkipReason::CaptureTimedOut) => "capture timed out",
        Some(SkipReason::InvalidConfig) => "invalid config",
    }
}
