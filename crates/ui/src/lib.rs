use bevy::prelude::*;
use bevy_egui::EguiPlugin;

pub mod deformation_panel;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<deformation_panel::DeformationPanelVisible>()
            .add_systems(
                Update,
                (
                    deformation_panel::deformation_panel_keybind,
                    deformation_panel::deformation_panel_ui,
                )
                    .chain(),
            );
    }
}
