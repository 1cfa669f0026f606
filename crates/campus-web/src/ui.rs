//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use campus_scene::ui::{render_building_details, render_connection_badge, render_overlay_toggles, DetailAction};
use campus_scene::{CampusCatalog, EnterBuildingRequest, SceneContext, SelectionChanged, UiLayout};

use crate::network::{FeedState, RefreshSnapshot};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (update_ui_layout, open_panel_on_selection))
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();
        if (ui_layout.screen_width - width).abs() > 1.0 || (ui_layout.screen_height - height).abs() > 1.0 {
            ui_layout.update_from_window(width, height);
        }
    }
}

/// A new selection reopens the detail panel if the user had closed it
fn open_panel_on_selection(mut changes: MessageReader<SelectionChanged>, mut ui_layout: ResMut<UiLayout>) {
    for change in changes.read() {
        if change.building_id.is_some() {
            ui_layout.show_detail_panel = true;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn ui_system(
    mut contexts: EguiContexts,
    mut context: ResMut<SceneContext>,
    catalog: Res<CampusCatalog>,
    feed: Res<FeedState>,
    mut ui_layout: ResMut<UiLayout>,
    mut refresh: MessageWriter<RefreshSnapshot>,
    mut enter_requests: MessageWriter<EnterBuildingRequest>,
    mut selection_changed: MessageWriter<SelectionChanged>,
) {
    let ui_scale = ui_layout.ui_scale();
    let Ok(ctx) = contexts.ctx_mut() else { return };

    if ui_layout.is_mobile {
        let mut style = (*ctx.style()).clone();
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);
    }

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if !ui_layout.is_mobile {
                ui.heading(egui::RichText::new("Campus Twin").size(16.0 * ui_scale));
                ui.separator();
            }
            render_overlay_toggles(ui, &mut context.overlay);
            ui.separator();
            if ui.button("⟳ Refresh").on_hover_text("Fetch a fresh sensor snapshot").clicked() {
                refresh.write(RefreshSnapshot);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                render_connection_badge(ui, feed.status());
                ui.label(
                    egui::RichText::new(format!("{} sensors", context.sensors.len()))
                        .small()
                        .color(egui::Color32::GRAY),
                );
            });
        });
    });

    let Some(building) = context.selected_building(&catalog) else { return };
    if !ui_layout.show_detail_panel {
        return;
    }

    let mut action = DetailAction::None;
    egui::SidePanel::right("building_details")
        .default_width(ui_layout.detail_panel_width())
        .resizable(!ui_layout.is_mobile)
        .show(ctx, |ui| {
            action = render_building_details(ui, building, &context.sensors, &ui_layout);
        });

    match action {
        DetailAction::Enter => {
            enter_requests.write(EnterBuildingRequest {
                building_id: building.id.clone(),
            });
        }
        DetailAction::Close => {
            context.clear_selection();
            ui_layout.show_detail_panel = false;
            selection_changed.write(SelectionChanged { building_id: None });
        }
        DetailAction::None => {}
    }
}
