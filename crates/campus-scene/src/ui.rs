//! Shared egui components: building detail panel, overlay toggles and the
//! connection badge

use std::collections::BTreeMap;

use bevy::prelude::*;
use bevy_egui::egui;
use campus_core::{BuildingDescriptor, BuildingSummary, ConnectionStatus, OverlayMode, RoomDescriptor, SensorStatus, SensorTable};

/// Responsive layout info, refreshed from the window each frame
#[derive(Resource, Debug, Clone)]
pub struct UiLayout {
    pub is_mobile: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    pub show_detail_panel: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            is_mobile: false,
            screen_width: 1920.0,
            screen_height: 1080.0,
            show_detail_panel: true,
        }
    }
}

impl UiLayout {
    pub fn update_from_window(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
        // Narrow or portrait screens get the mobile layout
        self.is_mobile = width < 800.0 || (height > width * 1.2);
    }

    pub fn detail_panel_width(&self) -> f32 {
        if self.is_mobile {
            self.screen_width * 0.85
        } else {
            340.0
        }
    }

    pub fn ui_scale(&self) -> f32 {
        if self.is_mobile { 1.2 } else { 1.0 }
    }
}

/// Asks the host application to open the interior view of a building.
/// The scene only logs it.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct EnterBuildingRequest {
    pub building_id: String,
}

/// What the user clicked in the detail panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    None,
    Close,
    Enter,
}

pub fn status_color32(status: SensorStatus) -> egui::Color32 {
    let [r, g, b] = status.color();
    egui::Color32::from_rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// Rooms keyed by floor, floors ascending, rooms in catalog order
pub fn rooms_by_floor(building: &BuildingDescriptor) -> BTreeMap<u32, Vec<&RoomDescriptor>> {
    let mut floors: BTreeMap<u32, Vec<&RoomDescriptor>> = BTreeMap::new();
    for room in &building.rooms {
        floors.entry(room.floor).or_default().push(room);
    }
    floors
}

/// Render the detail panel body for the selected building
pub fn render_building_details(
    ui: &mut egui::Ui,
    building: &BuildingDescriptor,
    sensors: &SensorTable,
    ui_layout: &UiLayout,
) -> DetailAction {
    let ui_scale = ui_layout.ui_scale();
    let mut action = DetailAction::None;

    ui.horizontal(|ui| {
        ui.heading(egui::RichText::new(&building.name).size(18.0 * ui_scale));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("✕").on_hover_text("Close").clicked() {
                action = DetailAction::Close;
            }
        });
    });
    if let Some(secondary) = &building.name_secondary {
        ui.label(egui::RichText::new(secondary).color(egui::Color32::GRAY));
    }
    ui.label(format!(
        "{} · {} floor{}",
        building.shape,
        building.dimensions.floors,
        if building.dimensions.floors == 1 { "" } else { "s" }
    ));

    ui.separator();
    render_summary(ui, &BuildingSummary::of(building));
    ui.separator();

    egui::ScrollArea::vertical().max_height(ui_layout.screen_height * 0.55).show(ui, |ui| {
        for (floor, rooms) in rooms_by_floor(building) {
            egui::CollapsingHeader::new(format!("Floor {}", floor))
                .default_open(true)
                .show(ui, |ui| {
                    for room in rooms {
                        render_room(ui, building, room, sensors);
                    }
                });
        }
        if building.rooms.is_empty() {
            ui.label(egui::RichText::new("No rooms listed").italics().color(egui::Color32::GRAY));
        }
    });

    ui.separator();
    if ui
        .add_sized([ui.available_width(), 28.0 * ui_scale], egui::Button::new("Enter building"))
        .clicked()
    {
        action = DetailAction::Enter;
    }

    action
}

fn render_summary(ui: &mut egui::Ui, summary: &BuildingSummary) {
    ui.horizontal(|ui| {
        ui.label(format!("{} rooms", summary.rooms));
        ui.label(format!("{} sensors", summary.total_sensors));
    });
    ui.horizontal(|ui| {
        for (status, count) in [
            (SensorStatus::Normal, summary.online),
            (SensorStatus::Warning, summary.warning),
            (SensorStatus::Critical, summary.critical),
        ] {
            ui.label(egui::RichText::new(format!("● {} {}", count, status.catalog_label())).color(status_color32(status)));
        }
    });
}

/// Room heading plus one row per sensor, live values preferred over seed data
fn render_room(ui: &mut egui::Ui, building: &BuildingDescriptor, room: &RoomDescriptor, sensors: &SensorTable) {
    ui.horizontal(|ui| {
        ui.strong(&room.name);
        if !room.room_type.is_empty() {
            ui.label(egui::RichText::new(&room.room_type).small().color(egui::Color32::GRAY));
        }
        if let Some(capacity) = room.capacity {
            ui.label(egui::RichText::new(format!("cap {}", capacity)).small());
        }
    });

    for reading in &room.sensors {
        let live = sensors.get(&building.seed_sensor_id(room, reading));
        let (value, unit, status) = match live {
            Some(record) => (record.value, record.unit.as_str(), record.status),
            None => (reading.value, reading.unit.as_str(), reading.status),
        };
        ui.horizontal(|ui| {
            ui.add_space(12.0);
            ui.label(egui::RichText::new("●").color(status_color32(status)));
            ui.label(&reading.sensor_type);
            ui.label(format!("{:.1} {}", value, unit));
        });
    }
}

/// Heat / flow toggle buttons. Returns true if the mode changed.
pub fn render_overlay_toggles(ui: &mut egui::Ui, mode: &mut OverlayMode) -> bool {
    let before = *mode;
    if ui.selectable_label(mode.heat_active(), "🌡 Heat").clicked() {
        mode.toggle_heat();
    }
    if ui.selectable_label(mode.flow_active(), "〰 Flow").clicked() {
        mode.toggle_flow();
    }
    *mode != before
}

pub fn render_connection_badge(ui: &mut egui::Ui, status: ConnectionStatus) {
    let (text, color) = match status {
        ConnectionStatus::Connected => ("● Live", egui::Color32::from_rgb(80, 200, 120)),
        ConnectionStatus::Disconnected => ("● Offline", egui::Color32::from_rgb(220, 80, 80)),
    };
    ui.label(egui::RichText::new(text).color(color));
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::Catalog;

    #[test]
    fn test_rooms_grouped_by_floor() {
        let catalog = Catalog::from_toml_str(
            r#"
[[building]]
id = "b"
name = "B"
shape = "rectangle"
position = [0.0, 0.0, 0.0]
dimensions = { width = 10.0, depth = 8.0, height = 7.0, floors = 2 }
palette = { wall = [1.0, 1.0, 1.0], roof = [0.2, 0.2, 0.2] }

[[building.room]]
id = "upper"
name = "Upper"
floor = 2

[[building.room]]
id = "hall"
name = "Hall"

[[building.room]]
id = "kitchen"
name = "Kitchen"
floor = 1
"#,
        )
        .unwrap();

        let floors = rooms_by_floor(catalog.get("b").unwrap());
        let order: Vec<(u32, Vec<&str>)> = floors
            .iter()
            .map(|(floor, rooms)| (*floor, rooms.iter().map(|r| r.id.as_str()).collect()))
            .collect();
        assert_eq!(order, vec![(1, vec!["hall", "kitchen"]), (2, vec!["upper"])]);
    }

    #[test]
    fn test_layout_switches_to_mobile() {
        let mut layout = UiLayout::default();
        layout.update_from_window(390.0, 844.0);
        assert!(layout.is_mobile);
        assert!((layout.detail_panel_width() - 390.0 * 0.85).abs() < 1e-3);
        layout.update_from_window(1600.0, 900.0);
        assert!(!layout.is_mobile);
        assert_eq!(layout.detail_panel_width(), 340.0);
    }
}
