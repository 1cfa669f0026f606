//! Main Bevy application setup

use std::sync::Arc;

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use campus_core::Catalog;
use campus_scene::{CampusCatalog, CampusScenePlugin};

use crate::network::FeedPlugin;
use crate::ui::UiPlugin;

/// Campus layout baked into the bundle
const CAMPUS_CATALOG: &str = include_str!("../../../assets/campus.toml");

fn load_catalog() -> Catalog {
    match Catalog::from_toml_str(CAMPUS_CATALOG) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(error = %e, "Embedded campus catalog is invalid, starting with an empty campus");
            Catalog::default()
        }
    }
}

/// Run the Bevy application
pub fn run() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.62, 0.75, 0.88)))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Campus Twin".to_string(),
                        canvas: Some("#campus-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Picking must be registered before EguiPlugin so egui can detect it
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(CampusCatalog(Arc::new(load_catalog())))
        .add_plugins(CampusScenePlugin)
        .add_plugins(FeedPlugin)
        .add_plugins(UiPlugin)
        .run();
}
