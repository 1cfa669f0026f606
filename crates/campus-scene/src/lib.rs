//! Campus Scene - Shared 3D campus rendering and interaction
//!
//! This crate draws the building catalog as procedural meshes, drives the
//! camera toward the selected building, and keeps sensor overlays in step
//! with the live sensor table held in [`SceneContext`].
//!
//! The host app inserts a [`CampusCatalog`] before adding
//! [`CampusScenePlugin`], and feeds the table from systems placed before
//! [`SceneSet::Render`].

pub mod buildings;
pub mod camera;
pub mod context;
pub mod interaction;
pub mod overlay;
pub mod scene;
pub mod ui;

use bevy::prelude::*;
use chrono::Utc;
use tracing::info;

pub use camera::{CameraController, CameraState, CameraTuning, MainCamera};
pub use context::{CampusCatalog, SceneContext, SelectionChanged};
pub use interaction::BuildingClicked;
pub use overlay::OverlayTuning;
pub use ui::{EnterBuildingRequest, UiLayout};

/// Frame phases of the scene, run in this order
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneSet {
    /// Pointer and keyboard handling
    Input,
    /// Camera and hover/selection feedback
    Animate,
    /// Overlay rebuild and label projection
    Render,
}

/// Plugin that sets up the shared 3D campus scene
pub struct CampusScenePlugin;

impl Plugin for CampusScenePlugin {
    fn build(&self, app: &mut App) {
        let tuning = app
            .world()
            .get_resource::<CameraTuning>()
            .copied()
            .unwrap_or_default();

        app.insert_resource(SceneContext::new(tuning))
            .init_resource::<UiLayout>()
            .add_message::<SelectionChanged>()
            .add_message::<EnterBuildingRequest>()
            .configure_sets(Update, (SceneSet::Input, SceneSet::Animate, SceneSet::Render).chain())
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(buildings::BuildingsPlugin)
            .add_plugins(interaction::InteractionPlugin)
            .add_plugins(overlay::OverlayPlugin)
            .add_systems(PreStartup, seed_sensor_table)
            .add_systems(Update, log_enter_requests);
    }
}

/// Fill the live table from catalog seed readings so markers show before
/// the feed delivers anything
fn seed_sensor_table(catalog: Res<CampusCatalog>, mut context: ResMut<SceneContext>) {
    context.sensors.seed(catalog.seed_records(Utc::now()));
    info!(sensors = context.sensors.len(), "Seeded sensor table from catalog");
}

fn log_enter_requests(mut requests: MessageReader<EnterBuildingRequest>) {
    for request in requests.read() {
        info!(building = %request.building_id, "Enter building requested");
    }
}
