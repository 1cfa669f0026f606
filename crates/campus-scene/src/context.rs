//! Shared scene state
//!
//! One resource owns selection, camera, live sensor table and overlay mode.
//! Systems borrow it for the duration of a frame; nothing else holds a copy.

use std::ops::Deref;
use std::sync::Arc;

use bevy::prelude::*;
use campus_core::{BuildingDescriptor, Catalog, OverlayMode, SelectionChange, SelectionState, SensorTable};

use crate::camera::{CameraController, CameraTuning};

/// Read-only building catalog, loaded once at startup
#[derive(Resource, Clone)]
pub struct CampusCatalog(pub Arc<Catalog>);

impl Deref for CampusCatalog {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.0
    }
}

#[derive(Resource, Default)]
pub struct SceneContext {
    pub selection: SelectionState,
    pub camera: CameraController,
    pub sensors: SensorTable,
    pub overlay: OverlayMode,
}

/// Emitted whenever the selected building changes
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub building_id: Option<String>,
}

impl SceneContext {
    pub fn new(tuning: CameraTuning) -> Self {
        Self {
            camera: CameraController::new(tuning),
            ..Default::default()
        }
    }

    /// Toggle-select a building and steer the camera toward it
    pub fn select(&mut self, building_id: &str, catalog: &Catalog) -> SelectionChange {
        let change = self.selection.select(building_id);
        self.retarget_camera(catalog);
        change
    }

    /// Drop the selection and return to the overview
    pub fn clear_selection(&mut self) -> SelectionChange {
        let change = self.selection.clear();
        self.camera.retarget(None);
        change
    }

    /// Descriptor of the selected building, if the catalog knows it
    pub fn selected_building<'a>(&self, catalog: &'a Catalog) -> Option<&'a BuildingDescriptor> {
        catalog.get(self.selection.selected()?)
    }

    fn retarget_camera(&mut self, catalog: &Catalog) {
        let position = self
            .selected_building(catalog)
            .map(|building| Vec3::from_array(building.position));
        self.camera.retarget(position);
    }
}
