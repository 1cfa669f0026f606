//! Overlay mode and overlay sample derivation
//!
//! Heat and flow are mutually exclusive views. Rather than two flags that
//! must be kept in sync, the active view is a single enum.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::sensor::SensorRecord;
use crate::table::SensorTable;

/// Which overlay is drawn on top of the base scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    #[default]
    Off,
    Heat,
    Flow,
}

impl OverlayMode {
    /// Heat on (deactivating flow), or off if heat was already on
    pub fn toggle_heat(&mut self) {
        *self = if *self == OverlayMode::Heat { OverlayMode::Off } else { OverlayMode::Heat };
    }

    /// Flow on (deactivating heat), or off if flow was already on
    pub fn toggle_flow(&mut self) {
        *self = if *self == OverlayMode::Flow { OverlayMode::Off } else { OverlayMode::Flow };
    }

    pub fn set(&mut self, mode: OverlayMode) {
        *self = mode;
    }

    pub fn heat_active(&self) -> bool {
        *self == OverlayMode::Heat
    }

    pub fn flow_active(&self) -> bool {
        *self == OverlayMode::Flow
    }
}

fn default_conduit_color() -> [f32; 3] {
    [0.25, 0.6, 1.0]
}

fn default_conduit_radius() -> f32 {
    0.35
}

/// A conduit drawn between two world-space endpoints in flow mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConduit {
    pub id: String,
    pub from: [f32; 3],
    pub to: [f32; 3],
    #[serde(default = "default_conduit_color")]
    pub color: [f32; 3],
    #[serde(default = "default_conduit_radius")]
    pub radius: f32,
}

/// One translucent disc in heat mode
#[derive(Debug, Clone, PartialEq)]
pub struct HeatSample {
    pub sensor_id: String,
    pub position: [f32; 3],
    /// Normalized 0..1
    pub intensity: f32,
    pub color: [f32; 3],
}

/// Temperature band mapped onto heat intensity 0..1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatBand {
    pub min: f64,
    pub max: f64,
}

impl Default for HeatBand {
    fn default() -> Self {
        Self { min: 16.0, max: 28.0 }
    }
}

impl HeatBand {
    pub fn intensity(&self, value: f64) -> f32 {
        let span = (self.max - self.min).max(f64::EPSILON);
        ((value - self.min) / span).clamp(0.0, 1.0) as f32
    }
}

const COOL: [f32; 3] = [0.15, 0.35, 1.0];
const HOT: [f32; 3] = [1.0, 0.2, 0.05];

/// Blue-to-red ramp for a normalized intensity
pub fn heat_color(intensity: f32) -> [f32; 3] {
    let t = intensity.clamp(0.0, 1.0);
    [
        COOL[0] * (1.0 - t) + HOT[0] * t,
        COOL[1] * (1.0 - t) + HOT[1] * t,
        COOL[2] * (1.0 - t) + HOT[2] * t,
    ]
}

/// Height above a building's roof where its sensor markers float
pub const MARKER_CLEARANCE: f32 = 2.5;
/// Horizontal spacing between markers sharing a building
pub const MARKER_SPACING: f32 = 2.0;

/// World-space anchor for a live sensor.
///
/// An explicit position wins. Otherwise the sensor floats above its building,
/// spread along X by `slot` so siblings don't overlap. Sensors with neither
/// have no anchor and are not drawn.
pub fn sensor_anchor(record: &SensorRecord, catalog: &Catalog, slot: usize) -> Option<[f32; 3]> {
    if let Some(position) = record.position {
        return Some(position);
    }
    let building = catalog.get(record.building_id.as_deref()?)?;
    let [x, y, z] = building.position;
    Some([
        x + slot as f32 * MARKER_SPACING - MARKER_SPACING,
        y + building.dimensions.height + MARKER_CLEARANCE,
        z,
    ])
}

/// Anchors for every drawable sensor, in table order
pub fn sensor_anchors<'a>(table: &'a SensorTable, catalog: &Catalog) -> Vec<(&'a SensorRecord, [f32; 3])> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut anchors = Vec::new();
    for record in table.iter() {
        let slot = match record.building_id.as_deref() {
            Some(building) if record.position.is_none() => {
                let slot = slots.entry(building).or_insert(0);
                *slot += 1;
                *slot - 1
            }
            _ => 0,
        };
        if let Some(anchor) = sensor_anchor(record, catalog, slot) {
            anchors.push((record, anchor));
        }
    }
    anchors
}

/// Heat samples for every anchored temperature sensor, projected to ground level
pub fn heat_samples(table: &SensorTable, catalog: &Catalog, band: HeatBand) -> Vec<HeatSample> {
    sensor_anchors(table, catalog)
        .into_iter()
        .filter(|(record, _)| record.sensor_type.eq_ignore_ascii_case("temperature"))
        .map(|(record, [x, _, z])| {
            let intensity = band.intensity(record.value);
            HeatSample {
                sensor_id: record.id.clone(),
                position: [x, 0.05, z],
                intensity,
                color: heat_color(intensity),
            }
        })
        .collect()
}
