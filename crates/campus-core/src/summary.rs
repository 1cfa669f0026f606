//! Aggregated sensor status for the building detail panel

use serde::Serialize;

use crate::catalog::BuildingDescriptor;
use crate::sensor::SensorStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildingSummary {
    pub rooms: usize,
    pub total_sensors: usize,
    pub online: usize,
    pub warning: usize,
    pub critical: usize,
}

impl BuildingSummary {
    /// Sum room-level sensor statuses for a building
    pub fn of(building: &BuildingDescriptor) -> Self {
        let mut summary = BuildingSummary {
            rooms: building.rooms.len(),
            ..Default::default()
        };
        for reading in building.rooms.iter().flat_map(|room| room.sensors.iter()) {
            summary.total_sensors += 1;
            match reading.status {
                SensorStatus::Normal => summary.online += 1,
                SensorStatus::Warning => summary.warning += 1,
                SensorStatus::Critical => summary.critical += 1,
            }
        }
        summary
    }

    pub fn has_issues(&self) -> bool {
        self.warning > 0 || self.critical > 0
    }
}
