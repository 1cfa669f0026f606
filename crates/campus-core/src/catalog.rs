//! Building catalog - declarative building, room, and seed sensor descriptors
//!
//! The catalog is loaded once at startup from a TOML document and treated as
//! read-only for the rest of the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::overlay::FlowConduit;
use crate::sensor::{SensorReading, SensorRecord};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Duplicate building id: {0}")]
    DuplicateBuilding(String),
    #[error("Building {id} has invalid dimensions: {reason}")]
    InvalidDimensions { id: String, reason: String },
    #[error("Building {0} has a non-finite position or rotation")]
    InvalidPlacement(String),
    #[error("Room {room} in building {building} is on floor {floor}, building has {floors}")]
    RoomFloorOutOfRange {
        building: String,
        room: String,
        floor: u32,
        floors: u32,
    },
}

/// Procedural shape family of a building.
///
/// Unknown tags are kept as `Unrecognized` rather than failing the load; the
/// renderer draws them as rectangles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeTag {
    Horseshoe,
    Zigzag,
    Ring,
    Chapel,
    Rectangle,
    Unrecognized(String),
}

impl From<String> for ShapeTag {
    fn from(tag: String) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "horseshoe" => ShapeTag::Horseshoe,
            "zigzag" => ShapeTag::Zigzag,
            "ring" => ShapeTag::Ring,
            "chapel" => ShapeTag::Chapel,
            "rectangle" => ShapeTag::Rectangle,
            _ => ShapeTag::Unrecognized(tag),
        }
    }
}

impl From<ShapeTag> for String {
    fn from(tag: ShapeTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeTag::Horseshoe => f.write_str("horseshoe"),
            ShapeTag::Zigzag => f.write_str("zigzag"),
            ShapeTag::Ring => f.write_str("ring"),
            ShapeTag::Chapel => f.write_str("chapel"),
            ShapeTag::Rectangle => f.write_str("rectangle"),
            ShapeTag::Unrecognized(tag) => f.write_str(tag),
        }
    }
}

/// Outer dimensions in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    #[serde(default = "default_floors")]
    pub floors: u32,
}

fn default_floors() -> u32 {
    1
}

impl Dimensions {
    pub fn floor_height(&self) -> f32 {
        self.height / self.floors.max(1) as f32
    }
}

/// Colors as sRGB triples (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub wall: [f32; 3],
    pub roof: [f32; 3],
    #[serde(default)]
    pub accent: Option<[f32; 3]>,
}

impl Palette {
    /// Accent color, falling back to the wall color
    pub fn accent_or_wall(&self) -> [f32; 3] {
        self.accent.unwrap_or(self.wall)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    pub id: String,
    pub name: String,
    /// 1-based floor index
    #[serde(default = "default_floors")]
    pub floor: u32,
    #[serde(rename = "type", default)]
    pub room_type: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default, rename = "sensor")]
    pub sensors: Vec<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDescriptor {
    pub id: String,
    pub name: String,
    /// Name in the secondary display language
    #[serde(default)]
    pub name_secondary: Option<String>,
    pub shape: ShapeTag,
    pub position: [f32; 3],
    /// Yaw in degrees
    #[serde(default)]
    pub rotation_deg: f32,
    pub dimensions: Dimensions,
    pub palette: Palette,
    #[serde(default, rename = "room")]
    pub rooms: Vec<RoomDescriptor>,
}

impl BuildingDescriptor {
    /// Sensor id for a seed reading, derived when the catalog doesn't name one
    pub fn seed_sensor_id(&self, room: &RoomDescriptor, reading: &SensorReading) -> String {
        reading
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}-{}", self.id, room.id, reading.sensor_type))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let d = &self.dimensions;
        let invalid = |reason: &str| CatalogError::InvalidDimensions {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if !(d.width > 0.0 && d.depth > 0.0 && d.height > 0.0) {
            return Err(invalid("width, depth and height must be positive"));
        }
        if ![d.width, d.depth, d.height].iter().all(|v| v.is_finite()) {
            return Err(invalid("width, depth and height must be finite"));
        }
        if !self.position.iter().all(|c| c.is_finite()) || !self.rotation_deg.is_finite() {
            return Err(CatalogError::InvalidPlacement(self.id.clone()));
        }
        if d.floors == 0 {
            return Err(invalid("floors must be at least 1"));
        }
        for room in &self.rooms {
            if room.floor == 0 || room.floor > d.floors {
                return Err(CatalogError::RoomFloorOutOfRange {
                    building: self.id.clone(),
                    room: room.id.clone(),
                    floor: room.floor,
                    floors: d.floors,
                });
            }
        }
        Ok(())
    }
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    building: Vec<BuildingDescriptor>,
    #[serde(default)]
    conduit: Vec<FlowConduit>,
}

/// The static, ordered set of buildings plus declared flow conduits
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buildings: Vec<BuildingDescriptor>,
    conduits: Vec<FlowConduit>,
}

impl Catalog {
    pub fn new(buildings: Vec<BuildingDescriptor>, conduits: Vec<FlowConduit>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for building in &buildings {
            if !seen.insert(building.id.as_str()) {
                return Err(CatalogError::DuplicateBuilding(building.id.clone()));
            }
            building.validate()?;
        }
        Ok(Self { buildings, conduits })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.building, file.conduit)
    }

    /// Load a catalog from a TOML file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            buildings = catalog.buildings.len(),
            conduits = catalog.conduits.len(),
            "Loaded building catalog"
        );
        Ok(catalog)
    }

    pub fn buildings(&self) -> &[BuildingDescriptor] {
        &self.buildings
    }

    pub fn conduits(&self) -> &[FlowConduit] {
        &self.conduits
    }

    /// Look up a building; unknown ids resolve to `None`
    pub fn get(&self, id: &str) -> Option<&BuildingDescriptor> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Live records seeded from the catalog's room sensors.
    ///
    /// Seed records carry their building id but no explicit position; the
    /// overlay places them above their building.
    pub fn seed_records(&self, now: DateTime<Utc>) -> Vec<SensorRecord> {
        let mut records = Vec::new();
        for building in &self.buildings {
            for room in &building.rooms {
                for reading in &room.sensors {
                    records.push(SensorRecord {
                        id: building.seed_sensor_id(room, reading),
                        sensor_type: reading.sensor_type.clone(),
                        value: reading.value,
                        unit: reading.unit.clone(),
                        status: reading.status,
                        position: None,
                        building_id: Some(building.id.clone()),
                        updated_at: now,
                    });
                }
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorStatus;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[[building]]
id = "kindergarten-main"
name = "Kindergarten"
name_secondary = "Lastentarha"
shape = "horseshoe"
position = [0.0, 0.0, 0.0]
dimensions = { width = 30.0, depth = 20.0, height = 4.0, floors = 1 }
palette = { wall = [0.9, 0.85, 0.7], roof = [0.5, 0.25, 0.2] }

[[building.room]]
id = "k-1"
name = "Group room"
type = "classroom"
capacity = 24

[[building.room.sensor]]
id = "k-1-temp"
type = "temperature"
value = 22.5
unit = "°C"
status = "online"

[[building.room.sensor]]
type = "humidity"
value = 41.0
unit = "%"
status = "warning"

[[building]]
id = "kindergarten-inner"
name = "Inner Court"
shape = "pagoda"
position = [40.0, 0.0, 10.0]
rotation_deg = 15.0
dimensions = { width = 12.0, depth = 10.0, height = 7.0, floors = 2 }
palette = { wall = [0.8, 0.8, 0.8], roof = [0.3, 0.3, 0.3], accent = [0.2, 0.4, 0.8] }

[[conduit]]
id = "heat-main"
from = [0.0, 0.5, 0.0]
to = [40.0, 0.5, 10.0]
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        assert_eq!(catalog.buildings().len(), 2);
        assert_eq!(catalog.conduits().len(), 1);

        let main = catalog.get("kindergarten-main").unwrap();
        assert_eq!(main.shape, ShapeTag::Horseshoe);
        assert_eq!(main.rooms[0].capacity, Some(24));
        assert_eq!(main.rooms[0].sensors[1].status, SensorStatus::Warning);

        let inner = catalog.get("kindergarten-inner").unwrap();
        assert_eq!(inner.shape, ShapeTag::Unrecognized("pagoda".to_string()));
        assert_eq!(inner.palette.accent_or_wall(), [0.2, 0.4, 0.8]);
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn test_seed_records_derive_missing_ids() {
        let catalog = Catalog::from_toml_str(SAMPLE).unwrap();
        let records = catalog.seed_records(Utc::now());
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["k-1-temp", "kindergarten-main-k-1-humidity"]);
        assert!(records.iter().all(|r| r.building_id.as_deref() == Some("kindergarten-main")));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doubled = format!("{}\n{}", SAMPLE, SAMPLE.split("[[conduit]]").next().unwrap());
        let err = Catalog::from_toml_str(&doubled).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateBuilding(_)));
    }

    #[test]
    fn test_room_floor_validation() {
        let broken = SAMPLE.replace("type = \"classroom\"", "type = \"classroom\"\nfloor = 3");
        let err = Catalog::from_toml_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogError::RoomFloorOutOfRange { floor: 3, .. }));
    }

    #[test]
    fn test_non_finite_geometry_rejected() {
        let nan_position = SAMPLE.replace("[40.0, 0.0, 10.0]", "[40.0, nan, 10.0]");
        let err = Catalog::from_toml_str(&nan_position).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPlacement(ref id) if id == "kindergarten-inner"));

        let endless = SAMPLE.replace("width = 12.0", "width = inf");
        let err = Catalog::from_toml_str(&endless).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDimensions { .. }));

        let spinning = SAMPLE.replace("rotation_deg = 15.0", "rotation_deg = -inf");
        assert!(Catalog::from_toml_str(&spinning).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.buildings().len(), 2);
    }
}
