//! Sensor readings, live sensor records, and the partial-update merge policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::feed::FeedError;

/// Sensor health, normalized from both status vocabularies.
///
/// Catalog seed data speaks `online / warning / offline`, the live feed
/// speaks `normal / warning / critical`. Both are accepted on input and
/// collapse onto these three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SensorStatus {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl SensorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorStatus::Normal => "normal",
            SensorStatus::Warning => "warning",
            SensorStatus::Critical => "critical",
        }
    }

    /// Label in the catalog vocabulary (used by the detail panel)
    pub fn catalog_label(&self) -> &'static str {
        match self {
            SensorStatus::Normal => "online",
            SensorStatus::Warning => "warning",
            SensorStatus::Critical => "offline",
        }
    }

    /// Marker color as sRGB (critical red, warning amber, normal green)
    pub fn color(&self) -> [f32; 3] {
        match self {
            SensorStatus::Normal => [0.2, 0.8, 0.35],
            SensorStatus::Warning => [1.0, 0.72, 0.1],
            SensorStatus::Critical => [0.9, 0.15, 0.15],
        }
    }
}

impl FromStr for SensorStatus {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "normal" | "ok" => Ok(SensorStatus::Normal),
            "warning" => Ok(SensorStatus::Warning),
            "offline" | "critical" | "error" => Ok(SensorStatus::Critical),
            other => Err(FeedError::UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for SensorStatus {
    type Error = FeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SensorStatus> for String {
    fn from(status: SensorStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static sensor reading attached to a catalog room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Stable id used when the reading seeds the live table.
    /// Derived from building/room/type when omitted.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub status: SensorStatus,
}

/// A live sensor as held in the sensor table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    pub status: SensorStatus,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    #[serde(default)]
    pub building_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// An inbound upsert. Only `id` is mandatory; omitted fields keep their
/// previous value when the sensor already exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorPatch {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SensorStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<String>,
}

impl SensorPatch {
    /// Reject patches that can never be applied, regardless of table state
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.id.trim().is_empty() {
            return Err(FeedError::EmptyId);
        }
        if let Some(value) = self.value {
            if !value.is_finite() {
                return Err(FeedError::NonFinite(self.id.clone()));
            }
        }
        if let Some(pos) = self.position {
            if pos.iter().any(|c| !c.is_finite()) {
                return Err(FeedError::NonFinite(self.id.clone()));
            }
        }
        Ok(())
    }
}

impl From<&SensorRecord> for SensorPatch {
    fn from(record: &SensorRecord) -> Self {
        SensorPatch {
            id: record.id.clone(),
            sensor_type: Some(record.sensor_type.clone()),
            value: Some(record.value),
            unit: Some(record.unit.clone()),
            status: Some(record.status),
            position: record.position,
            building_id: record.building_id.clone(),
        }
    }
}

impl SensorRecord {
    /// Build a new record from the first patch seen for its id
    pub fn from_patch(patch: SensorPatch, now: DateTime<Utc>) -> Result<Self, FeedError> {
        patch.validate()?;
        let sensor_type = patch.sensor_type.ok_or_else(|| FeedError::MissingField {
            id: patch.id.clone(),
            field: "type",
        })?;
        let value = patch.value.ok_or_else(|| FeedError::MissingField {
            id: patch.id.clone(),
            field: "value",
        })?;
        let status = patch.status.ok_or_else(|| FeedError::MissingField {
            id: patch.id.clone(),
            field: "status",
        })?;

        Ok(SensorRecord {
            id: patch.id,
            sensor_type,
            value,
            unit: patch.unit.unwrap_or_default(),
            status,
            position: patch.position,
            building_id: patch.building_id,
            updated_at: now,
        })
    }

    /// Field-by-field merge: provided fields overwrite, omitted fields stay
    pub fn merge(&mut self, patch: SensorPatch, now: DateTime<Utc>) {
        if let Some(sensor_type) = patch.sensor_type {
            self.sensor_type = sensor_type;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.position.is_some() {
            self.position = patch.position;
        }
        if patch.building_id.is_some() {
            self.building_id = patch.building_id;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_vocabularies_normalize() {
        assert_eq!("online".parse::<SensorStatus>().unwrap(), SensorStatus::Normal);
        assert_eq!("normal".parse::<SensorStatus>().unwrap(), SensorStatus::Normal);
        assert_eq!("Warning".parse::<SensorStatus>().unwrap(), SensorStatus::Warning);
        assert_eq!("offline".parse::<SensorStatus>().unwrap(), SensorStatus::Critical);
        assert_eq!("critical".parse::<SensorStatus>().unwrap(), SensorStatus::Critical);
        assert!("sleepy".parse::<SensorStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_in_feed_vocabulary() {
        let json = serde_json::to_string(&SensorStatus::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: SensorStatus = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(parsed, SensorStatus::Critical);
    }

    #[test]
    fn test_new_record_requires_core_fields() {
        let patch = SensorPatch {
            id: "k-1-temp".to_string(),
            value: Some(21.0),
            ..Default::default()
        };
        let err = SensorRecord::from_patch(patch, Utc::now()).unwrap_err();
        assert!(matches!(err, FeedError::MissingField { field: "type", .. }));
    }

    #[test]
    fn test_merge_keeps_omitted_fields() {
        let now = Utc::now();
        let mut record = SensorRecord::from_patch(
            SensorPatch {
                id: "k-1-co2".to_string(),
                sensor_type: Some("air-quality".to_string()),
                value: Some(640.0),
                unit: Some("ppm".to_string()),
                status: Some(SensorStatus::Normal),
                position: Some([1.0, 2.0, 3.0]),
                building_id: Some("kindergarten-main".to_string()),
            },
            now,
        )
        .unwrap();

        record.merge(
            SensorPatch {
                id: "k-1-co2".to_string(),
                status: Some(SensorStatus::Warning),
                ..Default::default()
            },
            now,
        );

        assert_eq!(record.value, 640.0);
        assert_eq!(record.unit, "ppm");
        assert_eq!(record.status, SensorStatus::Warning);
        assert_eq!(record.position, Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let patch = SensorPatch {
            id: "x".to_string(),
            value: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(FeedError::NonFinite(_))));
    }
}
