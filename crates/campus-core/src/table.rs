//! In-memory sensor table fed by the realtime channel

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::feed::{FeedError, FeedMessage};
use crate::sensor::{SensorPatch, SensorRecord};

/// Result of applying one upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Live sensors keyed by sensor id.
///
/// Records are created on the first message for an id and updated in place
/// afterwards. Nothing removes a record: disconnects and snapshot refreshes
/// keep whatever is already known.
#[derive(Debug, Clone, Default)]
pub struct SensorTable {
    records: BTreeMap<String, SensorRecord>,
    revision: u64,
}

impl SensorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a single patch (last write wins, omitted fields preserved)
    pub fn apply(&mut self, patch: SensorPatch, now: DateTime<Utc>) -> Result<UpsertOutcome, FeedError> {
        patch.validate()?;

        let outcome = match self.records.get_mut(&patch.id) {
            Some(existing) => {
                existing.merge(patch, now);
                UpsertOutcome::Updated
            }
            None => {
                let record = SensorRecord::from_patch(patch, now)?;
                self.records.insert(record.id.clone(), record);
                UpsertOutcome::Inserted
            }
        };

        self.revision += 1;
        Ok(outcome)
    }

    /// Apply a decoded feed message, returning how many records changed.
    /// Individual malformed records inside a snapshot are skipped.
    pub fn apply_message(&mut self, msg: FeedMessage, now: DateTime<Utc>) -> Result<usize, FeedError> {
        match msg {
            FeedMessage::SensorUpsert(patch) => self.apply(patch, now).map(|_| 1),
            FeedMessage::SensorSnapshot(records) => Ok(self.reconcile(records, now)),
            FeedMessage::Pong => Ok(0),
        }
    }

    /// Parse and apply a raw payload. A malformed payload leaves the table untouched.
    pub fn apply_raw(&mut self, text: &str, now: DateTime<Utc>) -> Result<usize, FeedError> {
        let msg = FeedMessage::parse(text)?;
        self.apply_message(msg, now)
    }

    /// Merge a full snapshot fetched outside the push stream.
    /// Records missing from the snapshot are retained.
    pub fn reconcile(&mut self, snapshot: Vec<SensorPatch>, now: DateTime<Utc>) -> usize {
        let mut applied = 0;
        for patch in snapshot {
            let id = patch.id.clone();
            match self.apply(patch, now) {
                Ok(_) => applied += 1,
                Err(e) => debug!(sensor = %id, error = %e, "Skipping snapshot record"),
            }
        }
        applied
    }

    /// Seed the table with records that are not yet present
    pub fn seed(&mut self, records: impl IntoIterator<Item = SensorRecord>) {
        for record in records {
            if !self.records.contains_key(&record.id) {
                self.records.insert(record.id.clone(), record);
                self.revision += 1;
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&SensorRecord> {
        self.records.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Monotonic counter bumped on every change; renderers compare it to
    /// decide whether to rebuild.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Records as a snapshot payload
    pub fn snapshot(&self) -> Vec<SensorPatch> {
        self.records.values().map(SensorPatch::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorStatus;

    fn temp_patch(id: &str, value: f64) -> SensorPatch {
        SensorPatch {
            id: id.to_string(),
            sensor_type: Some("temperature".to_string()),
            value: Some(value),
            unit: Some("°C".to_string()),
            status: Some(SensorStatus::Normal),
            ..Default::default()
        }
    }

    #[test]
    fn test_partial_update_preserves_status() {
        let mut table = SensorTable::new();
        let now = Utc::now();

        table
            .apply_raw(
                r#"{"type":"sensor_upsert","data":{"id":"k-1-temp","type":"temperature","value":22.5,"status":"online"}}"#,
                now,
            )
            .unwrap();
        table
            .apply_raw(r#"{"type":"sensor_upsert","data":{"id":"k-1-temp","value":23.1}}"#, now)
            .unwrap();

        let record = table.get("k-1-temp").unwrap();
        assert_eq!(record.value, 23.1);
        assert_eq!(record.status, SensorStatus::Normal);
        assert_eq!(record.status.catalog_label(), "online");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_malformed_payloads_are_no_ops() {
        let mut table = SensorTable::new();
        let now = Utc::now();
        table.apply(temp_patch("a", 20.0), now).unwrap();
        table.apply(temp_patch("b", 21.0), now).unwrap();
        let before: Vec<SensorRecord> = table.iter().cloned().collect();
        let revision = table.revision();

        let payloads = [
            "not json at all",
            r#"{"type":"sensor_upsert"}"#,
            r#"{"type":"sensor_upsert","data":{"value":3.0}}"#,
            r#"{"type":"sensor_upsert","data":{"id":"","value":3.0}}"#,
            r#"{"type":"sensor_upsert","data":{"id":"a","status":"exploded"}}"#,
            r#"{"type":"sensor_upsert","data":{"id":"new-one","value":3.0}}"#,
            r#"{"type":"sensor_teleport","data":{"id":"a"}}"#,
            r#"{"type":"sensor_upsert","data":{"id":"a","value":"warm"}}"#,
        ];
        for payload in payloads {
            assert!(table.apply_raw(payload, now).is_err(), "accepted: {}", payload);
        }

        let after: Vec<SensorRecord> = table.iter().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(table.revision(), revision);
    }

    #[test]
    fn test_updates_apply_in_arrival_order() {
        let mut table = SensorTable::new();
        let now = Utc::now();
        for value in [1.0, 2.0, 3.0] {
            table.apply(temp_patch("a", value), now).unwrap();
        }
        assert_eq!(table.get("a").unwrap().value, 3.0);
    }

    #[test]
    fn test_reconcile_keeps_unlisted_and_skips_bad_records() {
        let mut table = SensorTable::new();
        let now = Utc::now();
        table.apply(temp_patch("kept", 19.0), now).unwrap();

        let applied = table.reconcile(
            vec![
                temp_patch("fresh", 22.0),
                SensorPatch {
                    id: "incomplete".to_string(),
                    ..Default::default()
                },
            ],
            now,
        );

        assert_eq!(applied, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("kept").unwrap().value, 19.0);
        assert!(table.get("incomplete").is_none());
    }

    #[test]
    fn test_snapshot_message_with_bad_record_still_applies() {
        let mut table = SensorTable::new();
        let now = Utc::now();

        let applied = table
            .apply_raw(
                r#"{"type":"sensor_snapshot","data":[
                    {"id":"good","type":"temperature","value":21.0,"unit":"°C","status":"normal"},
                    {"id":"bad","type":"temperature","value":21.0,"unit":"°C","status":"degraded"}
                ]}"#,
                now,
            )
            .unwrap();

        assert_eq!(applied, 1);
        assert_eq!(table.len(), 1);
        assert!(table.get("good").is_some());
        assert!(table.get("bad").is_none());
    }

    #[test]
    fn test_seed_does_not_overwrite_live_values() {
        let mut table = SensorTable::new();
        let now = Utc::now();
        table.apply(temp_patch("a", 30.0), now).unwrap();

        let seed = SensorRecord::from_patch(temp_patch("a", 20.0), now).unwrap();
        let other = SensorRecord::from_patch(temp_patch("b", 20.0), now).unwrap();
        table.seed([seed, other]);

        assert_eq!(table.get("a").unwrap().value, 30.0);
        assert_eq!(table.len(), 2);
    }
}
