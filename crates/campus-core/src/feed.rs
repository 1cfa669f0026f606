//! Feed wire messages and error types

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::sensor::SensorPatch;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Malformed feed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sensor update has an empty id")]
    EmptyId,
    #[error("Sensor {id} is not known yet and the update lacks `{field}`")]
    MissingField { id: String, field: &'static str },
    #[error("Unknown sensor status `{0}`")]
    UnknownStatus(String),
    #[error("Non-finite value in update for sensor {0}")]
    NonFinite(String),
}

/// Messages on the push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FeedMessage {
    #[serde(rename = "sensor_upsert", alias = "sensor_insert", alias = "sensor_update")]
    SensorUpsert(SensorPatch),
    #[serde(rename = "sensor_snapshot")]
    SensorSnapshot(#[serde(deserialize_with = "lenient_records")] Vec<SensorPatch>),
    #[serde(rename = "pong")]
    Pong,
}

impl FeedMessage {
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Parse a snapshot body (a JSON array of records). Records that fail to
/// decode are dropped individually; only a body that is not an array fails.
pub fn parse_snapshot(text: &str) -> Result<Vec<SensorPatch>, FeedError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(text)?;
    Ok(decode_records(raw))
}

fn decode_records(raw: Vec<serde_json::Value>) -> Vec<SensorPatch> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<SensorPatch>(value) {
            Ok(patch) => Some(patch),
            Err(e) => {
                debug!(error = %e, "Skipping undecodable snapshot record");
                None
            }
        })
        .collect()
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<SensorPatch>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(decode_records(raw))
}

/// Transport-level connection status of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// Build the push-channel URL for a twin from a websocket base URL
pub fn channel_url(ws_base: &str, twin_id: &str) -> String {
    format!("{}/ws/twins/{}", ws_base.trim_end_matches('/'), twin_id)
}

/// Build the snapshot URL for a twin from an HTTP base URL
pub fn snapshot_url(http_base: &str, twin_id: &str) -> String {
    format!("{}/api/twins/{}/sensors", http_base.trim_end_matches('/'), twin_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorStatus;

    #[test]
    fn test_parse_upsert_and_aliases() {
        let msg = FeedMessage::parse(
            r#"{"type":"sensor_update","data":{"id":"k-1-temp","value":23.1}}"#,
        )
        .unwrap();
        match msg {
            FeedMessage::SensorUpsert(patch) => {
                assert_eq!(patch.id, "k-1-temp");
                assert_eq!(patch.value, Some(23.1));
                assert_eq!(patch.status, None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        let err = FeedMessage::parse(
            r#"{"type":"sensor_upsert","data":{"id":"a","status":"melting"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FeedError::Json(_)));
    }

    #[test]
    fn test_snapshot_drops_only_bad_records() {
        let msg = FeedMessage::parse(
            r#"{"type":"sensor_snapshot","data":[
                {"id":"good","type":"temperature","value":21.0,"status":"normal"},
                {"id":"bad","type":"temperature","value":21.0,"status":"degraded"},
                {"id":"worse","value":"warm"}
            ]}"#,
        )
        .unwrap();
        match msg {
            FeedMessage::SensorSnapshot(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].id, "good");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_snapshot_body() {
        let records = parse_snapshot(
            r#"[{"id":"good","value":1.5},{"id":"bad","status":"degraded"},42]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, Some(1.5));

        assert!(parse_snapshot(r#"{"id":"good"}"#).is_err());
        assert!(parse_snapshot("not json").is_err());
    }

    #[test]
    fn test_upsert_serializes_without_empty_fields() {
        let msg = FeedMessage::SensorUpsert(SensorPatch {
            id: "a".to_string(),
            status: Some(SensorStatus::Warning),
            ..Default::default()
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"sensor_upsert","data":{"id":"a","status":"warning"}}"#);
    }

    #[test]
    fn test_urls() {
        assert_eq!(channel_url("ws://host:8080/", "campus-1"), "ws://host:8080/ws/twins/campus-1");
        assert_eq!(
            snapshot_url("http://host:8080", "campus-1"),
            "http://host:8080/api/twins/campus-1/sensors"
        );
    }
}
