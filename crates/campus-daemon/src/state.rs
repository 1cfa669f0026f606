//! Application state management

use campus_core::{Catalog, FeedError, FeedMessage, SensorPatch, SensorTable, UpsertOutcome};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ApiError;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<Catalog>,
    /// Authoritative sensor table served to snapshot requests
    pub sensors: RwLock<SensorTable>,
    /// Feed messages fanned out to WebSocket clients
    pub events: broadcast::Sender<FeedMessage>,
}

impl AppState {
    /// Create state with the sensor table seeded from the catalog
    pub fn new(config: Config, catalog: Catalog) -> Arc<Self> {
        let mut sensors = SensorTable::new();
        sensors.seed(catalog.seed_records(Utc::now()));
        info!(sensors = sensors.len(), "Seeded sensor table from catalog");

        let (events, _) = broadcast::channel(config.feed.channel_capacity.max(1));

        Arc::new(Self {
            config,
            catalog: Arc::new(catalog),
            sensors: RwLock::new(sensors),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedMessage> {
        self.events.subscribe()
    }

    /// Resolve a twin id from a request path
    pub fn check_twin(&self, twin_id: &str) -> Result<(), ApiError> {
        if twin_id == self.config.feed.twin_id {
            Ok(())
        } else {
            Err(ApiError::UnknownTwin(twin_id.to_string()))
        }
    }

    pub async fn snapshot(&self) -> Vec<SensorPatch> {
        self.sensors.read().await.snapshot()
    }

    /// Apply an upsert to the table and forward it to connected clients
    pub async fn publish(&self, patch: SensorPatch) -> Result<UpsertOutcome, FeedError> {
        let outcome = self.sensors.write().await.apply(patch.clone(), Utc::now())?;
        // No receivers is fine
        let receivers = self.events.send(FeedMessage::SensorUpsert(patch)).unwrap_or(0);
        debug!(?outcome, receivers, "Published sensor update");
        Ok(outcome)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::state;
    use super::*;
    use campus_core::SensorStatus;

    #[tokio::test]
    async fn test_seeded_from_catalog() {
        let state = state();
        let snapshot = state.snapshot().await;
        let ids: Vec<&str> = snapshot.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["k-1-co2", "k-1-temp"]);
    }

    #[tokio::test]
    async fn test_publish_merges_and_broadcasts() {
        let state = state();
        let mut rx = state.subscribe();

        let patch = SensorPatch {
            id: "k-1-temp".to_string(),
            value: Some(23.1),
            ..Default::default()
        };
        let outcome = state.publish(patch.clone()).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(rx.recv().await.unwrap(), FeedMessage::SensorUpsert(patch));

        let table = state.sensors.read().await;
        let record = table.get("k-1-temp").unwrap();
        assert_eq!(record.value, 23.1);
        assert_eq!(record.status, SensorStatus::Normal);
    }

    #[tokio::test]
    async fn test_invalid_publish_is_not_broadcast() {
        let state = state();
        let mut rx = state.subscribe();
        let patch = SensorPatch {
            id: "new-sensor".to_string(),
            value: Some(1.0),
            ..Default::default()
        };
        assert!(state.publish(patch).await.is_err());
        assert!(rx.try_recv().is_err());
        assert_eq!(state.sensors.read().await.len(), 2);
    }

    #[test]
    fn test_check_twin() {
        let state = state();
        assert!(state.check_twin("campus").is_ok());
        assert!(matches!(state.check_twin("other"), Err(ApiError::UnknownTwin(_))));
    }
}
