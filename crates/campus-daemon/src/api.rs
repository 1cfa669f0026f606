//! REST API handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use campus_core::{BuildingDescriptor, FlowConduit, SensorPatch, UpsertOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Current sensor snapshot for a twin
pub async fn list_sensors(
    State(state): State<Arc<AppState>>,
    Path(twin_id): Path<String>,
) -> Result<Json<Vec<SensorPatch>>, ApiError> {
    state.check_twin(&twin_id)?;
    Ok(Json(state.snapshot().await))
}

#[derive(Serialize)]
pub struct PublishResponse {
    pub inserted: bool,
}

/// Inject an upsert, as a sensor gateway would
pub async fn publish_sensor(
    State(state): State<Arc<AppState>>,
    Path(twin_id): Path<String>,
    Json(patch): Json<SensorPatch>,
) -> Result<Json<PublishResponse>, ApiError> {
    state.check_twin(&twin_id)?;
    let id = patch.id.clone();
    let outcome = state.publish(patch).await?;
    info!(sensor = %id, ?outcome, "Sensor update injected");
    Ok(Json(PublishResponse {
        inserted: outcome == UpsertOutcome::Inserted,
    }))
}

#[derive(Serialize)]
struct CatalogResponse<'a> {
    buildings: &'a [BuildingDescriptor],
    conduits: &'a [FlowConduit],
}

/// The building catalog the table was seeded from
pub async fn get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(CatalogResponse {
        buildings: state.catalog.buildings(),
        conduits: state.catalog.conduits(),
    })
    .into_response()
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub twin_id: String,
    pub sensors: usize,
    pub clients: usize,
    pub version: &'static str,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        twin_id: state.config.feed.twin_id.clone(),
        sensors: state.sensors.read().await.len(),
        clients: state.events.receiver_count(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
