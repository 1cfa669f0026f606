//! Web server setup

use anyhow::Result;
use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;
use crate::ws;

/// Build the router: feed API, push channel, and the web front end as fallback
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/catalog", get(api::get_catalog))
        .route(
            "/api/twins/{twin}/sensors",
            get(api::list_sensors).post(api::publish_sensor),
        )
        .route("/ws/twins/{twin}", get(ws::websocket_handler))
        .fallback_service(ServeDir::new(&state.config.daemon.web_root))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the web server until it fails
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::state;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use campus_core::SensorPatch;
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_endpoint() {
        let app = router(state());
        let response = app
            .oneshot(Request::get("/api/twins/campus/sensors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let snapshot: Vec<SensorPatch> = serde_json::from_slice(&bytes).unwrap();
        let temp = snapshot.iter().find(|p| p.id == "k-1-temp").unwrap();
        assert_eq!(temp.value, Some(22.5));
        assert_eq!(temp.building_id.as_deref(), Some("kindergarten-main"));
    }

    #[tokio::test]
    async fn test_unknown_twin_is_not_found() {
        let app = router(state());
        let response = app
            .oneshot(Request::get("/api/twins/elsewhere/sensors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unknown twin: elsewhere");
    }

    #[tokio::test]
    async fn test_publish_then_snapshot_reflects_merge() {
        let state = state();
        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::post("/api/twins/campus/sensors")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id":"k-1-temp","value":23.1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["inserted"], false);

        let table = state.sensors.read().await;
        let record = table.get("k-1-temp").unwrap();
        assert_eq!(record.value, 23.1);
        assert_eq!(record.status.as_str(), "normal");
    }

    #[tokio::test]
    async fn test_publish_incomplete_new_sensor_rejected() {
        let app = router(state());
        let response = app
            .oneshot(
                Request::post("/api/twins/campus/sensors")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id":"fresh","value":1.0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_and_status() {
        let app = router(state());
        let response = app
            .clone()
            .oneshot(Request::get("/api/catalog").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let catalog = body_json(response).await;
        assert_eq!(catalog["buildings"][0]["id"], "kindergarten-main");
        assert_eq!(catalog["buildings"][0]["shape"], "horseshoe");

        let response = app
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = body_json(response).await;
        assert_eq!(status["twin_id"], "campus");
        assert_eq!(status["sensors"], 2);
    }
}
