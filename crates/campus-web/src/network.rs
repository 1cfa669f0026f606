//! Realtime sensor feed client
//!
//! Browser callbacks only push [`TransportEvent`]s onto a shared queue; the
//! frame loop drains it and is the only writer of the sensor table.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use campus_core::feed::{channel_url, parse_snapshot, snapshot_url};
use campus_core::{ConnectionStatus, FeedConnection, ReconnectPolicy, SensorTable};
use campus_scene::{SceneContext, SceneSet};
use chrono::{DateTime, Utc};

const DEFAULT_TWIN: &str = "campus";
const SYNC_INTERVAL_SECS: f32 = 30.0;

pub struct FeedPlugin;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSet {
    /// Drain transport events into the sensor table
    Apply,
}

/// Where the feed lives
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct FeedConfig {
    /// HTTP(S) base URL, e.g. "http://192.168.1.100:8080"
    pub http_url: String,
    /// WebSocket base URL, e.g. "ws://192.168.1.100:8080"
    pub ws_url: String,
    pub twin_id: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::from_feed_address("localhost:8080", DEFAULT_TWIN)
    }
}

impl FeedConfig {
    /// Config from `?feed=host:port&twin=id`, falling back to same-origin
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let location = window.location();
        let search = location.search().unwrap_or_default();
        let twin = Self::parse_query_param(&search, "twin").unwrap_or_else(|| DEFAULT_TWIN.to_string());

        if let Some(feed) = Self::parse_query_param(&search, "feed") {
            tracing::info!(feed = %feed, twin = %twin, "Using feed from URL parameter");
            return Self::from_feed_address(&feed, &twin);
        }

        let host = location.host().unwrap_or_else(|_| "localhost:8080".to_string());
        let is_https = location.protocol().unwrap_or_default() == "https:";
        Self {
            http_url: format!("{}://{}", if is_https { "https" } else { "http" }, host),
            ws_url: format!("{}://{}", if is_https { "wss" } else { "ws" }, host),
            twin_id: twin,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Config from a feed address, with or without an http(s) scheme
    pub fn from_feed_address(addr: &str, twin_id: &str) -> Self {
        let addr = addr.trim_end_matches('/');
        let (http_url, ws_url) = if addr.starts_with("https://") || addr.starts_with("http://") {
            let ws = addr.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1);
            (addr.to_string(), ws)
        } else {
            (format!("http://{}", addr), format!("ws://{}", addr))
        };
        Self {
            http_url,
            ws_url,
            twin_id: twin_id.to_string(),
        }
    }

    fn parse_query_param(search: &str, param: &str) -> Option<String> {
        let search = search.trim_start_matches('?');
        for pair in search.split('&') {
            let mut parts = pair.splitn(2, '=');
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                if key == param && !value.is_empty() {
                    return Some(value.replace("%3A", ":").replace("%2F", "/"));
                }
            }
        }
        None
    }

    pub fn channel_url(&self) -> String {
        channel_url(&self.ws_url, &self.twin_id)
    }

    pub fn snapshot_url(&self) -> String {
        snapshot_url(&self.http_url, &self.twin_id)
    }
}

/// Something the transport observed
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    /// Body of a snapshot fetch
    Snapshot(String),
    Closed,
    Error(String),
}

/// Shared queue between browser callbacks and the frame loop. Each event is
/// tagged with the socket generation that produced it.
#[derive(Resource, Default, Clone)]
pub struct TransportQueue(pub Arc<Mutex<Vec<(u64, TransportEvent)>>>);

impl TransportQueue {
    pub fn push(&self, generation: u64, event: TransportEvent) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push((generation, event));
        }
    }

    pub fn drain(&self) -> Vec<(u64, TransportEvent)> {
        match self.0.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }
}

/// Connection bookkeeping for the push channel
#[derive(Resource)]
pub struct FeedState {
    pub connection: FeedConnection,
    /// Generation of the current socket; events from older sockets only
    /// contribute data
    generation: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            connection: FeedConnection::new(ReconnectPolicy::default()),
            generation: 0,
        }
    }
}

impl FeedState {
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }
}

/// Ask for a fresh snapshot (toolbar button, reconnect, periodic sync)
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RefreshSnapshot;

#[derive(Resource)]
pub struct PeriodicSyncTimer {
    pub timer: Timer,
}

impl Default for PeriodicSyncTimer {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(SYNC_INTERVAL_SECS, TimerMode::Repeating),
        }
    }
}

/// What the frame loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedAction {
    None,
    Refresh,
}

/// Merge one transport event into the table and connection state.
///
/// Only the current socket may change connection status; a late close from
/// a replaced socket must not schedule another reconnect.
pub fn apply_transport_event(
    event: TransportEvent,
    current: bool,
    table: &mut SensorTable,
    connection: &mut FeedConnection,
    now_secs: f64,
    now: DateTime<Utc>,
) -> FeedAction {
    match event {
        TransportEvent::Opened if current => {
            if connection.on_open() {
                return FeedAction::Refresh;
            }
        }
        TransportEvent::Message(text) => {
            if let Err(e) = table.apply_raw(&text, now) {
                tracing::debug!(error = %e, "Dropping malformed feed message");
            }
        }
        TransportEvent::Snapshot(body) => match parse_snapshot(&body) {
            Ok(snapshot) => {
                let applied = table.reconcile(snapshot, now);
                tracing::debug!(applied, "Sensor snapshot reconciled");
            }
            Err(e) => tracing::warn!(error = %e, "Sensor snapshot body was not a record list"),
        },
        TransportEvent::Closed if current => connection.on_transport_failure(now_secs),
        TransportEvent::Error(reason) if current => {
            tracing::warn!(reason = %reason, "Sensor feed transport error");
            connection.on_transport_failure(now_secs);
        }
        _ => {}
    }
    FeedAction::None
}

impl Plugin for FeedPlugin {
    fn build(&self, app: &mut App) {
        let feed_config = FeedConfig::from_browser();

        app.insert_resource(feed_config)
            .init_resource::<TransportQueue>()
            .init_resource::<FeedState>()
            .init_resource::<PeriodicSyncTimer>()
            .add_message::<RefreshSnapshot>()
            .configure_sets(Update, FeedSet::Apply.before(SceneSet::Render))
            .add_systems(Startup, connect_feed)
            .add_systems(
                Update,
                (apply_feed_events, drive_reconnect, periodic_sync, handle_refresh)
                    .chain()
                    .in_set(FeedSet::Apply),
            );
    }
}

fn connect_feed(config: Res<FeedConfig>, queue: Res<TransportQueue>, mut state: ResMut<FeedState>, mut refresh: MessageWriter<RefreshSnapshot>) {
    state.generation += 1;
    open_channel(&config.channel_url(), &queue, state.generation);
    refresh.write(RefreshSnapshot);
}

/// Drain transport events into the table, once per frame
fn apply_feed_events(
    time: Res<Time>,
    queue: Res<TransportQueue>,
    mut state: ResMut<FeedState>,
    mut context: ResMut<SceneContext>,
    mut refresh: MessageWriter<RefreshSnapshot>,
) {
    let events = queue.drain();
    if events.is_empty() {
        return;
    }
    let now_secs = time.elapsed_secs_f64();
    let now = Utc::now();
    let generation = state.generation;

    for (event_generation, event) in events {
        let current = event_generation == generation;
        let action = apply_transport_event(event, current, &mut context.sensors, &mut state.connection, now_secs, now);
        if action == FeedAction::Refresh {
            refresh.write(RefreshSnapshot);
        }
    }
}

fn drive_reconnect(time: Res<Time>, config: Res<FeedConfig>, queue: Res<TransportQueue>, mut state: ResMut<FeedState>) {
    if state.connection.take_due_reconnect(time.elapsed_secs_f64()) {
        state.generation += 1;
        tracing::info!(attempt = state.connection.attempts(), "Reconnecting sensor feed");
        open_channel(&config.channel_url(), &queue, state.generation);
    }
}

fn periodic_sync(time: Res<Time>, mut sync_timer: ResMut<PeriodicSyncTimer>, mut refresh: MessageWriter<RefreshSnapshot>) {
    sync_timer.timer.tick(time.delta());
    if sync_timer.timer.just_finished() {
        tracing::debug!("Periodic sensor sync triggered");
        refresh.write(RefreshSnapshot);
    }
}

/// Coalesce refresh requests into one snapshot fetch per frame
fn handle_refresh(
    mut requests: MessageReader<RefreshSnapshot>,
    config: Res<FeedConfig>,
    queue: Res<TransportQueue>,
    state: Res<FeedState>,
) {
    if requests.read().count() > 0 {
        fetch_snapshot(&config.snapshot_url(), &queue, state.generation);
    }
}

#[cfg(target_arch = "wasm32")]
fn open_channel(url: &str, queue: &TransportQueue, generation: u64) {
    use wasm_bindgen::prelude::*;
    use web_sys::{MessageEvent, WebSocket};

    tracing::info!(url = %url, "Connecting sensor feed");

    match WebSocket::new(url) {
        Ok(ws) => {
            let q = queue.clone();
            let onopen = Closure::wrap(Box::new(move |_: JsValue| {
                q.push(generation, TransportEvent::Opened);
            }) as Box<dyn FnMut(JsValue)>);
            ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
            onopen.forget();

            let q = queue.clone();
            let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
                if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                    q.push(generation, TransportEvent::Message(text.into()));
                }
            }) as Box<dyn FnMut(MessageEvent)>);
            ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
            onmessage.forget();

            let q = queue.clone();
            let onclose = Closure::wrap(Box::new(move |_: JsValue| {
                q.push(generation, TransportEvent::Closed);
            }) as Box<dyn FnMut(JsValue)>);
            ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
            onclose.forget();

            let q = queue.clone();
            let onerror = Closure::wrap(Box::new(move |_: JsValue| {
                q.push(generation, TransportEvent::Error("websocket error".to_string()));
            }) as Box<dyn FnMut(JsValue)>);
            ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();
        }
        Err(e) => {
            queue.push(generation, TransportEvent::Error(format!("{:?}", e)));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_channel(url: &str, _queue: &TransportQueue, _generation: u64) {
    tracing::info!(url = %url, "Sensor feed transport not available in native mode");
}

#[cfg(target_arch = "wasm32")]
fn fetch_snapshot(url: &str, queue: &TransportQueue, generation: u64) {
    use wasm_bindgen_futures::spawn_local;

    let queue = queue.clone();
    let url = url.to_string();
    spawn_local(async move {
        match gloo_net::http::Request::get(&url).send().await {
            Ok(response) if response.ok() => match response.text().await {
                Ok(body) => queue.push(generation, TransportEvent::Snapshot(body)),
                Err(e) => tracing::warn!(error = ?e, "Failed to read sensor snapshot"),
            },
            Ok(response) => tracing::warn!(status = response.status(), url = %url, "Sensor snapshot request failed"),
            Err(e) => tracing::warn!(error = ?e, url = %url, "Failed to fetch sensor snapshot"),
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_snapshot(url: &str, _queue: &TransportQueue, _generation: u64) {
    tracing::debug!(url = %url, "Snapshot fetch skipped in native mode");
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::SensorStatus;

    fn upsert(id: &str, value: f64) -> TransportEvent {
        TransportEvent::Message(format!(
            r#"{{"type":"sensor_upsert","data":{{"id":"{}","type":"temperature","value":{},"unit":"°C","status":"online"}}}}"#,
            id, value
        ))
    }

    #[test]
    fn test_feed_address_parsing() {
        let config = FeedConfig::from_feed_address("10.0.0.5:9000", "north");
        assert_eq!(config.http_url, "http://10.0.0.5:9000");
        assert_eq!(config.channel_url(), "ws://10.0.0.5:9000/ws/twins/north");
        assert_eq!(config.snapshot_url(), "http://10.0.0.5:9000/api/twins/north/sensors");

        let secure = FeedConfig::from_feed_address("https://twin.campus.local/", "campus");
        assert_eq!(secure.channel_url(), "wss://twin.campus.local/ws/twins/campus");
    }

    #[test]
    fn test_query_param() {
        let search = "?feed=10.0.0.5%3A9000&twin=north";
        assert_eq!(FeedConfig::parse_query_param(search, "feed").as_deref(), Some("10.0.0.5:9000"));
        assert_eq!(FeedConfig::parse_query_param(search, "twin").as_deref(), Some("north"));
        assert_eq!(FeedConfig::parse_query_param(search, "missing"), None);
        assert_eq!(FeedConfig::parse_query_param("?twin=", "twin"), None);
    }

    #[test]
    fn test_disconnect_reconnect_preserves_values() {
        let mut table = SensorTable::new();
        let mut connection = FeedConnection::new(ReconnectPolicy::default());
        let now = Utc::now();

        apply_transport_event(TransportEvent::Opened, true, &mut table, &mut connection, 0.0, now);
        apply_transport_event(upsert("k-1-temp", 22.5), true, &mut table, &mut connection, 0.1, now);
        apply_transport_event(upsert("k-2-temp", 19.0), true, &mut table, &mut connection, 0.2, now);
        let before: Vec<_> = table.iter().cloned().collect();

        apply_transport_event(TransportEvent::Closed, true, &mut table, &mut connection, 5.0, now);
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert!(connection.take_due_reconnect(5.5));

        let action = apply_transport_event(TransportEvent::Opened, true, &mut table, &mut connection, 5.6, now);
        assert_eq!(action, FeedAction::Refresh);
        assert!(connection.status().is_connected());

        let after: Vec<_> = table.iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_malformed_message_is_dropped() {
        let mut table = SensorTable::new();
        let mut connection = FeedConnection::new(ReconnectPolicy::default());
        let now = Utc::now();
        apply_transport_event(upsert("k-1-temp", 22.5), true, &mut table, &mut connection, 0.0, now);

        for junk in ["{", "null", r#"{"type":"sensor_upsert","data":{"value":1}}"#, r#"{"type":"mystery"}"#] {
            apply_transport_event(TransportEvent::Message(junk.into()), true, &mut table, &mut connection, 0.1, now);
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("k-1-temp").map(|r| r.value), Some(22.5));
    }

    #[test]
    fn test_stale_socket_cannot_disconnect() {
        let mut table = SensorTable::new();
        let mut connection = FeedConnection::new(ReconnectPolicy::default());
        let now = Utc::now();
        apply_transport_event(TransportEvent::Opened, true, &mut table, &mut connection, 0.0, now);

        apply_transport_event(TransportEvent::Closed, false, &mut table, &mut connection, 1.0, now);
        assert!(connection.status().is_connected());
        assert_eq!(connection.retry_at(), None);

        // data from the old socket still counts
        apply_transport_event(upsert("late", 20.0), false, &mut table, &mut connection, 1.1, now);
        assert!(table.get("late").is_some());
    }

    #[test]
    fn test_snapshot_reconciles_partial_table() {
        let mut table = SensorTable::new();
        let mut connection = FeedConnection::new(ReconnectPolicy::default());
        let now = Utc::now();
        apply_transport_event(upsert("kept", 20.0), true, &mut table, &mut connection, 0.0, now);

        let body = r#"[
            {"id":"kept","value":21.0},
            {"id":"new","type":"humidity","value":40.0,"unit":"%","status":"warning"}
        ]"#;
        apply_transport_event(TransportEvent::Snapshot(body.into()), true, &mut table, &mut connection, 0.0, now);

        assert_eq!(table.get("kept").map(|r| r.value), Some(21.0));
        assert_eq!(table.get("new").map(|r| r.status), Some(SensorStatus::Warning));
    }

    #[test]
    fn test_snapshot_with_bad_record_keeps_good_ones() {
        let mut table = SensorTable::new();
        let mut connection = FeedConnection::new(ReconnectPolicy::default());
        let now = Utc::now();

        let body = r#"[
            {"id":"good","type":"temperature","value":21.0,"unit":"°C","status":"normal"},
            {"id":"bad","type":"temperature","value":21.0,"unit":"°C","status":"degraded"},
            {"id":"worse","type":"temperature","value":"warm","unit":"°C","status":"normal"}
        ]"#;
        apply_transport_event(TransportEvent::Snapshot(body.into()), true, &mut table, &mut connection, 0.0, now);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("good").map(|r| r.value), Some(21.0));

        let pushed = r#"{"type":"sensor_snapshot","data":[
            {"id":"good","value":22.0},
            {"id":"bad","status":"degraded"}
        ]}"#;
        apply_transport_event(TransportEvent::Message(pushed.into()), true, &mut table, &mut connection, 0.1, now);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("good").map(|r| r.value), Some(22.0));
    }

    #[test]
    fn test_queue_drains_in_arrival_order() {
        let queue = TransportQueue::default();
        queue.push(1, TransportEvent::Opened);
        queue.push(1, TransportEvent::Message("a".into()));
        queue.push(2, TransportEvent::Closed);
        let drained = queue.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[1], (1, TransportEvent::Message("a".into())));
        assert!(queue.drain().is_empty());
    }
}
