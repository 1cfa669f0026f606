//! Campus Core - Core types, building catalog, and live sensor state
//!
//! This crate provides the renderer-independent pieces of the campus twin:
//! - Building catalog (declarative building/room/sensor descriptors loaded from TOML)
//! - Live sensor table with the feed's upsert/merge policy
//! - Feed wire messages and reconnect backoff bookkeeping
//! - Selection store with toggle semantics
//! - Overlay mode and heat/flow sample derivation
//! - Aggregated building summaries for the detail panel

pub mod backoff;
pub mod catalog;
pub mod feed;
pub mod overlay;
pub mod selection;
pub mod sensor;
pub mod summary;
pub mod table;

pub use backoff::{FeedConnection, ReconnectPolicy};
pub use catalog::{
    BuildingDescriptor, Catalog, CatalogError, Dimensions, Palette, RoomDescriptor, ShapeTag,
};
pub use feed::{ConnectionStatus, FeedError, FeedMessage};
pub use overlay::{FlowConduit, HeatBand, HeatSample, OverlayMode};
pub use selection::{SelectionChange, SelectionState};
pub use sensor::{SensorPatch, SensorReading, SensorRecord, SensorStatus};
pub use summary::BuildingSummary;
pub use table::{SensorTable, UpsertOutcome};
