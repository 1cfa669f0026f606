//! Campus Web - WebGPU-powered campus twin frontend
//!
//! This crate wires the shared campus scene to the browser: the realtime
//! sensor feed transport and the egui toolbar and detail panel.

mod app;
pub mod network;
mod ui;

pub use app::run;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    // wgpu is noisy below WARN
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );

    app::run();
}
