//! Doodle Digits core crate.
//!
//! A drawing game for the browser: the player hears and reads a number or
//! letter, draws it on a canvas and presses Check. Tesseract.js grades the
//! drawing when the host page has loaded it; a bitmap template comparison
//! covers low-confidence readings and pages without OCR. Per-character
//! statistics and the total score persist in `localStorage`.
//!
//! Everything except the `game` module is plain Rust and tested on the host.

use wasm_bindgen::prelude::*;

pub mod charset;
pub mod config;
pub mod error;
mod game;
pub mod progress;
pub mod raster;
pub mod recognizer;
pub mod round;
pub mod storage;

pub use charset::Mode;
pub use config::GameConfig;
pub use error::GameError;
pub use progress::ScoreBook;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // A second init (hot reload) fails harmlessly.
    let _ = console_log::init_with_level(log::Level::Debug);
}

// -----------------------------------------------------------------------------
// Exports
// -----------------------------------------------------------------------------

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    game::start(GameConfig::default()).map_err(Into::into)
}

/// Start with a JSON override of [`GameConfig`]; omitted fields keep defaults.
#[wasm_bindgen]
pub fn start_game_with_config(config_json: &str) -> Result<(), JsValue> {
    let cfg = GameConfig::from_json(config_json)?;
    game::start(cfg).map_err(Into::into)
}

/// Forget all per-character statistics and the total score.
#[wasm_bindgen]
pub fn reset_progress() -> Result<(), JsValue> {
    game::reset_progress().map_err(Into::into)
}

#[wasm_bindgen]
pub fn current_target() -> Option<String> {
    game::current_target()
}

#[wasm_bindgen]
pub fn total_score() -> f64 {
    game::total_score().unwrap_or(0) as f64
}
