pub mod config;
pub mod dsp;
pub mod error;
pub mod instruments;
pub mod note;
pub mod validate;

use wasm_bindgen::prelude::*;

pub use crate::config::{SongConfig, parse_config};
pub use crate::dsp::engine::{AudioEngine, RenderContext, render};
pub use crate::dsp::renderer::RenderedAudio;
pub use crate::error::{EdmError, Result};
pub use crate::validate::{ValidationReport, validate};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the edmgen-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn song_from_js(config: JsValue) -> std::result::Result<SongConfig, JsValue> {
    serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("malformed config: {e}")))
}

fn to_js_error(e: EdmError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: render a song object to a WAV byte array (16-bit mono PCM).
#[wasm_bindgen]
pub fn render_song_wav(config: JsValue) -> std::result::Result<Vec<u8>, JsValue> {
    let song = song_from_js(config)?;
    render(&song).and_then(|audio| audio.to_wav_bytes()).map_err(to_js_error)
}

/// WASM-exposed: render a song object to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_song_samples(config: JsValue) -> std::result::Result<Vec<f32>, JsValue> {
    let song = song_from_js(config)?;
    render(&song).map(|audio| audio.to_f32()).map_err(to_js_error)
}

/// WASM-exposed: check a song object and return `{ errors, warnings }`.
#[wasm_bindgen]
pub fn validate_song(config: JsValue) -> std::result::Result<JsValue, JsValue> {
    let song = song_from_js(config)?;
    serde_wasm_bindgen::to_value(&validate(&song)).map_err(|e| JsValue::from_str(&format!("{e}")))
}
