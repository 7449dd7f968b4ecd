//! DSP Engine: Pure Rust audio synthesis and processing.
//!
//! All DSP runs in Rust for deterministic, cross-platform audio output.
//! The same code powers both the browser (via WASM) and the CLI renderer
//! (offline WAV export).

pub mod automation;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod modulation;
pub mod oscillator;
pub mod renderer;
pub mod sidechain;
