//! Signal primitives for the pad voices.
//!
//! Everything here renders in Rust so the same code runs in the AudioWorklet
//! (via WASM) and in native tests.

pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod sampler;
pub mod source;
