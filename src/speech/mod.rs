//! Speech synthesis: engine abstraction and per-unit clip rendering.

/// Speech engine trait and the `espeak-ng` implementation.
pub mod engine;
/// Per-unit synthesis with retry, fallback voice and a bounded worker pool.
pub mod synth;
