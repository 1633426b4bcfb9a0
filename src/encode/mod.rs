//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`) and `ffprobe` helpers.
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
