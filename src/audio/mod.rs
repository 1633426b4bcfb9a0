//! Audio: PCM buffers, the narration track builder, music sources and the ducking mixer.

/// Narration + music mixing.
pub mod mix;
/// Music bed sources (WAV files, procedural pad).
pub mod music;
/// PCM buffers, WAV I/O and resampling.
pub mod pcm;
/// Narration track assembly.
pub mod track;
