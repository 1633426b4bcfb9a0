//! Narration script input and sentence segmentation.

/// Script loading (plain text or topic-tagged JSON sections).
pub mod input;
/// Sentence-level segmentation into [`NarrationUnit`](segment::NarrationUnit)s.
pub mod segment;
