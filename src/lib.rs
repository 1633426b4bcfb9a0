//! Slidecast turns a narration script and a curated image pool into a narrated slideshow video.
//!
//! A run moves through fixed stages:
//!
//! - segment the script into sentence-level [`NarrationUnit`]s
//! - synthesize each unit with an offline [`SpeechEngine`] and concatenate a [`NarrationTrack`]
//! - assign pool images to every unit and mix a ducked music bed under the narration
//! - compose a [`RenderTimeline`] and encode it with `ffmpeg`
//!
//! [`pipeline::run`] wires the stages together.
#![forbid(unsafe_code)]

pub mod audio;
pub mod captions;
pub mod config;
pub mod encode;
mod foundation;
pub mod manifest;
pub mod pipeline;
pub mod render;
pub mod script;
pub mod speech;
pub mod timeline;
pub mod visual;

pub use crate::foundation::core::{Canvas, Fps, UnitId};
pub use crate::foundation::error::{SlidecastError, SlidecastResult, Stage};

pub use crate::audio::mix::{MixSettings, MixedAudioTrack, mix};
pub use crate::audio::pcm::AudioPcm;
pub use crate::audio::track::{NarrationTrack, TimedUnit};
pub use crate::config::{PipelineConfig, Strictness, TransitionType, VoiceConfig};
pub use crate::encode::sink::{FrameSink, RecordingSink, SinkConfig, StagedSoundtrack};
pub use crate::pipeline::{PipelineInputs, PipelineOutput};
pub use crate::render::frame::FrameRgba;
pub use crate::script::segment::{NarrationUnit, Segmenter};
pub use crate::speech::engine::{EspeakEngine, SpeechEngine};
pub use crate::speech::synth::{SynthesizedClip, Synthesizer};
pub use crate::timeline::RenderTimeline;
pub use crate::visual::assign::{Assigner, SegmentAssignment};
pub use crate::visual::pool::{ImageAsset, ImagePool};
