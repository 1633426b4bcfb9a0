use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::mix::MixedAudioTrack;
use crate::audio::pcm::write_f32le;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::frame::FrameRgba;

/// Everything an encoder needs before the first frame arrives.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    /// Mixed audio to mux as the only audio stream.
    pub soundtrack: Option<StagedSoundtrack>,
    /// SubRip file to draw onto the frames.
    pub burned_captions: Option<PathBuf>,
}

/// The mixed soundtrack written out as raw interleaved `f32le` samples for the encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedSoundtrack {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

impl StagedSoundtrack {
    /// Write `mix` to `path`.
    pub fn write(mix: &MixedAudioTrack, path: &Path) -> SlidecastResult<Self> {
        let pcm = &mix.pcm;
        if pcm.sample_rate == 0 || pcm.channels == 0 {
            return Err(SlidecastError::validation(format!(
                "soundtrack needs a sample rate and channels (got {} Hz/{} ch)",
                pcm.sample_rate, pcm.channels
            )));
        }
        write_f32le(&pcm.interleaved_f32, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sample_rate: pcm.sample_rate,
            channels: pcm.channels,
            frames: pcm.frames(),
        })
    }
}

/// Consumer of rendered frames.
pub trait FrameSink {
    fn begin(&mut self, cfg: &SinkConfig) -> SlidecastResult<()>;
    /// Frames arrive in timeline order, one call per frame.
    fn push_frame(&mut self, frame: &Arc<FrameRgba>) -> SlidecastResult<()>;
    /// Flush and close. Returns how many frames were accepted.
    fn end(&mut self) -> SlidecastResult<u64>;
}

/// Keeps every pushed frame. Used for previews and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    cfg: Option<SinkConfig>,
    frames: Vec<Arc<FrameRgba>>,
    closed: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[Arc<FrameRgba>] {
        &self.frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSink for RecordingSink {
    fn begin(&mut self, cfg: &SinkConfig) -> SlidecastResult<()> {
        *self = Self {
            cfg: Some(cfg.clone()),
            ..Self::default()
        };
        Ok(())
    }

    fn push_frame(&mut self, frame: &Arc<FrameRgba>) -> SlidecastResult<()> {
        if self.cfg.is_none() || self.closed {
            return Err(SlidecastError::render("recording sink is not open"));
        }
        self.frames.push(Arc::clone(frame));
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<u64> {
        self.closed = true;
        Ok(self.frames.len() as u64)
    }
}
