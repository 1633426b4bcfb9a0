use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Slide boundary transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    #[default]
    Crossfade,
    Cut,
}

/// What to do with a unit that cannot be synthesized or illustrated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Abort the run on the first failing unit.
    #[default]
    FailFast,
    /// Fill failed speech with silence or a failed image with a placeholder, log it and carry on.
    SkipAndLog,
}

/// Built-in music bed generators used when no music file is supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicGenerator {
    AmbientPad,
}

/// Voice selection handed to the speech engine.
///
/// Two configs with equal fields must render identical audio for identical text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Engine-specific voice name (an `espeak-ng` voice such as `en` or `en-us`).
    pub voice: String,
    /// Speaking rate in words per minute.
    pub rate: u32,
    /// Pitch adjustment, 0..=99 with 50 as neutral.
    pub pitch: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: "en".to_string(),
            rate: 165,
            pitch: 50,
        }
    }
}

impl VoiceConfig {
    pub fn named(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            ..Self::default()
        }
    }
}

/// All tunables of a pipeline run.
///
/// Every field has a default so partial JSON files are accepted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub words_per_second: f64,
    pub min_unit_duration: f64,
    pub images_per_seconds_interval: f64,
    pub music_duck_gain: f32,
    pub music_loop_crossfade_secs: f64,
    pub music_fade_out_secs: f64,
    pub music_generator: Option<MusicGenerator>,
    pub transition_type: TransitionType,
    pub transition_duration: f64,
    pub synthesis_retry_count: u32,
    pub synthesis_timeout_secs: f64,
    pub synthesis_threads: Option<usize>,
    pub strictness: Strictness,
    pub sample_rate: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub background_rgb: [u8; 3],
    pub duration_tolerance_secs: f64,
    pub voice: VoiceConfig,
    pub fallback_voice: Option<VoiceConfig>,
    pub write_captions: bool,
    /// Draw the captions onto the video frames (needs an `ffmpeg` built with libass).
    pub burn_captions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            words_per_second: 2.5,
            min_unit_duration: 1.5,
            images_per_seconds_interval: 4.0,
            music_duck_gain: 0.25,
            music_loop_crossfade_secs: 1.0,
            music_fade_out_secs: 2.0,
            music_generator: None,
            transition_type: TransitionType::Crossfade,
            transition_duration: 0.5,
            synthesis_retry_count: 1,
            synthesis_timeout_secs: 30.0,
            synthesis_threads: None,
            strictness: Strictness::FailFast,
            sample_rate: 48_000,
            fps: 30,
            width: 1280,
            height: 720,
            background_rgb: [0, 0, 0],
            duration_tolerance_secs: 0.05,
            voice: VoiceConfig::default(),
            fallback_voice: Some(VoiceConfig::named("en-us")),
            write_captions: true,
            burn_captions: false,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file, filling unspecified fields with defaults.
    pub fn from_json_file(path: &Path) -> SlidecastResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SlidecastResult<()> {
        fn positive(name: &str, v: f64) -> SlidecastResult<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(SlidecastError::validation(format!(
                    "{name} must be finite and > 0 (got {v})"
                )));
            }
            Ok(())
        }
        fn non_negative(name: &str, v: f64) -> SlidecastResult<()> {
            if !v.is_finite() || v < 0.0 {
                return Err(SlidecastError::validation(format!(
                    "{name} must be finite and >= 0 (got {v})"
                )));
            }
            Ok(())
        }

        positive("words_per_second", self.words_per_second)?;
        positive("min_unit_duration", self.min_unit_duration)?;
        positive("images_per_seconds_interval", self.images_per_seconds_interval)?;
        positive("synthesis_timeout_secs", self.synthesis_timeout_secs)?;
        positive("duration_tolerance_secs", self.duration_tolerance_secs)?;
        non_negative("transition_duration", self.transition_duration)?;
        non_negative("music_loop_crossfade_secs", self.music_loop_crossfade_secs)?;
        non_negative("music_fade_out_secs", self.music_fade_out_secs)?;

        if !self.music_duck_gain.is_finite() || !(0.0..=1.0).contains(&self.music_duck_gain) {
            return Err(SlidecastError::validation(
                "music_duck_gain must be within [0, 1]",
            ));
        }
        if self.sample_rate == 0 {
            return Err(SlidecastError::validation("sample_rate must be non-zero"));
        }
        if self.fps == 0 {
            return Err(SlidecastError::validation("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::validation(
                "width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(
                "width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if let Some(0) = self.synthesis_threads {
            return Err(SlidecastError::validation(
                "synthesis_threads must be >= 1 when set",
            ));
        }
        if self.voice.voice.trim().is_empty() {
            return Err(SlidecastError::validation("voice name must be non-empty"));
        }
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn frame_rate(&self) -> SlidecastResult<Fps> {
        Fps::new(self.fps, 1)
    }
}
