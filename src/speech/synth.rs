use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::Digest as _;

use crate::audio::pcm::{AudioPcm, write_wav};
use crate::config::{PipelineConfig, Strictness, VoiceConfig};
use crate::foundation::core::{UnitId, build_thread_pool, samples_to_secs, secs_to_samples};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::script::segment::NarrationUnit;
use crate::speech::engine::SpeechEngine;

/// Rendered speech for one narration unit.
#[derive(Clone, Debug)]
pub struct SynthesizedClip {
    pub unit_id: UnitId,
    /// Mono PCM at the pipeline sample rate.
    pub audio: AudioPcm,
    /// Seconds, measured from the rendered samples. Authoritative for timing.
    pub measured_duration: f64,
    /// WAV artifact written for this unit, when an artifact directory is configured.
    pub artifact: Option<PathBuf>,
    /// SHA-256 of the little-endian sample bytes, for reproducibility checks.
    pub sha256: String,
    /// Silence standing in for a unit the engine could not render.
    pub silence_padded: bool,
}

/// Result of synthesizing a batch of units.
#[derive(Debug, Default)]
pub struct SynthesisOutcome {
    /// Clips in unit-id order, one per unit.
    pub clips: Vec<SynthesizedClip>,
    /// Units whose speech failed under [`Strictness::SkipAndLog`] and were filled with silence.
    pub skipped: Vec<UnitId>,
}

/// Renders narration units through a [`SpeechEngine`] with retry and a fallback voice.
pub struct Synthesizer<'a> {
    engine: &'a dyn SpeechEngine,
    sample_rate: u32,
    retry_count: u32,
    fallback_voice: Option<VoiceConfig>,
    artifact_dir: Option<PathBuf>,
    threads: Option<usize>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(engine: &'a dyn SpeechEngine, cfg: &PipelineConfig) -> Self {
        Self {
            engine,
            sample_rate: cfg.sample_rate,
            retry_count: cfg.synthesis_retry_count,
            fallback_voice: cfg.fallback_voice.clone(),
            artifact_dir: None,
            threads: cfg.synthesis_threads,
        }
    }

    /// Write one `unit_XXX.wav` per synthesized unit into `dir`.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Render one unit. Attempt 0 uses `voice`; retries use the fallback voice when configured.
    #[tracing::instrument(skip_all, fields(unit = %unit.id))]
    pub fn synthesize(
        &self,
        unit: &NarrationUnit,
        voice: &VoiceConfig,
    ) -> SlidecastResult<SynthesizedClip> {
        let mut last_err = String::from("no synthesis attempt was made");
        for attempt in 0..=self.retry_count {
            let attempt_voice = if attempt == 0 {
                voice
            } else {
                self.fallback_voice.as_ref().unwrap_or(voice)
            };

            match self.render_once(&unit.text, attempt_voice) {
                Ok(audio) => return self.finish(unit.id, audio),
                Err(e) => {
                    last_err = format!("{e:#}");
                    tracing::warn!(
                        attempt,
                        voice = %attempt_voice.voice,
                        error = %last_err,
                        "speech engine attempt failed"
                    );
                }
            }
        }
        Err(SlidecastError::synthesis(unit.id, last_err))
    }

    fn render_once(&self, text: &str, voice: &VoiceConfig) -> anyhow::Result<AudioPcm> {
        let raw = self.engine.render(text, voice)?;
        let audio = raw.conform_mono(self.sample_rate)?;
        anyhow::ensure!(
            !audio.is_empty(),
            "{} returned zero-length audio",
            self.engine.name()
        );
        Ok(audio)
    }

    fn finish(&self, unit_id: UnitId, audio: AudioPcm) -> SlidecastResult<SynthesizedClip> {
        let measured_duration = samples_to_secs(audio.frames() as u64, audio.sample_rate);
        let sha256 = pcm_sha256(&audio);

        let artifact = match self.artifact_dir.as_deref() {
            Some(dir) => {
                let path = clip_path(dir, unit_id);
                write_wav(&audio, &path)?;
                Some(path)
            }
            None => None,
        };

        tracing::debug!(unit = %unit_id, seconds = measured_duration, "synthesized clip");
        Ok(SynthesizedClip {
            unit_id,
            audio,
            measured_duration,
            artifact,
            sha256,
            silence_padded: false,
        })
    }

    /// Silent clip lasting the unit's estimated duration, so it keeps its slot in the track.
    fn silence_for(&self, unit: &NarrationUnit) -> SlidecastResult<SynthesizedClip> {
        let frames = secs_to_samples(unit.estimated_duration, self.sample_rate).max(1) as usize;
        let mut clip = self.finish(unit.id, AudioPcm::silence(self.sample_rate, 1, frames))?;
        clip.silence_padded = true;
        Ok(clip)
    }

    /// Render all units on a bounded worker pool and return clips in unit-id order.
    ///
    /// Under [`Strictness::FailFast`] the failure of the lowest unit id is returned; under
    /// [`Strictness::SkipAndLog`] failing units get a silent clip of their estimated duration and
    /// are listed in `skipped`. A batch where every unit failed is still an error.
    #[tracing::instrument(skip_all, fields(units = units.len()))]
    pub fn synthesize_all(
        &self,
        units: &[NarrationUnit],
        voice: &VoiceConfig,
        strictness: Strictness,
    ) -> SlidecastResult<SynthesisOutcome> {
        let pool = build_thread_pool(self.threads, "synthesis")?;
        let mut results: Vec<(UnitId, SlidecastResult<SynthesizedClip>)> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| (unit.id, self.synthesize(unit, voice)))
                .collect()
        });
        // Completion order is irrelevant; assembly order is unit-id order.
        results.sort_by_key(|(id, _)| *id);

        let mut outcome = SynthesisOutcome::default();
        let mut first_err = None;
        for (unit, (id, res)) in units_by_id(units).into_iter().zip(results) {
            debug_assert_eq!(unit.id, id);
            match res {
                Ok(clip) => outcome.clips.push(clip),
                Err(e) if strictness == Strictness::FailFast => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        unit = %id,
                        error = %e,
                        seconds = unit.estimated_duration,
                        "speech failed; padding unit with silence"
                    );
                    outcome.clips.push(self.silence_for(unit)?);
                    outcome.skipped.push(id);
                    first_err.get_or_insert(e);
                }
            }
        }

        if outcome.skipped.len() == units.len()
            && let Some(e) = first_err
        {
            return Err(e);
        }
        tracing::info!(
            clips = outcome.clips.len(),
            skipped = outcome.skipped.len(),
            "synthesis finished"
        );
        Ok(outcome)
    }
}

fn units_by_id(units: &[NarrationUnit]) -> Vec<&NarrationUnit> {
    let mut sorted: Vec<&NarrationUnit> = units.iter().collect();
    sorted.sort_by_key(|u| u.id);
    sorted
}

/// Artifact path for a unit's clip inside `dir`.
pub fn clip_path(dir: &Path, unit_id: UnitId) -> PathBuf {
    dir.join(format!("unit_{:03}.wav", unit_id.0))
}

fn pcm_sha256(pcm: &AudioPcm) -> String {
    let mut hasher = sha2::Sha256::new();
    for s in &pcm.interleaved_f32 {
        hasher.update(s.to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/speech/synth.rs"]
mod tests;
