//! End-to-end run: script in, MP4 out.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::audio::mix::{MixSettings, MixedAudioTrack, mix};
use crate::audio::music::{AmbientPad, MusicSource, WavMusic};
use crate::audio::pcm::{AudioPcm, write_wav};
use crate::audio::track::NarrationTrack;
use crate::captions::write_srt;
use crate::config::{MusicGenerator, PipelineConfig};
use crate::foundation::error::SlidecastResult;
use crate::manifest::RunManifest;
use crate::render::compositor::{Mp4Target, RenderReport, RenderThreading, render_mp4};
use crate::script::input::load_script;
use crate::script::segment::{NarrationUnit, Segmenter};
use crate::speech::engine::SpeechEngine;
use crate::speech::synth::Synthesizer;
use crate::timeline::RenderTimeline;
use crate::visual::assign::Assigner;
use crate::visual::pool::ImagePool;

/// Files a run reads and writes.
#[derive(Clone, Debug)]
pub struct PipelineInputs {
    /// Narration script (`.txt` or `.json` sections).
    pub script: PathBuf,
    /// Image pool JSON.
    pub images: PathBuf,
    /// Optional music bed WAV. Falls back to `music_generator` when unset.
    pub music: Option<PathBuf>,
    /// Final MP4 path.
    pub output: PathBuf,
    /// Directory for intermediate artifacts and the manifest.
    pub work_dir: PathBuf,
}

/// Paths produced by a successful run.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub video: PathBuf,
    pub captions: Option<PathBuf>,
    pub manifest: PathBuf,
    pub narration_wav: PathBuf,
    pub mix_wav: PathBuf,
    pub render: RenderReport,
}

impl PipelineInputs {
    pub fn speech_dir(&self) -> PathBuf {
        self.work_dir.join("speech")
    }

    pub fn captions_path(&self) -> PathBuf {
        sidecar(&self.output, "captions.srt")
    }

    /// Where the SRT goes: next to the video when it is kept, otherwise in the work dir for
    /// burning only.
    fn srt_path(&self, cfg: &PipelineConfig) -> Option<PathBuf> {
        if cfg.write_captions {
            Some(self.captions_path())
        } else if cfg.burn_captions {
            Some(self.work_dir.join("captions.srt"))
        } else {
            None
        }
    }
}

fn sidecar(output: &Path, name: &str) -> PathBuf {
    match output.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Load and segment a script.
pub fn segment_script(path: &Path, cfg: &PipelineConfig) -> SlidecastResult<Vec<NarrationUnit>> {
    let sections = load_script(path)?;
    Segmenter::from_config(cfg)?.segment_sections(&sections)
}

/// Pick the music bed: an explicit file wins over the configured generator.
pub fn music_source(
    music: Option<&Path>,
    cfg: &PipelineConfig,
) -> Option<Box<dyn MusicSource>> {
    match (music, cfg.music_generator) {
        (Some(path), _) => Some(Box::new(WavMusic::new(path))),
        (None, Some(MusicGenerator::AmbientPad)) => Some(Box::new(AmbientPad::default())),
        (None, None) => None,
    }
}

/// Run every stage and write the video, captions and work-dir artifacts.
#[tracing::instrument(skip_all, fields(script = %inputs.script.display(), out = %inputs.output.display()))]
pub fn run(
    inputs: &PipelineInputs,
    cfg: &PipelineConfig,
    engine: &dyn SpeechEngine,
) -> SlidecastResult<PipelineOutput> {
    cfg.validate()?;
    std::fs::create_dir_all(&inputs.work_dir)
        .with_context(|| format!("create work dir '{}'", inputs.work_dir.display()))?;

    let units = segment_script(&inputs.script, cfg)?;
    tracing::info!(units = units.len(), "segmented script");
    let pool = ImagePool::from_json_file(&inputs.images)?;

    let synthesis = Synthesizer::new(engine, cfg)
        .with_artifact_dir(inputs.speech_dir())
        .synthesize_all(&units, &cfg.voice, cfg.strictness)?;

    let track = NarrationTrack::build(synthesis.clips.clone())?;
    let narration_wav = inputs.work_dir.join("narration.wav");
    write_wav(&track.pcm, &narration_wav)?;

    let assignments = Assigner::from_config(cfg)?
        .with_existing_files()
        .assign_timed(&units, &track, &pool, cfg.strictness)?;

    let source = music_source(inputs.music.as_deref(), cfg);
    let music: Option<AudioPcm> = match source.as_deref() {
        Some(src) => {
            tracing::info!(music = %src.describe(), "loading music bed");
            Some(src.generate(track.total_duration(), cfg.sample_rate)?)
        }
        None => None,
    };
    let mixed: MixedAudioTrack = mix(&track, music.as_ref(), MixSettings::from(cfg))?;
    let mix_wav = inputs.work_dir.join("mix.wav");
    write_wav(&mixed.pcm, &mix_wav)?;

    let srt = inputs.srt_path(cfg);
    if let Some(path) = &srt {
        write_srt(path, &track, &units)?;
    }

    let timeline = RenderTimeline::build(&track, &assignments, cfg)?;
    let target = Mp4Target {
        path: inputs.output.clone(),
        tolerance_secs: cfg.duration_tolerance_secs,
        burned_captions: srt.clone().filter(|_| cfg.burn_captions),
    };
    let render = render_mp4(&timeline, &mixed, &target, &RenderThreading::default())?;
    let captions = srt.filter(|_| cfg.write_captions);

    let mut manifest = RunManifest::build(cfg, &units, &synthesis, &track, &assignments);
    manifest.music = source.as_ref().map(|s| s.describe());
    manifest.output = Some(render.output.clone());
    let manifest_path = inputs.work_dir.join("manifest.json");
    manifest.write_json(&manifest_path)?;

    tracing::info!(
        video = %render.output.display(),
        seconds = render.video_duration,
        skipped = synthesis.skipped.len(),
        placeholders = assignments.placeholders.len(),
        "run complete"
    );
    Ok(PipelineOutput {
        video: render.output.clone(),
        captions,
        manifest: manifest_path,
        narration_wav,
        mix_wav,
        render,
    })
}
