//! Run manifest: what was rendered, where it came from, and how long it took to say.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::audio::track::NarrationTrack;
use crate::config::PipelineConfig;
use crate::foundation::core::UnitId;
use crate::foundation::error::SlidecastResult;
use crate::script::segment::NarrationUnit;
use crate::speech::synth::SynthesisOutcome;
use crate::visual::assign::AssignmentOutcome;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnitRecord {
    pub id: UnitId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub estimated_duration: f64,
    pub measured_duration: Option<f64>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub placeholder: bool,
    /// Speech failed and the unit was filled with silence.
    #[serde(default)]
    pub silence_padded: bool,
    pub clip_sha256: Option<String>,
    pub clip_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunManifest {
    pub tool_version: String,
    pub config: PipelineConfig,
    pub units: Vec<UnitRecord>,
    pub skipped_units: Vec<UnitId>,
    pub total_duration: f64,
    /// Description of the music bed, if any.
    pub music: Option<String>,
    pub output: Option<PathBuf>,
}

impl RunManifest {
    pub fn build(
        cfg: &PipelineConfig,
        units: &[NarrationUnit],
        synthesis: &SynthesisOutcome,
        track: &NarrationTrack,
        assignments: &AssignmentOutcome,
    ) -> Self {
        let records = units
            .iter()
            .map(|u| {
                let clip = synthesis.clips.iter().find(|c| c.unit_id == u.id);
                let timed = track.timed_unit(u.id);
                UnitRecord {
                    id: u.id,
                    text: u.text.clone(),
                    topic: u.topic.clone(),
                    estimated_duration: u.estimated_duration,
                    measured_duration: clip.map(|c| c.measured_duration),
                    start: timed.map(|t| t.start),
                    end: timed.map(|t| t.end),
                    images: assignments
                        .for_unit(u.id)
                        .map(|a| a.images.iter().map(|i| i.path.clone()).collect())
                        .unwrap_or_default(),
                    placeholder: assignments.placeholders.contains(&u.id),
                    silence_padded: clip.is_some_and(|c| c.silence_padded),
                    clip_sha256: clip.map(|c| c.sha256.clone()),
                    clip_path: clip.and_then(|c| c.artifact.clone()),
                }
            })
            .collect();

        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            config: cfg.clone(),
            units: records,
            skipped_units: synthesis.skipped.clone(),
            total_duration: track.total_duration(),
            music: None,
            output: None,
        }
    }

    pub fn write_json(&self, path: &Path) -> SlidecastResult<()> {
        let json = serde_json::to_vec_pretty(self).context("serialize run manifest")?;
        std::fs::write(path, json)
            .with_context(|| format!("write run manifest '{}'", path.display()))?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> SlidecastResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read run manifest '{}'", path.display()))?;
        Ok(serde_json::from_slice(&bytes)
            .with_context(|| format!("parse run manifest '{}'", path.display()))?)
    }
}
