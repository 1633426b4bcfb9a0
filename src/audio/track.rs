use crate::audio::pcm::AudioPcm;
use crate::foundation::core::{UnitId, samples_to_secs};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::speech::synth::SynthesizedClip;

/// Position of one unit inside the narration track, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimedUnit {
    pub unit_id: UnitId,
    pub start: f64,
    pub end: f64, // exclusive
    /// First sample of the unit in the track.
    pub start_sample: u64,
    /// One past the last sample of the unit.
    pub end_sample: u64,
}

impl TimedUnit {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Concatenated narration waveform with per-unit boundaries.
#[derive(Clone, Debug)]
pub struct NarrationTrack {
    pub pcm: AudioPcm,
    /// Contiguous, ordered by unit id, covering `[0, total_duration)`.
    pub units: Vec<TimedUnit>,
}

impl NarrationTrack {
    /// Concatenate clips in unit-id order with no gaps.
    ///
    /// Clips may arrive in any order (e.g. worker completion order).
    #[tracing::instrument(skip_all, fields(clips = clips.len()))]
    pub fn build(mut clips: Vec<SynthesizedClip>) -> SlidecastResult<Self> {
        if clips.is_empty() {
            return Err(SlidecastError::validation(
                "narration track needs at least one clip",
            ));
        }
        clips.sort_by_key(|c| c.unit_id);
        if let Some(pair) = clips.windows(2).find(|w| w[0].unit_id == w[1].unit_id) {
            return Err(SlidecastError::validation(format!(
                "duplicate clip for unit {}",
                pair[0].unit_id
            )));
        }

        let sample_rate = clips[0].audio.sample_rate;
        let channels = clips[0].audio.channels;
        for clip in &clips {
            if clip.audio.is_empty() || clip.measured_duration <= 0.0 {
                return Err(SlidecastError::DegenerateClip {
                    unit_id: clip.unit_id,
                });
            }
            if clip.audio.sample_rate != sample_rate || clip.audio.channels != channels {
                return Err(SlidecastError::validation(format!(
                    "unit {} clip format {} Hz/{} ch differs from {} Hz/{} ch",
                    clip.unit_id,
                    clip.audio.sample_rate,
                    clip.audio.channels,
                    sample_rate,
                    channels
                )));
            }
        }

        let total_len: usize = clips.iter().map(|c| c.audio.interleaved_f32.len()).sum();
        let mut samples = Vec::with_capacity(total_len);
        let mut units = Vec::with_capacity(clips.len());
        let mut cursor = 0u64;
        for clip in &clips {
            let frames = clip.audio.frames() as u64;
            let next = cursor + frames;
            units.push(TimedUnit {
                unit_id: clip.unit_id,
                start: samples_to_secs(cursor, sample_rate),
                end: samples_to_secs(next, sample_rate),
                start_sample: cursor,
                end_sample: next,
            });
            samples.extend_from_slice(&clip.audio.interleaved_f32);
            cursor = next;
        }

        let track = Self {
            pcm: AudioPcm {
                sample_rate,
                channels,
                interleaved_f32: samples,
            },
            units,
        };
        tracing::info!(
            units = track.units.len(),
            seconds = track.total_duration(),
            "built narration track"
        );
        Ok(track)
    }

    pub fn total_samples(&self) -> u64 {
        self.pcm.frames() as u64
    }

    pub fn total_duration(&self) -> f64 {
        self.pcm.duration_secs()
    }

    pub fn sample_rate(&self) -> u32 {
        self.pcm.sample_rate
    }

    pub fn timed_unit(&self, id: UnitId) -> Option<&TimedUnit> {
        self.units.iter().find(|u| u.unit_id == id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/track.rs"]
mod tests;
