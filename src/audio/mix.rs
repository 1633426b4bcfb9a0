use crate::audio::pcm::AudioPcm;
use crate::audio::track::NarrationTrack;
use crate::config::PipelineConfig;
use crate::foundation::core::{samples_to_secs, secs_to_samples};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Mixer tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixSettings {
    /// Music peak relative to narration peak.
    pub duck_gain: f32,
    /// Overlap used when looping a short music bed.
    pub loop_crossfade_secs: f64,
    /// Fade applied to the tail of the fitted music.
    pub fade_out_secs: f64,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for MixSettings {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            duck_gain: cfg.music_duck_gain,
            loop_crossfade_secs: cfg.music_loop_crossfade_secs,
            fade_out_secs: cfg.music_fade_out_secs,
        }
    }
}

/// Final soundtrack: exactly as long as the narration, samples in `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct MixedAudioTrack {
    pub pcm: AudioPcm,
    /// Linear gain applied to the fitted music (0 when there is none).
    pub music_gain: f32,
    /// Gain applied after summing to keep the peak at or below 1.
    pub normalize_gain: f32,
}

impl MixedAudioTrack {
    pub fn duration_secs(&self) -> f64 {
        self.pcm.duration_secs()
    }

    pub fn frames(&self) -> usize {
        self.pcm.frames()
    }
}

/// Mix `music` under the narration, fitted to the narration length and ducked.
///
/// Without music the narration passes through (clamped).
#[tracing::instrument(skip_all, fields(has_music = music.is_some()))]
pub fn mix(
    narration: &NarrationTrack,
    music: Option<&AudioPcm>,
    settings: MixSettings,
) -> SlidecastResult<MixedAudioTrack> {
    let target_frames = narration.pcm.frames();
    if target_frames == 0 || narration.total_duration() <= 0.0 {
        return Err(SlidecastError::duration_mismatch(
            "narration track has zero duration",
        ));
    }
    let sample_rate = narration.sample_rate();
    let channels = usize::from(narration.pcm.channels.max(1));

    let mut out = narration.pcm.interleaved_f32.clone();
    let mut music_gain = 0.0f32;

    if let Some(music) = music {
        let music = music.conform_mono(sample_rate)?;
        let fitted = fit_music(
            &music.interleaved_f32,
            target_frames,
            secs_to_samples(settings.loop_crossfade_secs, sample_rate) as usize,
            secs_to_samples(settings.fade_out_secs, sample_rate) as usize,
        );

        music_gain = duck_gain(narration.pcm.peak(), peak_of(&fitted), settings.duck_gain);
        for (frame, &m) in fitted.iter().enumerate() {
            let base = frame * channels;
            for s in &mut out[base..base + channels] {
                *s += m * music_gain;
            }
        }
    }

    let peak = peak_of(&out);
    let normalize_gain = if peak > 1.0 { 1.0 / peak } else { 1.0 };
    for s in &mut out {
        *s = (*s * normalize_gain).clamp(-1.0, 1.0);
    }

    let pcm = AudioPcm {
        sample_rate,
        channels: narration.pcm.channels,
        interleaved_f32: out,
    };
    if pcm.frames() != target_frames {
        return Err(SlidecastError::duration_mismatch(format!(
            "mixed audio has {} frames, narration has {target_frames}",
            pcm.frames()
        )));
    }

    tracing::info!(
        seconds = samples_to_secs(target_frames as u64, sample_rate),
        music_gain,
        normalize_gain,
        "mixed soundtrack"
    );
    Ok(MixedAudioTrack {
        pcm,
        music_gain,
        normalize_gain,
    })
}

/// Loop (with crossfade) or trim mono `music` to exactly `target` samples, then fade the tail.
///
/// The loop crossfade is bounded to half the music length.
pub fn fit_music(
    music: &[f32],
    target: usize,
    crossfade: usize,
    fade_out: usize,
) -> Vec<f32> {
    if music.is_empty() {
        tracing::warn!("music bed is empty; mixing silence");
        return vec![0.0; target];
    }

    let mut out: Vec<f32> = Vec::with_capacity(target + music.len());
    out.extend_from_slice(music);

    let xf = crossfade.min(music.len() / 2);
    while out.len() < target {
        let tail = out.len() - xf;
        for k in 0..xf {
            let w = (k + 1) as f32 / (xf + 1) as f32;
            out[tail + k] = out[tail + k] * (1.0 - w) + music[k] * w;
        }
        out.extend_from_slice(&music[xf..]);
    }
    out.truncate(target);

    let fade = fade_out.min(target);
    for (i, s) in out[target - fade..].iter_mut().enumerate() {
        *s *= fade_gain(fade - i, fade);
    }
    out
}

/// Linear fade gain with `remaining` samples left out of `len`.
fn fade_gain(remaining: usize, len: usize) -> f32 {
    if len == 0 {
        return 1.0;
    }
    ((remaining - 1) as f32 / len as f32).clamp(0.0, 1.0)
}

/// Gain that puts the music peak at `duck` times the narration peak.
///
/// Falls back to the plain `duck` gain when either side is silent.
fn duck_gain(narration_peak: f32, music_peak: f32, duck: f32) -> f32 {
    if narration_peak > 0.0 && music_peak > 0.0 {
        duck * narration_peak / music_peak
    } else {
        duck
    }
}

fn peak_of(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
