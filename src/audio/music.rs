use std::f64::consts::TAU;
use std::path::PathBuf;

use crate::audio::pcm::{AudioPcm, read_wav};
use crate::foundation::core::secs_to_samples;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Black-box music bed provider.
///
/// The returned waveform has whatever length the source produces; the mixer fits it to the
/// narration.
pub trait MusicSource {
    fn describe(&self) -> String;

    /// Produce a waveform. `duration_hint_secs` is advisory.
    fn generate(&self, duration_hint_secs: f64, sample_rate: u32) -> SlidecastResult<AudioPcm>;
}

/// Music read from a WAV file (e.g. the output of a generative music model).
#[derive(Clone, Debug)]
pub struct WavMusic {
    pub path: PathBuf,
}

impl WavMusic {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MusicSource for WavMusic {
    fn describe(&self) -> String {
        format!("wav:{}", self.path.display())
    }

    fn generate(&self, _duration_hint_secs: f64, _sample_rate: u32) -> SlidecastResult<AudioPcm> {
        read_wav(&self.path)
    }
}

/// Procedural ambient pad: a slow minor progression of detuned sine chords.
///
/// Fixed length, fully deterministic. Useful when no generated music is available.
#[derive(Clone, Debug)]
pub struct AmbientPad {
    /// Length of the rendered loop in seconds.
    pub loop_secs: f64,
    /// Seconds each chord is held.
    pub chord_secs: f64,
    /// Overlap between consecutive chords.
    pub chord_crossfade_secs: f64,
}

impl Default for AmbientPad {
    fn default() -> Self {
        Self {
            loop_secs: 32.0,
            chord_secs: 8.0,
            chord_crossfade_secs: 1.5,
        }
    }
}

/// (root MIDI note, intervals): Cm7, Dm, G, Fm.
const PROGRESSION: [(i32, &[i32]); 4] = [
    (48, &[0, 3, 7, 10]),
    (50, &[0, 3, 7]),
    (55, &[0, 4, 7]),
    (53, &[0, 3, 7]),
];

const DETUNE_CENTS: [f64; 3] = [0.0, -4.0, 6.0];

fn midi_to_hz(midi: i32) -> f64 {
    440.0 * 2f64.powf(f64::from(midi - 69) / 12.0)
}

impl AmbientPad {
    fn chord_sample(chord: usize, t: f64) -> f64 {
        let (root, intervals) = PROGRESSION[chord % PROGRESSION.len()];
        let mut acc = 0.0;
        for iv in intervals {
            let base = midi_to_hz(root + iv);
            for cents in DETUNE_CENTS {
                let hz = base * 2f64.powf(cents / 1200.0);
                acc += (TAU * hz * t).sin();
            }
        }
        acc / (intervals.len() * DETUNE_CENTS.len()) as f64
    }
}

impl MusicSource for AmbientPad {
    fn describe(&self) -> String {
        format!("ambient_pad:{}s", self.loop_secs)
    }

    fn generate(&self, _duration_hint_secs: f64, sample_rate: u32) -> SlidecastResult<AudioPcm> {
        if !(self.loop_secs > 0.0 && self.chord_secs > 0.0) || sample_rate == 0 {
            return Err(SlidecastError::validation(
                "ambient pad needs positive loop/chord lengths and sample rate",
            ));
        }
        let frames = secs_to_samples(self.loop_secs, sample_rate) as usize;
        let xf = self.chord_crossfade_secs.clamp(0.0, self.chord_secs / 2.0);
        let edge = 3.0f64.min(self.loop_secs / 4.0);

        let mut samples = Vec::with_capacity(frames);
        for i in 0..frames {
            let t = i as f64 / f64::from(sample_rate);
            let chord = (t / self.chord_secs).floor() as usize;
            let pos = t - chord as f64 * self.chord_secs;

            let mut v = Self::chord_sample(chord, t);
            if xf > 0.0 && pos > self.chord_secs - xf {
                let w = (pos - (self.chord_secs - xf)) / xf;
                v = v * (1.0 - w) + Self::chord_sample(chord + 1, t) * w;
            }

            let fade_in = (t / edge).min(1.0);
            let fade_out = ((self.loop_secs - t) / edge).clamp(0.0, 1.0);
            samples.push((v * fade_in * fade_out) as f32);
        }

        // Normalize to -3 dBFS.
        let mut pcm = AudioPcm::mono(sample_rate, samples);
        let peak = pcm.peak();
        if peak > 0.0 {
            let gain = 0.708 / peak;
            for s in &mut pcm.interleaved_f32 {
                *s *= gain;
            }
        }
        Ok(pcm)
    }
}
