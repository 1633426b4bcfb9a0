use super::*;
use crate::audio::track::TimedUnit;
use crate::foundation::core::UnitId;

const RATE: u32 = 100;

fn narration(secs: f64, level: f32) -> NarrationTrack {
    let frames = secs_to_samples(secs, RATE);
    NarrationTrack {
        pcm: AudioPcm::mono(RATE, vec![level; frames as usize]),
        units: vec![TimedUnit {
            unit_id: UnitId(0),
            start: 0.0,
            end: secs,
            start_sample: 0,
            end_sample: frames,
        }],
    }
}

fn settings() -> MixSettings {
    MixSettings {
        duck_gain: 0.25,
        loop_crossfade_secs: 1.0,
        fade_out_secs: 2.0,
    }
}

#[test]
fn short_music_is_looped_to_narration_length() {
    // 118 s of narration over a 90 s bed.
    let track = narration(118.0, 0.5);
    let music = AudioPcm::mono(RATE, vec![0.8; 90 * RATE as usize]);
    let mixed = mix(&track, Some(&music), settings()).unwrap();

    assert_eq!(mixed.frames(), track.pcm.frames());
    assert!((mixed.duration_secs() - 118.0).abs() < 1e-9);
    // Music audible past the first pass (sample at 100 s).
    let s = mixed.pcm.interleaved_f32[100 * RATE as usize];
    assert!(s > 0.5 + 1e-3, "sample {s}");
}

#[test]
fn long_music_is_trimmed_and_faded() {
    let track = narration(10.0, 0.0);
    let music = AudioPcm::mono(RATE, vec![0.6; 30 * RATE as usize]);
    let mixed = mix(&track, Some(&music), settings()).unwrap();

    assert_eq!(mixed.frames(), 10 * RATE as usize);
    let last = *mixed.pcm.interleaved_f32.last().unwrap();
    assert!(last.abs() < 1e-6);
    let mid = mixed.pcm.interleaved_f32[5 * RATE as usize];
    let late = mixed.pcm.interleaved_f32[9 * RATE as usize];
    assert!(late < mid);
}

#[test]
fn music_peak_is_ducked_relative_to_narration() {
    let track = narration(20.0, 0.8);
    let music = AudioPcm::mono(RATE, vec![1.0; 20 * RATE as usize]);
    let mixed = mix(&track, Some(&music), settings()).unwrap();

    assert!((mixed.music_gain - 0.2).abs() < 1e-6);
    // 0.8 narration + 0.2 music, no normalization needed.
    let s = mixed.pcm.interleaved_f32[RATE as usize];
    assert!((s - 1.0).abs() < 1e-5);
    assert!(mixed.pcm.peak() <= 1.0);
}

#[test]
fn silent_narration_falls_back_to_plain_gain() {
    let track = narration(5.0, 0.0);
    let music = AudioPcm::mono(RATE, vec![0.5; 5 * RATE as usize]);
    let mixed = mix(&track, Some(&music), settings()).unwrap();
    assert!((mixed.music_gain - 0.25).abs() < 1e-6);
}

#[test]
fn overloaded_mix_is_normalized() {
    let mut track = narration(4.0, 0.9);
    track.pcm.interleaved_f32[10] = 1.0;
    let music = AudioPcm::mono(RATE, vec![1.0; 4 * RATE as usize]);
    let mixed = mix(&track, Some(&music), settings()).unwrap();
    assert!(mixed.normalize_gain < 1.0);
    assert!(mixed.pcm.peak() <= 1.0 + 1e-6);
}

#[test]
fn no_music_passes_narration_through() {
    let track = narration(3.0, 0.3);
    let mixed = mix(&track, None, settings()).unwrap();
    assert_eq!(mixed.pcm, track.pcm);
    assert_eq!(mixed.music_gain, 0.0);
}

#[test]
fn music_at_other_rate_is_conformed() {
    let track = narration(2.0, 0.5);
    let music = AudioPcm {
        sample_rate: RATE * 2,
        channels: 2,
        interleaved_f32: vec![0.4; 2 * 2 * 2 * RATE as usize],
    };
    let mixed = mix(&track, Some(&music), settings()).unwrap();
    assert_eq!(mixed.frames(), 2 * RATE as usize);
}

#[test]
fn zero_length_narration_is_a_duration_mismatch() {
    let track = NarrationTrack {
        pcm: AudioPcm::mono(RATE, Vec::new()),
        units: Vec::new(),
    };
    let err = mix(&track, None, settings()).unwrap_err();
    assert!(matches!(err, SlidecastError::DurationMismatch(_)));
}

#[test]
fn fit_music_crossfades_loop_seam() {
    let music: Vec<f32> = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
    let out = fit_music(&music, 10, 2, 0);
    assert_eq!(out.len(), 10);
    // Seam overlaps the last two samples of the first pass with the first two of the next.
    assert!(out[4] > 0.0 && out[5] > out[4]);
    assert_eq!(out[6], 1.0);
}

#[test]
fn fit_music_handles_empty_bed() {
    assert_eq!(fit_music(&[], 5, 2, 2), vec![0.0; 5]);
}
