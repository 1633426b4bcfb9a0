use std::sync::Mutex;

use super::*;

/// Deterministic engine: 0.1 s of constant tone per character at 1 kHz sample rate.
struct CharLengthEngine;

impl SpeechEngine for CharLengthEngine {
    fn name(&self) -> &str {
        "char-length"
    }

    fn render(&self, text: &str, _voice: &VoiceConfig) -> anyhow::Result<AudioPcm> {
        Ok(AudioPcm::mono(1_000, vec![0.5; text.chars().count() * 100]))
    }
}

/// Fails for one voice name, records every voice it was asked for.
struct VoiceSensitiveEngine {
    broken_voice: String,
    calls: Mutex<Vec<String>>,
}

impl SpeechEngine for VoiceSensitiveEngine {
    fn name(&self) -> &str {
        "voice-sensitive"
    }

    fn render(&self, text: &str, voice: &VoiceConfig) -> anyhow::Result<AudioPcm> {
        self.calls.lock().unwrap().push(voice.voice.clone());
        anyhow::ensure!(voice.voice != self.broken_voice, "voice unavailable");
        Ok(AudioPcm::mono(1_000, vec![0.1; text.len() * 10]))
    }
}

/// Returns empty audio for texts containing "silent", errors for texts containing "boom".
struct SelectiveEngine;

impl SpeechEngine for SelectiveEngine {
    fn name(&self) -> &str {
        "selective"
    }

    fn render(&self, text: &str, _voice: &VoiceConfig) -> anyhow::Result<AudioPcm> {
        anyhow::ensure!(!text.contains("boom"), "engine crashed");
        if text.contains("silent") {
            return Ok(AudioPcm::mono(1_000, Vec::new()));
        }
        Ok(AudioPcm::mono(1_000, vec![0.2; 500]))
    }
}

fn cfg() -> PipelineConfig {
    PipelineConfig {
        sample_rate: 1_000,
        synthesis_threads: Some(3),
        ..PipelineConfig::default()
    }
}

fn unit(id: u32, text: &str) -> NarrationUnit {
    NarrationUnit {
        id: UnitId(id),
        text: text.to_string(),
        estimated_duration: 1.5,
        topic: None,
    }
}

#[test]
fn measured_duration_comes_from_samples() {
    let engine = CharLengthEngine;
    let synth = Synthesizer::new(&engine, &cfg());
    let clip = synth
        .synthesize(&unit(1, "Hello."), &VoiceConfig::default())
        .unwrap();
    assert_eq!(clip.audio.frames(), 600);
    assert!((clip.measured_duration - 0.6).abs() < 1e-12);
    assert!(clip.artifact.is_none());
}

#[test]
fn synthesis_is_deterministic() {
    let engine = CharLengthEngine;
    let synth = Synthesizer::new(&engine, &cfg());
    let a = synth
        .synthesize(&unit(1, "Same text."), &VoiceConfig::default())
        .unwrap();
    let b = synth
        .synthesize(&unit(1, "Same text."), &VoiceConfig::default())
        .unwrap();
    assert_eq!(a.sha256, b.sha256);
    assert_eq!(a.audio, b.audio);
}

#[test]
fn resamples_engine_output_to_pipeline_rate() {
    let engine = CharLengthEngine;
    let cfg = PipelineConfig {
        sample_rate: 2_000,
        ..cfg()
    };
    let clip = Synthesizer::new(&engine, &cfg)
        .synthesize(&unit(1, "Hi."), &VoiceConfig::default())
        .unwrap();
    assert_eq!(clip.audio.sample_rate, 2_000);
    assert_eq!(clip.audio.frames(), 600);
}

#[test]
fn retries_with_fallback_voice() {
    let engine = VoiceSensitiveEngine {
        broken_voice: "en".to_string(),
        calls: Mutex::new(Vec::new()),
    };
    let clip = Synthesizer::new(&engine, &cfg())
        .synthesize(&unit(3, "Retry me."), &VoiceConfig::named("en"))
        .unwrap();
    assert_eq!(clip.unit_id, UnitId(3));
    assert_eq!(*engine.calls.lock().unwrap(), vec!["en", "en-us"]);
}

#[test]
fn surfaces_synthesis_error_after_retries() {
    let engine = VoiceSensitiveEngine {
        broken_voice: "en".to_string(),
        calls: Mutex::new(Vec::new()),
    };
    let cfg = PipelineConfig {
        fallback_voice: None,
        synthesis_retry_count: 1,
        ..cfg()
    };
    let err = Synthesizer::new(&engine, &cfg)
        .synthesize(&unit(5, "Never works."), &VoiceConfig::named("en"))
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Synthesis { unit_id: UnitId(5), .. }));
    assert!(err.to_string().contains("voice unavailable"));
    assert_eq!(engine.calls.lock().unwrap().len(), 2);
}

#[test]
fn zero_length_audio_is_a_synthesis_error() {
    let engine = SelectiveEngine;
    let err = Synthesizer::new(&engine, &cfg())
        .synthesize(&unit(2, "A silent line."), &VoiceConfig::default())
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Synthesis { unit_id: UnitId(2), .. }));
    assert!(err.to_string().contains("zero-length"));
}

#[test]
fn writes_one_artifact_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let engine = CharLengthEngine;
    let synth = Synthesizer::new(&engine, &cfg()).with_artifact_dir(dir.path());
    let clip = synth
        .synthesize(&unit(7, "Saved."), &VoiceConfig::default())
        .unwrap();
    let path = clip.artifact.unwrap();
    assert_eq!(path, dir.path().join("unit_007.wav"));
    let back = crate::audio::pcm::read_wav(&path).unwrap();
    assert_eq!(back, clip.audio);
}

#[test]
fn pool_results_come_back_in_unit_order() {
    let engine = CharLengthEngine;
    let units: Vec<NarrationUnit> = (1..=12)
        .map(|i| unit(i, &"x".repeat(i as usize)))
        .collect();
    let outcome = Synthesizer::new(&engine, &cfg())
        .synthesize_all(&units, &VoiceConfig::default(), Strictness::FailFast)
        .unwrap();
    let ids: Vec<u32> = outcome.clips.iter().map(|c| c.unit_id.0).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    assert!(outcome.skipped.is_empty());
}

#[test]
fn fail_fast_reports_lowest_failing_unit() {
    let engine = SelectiveEngine;
    let units = vec![unit(1, "fine."), unit(2, "boom."), unit(3, "boom again.")];
    let err = Synthesizer::new(&engine, &cfg())
        .synthesize_all(&units, &VoiceConfig::default(), Strictness::FailFast)
        .unwrap_err();
    assert_eq!(err.unit_id(), Some(UnitId(2)));
}

#[test]
fn skip_and_log_pads_failing_units_with_silence() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SelectiveEngine;
    let mut units = vec![unit(1, "fine."), unit(2, "boom."), unit(3, "also fine.")];
    units[1].estimated_duration = 2.25;
    let outcome = Synthesizer::new(&engine, &cfg())
        .with_artifact_dir(dir.path())
        .synthesize_all(&units, &VoiceConfig::default(), Strictness::SkipAndLog)
        .unwrap();
    let ids: Vec<UnitId> = outcome.clips.iter().map(|c| c.unit_id).collect();
    assert_eq!(ids, vec![UnitId(1), UnitId(2), UnitId(3)]);
    assert_eq!(outcome.skipped, vec![UnitId(2)]);

    let padded = &outcome.clips[1];
    assert!(padded.silence_padded);
    assert_eq!(padded.audio.frames(), 2_250);
    assert!((padded.measured_duration - 2.25).abs() < 1e-12);
    assert_eq!(padded.audio.peak(), 0.0);
    assert!(padded.artifact.as_ref().unwrap().exists());
    assert!(!outcome.clips[0].silence_padded);
}

#[test]
fn skip_and_log_with_nothing_left_is_an_error() {
    let engine = SelectiveEngine;
    let units = vec![unit(1, "boom.")];
    let err = Synthesizer::new(&engine, &cfg())
        .synthesize_all(&units, &VoiceConfig::default(), Strictness::SkipAndLog)
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Synthesis { .. }));
}
