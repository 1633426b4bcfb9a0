use super::*;

fn clip(id: u32, frames: usize, sample_rate: u32) -> SynthesizedClip {
    SynthesizedClip {
        unit_id: UnitId(id),
        audio: AudioPcm::mono(sample_rate, vec![0.1; frames]),
        measured_duration: samples_to_secs(frames as u64, sample_rate),
        artifact: None,
        sha256: String::new(),
        silence_padded: false,
    }
}

#[test]
fn boundaries_follow_measured_durations() {
    let track = NarrationTrack::build(vec![clip(1, 2_100, 1_000), clip(2, 3_400, 1_000)]).unwrap();
    assert_eq!(track.units.len(), 2);
    assert_eq!(track.units[0].start, 0.0);
    assert!((track.units[0].end - 2.1).abs() < 1e-12);
    assert_eq!(track.units[0].end, track.units[1].start);
    assert!((track.units[1].end - 5.5).abs() < 1e-12);
    assert!((track.total_duration() - 5.5).abs() < 1e-12);
}

#[test]
fn total_duration_is_sum_of_clips_and_intervals_are_contiguous() {
    let clips: Vec<SynthesizedClip> = (1..=9).map(|i| clip(i, 1_000 + 37 * i as usize, 44_100)).collect();
    let sum: f64 = clips.iter().map(|c| c.measured_duration).sum();
    let track = NarrationTrack::build(clips).unwrap();

    assert!((track.total_duration() - sum).abs() <= 1.0 / 44_100.0);
    for pair in track.units.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
        assert_eq!(pair[0].end_sample, pair[1].start_sample);
    }
    assert_eq!(track.units.last().unwrap().end_sample, track.total_samples());
}

#[test]
fn reorders_out_of_order_clips() {
    let track = NarrationTrack::build(vec![clip(3, 10, 10), clip(1, 20, 10), clip(2, 30, 10)]).unwrap();
    let ids: Vec<u32> = track.units.iter().map(|u| u.unit_id.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(track.units[1].start_sample, 20);
    assert_eq!(track.timed_unit(UnitId(3)).unwrap().start_sample, 50);
}

#[test]
fn concatenates_without_gaps() {
    let mut a = clip(1, 2, 4);
    a.audio.interleaved_f32 = vec![0.1, 0.2];
    let mut b = clip(2, 3, 4);
    b.audio.interleaved_f32 = vec![0.3, 0.4, 0.5];
    let track = NarrationTrack::build(vec![a, b]).unwrap();
    assert_eq!(track.pcm.interleaved_f32, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
}

#[test]
fn zero_length_clip_is_degenerate() {
    let err = NarrationTrack::build(vec![clip(1, 10, 10), clip(2, 0, 10)]).unwrap_err();
    assert!(matches!(err, SlidecastError::DegenerateClip { unit_id: UnitId(2) }));
}

#[test]
fn mismatched_sample_rates_are_rejected() {
    let err = NarrationTrack::build(vec![clip(1, 10, 10), clip(2, 10, 20)]).unwrap_err();
    assert!(matches!(err, SlidecastError::Validation(_)));
}

#[test]
fn duplicate_units_are_rejected() {
    assert!(NarrationTrack::build(vec![clip(1, 10, 10), clip(1, 10, 10)]).is_err());
    assert!(NarrationTrack::build(Vec::new()).is_err());
}

#[test]
fn silence_padded_unit_keeps_its_interval() {
    let mut gap = clip(2, 1_500, 1_000);
    gap.audio = AudioPcm::silence(1_000, 1, 1_500);
    gap.silence_padded = true;
    let track = NarrationTrack::build(vec![clip(1, 2_000, 1_000), gap, clip(3, 1_000, 1_000)]).unwrap();

    let padded = track.timed_unit(UnitId(2)).unwrap();
    assert!((padded.start - 2.0).abs() < 1e-12);
    assert!((padded.end - 3.5).abs() < 1e-12);
    assert!(track.pcm.interleaved_f32[2_000..3_500].iter().all(|s| *s == 0.0));
    assert!((track.total_duration() - 4.5).abs() < 1e-12);
}
