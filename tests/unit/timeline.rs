use super::*;
use crate::audio::pcm::AudioPcm;
use crate::audio::track::TimedUnit;
use crate::visual::assign::SegmentAssignment;
use crate::visual::pool::ImageAsset;

const RATE: u32 = 10;

fn track(frames: &[u64]) -> NarrationTrack {
    let mut units = Vec::new();
    let mut cursor = 0u64;
    for (i, &n) in frames.iter().enumerate() {
        units.push(TimedUnit {
            unit_id: UnitId(i as u32 + 1),
            start: cursor as f64 / f64::from(RATE),
            end: (cursor + n) as f64 / f64::from(RATE),
            start_sample: cursor,
            end_sample: cursor + n,
        });
        cursor += n;
    }
    NarrationTrack {
        pcm: AudioPcm::mono(RATE, vec![0.0; cursor as usize]),
        units,
    }
}

fn assigned(per_unit: &[&[&str]]) -> AssignmentOutcome {
    AssignmentOutcome {
        assignments: per_unit
            .iter()
            .enumerate()
            .map(|(i, imgs)| SegmentAssignment {
                unit_id: UnitId(i as u32 + 1),
                images: imgs.iter().map(|p| ImageAsset::new(*p, "g")).collect(),
            })
            .collect(),
        placeholders: Vec::new(),
    }
}

fn cfg() -> PipelineConfig {
    PipelineConfig {
        fps: 10,
        ..PipelineConfig::default()
    }
}

#[test]
fn entries_follow_unit_timestamps() {
    // 2.1 s and 3.4 s of narration.
    let tl = RenderTimeline::build(&track(&[21, 34]), &assigned(&[&["a.png"], &["b.png"]]), &cfg())
        .unwrap();
    assert_eq!(tl.entries.len(), 2);
    assert_eq!(tl.entries[0].start, 0.0);
    assert!((tl.entries[0].end - 2.1).abs() < 1e-9);
    assert_eq!(tl.entries[0].end, tl.entries[1].start);
    assert!((tl.total_duration() - 5.5).abs() < 1e-9);
    assert_eq!(tl.frame_count(), 55);
}

#[test]
fn several_images_split_the_unit_evenly() {
    let tl = RenderTimeline::build(
        &track(&[90]),
        &assigned(&[&["a.png", "b.png", "c.png"]]),
        &cfg(),
    )
    .unwrap();
    assert_eq!(tl.entries[0].slides, 0..3);
    for s in &tl.slides {
        assert!((s.duration() - 3.0).abs() < 1e-9);
    }
    assert_eq!(tl.slides[2].end, 9.0);
}

#[test]
fn crossfade_is_clamped_to_half_the_shorter_slide() {
    let tl = RenderTimeline::build(&track(&[6, 30]), &assigned(&[&["a.png"], &["b.png"]]), &cfg())
        .unwrap();
    assert!((tl.fade_after(0) - 0.3).abs() < 1e-9);
    assert_eq!(tl.fade_after(1), 0.0);

    let long = RenderTimeline::build(&track(&[30, 30]), &assigned(&[&["a.png"], &["b.png"]]), &cfg())
        .unwrap();
    assert!((long.fade_after(0) - 0.5).abs() < 1e-9);
}

#[test]
fn crossfade_is_centered_on_the_boundary() {
    let tl = RenderTimeline::build(&track(&[30, 30]), &assigned(&[&["a.png"], &["b.png"]]), &cfg())
        .unwrap();
    // Boundary at 3.0 s, fade 0.5 s -> blending over [2.75, 3.25).
    assert_eq!(tl.frame_spec(27), FrameSpec::Still(0));
    match tl.frame_spec(28) {
        FrameSpec::Blend { from: 0, to: 1, t } => assert!((t - 0.1).abs() < 1e-5),
        other => panic!("unexpected {other:?}"),
    }
    match tl.frame_spec(30) {
        FrameSpec::Blend { from: 0, to: 1, t } => assert!((t - 0.5).abs() < 1e-5),
        other => panic!("unexpected {other:?}"),
    }
    match tl.frame_spec(32) {
        FrameSpec::Blend { from: 0, to: 1, t } => assert!((t - 0.9).abs() < 1e-5),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(tl.frame_spec(33), FrameSpec::Still(1));
    assert_eq!(tl.frame_spec(0), FrameSpec::Still(0));
    assert_eq!(tl.frame_spec(59), FrameSpec::Still(1));
}

#[test]
fn cut_never_blends() {
    let cfg = PipelineConfig {
        transition_type: TransitionType::Cut,
        ..cfg()
    };
    let tl = RenderTimeline::build(&track(&[30, 30]), &assigned(&[&["a.png"], &["b.png"]]), &cfg)
        .unwrap();
    assert_eq!(tl.frame_spec(29), FrameSpec::Still(0));
    assert_eq!(tl.frame_spec(30), FrameSpec::Still(1));
    assert_eq!(tl.entries[1].transition, TransitionType::Cut);
}

#[test]
fn placeholder_units_get_a_background_slide() {
    let mut outcome = assigned(&[&["a.png"]]);
    outcome.placeholders.push(UnitId(2));
    let tl = RenderTimeline::build(&track(&[20, 20]), &outcome, &cfg()).unwrap();
    assert_eq!(tl.slides[1].source, SlideSource::Placeholder);
}

#[test]
fn unassigned_unit_is_a_render_error() {
    let err = RenderTimeline::build(&track(&[20, 20]), &assigned(&[&["a.png"]]), &cfg())
        .unwrap_err();
    assert_eq!(err.unit_id(), Some(UnitId(2)));
    assert!(matches!(err, SlidecastError::Render { .. }));
}

#[test]
fn non_positive_interval_is_a_render_error() {
    let mut t = track(&[20, 20]);
    t.units[1].end = t.units[1].start;
    let err = RenderTimeline::build(&t, &assigned(&[&["a.png"], &["b.png"]]), &cfg()).unwrap_err();
    assert!(matches!(
        err,
        SlidecastError::Render { unit_id: Some(UnitId(2)), .. }
    ));
}

#[test]
fn inverted_or_nan_interval_is_a_render_error() {
    let images = assigned(&[&["a.png"], &["b.png"]]);

    let mut t = track(&[20, 20]);
    t.units[0].end = 0.5;
    t.units[0].start = 1.0;
    let err = RenderTimeline::build(&t, &images, &cfg()).unwrap_err();
    assert!(matches!(
        err,
        SlidecastError::Render { unit_id: Some(UnitId(1)), .. }
    ));

    let mut t = track(&[20, 20]);
    t.units[1].end = f64::NAN;
    let err = RenderTimeline::build(&t, &images, &cfg()).unwrap_err();
    assert!(matches!(
        err,
        SlidecastError::Render { unit_id: Some(UnitId(2)), .. }
    ));
}
