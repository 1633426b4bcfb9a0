use std::path::PathBuf;

use super::*;
use crate::audio::pcm::AudioPcm;
use crate::audio::track::TimedUnit;

fn unit(id: u32, secs: f64, topic: Option<&str>) -> NarrationUnit {
    NarrationUnit {
        id: UnitId(id),
        text: format!("Sentence {id}."),
        estimated_duration: secs,
        topic: topic.map(str::to_string),
    }
}

fn paths(a: &SegmentAssignment) -> Vec<PathBuf> {
    a.images.iter().map(|i| i.path.clone()).collect()
}

fn history_pool() -> ImagePool {
    ImagePool::new(vec![
        ImageAsset::new("history/a.png", "history").with_score(0.9),
        ImageAsset::new("history/b.png", "history").with_score(0.7),
        ImageAsset::new("history/c.png", "history").with_score(0.95),
        ImageAsset::new("campus/x.png", "campus").with_score(0.4),
    ])
    .unwrap()
}

#[test]
fn topic_fallback_picks_highest_score() {
    let assigner = Assigner::new(4.0).unwrap();
    let out = assigner
        .assign(&[unit(1, 3.0, Some("history"))], &history_pool())
        .unwrap();
    assert_eq!(paths(&out[0]), vec![PathBuf::from("history/c.png")]);
}

#[test]
fn long_unit_walks_down_the_ranking_and_repeats() {
    let assigner = Assigner::new(4.0).unwrap();
    // 17 s at one image per 4 s -> 5 images from a 3-image subgroup.
    let out = assigner
        .assign(&[unit(1, 17.0, Some("history"))], &history_pool())
        .unwrap();
    assert_eq!(
        paths(&out[0]),
        vec![
            PathBuf::from("history/c.png"),
            PathBuf::from("history/a.png"),
            PathBuf::from("history/b.png"),
            PathBuf::from("history/c.png"),
            PathBuf::from("history/a.png"),
        ]
    );
}

#[test]
fn image_count_has_a_floor_of_one() {
    let assigner = Assigner::new(4.0).unwrap();
    assert_eq!(assigner.image_count(0.2), 1);
    assert_eq!(assigner.image_count(4.0), 1);
    assert_eq!(assigner.image_count(4.1), 2);
}

#[test]
fn explicit_links_win_over_topic() {
    let mut assets = history_pool().assets().to_vec();
    assets.push(ImageAsset::new("picked.png", "campus").linked_to(UnitId(2)));
    let pool = ImagePool::new(assets).unwrap();

    let assigner = Assigner::new(4.0).unwrap();
    let out = assigner
        .assign(
            &[unit(1, 2.0, Some("history")), unit(2, 2.0, Some("history"))],
            &pool,
        )
        .unwrap();
    assert_eq!(paths(&out[0]), vec![PathBuf::from("history/c.png")]);
    assert_eq!(paths(&out[1]), vec![PathBuf::from("picked.png")]);
}

#[test]
fn unresolvable_link_falls_back_to_topic() {
    let mut assets = history_pool().assets().to_vec();
    assets.push(ImageAsset::new("missing.png", "history").linked_to(UnitId(1)));
    let pool = ImagePool::new(assets).unwrap();

    let assigner = Assigner::new(4.0)
        .unwrap()
        .with_resolver(|a| a.path != std::path::Path::new("missing.png"));
    let out = assigner
        .assign(&[unit(1, 2.0, Some("history"))], &pool)
        .unwrap();
    assert_eq!(paths(&out[0]), vec![PathBuf::from("history/c.png")]);
}

#[test]
fn units_without_topic_cycle_subgroup_champions() {
    let assigner = Assigner::new(4.0).unwrap();
    let units = [unit(1, 2.0, None), unit(2, 2.0, None), unit(3, 2.0, None)];
    let out = assigner.assign(&units, &history_pool()).unwrap();
    // Champions: campus/x (campus), history/c (history).
    assert_eq!(paths(&out[0]), vec![PathBuf::from("campus/x.png")]);
    assert_eq!(paths(&out[1]), vec![PathBuf::from("history/c.png")]);
    assert_eq!(paths(&out[2]), vec![PathBuf::from("campus/x.png")]);
}

#[test]
fn unknown_topic_uses_champions() {
    let assigner = Assigner::new(4.0).unwrap();
    let out = assigner
        .assign(&[unit(1, 2.0, Some("sports"))], &history_pool())
        .unwrap();
    assert_eq!(paths(&out[0]), vec![PathBuf::from("campus/x.png")]);
}

#[test]
fn empty_pool_is_no_image_available() {
    let assigner = Assigner::new(4.0).unwrap();
    let err = assigner
        .assign(&[unit(7, 2.0, Some("history"))], &ImagePool::default())
        .unwrap_err();
    assert!(matches!(err, SlidecastError::NoImageAvailable { unit_id } if unit_id == UnitId(7)));
}

#[test]
fn assignment_is_idempotent() {
    let assigner = Assigner::new(4.0).unwrap();
    let units = [unit(1, 9.0, Some("history")), unit(2, 3.0, None)];
    let pool = history_pool();
    assert_eq!(
        assigner.assign(&units, &pool).unwrap(),
        assigner.assign(&units, &pool).unwrap()
    );
}

fn track_for(units: &[(u32, u64)]) -> NarrationTrack {
    let rate = 10;
    let mut timed = Vec::new();
    let mut cursor = 0u64;
    for &(id, frames) in units {
        timed.push(TimedUnit {
            unit_id: UnitId(id),
            start: cursor as f64 / rate as f64,
            end: (cursor + frames) as f64 / rate as f64,
            start_sample: cursor,
            end_sample: cursor + frames,
        });
        cursor += frames;
    }
    NarrationTrack {
        pcm: AudioPcm::mono(rate, vec![0.1; cursor as usize]),
        units: timed,
    }
}

#[test]
fn timed_assignment_uses_measured_duration() {
    let assigner = Assigner::new(4.0).unwrap();
    // Estimated 2 s, measured 9 s -> 3 images.
    let units = [unit(1, 2.0, Some("history"))];
    let track = track_for(&[(1, 90)]);
    let out = assigner
        .assign_timed(&units, &track, &history_pool(), Strictness::FailFast)
        .unwrap();
    assert_eq!(out.assignments[0].images.len(), 3);
    assert!(out.placeholders.is_empty());
}

#[test]
fn timed_assignment_skips_units_missing_from_track() {
    let assigner = Assigner::new(4.0).unwrap();
    let units = [unit(1, 2.0, None), unit(2, 2.0, None)];
    let track = track_for(&[(2, 20)]);
    let out = assigner
        .assign_timed(&units, &track, &history_pool(), Strictness::FailFast)
        .unwrap();
    assert_eq!(out.assignments.len(), 1);
    assert_eq!(out.assignments[0].unit_id, UnitId(2));
    // Position in the unit list still drives champion cycling.
    assert_eq!(paths(&out.assignments[0]), vec![PathBuf::from("history/c.png")]);
}

#[test]
fn skip_and_log_turns_missing_images_into_placeholders() {
    let assigner = Assigner::new(4.0).unwrap();
    let units = [unit(1, 2.0, None)];
    let track = track_for(&[(1, 20)]);

    let out = assigner
        .assign_timed(&units, &track, &ImagePool::default(), Strictness::SkipAndLog)
        .unwrap();
    assert_eq!(out.placeholders, vec![UnitId(1)]);
    assert!(out.for_unit(UnitId(1)).is_none());

    let err = assigner
        .assign_timed(&units, &track, &ImagePool::default(), Strictness::FailFast)
        .unwrap_err();
    assert!(matches!(err, SlidecastError::NoImageAvailable { .. }));
}
