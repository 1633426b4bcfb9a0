use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::audio::mix::MixedAudioTrack;
use crate::encode::ffmpeg::{FfmpegSink, is_ffprobe_on_path, probe_durations};
use crate::encode::sink::{FrameSink, SinkConfig, StagedSoundtrack};
use crate::foundation::core::{UnitId, build_thread_pool};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::frame::{FrameRgba, crossfade_into, load_slide};
use crate::timeline::{FrameSpec, RenderTimeline, SlideSource};

/// Threading and chunking controls for frame rendering.
#[derive(Clone, Debug)]
pub struct RenderThreading {
    /// Chunk size in frames for batched scheduling.
    pub chunk_size: usize,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            chunk_size: 32,
            threads: None,
        }
    }
}

/// Aggregated rendering counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    /// Frames drawn as a crossfade between two slides.
    pub frames_blended: u64,
    /// Distinct slide images decoded.
    pub images_decoded: u64,
}

/// Where and how strictly an MP4 render is written.
#[derive(Clone, Debug)]
pub struct Mp4Target {
    pub path: PathBuf,
    /// Allowed divergence between video and audio durations, in seconds.
    pub tolerance_secs: f64,
    /// SubRip file drawn onto the frames.
    pub burned_captions: Option<PathBuf>,
}

/// Outcome of a successful MP4 render.
#[derive(Clone, Debug)]
pub struct RenderReport {
    pub output: PathBuf,
    pub stats: RenderStats,
    pub video_duration: f64,
    pub audio_duration: f64,
    /// Durations measured on the written file, when `ffprobe` is available.
    pub probed_video_duration: Option<f64>,
    pub probed_audio_duration: Option<f64>,
}

/// Check that the timeline's frame count and the soundtrack agree within `tolerance` seconds.
pub fn check_av_alignment(
    timeline: &RenderTimeline,
    audio: &MixedAudioTrack,
    tolerance: f64,
) -> SlidecastResult<()> {
    let video = timeline.video_duration();
    let audio = audio.duration_secs();
    if (video - audio).abs() > tolerance {
        return Err(SlidecastError::render(format!(
            "video ({video:.3}s, {} frames) and audio ({audio:.3}s) durations diverge by more than {tolerance}s",
            timeline.frame_count()
        )));
    }
    Ok(())
}

/// Sink configuration matching the timeline's canvas and frame rate, with no soundtrack.
pub fn sink_config_for(timeline: &RenderTimeline) -> SinkConfig {
    SinkConfig {
        canvas: timeline.canvas,
        fps: timeline.fps,
        soundtrack: None,
        burned_captions: None,
    }
}

/// Render every timeline frame into `sink`, in order.
#[tracing::instrument(skip_all, fields(frames = timeline.frame_count()))]
pub fn render_to_sink(
    timeline: &RenderTimeline,
    sink: &mut dyn FrameSink,
    cfg: &SinkConfig,
    threading: &RenderThreading,
) -> SlidecastResult<RenderStats> {
    if cfg.canvas != timeline.canvas || cfg.fps != timeline.fps {
        return Err(SlidecastError::validation(
            "sink canvas and frame rate must match the timeline",
        ));
    }
    let pool = build_thread_pool(threading.threads, "render")?;
    let slides = pool.install(|| decode_slides(timeline))?;

    let mut stats = RenderStats {
        images_decoded: slides
            .keys()
            .filter(|s| matches!(s, SlideSource::Image(_)))
            .count() as u64,
        ..RenderStats::default()
    };

    sink.begin(cfg)?;

    let total = timeline.frame_count();
    let chunk_size = threading.chunk_size.max(1) as u64;
    let mut chunk_start = 0u64;
    while chunk_start < total {
        let chunk_end = (chunk_start + chunk_size).min(total);
        let frames: Vec<(Arc<FrameRgba>, bool)> = pool.install(|| {
            (chunk_start..chunk_end)
                .into_par_iter()
                .map(|f| draw_frame(timeline, &slides, f))
                .collect::<SlidecastResult<_>>()
        })?;
        for (frame, blended) in &frames {
            sink.push_frame(frame)?;
            stats.frames_total += 1;
            stats.frames_blended += u64::from(*blended);
        }
        chunk_start = chunk_end;
    }

    let accepted = sink.end()?;
    if accepted != stats.frames_total {
        return Err(SlidecastError::render(format!(
            "sink accepted {accepted} of {} frames",
            stats.frames_total
        )));
    }
    tracing::debug!(?stats, "frames rendered");
    Ok(stats)
}

/// Render `timeline` with `audio` to an H.264/AAC MP4 at `target.path`.
///
/// The file is written to a temporary sibling and renamed over the destination only after the
/// encode and the duration checks succeed.
#[tracing::instrument(skip_all, fields(out = %target.path.display()))]
pub fn render_mp4(
    timeline: &RenderTimeline,
    audio: &MixedAudioTrack,
    target: &Mp4Target,
    threading: &RenderThreading,
) -> SlidecastResult<RenderReport> {
    let out_path = target.path.as_path();
    check_av_alignment(timeline, audio, target.tolerance_secs)?;

    let partial = sibling(out_path, "partial")?;
    let raw_audio = sibling(out_path, "audio.f32le")?;
    let result = encode_and_verify(timeline, audio, target, &partial, &raw_audio, threading);
    let _ = std::fs::remove_file(&raw_audio);

    let mut report = match result {
        Ok(report) => report,
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
    };

    if let Err(e) = std::fs::rename(&partial, out_path) {
        let _ = std::fs::remove_file(&partial);
        return Err(SlidecastError::render(format!(
            "failed to move '{}' to '{}': {e}",
            partial.display(),
            out_path.display()
        )));
    }
    report.output = out_path.to_path_buf();
    tracing::info!(
        seconds = report.video_duration,
        frames = report.stats.frames_total,
        "video written"
    );
    Ok(report)
}

fn encode_and_verify(
    timeline: &RenderTimeline,
    audio: &MixedAudioTrack,
    target: &Mp4Target,
    partial: &Path,
    raw_audio: &Path,
    threading: &RenderThreading,
) -> SlidecastResult<RenderReport> {
    let tolerance = target.tolerance_secs;
    let cfg = SinkConfig {
        soundtrack: Some(StagedSoundtrack::write(audio, raw_audio)?),
        burned_captions: target.burned_captions.clone(),
        ..sink_config_for(timeline)
    };

    let mut sink = FfmpegSink::new(partial);
    let stats = render_to_sink(timeline, &mut sink, &cfg, threading)?;

    let mut report = RenderReport {
        output: partial.to_path_buf(),
        stats,
        video_duration: timeline.video_duration(),
        audio_duration: audio.duration_secs(),
        probed_video_duration: None,
        probed_audio_duration: None,
    };

    if !is_ffprobe_on_path() {
        tracing::warn!("ffprobe not found; skipping post-mux duration check");
        return Ok(report);
    }
    let probed = probe_durations(partial)?;
    report.probed_video_duration = probed.video;
    report.probed_audio_duration = probed.audio;
    match (probed.video, probed.audio) {
        (Some(v), Some(a)) if (v - a).abs() > tolerance => Err(SlidecastError::render(format!(
            "muxed video ({v:.3}s) and audio ({a:.3}s) durations diverge by more than {tolerance}s"
        ))),
        (None, _) | (_, None) => Err(SlidecastError::render(
            "muxed file is missing a video or audio stream duration",
        )),
        _ => Ok(report),
    }
}

/// `dir/.name.suffix` next to `path`.
fn sibling(path: &Path, suffix: &str) -> SlidecastResult<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| {
            SlidecastError::validation(format!("output path '{}' has no file name", path.display()))
        })?
        .to_string_lossy();
    Ok(path.with_file_name(format!(".{name}.{suffix}")))
}

fn decode_slides(
    timeline: &RenderTimeline,
) -> SlidecastResult<HashMap<SlideSource, Arc<FrameRgba>>> {
    let mut unique: Vec<(&SlideSource, UnitId)> = Vec::new();
    for slide in &timeline.slides {
        if !unique.iter().any(|(s, _)| *s == &slide.source) {
            unique.push((&slide.source, slide.unit_id));
        }
    }

    unique
        .into_par_iter()
        .map(|(source, unit_id)| {
            let frame = match source {
                SlideSource::Placeholder => {
                    FrameRgba::solid(timeline.canvas, timeline.background_rgb)
                }
                SlideSource::Image(path) => {
                    load_slide(path, timeline.canvas, timeline.background_rgb)
                        .map_err(|e| SlidecastError::render_unit(unit_id, format!("{e:#}")))?
                }
            };
            Ok((source.clone(), Arc::new(frame)))
        })
        .collect()
}

fn draw_frame(
    timeline: &RenderTimeline,
    slides: &HashMap<SlideSource, Arc<FrameRgba>>,
    frame: u64,
) -> SlidecastResult<(Arc<FrameRgba>, bool)> {
    let lookup = |i: usize| {
        let slide = &timeline.slides[i];
        slides.get(&slide.source).cloned().ok_or_else(|| {
            SlidecastError::render_unit(slide.unit_id, "slide image was not decoded")
        })
    };

    match timeline.frame_spec(frame) {
        FrameSpec::Still(i) => Ok((lookup(i)?, false)),
        FrameSpec::Blend { from, to, t } => {
            let a = lookup(from)?;
            let b = lookup(to)?;
            if Arc::ptr_eq(&a, &b) {
                return Ok((a, false));
            }
            let mut data = vec![0u8; a.data.len()];
            crossfade_into(&mut data, &a.data, &b.data, t)?;
            Ok((
                Arc::new(FrameRgba {
                    width: a.width,
                    height: a.height,
                    data,
                }),
                true,
            ))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
