//! Slide schedule derived from narration timing and image assignments.

use std::path::PathBuf;

use crate::audio::track::NarrationTrack;
use crate::config::{PipelineConfig, TransitionType};
use crate::foundation::core::{Canvas, Fps, UnitId};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::visual::assign::AssignmentOutcome;

/// What a slide shows.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum SlideSource {
    Image(PathBuf),
    /// Background-color frame for a unit with no usable image.
    Placeholder,
}

/// One image display interval `[start, end)` in seconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Slide {
    pub unit_id: UnitId,
    pub source: SlideSource,
    pub start: f64,
    pub end: f64,
}

impl Slide {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Timeline entry for one narration unit.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TimelineEntry {
    pub unit_id: UnitId,
    pub start: f64,
    pub end: f64,
    /// Index range into [`RenderTimeline::slides`].
    pub slides: std::ops::Range<usize>,
    pub transition: TransitionType,
}

/// What to draw for a given output frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameSpec {
    Still(usize),
    /// Crossfade from slide `from` to slide `to`; `t` is the weight of `to` in `[0, 1]`.
    Blend { from: usize, to: usize, t: f32 },
}

/// Ordered slide schedule covering `[0, total_duration)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderTimeline {
    pub entries: Vec<TimelineEntry>,
    pub slides: Vec<Slide>,
    pub fps: Fps,
    pub canvas: Canvas,
    pub background_rgb: [u8; 3],
    /// Effective crossfade length at the boundary after each slide (0 for cuts and the last slide).
    boundary_fades: Vec<f64>,
}

impl RenderTimeline {
    /// One entry per timed unit. Each unit's images split its interval evenly.
    #[tracing::instrument(skip_all, fields(units = track.units.len()))]
    pub fn build(
        track: &NarrationTrack,
        assignments: &AssignmentOutcome,
        cfg: &PipelineConfig,
    ) -> SlidecastResult<Self> {
        if track.units.is_empty() {
            return Err(SlidecastError::render("timeline has no units"));
        }

        let mut entries = Vec::with_capacity(track.units.len());
        let mut slides = Vec::new();
        for timed in &track.units {
            if !timed.start.is_finite() || !timed.end.is_finite() || timed.end <= timed.start {
                return Err(SlidecastError::render_unit(
                    timed.unit_id,
                    format!("non-positive interval [{}, {})", timed.start, timed.end),
                ));
            }

            let sources: Vec<SlideSource> = match assignments.for_unit(timed.unit_id) {
                Some(a) if !a.images.is_empty() => a
                    .images
                    .iter()
                    .map(|img| SlideSource::Image(img.path.clone()))
                    .collect(),
                _ if assignments.placeholders.contains(&timed.unit_id) => {
                    vec![SlideSource::Placeholder]
                }
                _ => {
                    return Err(SlidecastError::render_unit(
                        timed.unit_id,
                        "no image assignment for unit",
                    ));
                }
            };

            let first = slides.len();
            let n = sources.len();
            let each = timed.duration() / n as f64;
            for (k, source) in sources.into_iter().enumerate() {
                let start = timed.start + each * k as f64;
                let end = if k + 1 == n {
                    timed.end
                } else {
                    timed.start + each * (k + 1) as f64
                };
                slides.push(Slide {
                    unit_id: timed.unit_id,
                    source,
                    start,
                    end,
                });
            }

            entries.push(TimelineEntry {
                unit_id: timed.unit_id,
                start: timed.start,
                end: timed.end,
                slides: first..slides.len(),
                transition: cfg.transition_type,
            });
        }

        let boundary_fades = boundary_fades(&slides, cfg.transition_type, cfg.transition_duration);
        let timeline = Self {
            entries,
            slides,
            fps: cfg.frame_rate()?,
            canvas: cfg.canvas(),
            background_rgb: cfg.background_rgb,
            boundary_fades,
        };
        tracing::info!(
            slides = timeline.slides.len(),
            seconds = timeline.total_duration(),
            frames = timeline.frame_count(),
            "built render timeline"
        );
        Ok(timeline)
    }

    pub fn total_duration(&self) -> f64 {
        self.slides.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Number of output frames, rounded to the nearest frame.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_round(self.total_duration()).max(1)
    }

    /// Seconds covered by `frames` output frames.
    pub fn video_duration(&self) -> f64 {
        self.fps.frames_to_secs(self.frame_count())
    }

    /// Effective crossfade length between slide `i` and slide `i + 1`.
    pub fn fade_after(&self, i: usize) -> f64 {
        self.boundary_fades.get(i).copied().unwrap_or(0.0)
    }

    /// Index of the slide covering time `t` (clamped to the timeline).
    pub fn slide_at(&self, t: f64) -> usize {
        let idx = self.slides.partition_point(|s| s.start <= t);
        idx.saturating_sub(1).min(self.slides.len().saturating_sub(1))
    }

    /// Drawing instructions for the frame starting at `frame / fps`.
    pub fn frame_spec(&self, frame: u64) -> FrameSpec {
        let t = self.fps.frames_to_secs(frame);
        let i = self.slide_at(t);

        // Fade into slide i, centered on its start.
        if i > 0 {
            let d = self.fade_after(i - 1);
            let b = self.slides[i].start;
            if d > 0.0 && t < b + d / 2.0 {
                let w = ((t - (b - d / 2.0)) / d).clamp(0.0, 1.0) as f32;
                return FrameSpec::Blend {
                    from: i - 1,
                    to: i,
                    t: w,
                };
            }
        }
        // Fade out of slide i into i + 1, centered on its end.
        let d = self.fade_after(i);
        if d > 0.0 {
            let b = self.slides[i].end;
            if t >= b - d / 2.0 {
                let w = ((t - (b - d / 2.0)) / d).clamp(0.0, 1.0) as f32;
                return FrameSpec::Blend {
                    from: i,
                    to: i + 1,
                    t: w,
                };
            }
        }
        FrameSpec::Still(i)
    }
}

/// Crossfade length per boundary: `min(configured, half the shorter neighbour)`.
fn boundary_fades(slides: &[Slide], kind: TransitionType, configured: f64) -> Vec<f64> {
    let mut out = vec![0.0; slides.len()];
    if kind == TransitionType::Cut || configured <= 0.0 {
        return out;
    }
    for (i, pair) in slides.windows(2).enumerate() {
        let shorter = pair[0].duration().min(pair[1].duration());
        out[i] = configured.min(0.5 * shorter);
    }
    out
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
