use crate::audio::track::NarrationTrack;
use crate::config::{PipelineConfig, Strictness};
use crate::foundation::core::UnitId;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::script::segment::NarrationUnit;
use crate::visual::pool::{ImageAsset, ImagePool, rank_order};

/// Images chosen for one narration unit, in display order. Never empty.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SegmentAssignment {
    pub unit_id: UnitId,
    pub images: Vec<ImageAsset>,
}

/// Assignments for a whole run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssignmentOutcome {
    pub assignments: Vec<SegmentAssignment>,
    /// Units with no usable image, to be shown as placeholder slides.
    pub placeholders: Vec<UnitId>,
}

impl AssignmentOutcome {
    pub fn for_unit(&self, id: UnitId) -> Option<&SegmentAssignment> {
        self.assignments.iter().find(|a| a.unit_id == id)
    }
}

type Resolver = Box<dyn Fn(&ImageAsset) -> bool + Send + Sync>;

/// Maps narration units to pool images.
///
/// Explicit links win; otherwise the unit's topic subgroup is ranked by quality; units without a
/// topic cycle through the best image of each subgroup.
pub struct Assigner {
    images_per_seconds_interval: f64,
    resolver: Option<Resolver>,
}

impl Assigner {
    pub fn new(images_per_seconds_interval: f64) -> SlidecastResult<Self> {
        if !images_per_seconds_interval.is_finite() || images_per_seconds_interval <= 0.0 {
            return Err(SlidecastError::validation(
                "images_per_seconds_interval must be finite and > 0",
            ));
        }
        Ok(Self {
            images_per_seconds_interval,
            resolver: None,
        })
    }

    pub fn from_config(cfg: &PipelineConfig) -> SlidecastResult<Self> {
        Self::new(cfg.images_per_seconds_interval)
    }

    /// Only images accepted by `resolver` are eligible.
    pub fn with_resolver(
        mut self,
        resolver: impl Fn(&ImageAsset) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Only images whose file exists are eligible.
    pub fn with_existing_files(self) -> Self {
        self.with_resolver(|a| a.path.is_file())
    }

    /// Number of images to show for a unit lasting `duration` seconds.
    pub fn image_count(&self, duration: f64) -> usize {
        let n = (duration / self.images_per_seconds_interval).ceil();
        if n.is_finite() && n >= 1.0 { n as usize } else { 1 }
    }

    /// Assign using the units' estimated durations.
    pub fn assign(
        &self,
        units: &[NarrationUnit],
        pool: &ImagePool,
    ) -> SlidecastResult<Vec<SegmentAssignment>> {
        units
            .iter()
            .enumerate()
            .map(|(pos, u)| self.assign_unit(u, pos, u.estimated_duration, pool))
            .collect()
    }

    /// Assign using measured durations from `track` where available.
    ///
    /// Units missing from the track are not assigned. Under
    /// [`Strictness::SkipAndLog`] a unit without any image becomes a placeholder.
    #[tracing::instrument(skip_all, fields(units = units.len(), images = pool.len()))]
    pub fn assign_timed(
        &self,
        units: &[NarrationUnit],
        track: &NarrationTrack,
        pool: &ImagePool,
        strictness: Strictness,
    ) -> SlidecastResult<AssignmentOutcome> {
        let mut outcome = AssignmentOutcome::default();
        for (pos, unit) in units.iter().enumerate() {
            let Some(timed) = track.timed_unit(unit.id) else {
                continue;
            };
            match self.assign_unit(unit, pos, timed.duration(), pool) {
                Ok(a) => outcome.assignments.push(a),
                Err(e @ SlidecastError::NoImageAvailable { .. })
                    if strictness == Strictness::SkipAndLog =>
                {
                    tracing::warn!(unit = %unit.id, error = %e, "using placeholder slide");
                    outcome.placeholders.push(unit.id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    fn assign_unit(
        &self,
        unit: &NarrationUnit,
        position: usize,
        duration: f64,
        pool: &ImagePool,
    ) -> SlidecastResult<SegmentAssignment> {
        let candidates = self.candidates(unit, position, pool);
        if candidates.is_empty() {
            return Err(SlidecastError::NoImageAvailable { unit_id: unit.id });
        }
        let count = self.image_count(duration);
        let images = candidates.iter().cycle().take(count).map(|a| (*a).clone()).collect();
        Ok(SegmentAssignment {
            unit_id: unit.id,
            images,
        })
    }

    fn candidates<'p>(
        &self,
        unit: &NarrationUnit,
        position: usize,
        pool: &'p ImagePool,
    ) -> Vec<&'p ImageAsset> {
        let linked: Vec<_> = pool.linked(unit.id).filter(|a| self.resolves(a)).collect();
        if !linked.is_empty() {
            return linked;
        }

        if let Some(topic) = unit.topic.as_deref() {
            let ranked: Vec<_> = pool
                .ranked_subgroup(topic)
                .into_iter()
                .filter(|a| self.resolves(a))
                .collect();
            if !ranked.is_empty() {
                return ranked;
            }
            tracing::debug!(unit = %unit.id, topic, "topic has no usable images; using champions");
        }

        let mut champions = self.resolved_champions(pool);
        if !champions.is_empty() {
            let len = champions.len();
            champions.rotate_left(position % len);
        }
        champions
    }

    fn resolved_champions<'p>(&self, pool: &'p ImagePool) -> Vec<&'p ImageAsset> {
        if self.resolver.is_none() {
            return pool.champions();
        }
        let mut by_group: Vec<&ImageAsset> = Vec::new();
        let mut usable: Vec<&ImageAsset> = pool.assets().iter().filter(|a| self.resolves(a)).collect();
        usable.sort_by(|a, b| a.subgroup.cmp(&b.subgroup).then_with(|| rank_order(a, b)));
        for a in usable {
            if by_group.last().is_none_or(|last| last.subgroup != a.subgroup) {
                by_group.push(a);
            }
        }
        by_group
    }

    fn resolves(&self, asset: &ImageAsset) -> bool {
        self.resolver.as_ref().is_none_or(|r| r(asset))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/visual/assign.rs"]
mod tests;
