use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::UnitId;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// One curated image.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageAsset {
    pub path: PathBuf,
    /// Topic folder the image belongs to.
    pub subgroup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    /// Units this image was picked for explicitly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unit_ids: Vec<UnitId>,
}

impl ImageAsset {
    pub fn new(path: impl Into<PathBuf>, subgroup: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subgroup: subgroup.into(),
            quality_score: None,
            unit_ids: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn linked_to(mut self, unit: UnitId) -> Self {
        self.unit_ids.push(unit);
        self
    }
}

/// Best first: higher score, scored before unscored, then smallest path.
pub fn rank_order(a: &ImageAsset, b: &ImageAsset) -> Ordering {
    let by_score = match (a.quality_score, b.quality_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then_with(|| a.path.cmp(&b.path))
}

/// Read-only collection of [`ImageAsset`]s, in the order they were supplied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImagePool {
    assets: Vec<ImageAsset>,
}

impl ImagePool {
    pub fn new(assets: Vec<ImageAsset>) -> SlidecastResult<Self> {
        for a in &assets {
            if let Some(s) = a.quality_score
                && !s.is_finite()
            {
                return Err(SlidecastError::validation(format!(
                    "image '{}' has a non-finite quality_score",
                    a.path.display()
                )));
            }
        }
        Ok(Self { assets })
    }

    /// Load a JSON array of assets. Relative paths resolve against the file's directory.
    pub fn from_json_file(path: &Path) -> SlidecastResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read image pool '{}'", path.display()))?;
        let mut assets: Vec<ImageAsset> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse image pool '{}'", path.display()))?;

        let root = path.parent().unwrap_or_else(|| Path::new("."));
        for a in &mut assets {
            if a.path.is_relative() {
                a.path = root.join(&a.path);
            }
        }
        tracing::debug!(images = assets.len(), pool = %path.display(), "loaded image pool");
        Self::new(assets)
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Images explicitly linked to `unit`, in pool order.
    pub fn linked(&self, unit: UnitId) -> impl Iterator<Item = &ImageAsset> {
        self.assets.iter().filter(move |a| a.unit_ids.contains(&unit))
    }

    /// Images in `subgroup`, best first.
    pub fn ranked_subgroup(&self, subgroup: &str) -> Vec<&ImageAsset> {
        let mut out: Vec<&ImageAsset> =
            self.assets.iter().filter(|a| a.subgroup == subgroup).collect();
        out.sort_by(|a, b| rank_order(a, b));
        out
    }

    /// Best image of every subgroup, subgroups in name order.
    pub fn champions(&self) -> Vec<&ImageAsset> {
        let mut best: BTreeMap<&str, &ImageAsset> = BTreeMap::new();
        for a in &self.assets {
            best.entry(a.subgroup.as_str())
                .and_modify(|cur| {
                    if rank_order(a, cur) == Ordering::Less {
                        *cur = a;
                    }
                })
                .or_insert(a);
        }
        best.into_values().collect()
    }
}
