use std::fmt;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// 1-based narration unit identifier, assigned in reading order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> SlidecastResult<Self> {
        if den == 0 {
            return Err(SlidecastError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(SlidecastError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Convert seconds to the nearest frame count.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Byte length of one tightly packed RGBA8 frame.
    pub fn rgba_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Convert a sample count to seconds at `sample_rate`.
pub fn samples_to_secs(samples: u64, sample_rate: u32) -> f64 {
    samples as f64 / f64::from(sample_rate)
}

/// Convert seconds to the nearest sample count at `sample_rate`.
pub fn secs_to_samples(secs: f64, sample_rate: u32) -> u64 {
    (secs * f64::from(sample_rate)).round().max(0.0) as u64
}

/// Rayon pool with an optional explicit worker count.
pub(crate) fn build_thread_pool(
    threads: Option<usize>,
    purpose: &str,
) -> SlidecastResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SlidecastError::validation(format!(
            "{purpose} threads must be >= 1 when set"
        )));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        SlidecastError::validation(format!("failed to build {purpose} thread pool: {e}"))
    })
}
