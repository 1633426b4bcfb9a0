//! SubRip (`.srt`) captions, one cue per narration unit.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::audio::track::NarrationTrack;
use crate::foundation::error::SlidecastResult;
use crate::script::segment::NarrationUnit;

/// Caption lines are wrapped at this many columns.
pub const CAPTION_WIDTH: usize = 50;

/// ASS style override used when captions are burned into the frames: white bottom-centered text
/// with a black outline.
pub const BURN_STYLE: &str = "FontName=Arial,FontSize=20,MarginV=40,PrimaryColour=&H00FFFFFF,\
OutlineColour=&H00000000,BorderStyle=1,Outline=2,Shadow=0,Alignment=2";

/// Format seconds as `HH:MM:SS,mmm`.
pub fn srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Build an SRT document from the track timing. Units not in the track are skipped.
pub fn build_srt(track: &NarrationTrack, units: &[NarrationUnit]) -> String {
    let mut out = String::new();
    let mut index = 1;
    for timed in &track.units {
        let Some(unit) = units.iter().find(|u| u.id == timed.unit_id) else {
            continue;
        };
        let _ = writeln!(out, "{index}");
        let _ = writeln!(
            out,
            "{} --> {}",
            srt_timestamp(timed.start),
            srt_timestamp(timed.end)
        );
        for line in wrap_words(&unit.text, CAPTION_WIDTH) {
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
        index += 1;
    }
    out
}

pub fn write_srt(path: &Path, track: &NarrationTrack, units: &[NarrationUnit]) -> SlidecastResult<()> {
    std::fs::write(path, build_srt(track, units))
        .with_context(|| format!("write captions '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote captions");
    Ok(())
}
