use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Opaque RGBA8 frame, tightly packed (`width * height * 4` bytes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    /// Frame filled with a single opaque color.
    pub fn solid(canvas: Canvas, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(canvas.rgba_len());
        for _ in 0..(canvas.width as usize * canvas.height as usize) {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Decode an image file and letterbox it onto the canvas.
pub fn load_slide(path: &Path, canvas: Canvas, background: [u8; 3]) -> anyhow::Result<FrameRgba> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_letterboxed(&bytes, canvas, background)
        .with_context(|| format!("decode image '{}'", path.display()))
}

/// Aspect-fit `bytes` into `canvas`, centered, over `background`. Alpha is flattened.
pub fn decode_letterboxed(
    bytes: &[u8],
    canvas: Canvas,
    background: [u8; 3],
) -> anyhow::Result<FrameRgba> {
    let rgba = image::load_from_memory(bytes)
        .context("decode image from memory")?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    anyhow::ensure!(w > 0 && h > 0, "image has zero size");

    let scale = f64::min(
        f64::from(canvas.width) / f64::from(w),
        f64::from(canvas.height) / f64::from(h),
    );
    let fit_w = ((f64::from(w) * scale).round() as u32).clamp(1, canvas.width);
    let fit_h = ((f64::from(h) * scale).round() as u32).clamp(1, canvas.height);
    let fitted = if (fit_w, fit_h) == (w, h) {
        rgba
    } else {
        image::imageops::resize(&rgba, fit_w, fit_h, image::imageops::FilterType::Triangle)
    };

    let mut frame = FrameRgba::solid(canvas, background);
    let off_x = (canvas.width - fit_w) / 2;
    let off_y = (canvas.height - fit_h) / 2;
    let row_bytes = canvas.width as usize * 4;
    for (y, row) in fitted.rows().enumerate() {
        let base = (off_y as usize + y) * row_bytes + off_x as usize * 4;
        for (x, px) in row.enumerate() {
            let d = &mut frame.data[base + x * 4..base + x * 4 + 4];
            let a = u16::from(px[3]);
            let inv = 255 - a;
            for c in 0..3 {
                d[c] = add_sat_u8(
                    mul_div255(u16::from(px[c]), a),
                    mul_div255(u16::from(background[c]), inv),
                );
            }
            d[3] = 255;
        }
    }
    Ok(frame)
}

/// Blend `a` into `b` with weight `t` on `b`, writing into `dst`.
pub fn crossfade_into(dst: &mut [u8], a: &[u8], b: &[u8], t: f32) -> SlidecastResult<()> {
    if dst.len() != a.len() || dst.len() != b.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::render(
            "crossfade expects equal-length rgba8 buffers",
        ));
    }
    let tt = ((t.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;
    for ((d, a), b) in dst.iter_mut().zip(a).zip(b) {
        *d = add_sat_u8(mul_div255(u16::from(*a), it), mul_div255(u16::from(*b), tt));
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
