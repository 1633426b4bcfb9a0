use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::samples_to_secs;
use crate::foundation::error::{SlidecastError, SlidecastResult};

#[derive(Clone, Debug, PartialEq)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples in `[-1, 1]`.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: 1,
            interleaved_f32: samples,
        }
    }

    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        samples_to_secs(self.frames() as u64, self.sample_rate)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.interleaved_f32
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Average all channels into one.
    pub fn to_mono(&self) -> AudioPcm {
        if self.channels <= 1 {
            return self.clone();
        }
        let ch = usize::from(self.channels);
        let samples = self
            .interleaved_f32
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect();
        AudioPcm::mono(self.sample_rate, samples)
    }

    /// Linear-interpolation resample to `target_rate`, keeping the channel layout.
    pub fn resample(&self, target_rate: u32) -> SlidecastResult<AudioPcm> {
        if target_rate == 0 || self.sample_rate == 0 {
            return Err(SlidecastError::validation("sample rates must be non-zero"));
        }
        if target_rate == self.sample_rate || self.is_empty() {
            return Ok(AudioPcm {
                sample_rate: target_rate,
                ..self.clone()
            });
        }

        let ch = usize::from(self.channels);
        let src_frames = self.frames();
        let dst_frames = ((src_frames as u128 * u128::from(target_rate)
            + u128::from(self.sample_rate) / 2)
            / u128::from(self.sample_rate)) as usize;
        let step = f64::from(self.sample_rate) / f64::from(target_rate);
        let src = &self.interleaved_f32;

        let mut out = Vec::with_capacity(dst_frames * ch);
        for dst in 0..dst_frames {
            let pos = dst as f64 * step;
            let f0 = (pos.floor() as usize).min(src_frames - 1);
            let f1 = (f0 + 1).min(src_frames - 1);
            let frac = (pos - f0 as f64) as f32;
            for c in 0..ch {
                let v0 = src[f0 * ch + c];
                let v1 = src[f1 * ch + c];
                out.push(v0 + ((v1 - v0) * frac));
            }
        }

        Ok(AudioPcm {
            sample_rate: target_rate,
            channels: self.channels,
            interleaved_f32: out,
        })
    }

    /// Bring the buffer to mono at `sample_rate`.
    pub fn conform_mono(&self, sample_rate: u32) -> SlidecastResult<AudioPcm> {
        self.to_mono().resample(sample_rate)
    }
}

/// Read a PCM WAV file (integer or float samples) into `f32`.
pub fn read_wav(path: &Path) -> SlidecastResult<AudioPcm> {
    let reader =
        hound::WavReader::open(path).with_context(|| format!("open wav '{}'", path.display()))?;
    decode_wav(reader)
        .with_context(|| format!("decode wav '{}'", path.display()))
        .map_err(Into::into)
}

fn decode_wav<R: std::io::Read>(reader: hound::WavReader<R>) -> anyhow::Result<AudioPcm> {
    let spec = reader.spec();
    anyhow::ensure!(
        spec.channels > 0 && spec.sample_rate > 0,
        "wav has zero channels or sample rate"
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(AudioPcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        interleaved_f32: samples,
    })
}

/// Write `pcm` as a 32-bit float WAV, creating parent directories.
pub fn write_wav(pcm: &AudioPcm, path: &Path) -> SlidecastResult<()> {
    ensure_parent(path)?;
    let spec = hound::WavSpec {
        channels: pcm.channels,
        sample_rate: pcm.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("create wav '{}'", path.display()))?;
    for &s in &pcm.interleaved_f32 {
        writer
            .write_sample(s)
            .with_context(|| format!("write wav '{}'", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalize wav '{}'", path.display()))?;
    Ok(())
}

/// Write interleaved `f32` PCM samples to raw little-endian `.f32le` file.
pub fn write_f32le(samples_interleaved: &[f32], out_path: &Path) -> SlidecastResult<()> {
    ensure_parent(out_path)?;
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes)
        .with_context(|| format!("write raw audio '{}'", out_path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create audio output directory '{}'", parent.display()))?;
    }
    Ok(())
}
