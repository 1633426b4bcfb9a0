use std::ffi::OsString;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::captions::BURN_STYLE;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::frame::FrameRgba;

/// Encodes frames to an H.264 MP4 through the system `ffmpeg`, muxing the staged soundtrack as
/// AAC.
///
/// Frames are streamed as raw RGBA on stdin. The output is always written as MP4, whatever the
/// extension of `out_path`.
pub struct FfmpegSink {
    out_path: PathBuf,
    running: Option<Encoder>,
}

struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: JoinHandle<std::io::Result<Vec<u8>>>,
    frame_len: usize,
    frames: u64,
}

impl FfmpegSink {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            running: None,
        }
    }
}

/// Full `ffmpeg` argument list for one encode into `out`.
pub fn encoder_args(cfg: &SinkConfig, out: &Path) -> SlidecastResult<Vec<OsString>> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));

    push(&["-y", "-loglevel", "error"]);
    push(&[
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
        // Input rate: must precede `-i`.
        "-r",
        &format!("{}/{}", cfg.fps.num, cfg.fps.den),
        "-i",
        "pipe:0",
    ]);
    if let Some(track) = &cfg.soundtrack {
        if track.sample_rate == 0 || track.channels == 0 {
            return Err(SlidecastError::validation(
                "soundtrack sample rate and channels must be non-zero",
            ));
        }
        push(&[
            "-f",
            "f32le",
            "-ar",
            &track.sample_rate.to_string(),
            "-ac",
            &track.channels.to_string(),
            "-i",
        ]);
        args.push(track.path.clone().into_os_string());
    }

    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));
    if let Some(srt) = &cfg.burned_captions {
        push(&["-vf", &subtitles_filter(srt)]);
    }
    push(&["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
    if cfg.soundtrack.is_some() {
        push(&["-c:a", "aac", "-shortest"]);
    } else {
        push(&["-an"]);
    }
    push(&["-movflags", "+faststart", "-f", "mp4"]);
    args.push(out.as_os_str().to_owned());
    Ok(args)
}

/// `subtitles` filter drawing `srt` with [`BURN_STYLE`].
pub fn subtitles_filter(srt: &Path) -> String {
    format!(
        "subtitles=filename={}:force_style={}",
        escape_filter_value(&srt.to_string_lossy()),
        escape_filter_value(BURN_STYLE)
    )
}

/// Escape a filter option value for both the option parser and the filtergraph parser.
fn escape_filter_value(value: &str) -> String {
    let escape = |s: &str, special: &[char]| {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            if special.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    };
    let option_level = escape(value, &['\\', '\'', ':']);
    escape(&option_level, &['\\', '\'', ',', ';', '[', ']'])
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: &SinkConfig) -> SlidecastResult<()> {
        if self.running.is_some() {
            return Err(SlidecastError::render("ffmpeg encoder is already running"));
        }
        let canvas = cfg.canvas;
        if canvas.width == 0
            || canvas.height == 0
            || !canvas.width.is_multiple_of(2)
            || !canvas.height.is_multiple_of(2)
        {
            return Err(SlidecastError::validation(format!(
                "canvas {}x{} must be non-zero and even for yuv420p output",
                canvas.width, canvas.height
            )));
        }
        if let Some(srt) = &cfg.burned_captions
            && !srt.is_file()
        {
            return Err(SlidecastError::validation(format!(
                "captions file '{}' does not exist",
                srt.display()
            )));
        }
        let args = encoder_args(cfg, &self.out_path)?;

        ensure_parent_dir(&self.out_path)?;
        if !is_ffmpeg_on_path() {
            return Err(SlidecastError::render(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SlidecastError::render(format!("failed to spawn ffmpeg: {e}")))?;

        let (Some(stdin), Some(mut stderr)) = (child.stdin.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SlidecastError::render("ffmpeg started without piped stdio"));
        };
        let stderr = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf)?;
            Ok(buf)
        });

        tracing::debug!(out = %self.out_path.display(), "ffmpeg encoder started");
        self.running = Some(Encoder {
            child,
            stdin: Some(stdin),
            stderr,
            frame_len: canvas.rgba_len(),
            frames: 0,
        });
        Ok(())
    }

    fn push_frame(&mut self, frame: &Arc<FrameRgba>) -> SlidecastResult<()> {
        let enc = self
            .running
            .as_mut()
            .ok_or_else(|| SlidecastError::render("ffmpeg encoder is not running"))?;
        if frame.data.len() != enc.frame_len {
            return Err(SlidecastError::render(format!(
                "frame {} is {}x{} ({} bytes), encoder expects {} bytes",
                enc.frames,
                frame.width,
                frame.height,
                frame.data.len(),
                enc.frame_len
            )));
        }
        let stdin = enc
            .stdin
            .as_mut()
            .ok_or_else(|| SlidecastError::render("ffmpeg stdin is closed"))?;
        stdin.write_all(&frame.data).map_err(|e| {
            SlidecastError::render(format!("ffmpeg stopped accepting frame {}: {e}", enc.frames))
        })?;
        enc.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<u64> {
        let mut enc = self
            .running
            .take()
            .ok_or_else(|| SlidecastError::render("ffmpeg encoder is not running"))?;
        drop(enc.stdin.take());

        let status = enc
            .child
            .wait()
            .map_err(|e| SlidecastError::render(format!("waiting for ffmpeg failed: {e}")))?;
        let stderr = enc
            .stderr
            .join()
            .map_err(|_| SlidecastError::render("ffmpeg stderr reader panicked"))?
            .unwrap_or_default();
        if !status.success() {
            return Err(SlidecastError::render(format!(
                "ffmpeg exited with {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(enc.frames)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut enc) = self.running.take() {
            drop(enc.stdin.take());
            let _ = enc.child.kill();
            let _ = enc.child.wait();
        }
    }
}

/// Video and audio stream durations of a written file, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbedDurations {
    pub video: Option<f64>,
    pub audio: Option<f64>,
}

/// Read stream durations through `ffprobe`.
pub fn probe_durations(path: &Path) -> SlidecastResult<ProbedDurations> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .context("failed to run ffprobe")?;
    if !out.status.success() {
        return Err(SlidecastError::render(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut =
        serde_json::from_slice(&out.stdout).context("ffprobe json parse failed")?;
    let stream = |kind: &str| {
        parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
            .and_then(|s| s.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
    };
    Ok(ProbedDurations {
        video: stream("video"),
        audio: stream("audio"),
    })
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
