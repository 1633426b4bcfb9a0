use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::audio::pcm::{AudioPcm, read_wav};
use crate::config::VoiceConfig;

/// Black-box text-to-speech engine.
///
/// Implementations must be deterministic: the same `(text, voice)` pair renders the same samples.
pub trait SpeechEngine: Send + Sync {
    /// Short engine name for logs and manifests.
    fn name(&self) -> &str;

    /// Render `text` with `voice`. The returned PCM may use any sample rate/channel layout.
    fn render(&self, text: &str, voice: &VoiceConfig) -> anyhow::Result<AudioPcm>;
}

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Offline engine driving the system `espeak-ng` binary.
#[derive(Clone, Debug)]
pub struct EspeakEngine {
    program: PathBuf,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl EspeakEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("espeak-ng"),
            timeout,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Use a specific binary instead of `espeak-ng` from `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory for the engine's intermediate WAV files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Return `true` when the engine binary can be invoked.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn scratch_path(&self) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir
            .join(format!("slidecast-espeak-{}-{n}.wav", std::process::id()))
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    fn render(&self, text: &str, voice: &VoiceConfig) -> anyhow::Result<AudioPcm> {
        let out_path = self.scratch_path();
        std::fs::create_dir_all(&self.scratch_dir).with_context(|| {
            format!("create speech scratch dir '{}'", self.scratch_dir.display())
        })?;

        let mut child = Command::new(&self.program)
            .args(["-v", &voice.voice])
            .args(["-s", &voice.rate.to_string()])
            .args(["-p", &voice.pitch.to_string()])
            .arg("--stdin")
            .arg("-w")
            .arg(&out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to spawn '{}' (is it installed and on PATH?)",
                    self.program.display()
                )
            })?;

        // Fed from its own thread so a child that never reads still hits the timeout.
        // Dropping stdin closes the pipe so espeak-ng sees end of input.
        let feeder = child.stdin.take().map(|mut stdin| {
            let bytes = text.as_bytes().to_vec();
            std::thread::spawn(move || stdin.write_all(&bytes))
        });

        let waited = wait_with_timeout(child, self.timeout);
        let fed = match feeder {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("stdin feeder thread panicked"))
                .and_then(|r| r.context("failed to write text to espeak-ng stdin")),
            None => Err(anyhow::anyhow!("failed to open espeak-ng stdin (unexpected)")),
        };

        let result = waited.and_then(|(status, stderr)| {
            fed?;
            anyhow::ensure!(
                status.success(),
                "espeak-ng exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            );
            read_wav(&out_path).map_err(anyhow::Error::from)
        });
        let _ = std::fs::remove_file(&out_path);
        result
    }
}

/// Wait for `child`, killing it once `timeout` elapses. Returns exit status and captured stderr.
pub(crate) fn wait_with_timeout(
    mut child: Child,
    timeout: Duration,
) -> anyhow::Result<(ExitStatus, Vec<u8>)> {
    let stderr_drain = child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes).map(|_| bytes)
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait().context("failed to poll child process")? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!("process timed out after {:.1}s", timeout.as_secs_f64());
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let stderr = match stderr_drain {
        Some(handle) => handle
            .join()
            .map_err(|_| anyhow::anyhow!("stderr drain thread panicked"))?
            .context("stderr read failed")?,
        None => Vec::new(),
    };
    Ok((status, stderr))
}
