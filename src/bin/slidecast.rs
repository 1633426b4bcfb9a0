use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, prelude::*};

use slidecast::pipeline::{self, PipelineInputs};
use slidecast::{EspeakEngine, PipelineConfig, Strictness, TransitionType};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment a script and print the narration units as JSON.
    Segment(SegmentArgs),
    /// Run the full pipeline and write an MP4 (requires `espeak-ng` and `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print the effective configuration as JSON.
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
struct SegmentArgs {
    /// Narration script (`.txt`, or `.json` topic sections).
    #[arg(long)]
    script: PathBuf,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Narration script (`.txt`, or `.json` topic sections).
    #[arg(long)]
    script: PathBuf,

    /// Image pool JSON.
    #[arg(long)]
    images: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Music bed WAV.
    #[arg(long)]
    music: Option<PathBuf>,

    /// Directory for intermediate artifacts [default: `<out dir>/slidecast-work`].
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Pipeline config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Override the slide transition.
    #[arg(long, value_enum)]
    transition: Option<TransitionChoice>,

    /// Keep going past failing units (silent narration and placeholder slides are logged).
    #[arg(long)]
    skip_failed: bool,

    /// Do not write the `captions.srt` sidecar.
    #[arg(long)]
    no_captions: bool,

    /// Draw the captions onto the frames (ffmpeg must have libass).
    #[arg(long)]
    burn_captions: bool,

    /// Path to the `espeak-ng` binary.
    #[arg(long, default_value = "espeak-ng")]
    espeak: PathBuf,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Config JSON to merge over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TransitionChoice {
    Crossfade,
    Cut,
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Segment(args) => cmd_segment(args),
        Command::Render(args) => cmd_render(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let cfg = match path {
        Some(p) => PipelineConfig::from_json_file(p)?,
        None => PipelineConfig::default(),
    };
    Ok(cfg)
}

fn cmd_segment(args: SegmentArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let units = pipeline::segment_script(&args.script, &cfg)?;
    let json = serde_json::to_string_pretty(&units).context("serialize narration units")?;
    println!("{json}");
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(fps) = args.fps {
        cfg.fps = fps;
    }
    if let Some(t) = args.transition {
        cfg.transition_type = match t {
            TransitionChoice::Crossfade => TransitionType::Crossfade,
            TransitionChoice::Cut => TransitionType::Cut,
        };
    }
    if args.skip_failed {
        cfg.strictness = Strictness::SkipAndLog;
    }
    if args.no_captions {
        cfg.write_captions = false;
    }
    if args.burn_captions {
        cfg.burn_captions = true;
    }
    cfg.validate()?;

    let work_dir = args.work_dir.unwrap_or_else(|| {
        args.out
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("slidecast-work")
    });
    let engine = EspeakEngine::new(Duration::from_secs_f64(cfg.synthesis_timeout_secs))
        .with_program(&args.espeak)
        .with_scratch_dir(work_dir.join("tmp"));
    if !engine.is_available() {
        anyhow::bail!(
            "speech engine '{}' is not available (install espeak-ng or pass --espeak)",
            args.espeak.display()
        );
    }

    let inputs = PipelineInputs {
        script: args.script,
        images: args.images,
        music: args.music,
        output: args.out,
        work_dir,
    };
    let out = pipeline::run(&inputs, &cfg, &engine)?;

    eprintln!("wrote {}", out.video.display());
    if let Some(captions) = &out.captions {
        eprintln!("wrote {}", captions.display());
    }
    eprintln!("manifest {}", out.manifest.display());
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let json = serde_json::to_string_pretty(&cfg).context("serialize config")?;
    println!("{json}");
    Ok(())
}
