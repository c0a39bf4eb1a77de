use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sceneshot::{
    ExtractionConfig, ExtractionEvent, ExtractionStats, FfmpegLogLevel, StreamEnd, VideoMetadata,
    VideoStream, spawn_extraction,
};
use serde_json::{Value, json};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const CLI_AFTER_HELP: &str = "Examples:\n  sceneshot extract lecture.mp4 --progress\n  sceneshot extract lecture.mp4 --threshold 0.25 --min-gap 15 --out shots --json\n  sceneshot probe lecture.mp4 --json\n  sceneshot completions zsh > _sceneshot";

#[derive(Debug, Parser)]
#[command(
    name = "sceneshot",
    version,
    about = "Extract scene-change keyframes from a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract keyframes into an output directory.
    #[command(
        after_help = "Keyframes go to <video_dir>/<video_stem>_keyframes unless --out is given."
    )]
    Extract {
        /// Input video path.
        input: PathBuf,

        /// Output directory for keyframe images.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Minimum scene-difference score (0.0 to 1.0) for a new keyframe.
        #[arg(long, default_value_t = sceneshot::config::DEFAULT_SCENE_THRESHOLD)]
        threshold: f64,

        /// Minimum number of frames between keyframes.
        #[arg(long, default_value_t = sceneshot::config::DEFAULT_MIN_FRAMES_BETWEEN)]
        min_gap: u64,

        /// Luminance (0 to 255) below which a pixel counts as black.
        #[arg(long, default_value_t = sceneshot::config::DEFAULT_BLACK_THRESHOLD)]
        black_threshold: u8,

        /// Fraction of black pixels (0.0 to 1.0) that marks a frame as black.
        #[arg(long, default_value_t = sceneshot::config::DEFAULT_BLACK_RATIO)]
        black_ratio: f64,

        /// Maximum keyframes per minute of video.
        #[arg(long, default_value_t = sceneshot::config::DEFAULT_MAX_KEYFRAMES_PER_MINUTE)]
        max_per_minute: u32,

        /// JPEG quality (0 to 100).
        #[arg(long, default_value_t = sceneshot::config::DEFAULT_OUTPUT_QUALITY)]
        quality: u8,

        /// Fail if the video ends on a read error instead of a clean EOF.
        #[arg(long)]
        strict: bool,

        /// Show a progress bar.
        #[arg(long)]
        progress: bool,

        /// Print the statistics as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print video stream metadata.
    #[command(visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    out: Option<PathBuf>,
    threshold: f64,
    min_gap: u64,
    black_threshold: u8,
    black_ratio: f64,
    max_per_minute: u32,
    quality: u8,
    strict: bool,
) -> Result<ExtractionConfig, Box<dyn std::error::Error>> {
    let mut config = ExtractionConfig::new()
        .with_scene_threshold(threshold)
        .with_min_frames_between(min_gap)
        .with_black_threshold(black_threshold)
        .with_black_ratio(black_ratio)
        .with_max_keyframes_per_minute(max_per_minute)
        .with_output_quality(quality)
        .with_fail_on_incomplete_stream(strict);
    if let Some(dir) = out {
        config = config.with_output_dir(dir);
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(global: &GlobalOptions) {
    let filter = if global.quiet {
        EnvFilter::new("error")
    } else if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Also routes the library's `log` records.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn metadata_json(metadata: &VideoMetadata) -> Value {
    json!({
        "path": metadata.path.display().to_string(),
        "width": metadata.width,
        "height": metadata.height,
        "fps": metadata.frames_per_second,
        "frame_count": metadata.frame_count,
        "duration_minutes": metadata.duration_minutes(),
        "codec": metadata.codec,
    })
}

fn stats_json(
    stats: &ExtractionStats,
    output_dir: &std::path::Path,
    status: &str,
    stream_end: Option<&StreamEnd>,
) -> Value {
    json!({
        "status": status,
        "total_frames": stats.total_frames,
        "frames_processed": stats.frames_processed,
        "keyframes_detected": stats.keyframes_detected,
        "max_allowed_keyframes": stats.max_allowed_keyframes,
        "keyframes_per_minute": stats.keyframes_per_minute(),
        "black_filtered": stats.black_filtered,
        "duration_minutes": stats.duration_minutes,
        "output_dir": output_dir.display().to_string(),
        "incomplete_stream": stream_end.is_some_and(StreamEnd::is_failure),
    })
}

fn progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}")?
            .progress_chars("##-"),
    );
    Ok(bar)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    if let Some(level) = cli.global.log_level {
        sceneshot::set_ffmpeg_log_level(level);
    }

    match cli.command {
        Commands::Extract {
            input,
            out,
            threshold,
            min_gap,
            black_threshold,
            black_ratio,
            max_per_minute,
            quality,
            strict,
            progress,
            json,
        } => {
            let config = build_config(
                out,
                threshold,
                min_gap,
                black_threshold,
                black_ratio,
                max_per_minute,
                quality,
                strict,
            )?;

            let bar = if progress { Some(progress_bar()?) } else { None };
            let handle = spawn_extraction(&input, config)?;

            for event in handle.events() {
                match event {
                    ExtractionEvent::Progress(info) => {
                        if let Some(bar) = &bar {
                            bar.set_position(info.percentage.unwrap_or(0.0).round() as u64);
                            bar.set_message(format!("{} keyframes", info.keyframes_detected));
                        }
                    }
                    ExtractionEvent::KeyframeSaved(info) => {
                        if cli.global.verbose {
                            let line = format!(
                                "{} {}",
                                "keyframe".cyan().bold(),
                                info.path.display()
                            );
                            match &bar {
                                Some(bar) => bar.println(line),
                                None => eprintln!("{line}"),
                            }
                        }
                        if let Some(bar) = &bar {
                            bar.set_message(format!("{} keyframes", info.sequence_index + 1));
                        }
                    }
                    ExtractionEvent::Completed {
                        stats,
                        output_dir,
                        stream_end,
                    } => {
                        if let Some(bar) = &bar {
                            bar.finish_and_clear();
                        }
                        if json {
                            let payload =
                                stats_json(&stats, &output_dir, "completed", stream_end.as_ref());
                            println!("{}", serde_json::to_string_pretty(&payload)?);
                        } else {
                            if let Some(end) = stream_end.as_ref().filter(|end| end.is_failure()) {
                                eprintln!(
                                    "{} {}",
                                    "warning:".yellow().bold(),
                                    format!("video may be truncated ({end})").yellow()
                                );
                            }
                            println!("{}", "Extraction complete".green().bold());
                            println!("{stats}");
                            println!("Output directory:    {}", output_dir.display());
                        }
                    }
                    ExtractionEvent::Cancelled { stats, output_dir } => {
                        if let Some(bar) = &bar {
                            bar.abandon();
                        }
                        if json {
                            let payload = stats_json(&stats, &output_dir, "cancelled", None);
                            println!("{}", serde_json::to_string_pretty(&payload)?);
                        } else {
                            println!("{}", "Extraction cancelled".yellow().bold());
                            println!("{stats}");
                        }
                    }
                    ExtractionEvent::Failed(error) => {
                        if let Some(bar) = &bar {
                            bar.abandon();
                        }
                        return Err(error.into());
                    }
                }
            }
        }
        Commands::Probe { input, json } => {
            let metadata = VideoStream::probe(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metadata_json(&metadata))?);
            } else {
                println!("File: {}", metadata.path.display());
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
                println!(
                    "Frames: {} ({:.1} min)",
                    metadata.frame_count,
                    metadata.duration_minutes()
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "sceneshot", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
