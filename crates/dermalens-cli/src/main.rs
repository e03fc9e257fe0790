mod replay;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dermalens_core::geometry;
use dermalens_core::{CaptureConfig, HeuristicEyewearPolicy, Phase};
use dermalens_hw::{Camera, FrameSequence};
use dermalens_session::{spawn_session, Feedback, RuntimeConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dermalens", about = "Dermalens live capture gate")]
struct Cli {
    /// Capture thresholds TOML (overrides DERMALENS_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded frames and landmarks through a full capture session
    Replay {
        /// Directory of frame images, replayed in file-name order
        #[arg(long)]
        frames: PathBuf,
        /// JSON landmark track, one entry per frame (null = no face)
        #[arg(long)]
        landmarks: PathBuf,
        /// Output JPEG (default: <DERMALENS_OUTPUT_DIR>/capture.jpg)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Give up if no capture happens within this many seconds
        #[arg(long, default_value_t = 15)]
        timeout: u64,
    },
    /// Print measurements and eyewear analysis for one frame as JSON
    Analyze {
        #[arg(long)]
        frame: PathBuf,
        #[arg(long)]
        landmarks: PathBuf,
        /// Track entry to use
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Print the effective capture thresholds as TOML
    Config,
    /// Run camera diagnostics
    Test {
        /// V4L2 device (default: DERMALENS_CAMERA_DEVICE)
        #[arg(long)]
        device: Option<String>,
        #[arg(long, default_value_t = 10)]
        frames: usize,
    },
    /// List V4L2 capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut runtime = RuntimeConfig::from_env();
    if cli.config.is_some() {
        runtime.config_path = cli.config;
    }
    let config = runtime.load_capture_config()?;

    match cli.command {
        Commands::Replay {
            frames,
            landmarks,
            out,
            timeout,
        } => {
            let out = out.unwrap_or_else(|| runtime.output_dir.join("capture.jpg"));
            run_replay(frames, landmarks, out, timeout, config).await?;
        }
        Commands::Analyze {
            frame,
            landmarks,
            index,
        } => run_analyze(frame, landmarks, index, &config)?,
        Commands::Config => print!("{}", config.to_toml_string()?),
        Commands::Test { device, frames } => {
            let device = device.unwrap_or(runtime.camera_device);
            run_camera_test(&device, frames, &config)?;
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for d in devices {
                println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
            }
        }
    }

    Ok(())
}

async fn run_replay(
    frames_dir: PathBuf,
    track_path: PathBuf,
    out: PathBuf,
    timeout: u64,
    config: CaptureConfig,
) -> Result<()> {
    let frames = replay::load_frames(&frames_dir)?;
    let track = replay::load_track(&track_path)?;
    if track.len() != frames.len() {
        tracing::warn!(
            frames = frames.len(),
            landmarks = track.len(),
            "frame and landmark counts differ"
        );
    }
    println!("Replaying {} frames from {}", frames.len(), frames_dir.display());

    let source = FrameSequence::new(frames).hold_last();
    let mut handle = spawn_session(source, replay::ReplayLandmarks::new(track), config)?;

    let mut rx = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while rx.changed().await.is_ok() {
            let line = status_line(&rx.borrow_and_update());
            if line != last {
                println!("{line}");
                last = line;
            }
        }
    });

    let captured = match tokio::time::timeout(Duration::from_secs(timeout), handle.wait_capture()).await {
        Ok(result) => result?,
        Err(_) => bail!("no capture within {timeout}s; the recording never held a valid pose long enough"),
    };
    handle.close();
    printer.await.ok();

    captured.save(&out)?;
    println!("Captured {}x{} → {}", captured.width, captured.height, out.display());
    Ok(())
}

fn run_analyze(frame_path: PathBuf, track_path: PathBuf, index: usize, config: &CaptureConfig) -> Result<()> {
    let image = image::open(&frame_path)
        .with_context(|| format!("decoding {}", frame_path.display()))?
        .to_rgba8();
    let frame = dermalens_hw::Frame::from_image(image, 0);
    let view = frame.view()?;

    let track = replay::load_track(&track_path)?;
    let Some(entry) = track.get(index) else {
        bail!("landmark track has {} entries, no index {index}", track.len());
    };
    let Some(landmarks) = entry else {
        println!("{}", serde_json::json!({ "face_detected": false }));
        return Ok(());
    };

    let measurements = geometry::measure(landmarks, view, config);
    let (ratios, verdict) = HeuristicEyewearPolicy::new(config.eyewear.clone()).evaluate(view, landmarks);
    let [cw, ch] = config.calibrated_resolution;

    let report = serde_json::json!({
        "face_detected": true,
        "frame": { "width": frame.width, "height": frame.height },
        "resolution_mismatch": frame.width != cw || frame.height != ch,
        "measurements": measurements,
        "eyewear": { "ratios": ratios, "verdict": verdict },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_camera_test(device: &str, count: usize, config: &CaptureConfig) -> Result<()> {
    println!("Running camera diagnostics on {device}...");
    let [w, h] = config.calibrated_resolution;
    let mut camera = Camera::open(device, w, h)?;
    println!(
        "Opened {}: {}x{} {:?}",
        camera.device_path, camera.width, camera.height, camera.fourcc
    );
    if (camera.width, camera.height) != (w, h) {
        println!("Warning: thresholds are calibrated for {w}x{h}");
    }

    let mut dark = 0usize;
    for _ in 0..count {
        let frame = camera.capture_frame()?;
        if frame.is_dark {
            dark += 1;
        }
        println!(
            "frame {:>4}  brightness {:>6.1}{}",
            frame.sequence,
            frame.avg_brightness(),
            if frame.is_dark { "  (dark)" } else { "" }
        );
    }
    println!("{count} frames, {dark} dark");
    Ok(())
}

fn status_line(f: &Feedback) -> String {
    match f.phase {
        Phase::Captured => return "Captured".to_string(),
        Phase::Countdown(n) => return format!("Hold still... {n}"),
        Phase::Idle => {}
    }
    let checks = checklist(f);
    format!("{checks}  Hold steady {:.0}%", f.stability_progress)
}

fn checklist(f: &Feedback) -> String {
    let s = &f.snapshot;
    let mark = |ok: bool| if ok { "[x]" } else { "[ ]" };
    let lighting = f.lighting.map(|l| l.message()).unwrap_or("Lighting");
    let distance = f.distance.map(|d| d.message()).unwrap_or("Distance");
    let glasses = if s.no_glasses { "No glasses detected" } else { "Please remove glasses" };
    [
        (s.face_detected, "Face detected"),
        (s.centered, "Center your face"),
        (s.lighting, lighting),
        (s.looking_straight, "Look straight ahead"),
        (s.no_glasses, glasses),
        (s.distance, distance),
    ]
    .iter()
    .map(|(ok, text)| format!("{} {text}", mark(*ok)))
    .collect::<Vec<_>>()
    .join("  ")
}
