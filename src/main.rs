use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trailblazer::capture::StillFrameCapture;
use trailblazer::{EngineConfig, Perception, Result, ScreenFix, ScreenPerception};
use trailblazer_core::{BearingSample, Compass};
use trailblazer_cv::utils::ImageUtils;

#[derive(Parser)]
#[command(name = "trailblazer")]
#[command(about = "Screen-vision navigation engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration as JSON.
    Defaults,
    /// Run icon, avatar and beacon perception over a screenshot.
    Inspect {
        /// Screenshot standing in for the screen.
        #[arg(long)]
        screenshot: PathBuf,

        /// Configuration file (missing fields take their defaults).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the full-frame scene report (JSON) here.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write an annotated copy of the screenshot here.
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Use enhanced (mask + edge) icon matching.
        #[arg(long)]
        enhanced: bool,

        /// Locate the avatar by template only, skipping the ring marker.
        #[arg(long)]
        no_ring: bool,
    },
}

/// What the engine would see on this screen
#[derive(Serialize)]
struct PerceptionSummary {
    icon: Option<ScreenFix>,
    avatar: Option<ScreenFix>,
    beacon: Option<BearingSample>,
    heading: Option<String>,
}

fn main() -> Result<()> {
    trailblazer::logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Defaults => {
            let json = serde_json::to_string_pretty(&EngineConfig::default())?;
            println!("{json}");
            Ok(())
        }
        Commands::Inspect {
            screenshot,
            config,
            out,
            overlay,
            enhanced,
            no_ring,
        } => {
            let mut cfg = match config {
                Some(path) => EngineConfig::load(path)?,
                None => EngineConfig::default(),
            };
            if enhanced {
                cfg = cfg.with_enhanced_icon();
            }
            if no_ring {
                cfg.detection = cfg.detection.with_template_avatar();
            }
            cfg.validate()?;
            run_inspect(&cfg, &screenshot, out.as_deref(), overlay.as_deref())
        }
    }
}

fn run_inspect(cfg: &EngineConfig, screenshot: &Path, out: Option<&Path>, overlay: Option<&Path>) -> Result<()> {
    tracing::info!("Loading screenshot: {}", screenshot.display());
    let capture = Arc::new(StillFrameCapture::open(screenshot)?);
    let frame = ImageUtils::rgba_to_bgr(capture.frame())?;
    let perception = ScreenPerception::new(cfg.detection.clone(), capture)?;

    let icon = perception.locate_icon()?;
    let avatar = perception.locate_avatar()?;
    let beacon = match &avatar {
        Some(fix) => perception.detect_beacon(fix.center)?,
        None => None,
    };
    let summary = PerceptionSummary {
        icon,
        avatar,
        beacon,
        heading: beacon.map(|b| Compass::from_bearing(b.degrees).to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if out.is_none() && overlay.is_none() {
        return Ok(());
    }
    let detector = perception.detector();
    let report = detector.inspect(&frame).context("Full-frame inspection failed")?;
    tracing::info!("Full-frame inspection took {} ms", report.processing_time_ms);

    if let Some(path) = out {
        detector.export_json(&report, path)?;
        tracing::info!("Report written to {}", path.display());
    }
    if let Some(path) = overlay {
        detector.save_overlay(&frame, &report, path)?;
    }
    Ok(())
}
