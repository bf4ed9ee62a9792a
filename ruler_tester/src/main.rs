mod image_helper;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};
use image_helper::image_helper::{load_rgba, save};
use ruler_vision::core_modules::screenshot::Screenshot;
use ruler_vision::pipeline::{MeasurementRecord, PointerEvent};
use ruler_vision::session::{SessionEvent, SessionHandle};
use ruler_vision::RulerConfig;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: ruler_tester <screenshot.png> <x> <y> [--area] [--debug <overlay.png>]";

struct Args {
    screenshot: PathBuf,
    x: i64,
    y: i64,
    area: bool,
    debug_out: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        bail!(USAGE);
    }

    let mut parsed = Args {
        screenshot: PathBuf::from(&args[0]),
        x: args[1].parse().with_context(|| format!("invalid x: {}", args[1]))?,
        y: args[2].parse().with_context(|| format!("invalid y: {}", args[2]))?,
        area: false,
        debug_out: None,
    };

    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--area" => parsed.area = true,
            "--debug" => {
                let path = rest.next().context("--debug needs an output path")?;
                parsed.debug_out = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument {other}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn print_record(record: &MeasurementRecord) {
    let extents = record.extents();
    let anchor = record.anchor();
    let color = record.background_color();
    let kind = match record {
        MeasurementRecord::Distances(_) => "distances",
        MeasurementRecord::Area(_) => "area",
    };
    println!("{kind} at ({}, {}): {}", anchor.x, anchor.y, record.label());
    println!(
        "  top {} right {} bottom {} left {}",
        extents.top, extents.right, extents.bottom, extents.left
    );
    println!("  background hsl({:.3}, {:.3}, {:.3})", color.h, color.s, color.l);
    if let MeasurementRecord::Area(result) = record {
        println!(
            "  region {} px, box x {}..={} y {}..={}",
            result.pixel_count,
            result.bounds.left,
            result.bounds.right,
            result.bounds.top,
            result.bounds.bottom
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args = parse_args()?;

    // --- 1. Screenshot loading ---
    let rgba = load_rgba(&args.screenshot)
        .with_context(|| format!("failed to load {}", args.screenshot.display()))?;
    let screenshot = Screenshot::try_from(rgba)?;
    tracing::info!(
        width = screenshot.width(),
        height = screenshot.height(),
        "screenshot loaded"
    );

    // --- 2. Session start ---
    let config = RulerConfig {
        debug_overlay: args.debug_out.is_some() && args.area,
        ..RulerConfig::default()
    };
    let (session, mut events) = SessionHandle::spawn(0, config);
    session.screenshot(screenshot);
    session.pointer(PointerEvent::new(args.x, args.y, args.area));

    // --- 3. Event loop ---
    let mut last_overlay = None;
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::ScreenshotProcessed { generation } => {
                tracing::debug!(generation, "screenshot processed");
            }
            SessionEvent::DebugScreen { tick, overlay, .. } => {
                tracing::debug!(tick, "debug screen");
                last_overlay = Some(overlay);
            }
            SessionEvent::Measurement(record) => {
                print_record(&record);
                break;
            }
            SessionEvent::Cleared => {
                println!("no measurement at ({}, {})", args.x, args.y);
                break;
            }
        }
    }

    // --- 4. Debug overlay ---
    if let (Some(path), Some(overlay)) = (&args.debug_out, &last_overlay) {
        save(path, overlay).with_context(|| format!("failed to write {}", path.display()))?;
        println!("debug overlay saved to {}", path.display());
    }

    session.shutdown().await;
    Ok(())
}
