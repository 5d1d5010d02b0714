//! Glyph Recorder
//!
//! Watches frames of the glyph hacking minigame, reads which glyph is drawn on
//! the eleven-anchor grid and which indicator slot is active, and records the
//! sequence until it can be resolved against the known sequence catalog.

mod automation;
mod calibration;
mod capture;
mod error;
mod glyph;
mod paths;
mod vision;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use automation::{AutoCapture, Classifier, LogListener, RecorderConfig};
use calibration::Calibration;
use calibration::preview::{COLOR_EXPECTED, draw_strokes, render_preview, save_preview};
use capture::{DirectoryFrameSource, load_frame};
use error::CaptureError;
use glyph::{Catalog, StrokePair};
use vision::hexagon::read_indicator_band;
use vision::strokes::{detect_glyphs, detect_lines};

/// Log file mirroring the main log while a capture session runs.
static SESSION_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Logs a message to the console, the main log file and the session log, with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);

    let log_path = paths::get_logs_dir().join("glyph_recorder.log");
    append_line(&log_path, &line);

    let session_log = SESSION_LOG
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(path) = session_log {
        append_line(&path, &line);
    }
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Starts or stops mirroring log lines into a session file.
pub fn set_session_log(path: Option<PathBuf>) {
    *SESSION_LOG.lock().unwrap_or_else(PoisonError::into_inner) = path;
}

#[derive(Parser, Debug)]
#[command(name = "glyph-recorder")]
#[command(about = "Record glyph sequences from minigame frames")]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the anchor grid in a frame showing the empty panel
    Calibrate(CalibrateArgs),
    /// Classify single frames
    Classify(ClassifyArgs),
    /// Replay a directory of frames through a capture session
    Watch(WatchArgs),
    /// Add every recognised glyph in a directory of frames to the history, in order.
    /// A frame with neither slots nor a glyph ends one drawing and clears the history
    Record(RecordArgs),
    /// Draw the detected anchors, strokes and slots onto a frame
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct CalibrateArgs {
    image: PathBuf,
    /// Store the detected anchors in the config file
    #[arg(long)]
    save: bool,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct WatchArgs {
    dir: PathBuf,
    /// Override the polling interval
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Detect the anchors in this frame instead of using the stored calibration
    #[arg(long)]
    calibrate: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RecordArgs {
    dir: PathBuf,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    image: PathBuf,
    output: PathBuf,
    /// Also draw the catalog strokes of this glyph, for comparison
    #[arg(long)]
    glyph: Option<String>,
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprint!("{}", log_msg);
        append_line(&paths::get_logs_dir().join("glyph_recorder.log"), &log_msg);
    }));

    let cli = Cli::parse();

    paths::ensure_directories()?;
    let config_path = cli.config.clone().unwrap_or_else(paths::get_config_path);
    automation::init_config(Some(&config_path));
    let config = automation::get_config().clone();

    match cli.cmd {
        Command::Calibrate(args) => run_calibrate(config, &config_path, &args),
        Command::Classify(args) => run_classify(config, &args),
        Command::Watch(args) => run_watch(config, &args),
        Command::Record(args) => run_record(config, &args),
        Command::Preview(args) => run_preview(config, &args),
    }
}

fn load_catalog(config: &RecorderConfig) -> Result<Arc<Catalog>> {
    let catalog = Catalog::load(
        config.glyph_catalog.as_deref(),
        config.sequence_catalog.as_deref(),
    )?;
    Ok(Arc::new(catalog))
}

fn run_calibrate(mut config: RecorderConfig, config_path: &Path, args: &CalibrateArgs) -> Result<()> {
    let frame = load_frame(&args.image)?;
    let calibration = calibration::calibrate_from_frame(&frame, &config.circle_detection)
        .with_context(|| format!("Calibration failed on {}", args.image.display()))?;

    for (i, (x, y)) in calibration.points().iter().enumerate() {
        println!("{:2}: ({}, {})", i, x, y);
    }

    if args.save {
        config.anchors = calibration.to_config();
        automation::save_config(&config, config_path)?;
    }
    Ok(())
}

fn run_classify(config: RecorderConfig, args: &ClassifyArgs) -> Result<()> {
    let catalog = load_catalog(&config)?;
    let calibration = load_calibration(&config)?;
    let classifier = Classifier::new(Arc::clone(&catalog), calibration.clone().map(Arc::new), &config);
    if !classifier.is_calibrated() {
        log("No calibration stored, only slots will be read");
    }

    for path in &args.images {
        let frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(e) => {
                log(&format!("{}: {}", path.display(), e));
                continue;
            }
        };
        let result = classifier.classify_frame(&frame);
        println!(
            "{}: {} slot(s), active {:?}, glyph {}",
            path.display(),
            result.hexagon_count,
            result.slot,
            result.symbol.as_deref().unwrap_or("-")
        );

        if let Some(calibration) = &calibration {
            let candidates = detect_glyphs(
                &frame,
                calibration,
                &config.stroke_detection,
                &catalog,
                config.matching.symbol_ratio,
            );
            if candidates.len() > 1 {
                println!("  candidates: {}", candidates.join(", "));
            }
        }
    }
    Ok(())
}

fn run_watch(mut config: RecorderConfig, args: &WatchArgs) -> Result<()> {
    if let Some(interval) = args.interval_ms {
        config.capture.auto_interval_ms = interval;
    }
    let catalog = load_catalog(&config)?;
    let source = DirectoryFrameSource::new(&args.dir)?;
    if source.is_empty() {
        bail!("No frames in {}", args.dir.display());
    }
    log(&format!("Replaying {} frame(s) from {}", source.len(), args.dir.display()));

    let circle_params = config.circle_detection.clone();
    let mut recorder = AutoCapture::new(config, catalog, Arc::new(source), Arc::new(LogListener));
    if let Some(image) = &args.calibrate {
        let calibration = calibration::calibrate_from_frame(&load_frame(image)?, &circle_params)?;
        recorder.set_calibration(calibration)?;
    }
    if recorder.calibration().is_none() {
        bail!("No calibration: run `calibrate --save` first or pass --calibrate <image>");
    }
    recorder.start_auto_capture()?;
    recorder.wait();
    log(&format!("Session ended in state {}", recorder.state()));

    println!("{}", recorder.status_string());
    match recorder.resolved() {
        Some(glyphs) => println!("Sequence: {}", glyphs.join(" ")),
        None => println!("Sequence not resolved"),
    }
    Ok(())
}

fn run_record(config: RecorderConfig, args: &RecordArgs) -> Result<()> {
    let catalog = load_catalog(&config)?;
    let source = DirectoryFrameSource::new(&args.dir)?;
    let recorder = AutoCapture::new(config, catalog, Arc::new(source), Arc::new(LogListener));

    let mut drawings = 0;
    loop {
        match recorder.capture_once() {
            Ok(result) => {
                let blank = result.hexagon_count == 0 && result.symbol.is_none();
                if blank && !recorder.captured().is_empty() {
                    drawings += 1;
                    println!("Drawing {}: {}", drawings, recorder.status_string());
                    recorder.clear();
                }
            }
            Err(CaptureError::Exhausted) => break,
            Err(e) => log(&format!("Skipping frame: {}", e)),
        }
    }

    if !recorder.captured().is_empty() {
        println!("Drawing {}: {}", drawings + 1, recorder.status_string());
    }
    Ok(())
}

fn load_calibration(config: &RecorderConfig) -> Result<Option<Calibration>> {
    if config.anchors.is_empty() {
        return Ok(None);
    }
    Ok(Some(Calibration::from_config(&config.anchors)?))
}

fn run_preview(config: RecorderConfig, args: &PreviewArgs) -> Result<()> {
    let frame = load_frame(&args.image)?;
    let calibration = load_calibration(&config)?;
    let strokes = calibration
        .as_ref()
        .map(|c| detect_lines(&frame, c, &config.stroke_detection))
        .unwrap_or_default();
    let indicators = read_indicator_band(&frame, &config.hexagon_detection);

    let mut img = render_preview(&frame, calibration.as_ref(), &strokes, &indicators);

    if let Some(name) = &args.glyph {
        let Some(calibration) = &calibration else {
            bail!("Drawing a glyph needs a stored calibration");
        };
        let catalog = load_catalog(&config)?;
        let expected: Vec<StrokePair> = catalog.strokes_for(name).into_iter().collect();
        if expected.is_empty() {
            bail!("Unknown glyph '{}'", name);
        }
        draw_strokes(&mut img, calibration, &expected, COLOR_EXPECTED, 1);
    }

    save_preview(&img, &args.output)
}
