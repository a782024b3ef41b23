//! posture_demo - run a tech-neck session against the configured camera
//!
//! Defaults to the synthetic camera and synthetic landmark source, so it runs
//! on any host. Stops after `--seconds` or on Ctrl-C.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use techneck::app::{CameraToggle, ModelStatus, TechNeckApp};
use techneck::capture::open_camera;
use techneck::config::AppConfig;
use techneck::detect::LoaderRegistry;
use techneck::render::LogSink;
use techneck::session::{QueuedScheduler, SessionState, TickOutcome};

const STATUS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Run time in seconds (0 = until Ctrl-C).
    #[arg(long, default_value_t = 20)]
    seconds: u64,
    /// Camera device (overrides config), e.g. stub://front_camera or /dev/video0.
    #[arg(long, env = "TECHNECK_CAMERA_DEVICE")]
    camera: Option<String>,
    /// Display refresh rate in Hz (overrides config).
    #[arg(long)]
    refresh_hz: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = AppConfig::load()?;
    if let Some(device) = args.camera {
        cfg.camera.device = device;
    }
    if let Some(refresh_hz) = args.refresh_hz {
        if refresh_hz == 0 {
            return Err(anyhow!("refresh-hz must be >= 1"));
        }
        cfg.display.refresh_hz = refresh_hz;
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("install Ctrl-C handler")?;

    let camera = open_camera(&cfg.camera.device, cfg.camera.target_fps)
        .with_context(|| format!("open camera {}", cfg.camera.device))?;
    let scheduler = QueuedScheduler::new();
    let mut app = TechNeckApp::new(
        camera,
        Box::new(scheduler.clone()),
        Box::new(LogSink::new()),
    )
    .with_profile(cfg.camera.profile);

    log::info!("posture_demo: {}", app.status_line());
    let registry = LoaderRegistry::with_builtin();
    if let ModelStatus::Failed(err) = app.load_model(
        &registry,
        &cfg.model.landmarker_options(),
        cfg.model.load_timeout,
    ) {
        bail!("{} ({})", err.user_message(), err);
    }

    match app.toggle_camera()? {
        CameraToggle::Started => {}
        other => bail!("camera did not start: {:?}", other),
    }

    let frame_interval = cfg.display.frame_interval();
    let deadline = (args.seconds > 0).then(|| Duration::from_secs(args.seconds));
    let started = Instant::now();
    let mut last_status = Instant::now();
    let mut summary = SessionState::default();

    while running.load(Ordering::SeqCst) && app.is_camera_running() {
        if deadline.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        let now_ms = started.elapsed().as_secs_f64() * 1000.0;
        for handle in scheduler.take_due() {
            if let TickOutcome::CaptureLost(err) = app.on_tick(handle, now_ms) {
                log::error!("posture_demo: camera stopped: {}", err);
            }
        }
        if let Some(session) = app.session() {
            if session.is_running() {
                summary = session.state().clone();
            }
        }
        if last_status.elapsed() >= STATUS_INTERVAL {
            log::info!("posture_demo: {}", app.status_line());
            last_status = Instant::now();
        }
        std::thread::sleep(frame_interval);
    }

    if app.is_camera_running() {
        app.toggle_camera()?;
    }
    if let Some(message) = app.error_message() {
        let hint = if app.can_retry_camera() {
            "run again once fixed"
        } else {
            "this host cannot capture"
        };
        log::error!("posture_demo: {} ({})", message, hint);
    }

    let classified = summary.frames_classified.max(1) as f64;
    log::info!(
        "posture_demo: {} frames classified, {} tech neck ({:.0}%), {} unmeasurable, {:.1}s",
        summary.frames_classified,
        summary.detection_count,
        summary.detection_count as f64 * 100.0 / classified,
        summary.frames_undetected,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
