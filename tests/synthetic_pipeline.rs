use std::time::Duration;

use techneck::app::{CameraToggle, ModelStatus, TechNeckApp};
use techneck::capture::open_camera;
use techneck::config::AppConfig;
use techneck::detect::LoaderRegistry;
use techneck::render::LogSink;
use techneck::session::{QueuedScheduler, TickOutcome};

#[test]
fn synthetic_camera_and_model_classify_upright_posture() {
    let cfg = AppConfig::default();
    let camera = open_camera(&cfg.camera.device, 100).expect("synthetic camera");
    let scheduler = QueuedScheduler::new();
    let mut app = TechNeckApp::new(camera, Box::new(scheduler.clone()), Box::new(LogSink::new()))
        .with_profile(cfg.camera.profile);

    assert_eq!(app.toggle_camera(), Ok(CameraToggle::ModelNotReady));
    let status = app
        .load_model(
            &LoaderRegistry::with_builtin(),
            &cfg.model.landmarker_options(),
            Duration::from_secs(5),
        )
        .clone();
    assert_eq!(status, ModelStatus::Ready);
    assert_eq!(app.toggle_camera(), Ok(CameraToggle::Started));

    let mut classified = 0;
    for step in 1..=15u32 {
        std::thread::sleep(Duration::from_millis(15));
        for handle in scheduler.take_due() {
            let outcome = app.on_tick(handle, f64::from(step) * 15.0);
            match outcome {
                TickOutcome::Classified(result) => {
                    assert!(!result.has_tech_neck);
                    classified += 1;
                }
                TickOutcome::CaptureLost(err) => panic!("capture lost: {}", err),
                TickOutcome::InferenceFailed | TickOutcome::ModeSwitchFailed => {
                    panic!("unexpected outcome {:?}", outcome)
                }
                _ => {}
            }
        }
    }

    assert!(classified > 0);
    let state = app.session().expect("session").state().clone();
    assert_eq!(state.detection_count, 0);
    assert_eq!(state.frames_classified, classified);
    assert_eq!(state.detected_poses, 1);
    assert!(state.last_result.expect("verdict").score > 80);

    assert_eq!(app.toggle_camera(), Ok(CameraToggle::Stopped));
    assert!(!app.is_camera_running());
    assert!(app.error_message().is_none());
}
