//! Application shell: model status and the camera toggle.

use std::time::Duration;

use crate::capture::{CaptureDevice, CaptureError, CaptureProfile};
use crate::detect::{LandmarkerOptions, LoaderRegistry, ModelLoadError, SharedLandmarker};
use crate::render::RenderSink;
use crate::session::{FrameScheduler, SessionLoop, TickHandle, TickOutcome};

/// Landmark source lifecycle. `Failed` is terminal until the app is rebuilt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed(ModelLoadError),
}

/// Result of pressing the camera toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraToggle {
    Started,
    Stopped,
    /// The landmark source is not loaded; nothing happened.
    ModelNotReady,
}

/// Capabilities held until the model is ready and a session can be built.
struct SessionParts {
    camera: Box<dyn CaptureDevice>,
    scheduler: Box<dyn FrameScheduler>,
    sink: Box<dyn RenderSink>,
}

pub struct TechNeckApp {
    status: ModelStatus,
    profile: CaptureProfile,
    parts: Option<SessionParts>,
    session: Option<SessionLoop>,
}

impl TechNeckApp {
    pub fn new(
        camera: Box<dyn CaptureDevice>,
        scheduler: Box<dyn FrameScheduler>,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        Self {
            status: ModelStatus::Loading,
            profile: CaptureProfile::default(),
            parts: Some(SessionParts {
                camera,
                scheduler,
                sink,
            }),
            session: None,
        }
    }

    pub fn with_profile(mut self, profile: CaptureProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn status(&self) -> &ModelStatus {
        &self.status
    }

    pub fn is_model_ready(&self) -> bool {
        self.status == ModelStatus::Ready
    }

    /// Load the landmark source through `registry` and record the outcome.
    pub fn load_model(
        &mut self,
        registry: &LoaderRegistry,
        options: &LandmarkerOptions,
        timeout: Duration,
    ) -> &ModelStatus {
        let loaded = registry.load(options, timeout);
        self.model_loaded(loaded)
    }

    /// Record the outcome of a landmark source load. Only the first outcome
    /// counts; later calls are ignored.
    pub fn model_loaded(
        &mut self,
        loaded: Result<SharedLandmarker, ModelLoadError>,
    ) -> &ModelStatus {
        if self.status != ModelStatus::Loading {
            log::warn!("TechNeckApp: model already {:?}, load result ignored", self.status);
            return &self.status;
        }
        match loaded {
            Ok(landmarker) => match self.parts.take() {
                Some(parts) => {
                    let session =
                        SessionLoop::new(landmarker, parts.camera, parts.scheduler, parts.sink)
                            .with_profile(self.profile);
                    self.session = Some(session);
                    self.status = ModelStatus::Ready;
                    log::info!("TechNeckApp: pose model ready");
                }
                None => {
                    self.status = ModelStatus::Failed(ModelLoadError::Initialization(
                        "session capabilities already consumed".to_string(),
                    ));
                }
            },
            Err(err) => {
                log::error!("TechNeckApp: {} ({})", err.user_message(), err);
                self.status = ModelStatus::Failed(err);
            }
        }
        &self.status
    }

    /// Start the camera session when idle, stop it when running.
    ///
    /// After a camera error the user cannot act on (see
    /// [`CaptureError::is_retryable`]) the camera is not requested again and
    /// the same error is returned.
    pub fn toggle_camera(&mut self) -> Result<CameraToggle, CaptureError> {
        let Some(session) = self.session.as_mut() else {
            log::info!("TechNeckApp: pose model not loaded yet, camera stays off");
            return Ok(CameraToggle::ModelNotReady);
        };
        if session.is_running() {
            session.stop();
            return Ok(CameraToggle::Stopped);
        }
        if let Some(err) = session.last_error().filter(|err| !err.is_retryable()) {
            log::warn!("TechNeckApp: camera unusable ({}), not retrying", err.code());
            return Err(err.clone());
        }
        session.start()?;
        Ok(CameraToggle::Started)
    }

    /// Forward a fired tick to the session.
    pub fn on_tick(&mut self, handle: TickHandle, now_ms: f64) -> TickOutcome {
        match self.session.as_mut() {
            Some(session) => session.on_tick(handle, now_ms),
            None => TickOutcome::Ignored,
        }
    }

    pub fn session(&self) -> Option<&SessionLoop> {
        self.session.as_ref()
    }

    pub fn is_camera_running(&self) -> bool {
        self.session
            .as_ref()
            .map(SessionLoop::is_running)
            .unwrap_or(false)
    }

    /// False once the camera failed in a way retrying cannot fix.
    pub fn can_retry_camera(&self) -> bool {
        self.session
            .as_ref()
            .and_then(SessionLoop::last_error)
            .map(CaptureError::is_retryable)
            .unwrap_or(true)
    }

    /// User-facing message for the current failure, if any.
    pub fn error_message(&self) -> Option<String> {
        if let ModelStatus::Failed(err) = &self.status {
            return Some(err.user_message().to_string());
        }
        self.session
            .as_ref()
            .and_then(SessionLoop::last_error)
            .map(|err| err.to_string())
    }

    /// One-line status: camera state, detected poses, model state.
    pub fn status_line(&self) -> String {
        let camera = if self.is_camera_running() {
            "running"
        } else {
            "stopped"
        };
        let poses = self
            .session
            .as_ref()
            .map(|session| session.state().detected_poses)
            .unwrap_or(0);
        let model = match &self.status {
            ModelStatus::Loading => "loading",
            ModelStatus::Ready => "ready",
            ModelStatus::Failed(_) => "failed",
        };
        format!("camera: {} | poses: {} | model: {}", camera, poses, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SyntheticCamera;
    use crate::detect::ScriptedLandmarkSource;
    use crate::render::LogSink;
    use crate::session::QueuedScheduler;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn app() -> TechNeckApp {
        TechNeckApp::new(
            Box::new(SyntheticCamera::new("stub://front_camera", 30)),
            Box::new(QueuedScheduler::new()),
            Box::new(LogSink::new()),
        )
    }

    fn scripted() -> SharedLandmarker {
        Arc::new(Mutex::new(ScriptedLandmarkSource::new()))
    }

    #[test]
    fn toggle_refuses_while_model_loading() {
        let mut app = app();
        assert_eq!(app.status(), &ModelStatus::Loading);
        assert_eq!(app.toggle_camera(), Ok(CameraToggle::ModelNotReady));
        assert!(!app.is_camera_running());
    }

    #[test]
    fn toggle_starts_and_stops_once_ready() {
        let mut app = app();
        assert_eq!(app.model_loaded(Ok(scripted())), &ModelStatus::Ready);
        assert_eq!(app.toggle_camera(), Ok(CameraToggle::Started));
        assert!(app.is_camera_running());
        assert_eq!(app.status_line(), "camera: running | poses: 0 | model: ready");
        assert_eq!(app.toggle_camera(), Ok(CameraToggle::Stopped));
        assert!(!app.is_camera_running());
    }

    #[test]
    fn load_failure_is_terminal() {
        let mut app = app();
        let timeout = ModelLoadError::Timeout(Duration::from_secs(30));
        app.model_loaded(Err(timeout.clone()));
        assert_eq!(app.status(), &ModelStatus::Failed(timeout));
        assert_eq!(
            app.error_message().as_deref(),
            Some("Failed to load the pose model. Please check your connection and try again.")
        );

        app.model_loaded(Ok(scripted()));
        assert!(!app.is_model_ready());
        assert_eq!(app.toggle_camera(), Ok(CameraToggle::ModelNotReady));
    }

    #[test]
    fn denied_camera_surfaces_message() {
        let mut app = TechNeckApp::new(
            Box::new(SyntheticCamera::new("stub://front_camera", 30).with_permission_denied()),
            Box::new(QueuedScheduler::new()),
            Box::new(LogSink::new()),
        );
        app.model_loaded(Ok(scripted()));
        assert_eq!(app.toggle_camera(), Err(CaptureError::PermissionDenied));
        assert!(!app.is_camera_running());
        assert_eq!(
            app.error_message().as_deref(),
            Some("Camera permission denied. Please allow camera access and try again.")
        );
        assert!(app.can_retry_camera());
        assert_eq!(app.toggle_camera(), Err(CaptureError::PermissionDenied));
    }

    struct NoCaptureHost {
        acquisitions: Arc<AtomicU32>,
    }

    impl CaptureDevice for NoCaptureHost {
        fn name(&self) -> &str {
            "none"
        }

        fn is_supported(&self) -> bool {
            false
        }

        fn acquire(
            &mut self,
            _profile: &CaptureProfile,
        ) -> Result<Box<dyn crate::capture::CaptureStream>, CaptureError> {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            Err(CaptureError::Other("unreachable on this host".to_string()))
        }
    }

    #[test]
    fn unsupported_host_is_not_retried() {
        let acquisitions = Arc::new(AtomicU32::new(0));
        let mut app = TechNeckApp::new(
            Box::new(NoCaptureHost {
                acquisitions: acquisitions.clone(),
            }),
            Box::new(QueuedScheduler::new()),
            Box::new(LogSink::new()),
        );
        app.model_loaded(Ok(scripted()));

        assert_eq!(app.toggle_camera(), Err(CaptureError::Unavailable));
        assert!(!app.can_retry_camera());
        assert_eq!(
            app.error_message().as_deref(),
            Some("Camera not supported on this device")
        );

        assert_eq!(app.toggle_camera(), Err(CaptureError::Unavailable));
        assert!(!app.is_camera_running());
        assert_eq!(acquisitions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn registry_load_marks_ready() {
        let mut app = app();
        let status = app
            .load_model(
                &LoaderRegistry::with_builtin(),
                &LandmarkerOptions::default(),
                Duration::from_secs(5),
            )
            .clone();
        assert_eq!(status, ModelStatus::Ready);
    }
}
