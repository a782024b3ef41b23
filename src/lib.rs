//! Tech-neck posture monitor
//!
//! This crate watches a front camera, estimates body landmarks per frame and
//! flags forward-head ("tech neck") posture in real time.
//!
//! # Architecture
//!
//! Data flows one direction per frame:
//!
//! ```text
//! camera frame -> landmark source -> skeleton(s) -> posture classifier
//!              -> {flag, score} -> session counters / render sink
//! ```
//!
//! # Module Structure
//!
//! - `landmark`: Landmark, Skeleton and detection result types
//! - `posture`: The tech-neck classifier (pure, deterministic)
//! - `capture`: Camera capability, capture profile, synthetic and V4L2 cameras
//! - `detect`: Landmark source contract, model loading, synthetic backends
//! - `session`: Per-frame session loop and tick scheduling
//! - `render`: Render sink contract and drawing helpers
//! - `app`: Model status and the camera toggle
//! - `config`: JSON file + environment configuration
//!
//! Frames never leave the process: no module stores, transmits or logs pixel
//! data.

pub mod app;
pub mod capture;
pub mod config;
pub mod detect;
pub mod landmark;
pub mod posture;
pub mod render;
pub mod session;

pub use app::{CameraToggle, ModelStatus, TechNeckApp};
pub use capture::{
    open_camera, CaptureDevice, CaptureError, CaptureProfile, CaptureStream, VideoFrame,
};
pub use config::AppConfig;
pub use detect::{
    LandmarkSource, LandmarkerOptions, LoaderRegistry, ModelLoadError, RunningMode,
    SharedLandmarker,
};
pub use landmark::{
    Landmark, PoseDetectionResult, PoseLandmark, Skeleton, POSE_LANDMARK_COUNT,
};
pub use posture::{
    assess, classify, ClassificationResult, PostureAssessment, PostureMeasurement,
    UndetectedReason, TECH_NECK_RATIO_THRESHOLD,
};
pub use render::{DrawList, RenderFrame, RenderSink};
pub use session::{
    FrameScheduler, QueuedScheduler, SessionLoop, SessionPhase, SessionState, TickHandle,
    TickOutcome,
};
