use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::capture::VideoFrame;
use crate::landmark::PoseDetectionResult;

/// Inference mode of a landmark source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningMode {
    /// Independent still images.
    #[default]
    Image,
    /// Consecutive frames of one stream, with monotonically increasing timestamps.
    Video,
}

/// Where inference runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    #[default]
    Gpu,
    Cpu,
}

/// Options a landmark source is created with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkerOptions {
    pub model_asset_path: String,
    pub delegate: Delegate,
    pub running_mode: RunningMode,
    /// Maximum number of skeletons returned per frame.
    pub num_poses: u32,
}

impl Default for LandmarkerOptions {
    fn default() -> Self {
        Self {
            model_asset_path: crate::config::DEFAULT_MODEL_ASSET_PATH.to_string(),
            delegate: Delegate::Gpu,
            running_mode: RunningMode::Image,
            num_poses: 2,
        }
    }
}

/// State of the single in-flight detection.
#[derive(Debug)]
pub enum DetectionPoll {
    /// Nothing has completed yet (or nothing was submitted).
    Pending,
    Ready(Result<PoseDetectionResult>),
}

/// Pose landmark estimator.
///
/// Detection is asynchronous: `submit` hands over one frame, `poll` returns the
/// result once available. Callers keep at most one submission outstanding.
///
/// # Audit Boundary
///
/// Implementations MUST NOT retain the frame's pixels beyond `submit`, write
/// them to disk, or send them over the network.
pub trait LandmarkSource: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn running_mode(&self) -> RunningMode;

    /// Switch inference mode. Completes before returning.
    fn set_running_mode(&mut self, mode: RunningMode) -> Result<()>;

    /// Start detection on `frame`. `timestamp_ms` must increase between calls
    /// in `Video` mode.
    fn submit(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<()>;

    /// Collect the result of the outstanding submission.
    fn poll(&mut self) -> DetectionPoll;

    /// Drop the outstanding submission, if any; its result is never delivered.
    fn cancel_pending(&mut self) {}
}

/// A loaded landmark source, shared between the application and its sessions.
pub type SharedLandmarker = Arc<Mutex<dyn LandmarkSource>>;
