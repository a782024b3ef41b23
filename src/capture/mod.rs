//! Camera capture.
//!
//! This module provides the camera capability the session loop consumes:
//! - `stub://` synthetic cameras (tests, demo host)
//! - Local V4L2 devices (feature: capture-v4l2)
//!
//! A `CaptureDevice` hands out at most one `CaptureStream` at a time. Streams
//! expose the frame currently being presented; reading twice without a new
//! frame arriving returns the same frame (same `media_time`).
//!
//! The capture layer MUST NOT:
//! - Store frames to disk
//! - Transmit frames over the network
//! - Log frame content

mod error;
mod frame;
mod profile;
pub mod synthetic;
#[cfg(feature = "capture-v4l2")]
pub mod v4l2;

pub use error::CaptureError;
pub use frame::VideoFrame;
pub use profile::{CaptureProfile, DimensionRange, FacingMode};
pub use synthetic::SyntheticCamera;
#[cfg(feature = "capture-v4l2")]
pub use v4l2::V4l2Camera;

/// A camera that can be acquired with a capability profile.
pub trait CaptureDevice: Send {
    /// Device identifier for logs.
    fn name(&self) -> &str;

    /// Feature detection: false when the host has no capture capability.
    fn is_supported(&self) -> bool {
        true
    }

    /// Claim the camera and start streaming.
    fn acquire(&mut self, profile: &CaptureProfile) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Stop every track of `stream` and give the camera back.
    fn release(&mut self, mut stream: Box<dyn CaptureStream>) {
        stream.stop_tracks();
    }
}

/// An acquired camera stream.
pub trait CaptureStream: Send {
    /// The frame currently presented, or `None` before the first decodable
    /// frame. Errors are fatal for the stream.
    fn current_frame(&mut self) -> Result<Option<&VideoFrame>, CaptureError>;

    /// Negotiated resolution.
    fn resolution(&self) -> (u32, u32);

    fn stop_tracks(&mut self);
}

/// Open the camera named by `device`.
///
/// `stub://` names open a synthetic camera; anything else is a device node and
/// requires the capture-v4l2 feature.
pub fn open_camera(device: &str, target_fps: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
    if device.trim().is_empty() {
        return Err(CaptureError::DeviceNotFound);
    }
    if device.starts_with("stub://") {
        return Ok(Box::new(SyntheticCamera::new(device, target_fps)));
    }
    #[cfg(feature = "capture-v4l2")]
    {
        Ok(Box::new(V4l2Camera::new(device, target_fps)))
    }
    #[cfg(not(feature = "capture-v4l2"))]
    {
        log::warn!(
            "camera {} requested but capture-v4l2 support is not compiled in",
            device
        );
        Err(CaptureError::Unavailable)
    }
}
