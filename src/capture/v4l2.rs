//! V4L2 camera.
//!
//! This module provides `V4l2Camera` for local device nodes (e.g. /dev/video0).
//!
//! The V4L2 camera is responsible for:
//! - Opening the device node and classifying open failures
//! - Negotiating a format inside the requested profile
//! - Capturing frames in-memory
//!
//! Facing mode has no V4L2 equivalent and is ignored; pick the device node
//! instead.

use anyhow::Context;
use ouroboros::self_referencing;

use super::{CaptureDevice, CaptureError, CaptureProfile, CaptureStream, VideoFrame};

/// A V4L2 device node. Support is compiled in, so the host always counts as
/// capture-capable; a missing node surfaces from `acquire` as `DeviceNotFound`.
pub struct V4l2Camera {
    device: String,
    target_fps: u32,
}

impl V4l2Camera {
    pub fn new(device: &str, target_fps: u32) -> Self {
        Self {
            device: device.to_string(),
            target_fps,
        }
    }
}

#[self_referencing]
struct DeviceStreamState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl CaptureDevice for V4l2Camera {
    fn name(&self) -> &str {
        &self.device
    }

    fn acquire(
        &mut self,
        profile: &CaptureProfile,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        profile
            .validate()
            .map_err(|e| CaptureError::Unsupported(e.to_string()))?;

        let device = v4l::Device::with_path(&self.device).map_err(|err| {
            log::warn!("V4l2Camera: failed to open {}: {}", self.device, err);
            CaptureError::from_io(&err)
        })?;
        let mut format = device.format().map_err(|err| CaptureError::from_io(&err))?;
        let (ideal_width, ideal_height) = profile.ideal_resolution();
        format.width = ideal_width;
        format.height = ideal_height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Camera: failed to set format on {}: {}",
                    self.device,
                    err
                );
                device.format().map_err(|err| CaptureError::from_io(&err))?
            }
        };
        if !profile.accepts(format.width, format.height) {
            return Err(CaptureError::Unsupported(format!(
                "device offers {}x{}, outside the requested range",
                format.width, format.height
            )));
        }

        if self.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Camera: failed to set fps on {}: {}",
                    self.device,
                    err
                );
            }
        }

        let state = DeviceStreamStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| CaptureError::Other(format!("{:#}", err)))?;

        log::info!(
            "V4l2Camera: streaming {} ({}x{})",
            self.device,
            format.width,
            format.height
        );
        Ok(Box::new(V4l2Stream {
            state: Some(state),
            width: format.width,
            height: format.height,
            frame: None,
        }))
    }
}

struct V4l2Stream {
    state: Option<DeviceStreamState>,
    width: u32,
    height: u32,
    frame: Option<VideoFrame>,
}

impl CaptureStream for V4l2Stream {
    /// Blocks until the driver dequeues the next buffer, so every read
    /// returns a new frame.
    fn current_frame(&mut self) -> Result<Option<&VideoFrame>, CaptureError> {
        use v4l::io::traits::CaptureStream as _;

        let state = self
            .state
            .as_mut()
            .context("v4l2 stream stopped")
            .map_err(|err| CaptureError::Other(err.to_string()))?;
        let (pixels, media_time) = state
            .with_mut(|fields| {
                fields.stream.next().map(|(buf, meta)| {
                    let media_time =
                        meta.timestamp.sec as f64 + meta.timestamp.usec as f64 / 1_000_000.0;
                    (buf.to_vec(), media_time)
                })
            })
            .map_err(|err| CaptureError::from_io(&err))?;

        self.frame = Some(VideoFrame::new(pixels, self.width, self.height, media_time));
        Ok(self.frame.as_ref())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop_tracks(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Camera: stream stopped");
        }
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_node_is_not_found() {
        let mut camera = V4l2Camera::new("/dev/video_does_not_exist", 30);
        assert!(camera.is_supported());
        let err = camera.acquire(&CaptureProfile::default()).err();
        assert_eq!(err, Some(CaptureError::DeviceNotFound));
        assert!(CaptureError::DeviceNotFound.is_retryable());
    }
}
