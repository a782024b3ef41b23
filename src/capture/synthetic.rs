//! Synthetic camera for `stub://` devices.
//!
//! Produces RGB frames at a fixed rate on a wall clock. The camera is
//! exclusive: acquiring it again before the previous stream is released
//! fails with `DeviceBusy`, the way a real device node does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::{CaptureDevice, CaptureError, CaptureProfile, CaptureStream, VideoFrame};

const DEFAULT_FPS: u32 = 30;

pub struct SyntheticCamera {
    name: String,
    target_fps: u32,
    claimed: Arc<AtomicBool>,
    deny_permission: bool,
}

impl SyntheticCamera {
    pub fn new(name: &str, target_fps: u32) -> Self {
        Self {
            name: name.to_string(),
            target_fps: if target_fps == 0 { DEFAULT_FPS } else { target_fps },
            claimed: Arc::new(AtomicBool::new(false)),
            deny_permission: false,
        }
    }

    /// Simulate a user declining the permission prompt.
    pub fn with_permission_denied(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn acquire(
        &mut self,
        profile: &CaptureProfile,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if self.deny_permission {
            return Err(CaptureError::PermissionDenied);
        }
        profile
            .validate()
            .map_err(|e| CaptureError::Unsupported(e.to_string()))?;
        if self
            .claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::DeviceBusy);
        }

        let (width, height) = profile.ideal_resolution();
        log::info!(
            "SyntheticCamera: {} streaming {}x{} @ {} fps ({:?}-facing)",
            self.name,
            width,
            height,
            self.target_fps,
            profile.facing
        );
        Ok(Box::new(SyntheticStream {
            claimed: self.claimed.clone(),
            started: Instant::now(),
            target_fps: self.target_fps,
            width,
            height,
            frame_index: None,
            frame: None,
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    claimed: Arc<AtomicBool>,
    started: Instant,
    target_fps: u32,
    width: u32,
    height: u32,
    frame_index: Option<u64>,
    frame: Option<VideoFrame>,
    stopped: bool,
}

impl SyntheticStream {
    fn generate_pixels(&self, index: u64) -> Vec<u8> {
        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + index) % 256) as u8;
        }
        pixels
    }
}

impl CaptureStream for SyntheticStream {
    fn current_frame(&mut self) -> Result<Option<&VideoFrame>, CaptureError> {
        if self.stopped {
            return Err(CaptureError::Other("capture stream stopped".to_string()));
        }
        let index = (self.started.elapsed().as_secs_f64() * self.target_fps as f64) as u64;
        if self.frame_index != Some(index) {
            let pixels = self.generate_pixels(index);
            let media_time = index as f64 / self.target_fps as f64;
            self.frame = Some(VideoFrame::new(pixels, self.width, self.height, media_time));
            self.frame_index = Some(index);
        }
        Ok(self.frame.as_ref())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.frame = None;
            self.claimed.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_yields_a_frame() {
        let mut camera = SyntheticCamera::new("stub://test", 30);
        let mut stream = camera
            .acquire(&CaptureProfile::default())
            .expect("acquire");
        let frame = stream.current_frame().expect("read").expect("frame");
        assert_eq!((frame.width, frame.height), (640, 480));
        assert_eq!(frame.byte_len(), 640 * 480 * 3);
        assert_eq!(stream.resolution(), (640, 480));
    }

    #[test]
    fn second_acquire_is_busy_until_release() {
        let mut camera = SyntheticCamera::new("stub://test", 30);
        let profile = CaptureProfile::default();
        let stream = camera.acquire(&profile).expect("acquire");
        assert!(camera.is_claimed());
        assert_eq!(camera.acquire(&profile).err(), Some(CaptureError::DeviceBusy));

        camera.release(stream);
        assert!(!camera.is_claimed());
        assert!(camera.acquire(&profile).is_ok());
    }

    #[test]
    fn denied_permission_is_classified() {
        let mut camera = SyntheticCamera::new("stub://test", 30).with_permission_denied();
        assert_eq!(
            camera.acquire(&CaptureProfile::default()).err(),
            Some(CaptureError::PermissionDenied)
        );
        assert!(!camera.is_claimed());
    }

    #[test]
    fn stopped_stream_reports_error() {
        let mut camera = SyntheticCamera::new("stub://test", 30);
        let mut stream = camera.acquire(&CaptureProfile::default()).expect("acquire");
        stream.stop_tracks();
        assert!(stream.current_frame().is_err());
    }
}
