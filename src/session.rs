//! Camera/inference session loop.
//!
//! One `SessionLoop` owns one camera stream and one render sink for the
//! duration of a session. The host drives it by firing the ticks it asks for
//! (one per display refresh); each tick pulls the presented frame, submits it
//! to the landmark source when it is new, and classifies the primary skeleton
//! once the detection completes.
//!
//! ```text
//! Idle --start--> Starting --first frame--> Active --stop--> Idle
//!                    |                        |
//!                    +--acquire error--> Idle +--capture error--> Idle
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use crate::capture::{CaptureDevice, CaptureError, CaptureProfile, CaptureStream};
use crate::detect::{DetectionPoll, LandmarkSource, RunningMode, SharedLandmarker};
use crate::landmark::PoseDetectionResult;
use crate::posture::{assess, ClassificationResult, PostureAssessment, UndetectedReason};
use crate::render::{RenderFrame, RenderSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    /// Camera acquired, waiting for the first decodable frame.
    Starting,
    Active,
}

/// Per-session counters. Reset to `Default` on stop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    pub running: bool,
    /// Frames flagged as tech neck since the session started.
    pub detection_count: u64,
    /// Media time of the last frame submitted for detection.
    pub last_frame_timestamp: Option<f64>,
    /// Verdict for the most recent completed detection.
    pub last_result: Option<ClassificationResult>,
    /// Skeletons in the most recent completed detection.
    pub detected_poses: usize,
    /// Frames whose primary skeleton could be measured.
    pub frames_classified: u64,
    /// Frames whose primary skeleton was present but not measurable.
    pub frames_undetected: u64,
}

impl SessionState {
    fn started() -> Self {
        Self {
            running: true,
            ..Self::default()
        }
    }
}

/// Identifies one scheduled tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// Host frame-presentation callback scheduling.
pub trait FrameScheduler: Send {
    /// Ask for one callback on the next display refresh.
    fn request_tick(&mut self) -> TickHandle;

    /// Withdraw a requested callback. Unknown or fired handles are ignored.
    fn cancel_tick(&mut self, handle: TickHandle);
}

#[derive(Debug, Default)]
struct TickQueue {
    next_id: u64,
    queued: VecDeque<TickHandle>,
    cancelled: u64,
}

/// Scheduler backed by a shared queue. The host drains due ticks with
/// `take_due` once per refresh and fires them at the session.
#[derive(Clone, Debug, Default)]
pub struct QueuedScheduler {
    inner: Arc<Mutex<TickQueue>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, TickQueue> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove and return every tick requested so far.
    pub fn take_due(&self) -> Vec<TickHandle> {
        self.queue().queued.drain(..).collect()
    }

    /// Number of requested ticks not yet taken.
    pub fn pending(&self) -> usize {
        self.queue().queued.len()
    }

    /// Number of ticks withdrawn before they were taken.
    pub fn cancelled(&self) -> u64 {
        self.queue().cancelled
    }
}

impl FrameScheduler for QueuedScheduler {
    fn request_tick(&mut self) -> TickHandle {
        let mut queue = self.queue();
        queue.next_id += 1;
        let handle = TickHandle(queue.next_id);
        queue.queued.push_back(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        let mut queue = self.queue();
        let before = queue.queued.len();
        queue.queued.retain(|queued| *queued != handle);
        if queue.queued.len() != before {
            queue.cancelled += 1;
        }
    }
}

/// What a tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Stale or post-stop tick; nothing happened.
    Ignored,
    /// No decodable frame yet.
    WaitingForFrame,
    /// The presented frame was already submitted.
    DuplicateFrame,
    /// A detection is still in flight; no new frame submitted.
    AwaitingResult,
    /// A frame was submitted and its result is pending.
    Submitted,
    Classified(ClassificationResult),
    /// The primary skeleton could not be measured; the frame carries the
    /// undetectable verdict.
    Undetected(UndetectedReason),
    /// A detection completed without any skeleton.
    NoPose,
    /// The landmark source failed on this frame; the loop continues.
    InferenceFailed,
    /// Switching the landmark source to video mode failed; retried next tick.
    ModeSwitchFailed,
    /// The camera stream failed; the session is stopped.
    CaptureLost(CaptureError),
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    timestamp_ms: f64,
}

enum FrameStep {
    NotReady,
    Lost(CaptureError),
    ModeSwitchFailed(anyhow::Error),
    Duplicate,
    SubmitFailed(anyhow::Error),
    Submitted,
    Completed(Result<PoseDetectionResult>),
}

fn lock_source(
    landmarker: &SharedLandmarker,
) -> Result<MutexGuard<'_, dyn LandmarkSource + 'static>> {
    landmarker
        .lock()
        .map_err(|_| anyhow!("landmark source lock poisoned"))
}

/// Drives one camera + landmark source pair through capture sessions.
pub struct SessionLoop {
    phase: SessionPhase,
    state: SessionState,
    profile: CaptureProfile,
    landmarker: SharedLandmarker,
    camera: Box<dyn CaptureDevice>,
    stream: Option<Box<dyn CaptureStream>>,
    scheduler: Box<dyn FrameScheduler>,
    sink: Box<dyn RenderSink>,
    pending_tick: Option<TickHandle>,
    in_flight: Option<InFlight>,
    mode_configured: bool,
    last_error: Option<CaptureError>,
}

impl SessionLoop {
    pub fn new(
        landmarker: SharedLandmarker,
        camera: Box<dyn CaptureDevice>,
        scheduler: Box<dyn FrameScheduler>,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        Self {
            phase: SessionPhase::Idle,
            state: SessionState::default(),
            profile: CaptureProfile::default(),
            landmarker,
            camera,
            stream: None,
            scheduler,
            sink,
            pending_tick: None,
            in_flight: None,
            mode_configured: false,
            last_error: None,
        }
    }

    pub fn with_profile(mut self, profile: CaptureProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Error that ended the last start attempt or session, if any.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Tick the loop is currently waiting for.
    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending_tick
    }

    pub fn profile(&self) -> &CaptureProfile {
        &self.profile
    }

    /// Acquire the camera and schedule the first tick.
    ///
    /// Calling this on a session that is not idle does nothing. Acquisition
    /// failures leave the loop idle and are not retried.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.phase != SessionPhase::Idle {
            log::warn!("SessionLoop: start ignored, session is {:?}", self.phase);
            return Ok(());
        }
        self.last_error = None;
        if !self.camera.is_supported() {
            return self.fail_start(CaptureError::Unavailable);
        }

        self.phase = SessionPhase::Starting;
        log::info!("SessionLoop: requesting camera {}", self.camera.name());
        let stream = match self.camera.acquire(&self.profile) {
            Ok(stream) => stream,
            Err(err) => return self.fail_start(err),
        };
        let (width, height) = stream.resolution();
        log::info!(
            "SessionLoop: camera {} granted at {}x{}",
            self.camera.name(),
            width,
            height
        );

        self.stream = Some(stream);
        self.state = SessionState::started();
        self.in_flight = None;
        self.mode_configured = false;
        self.pending_tick = Some(self.scheduler.request_tick());
        Ok(())
    }

    fn fail_start(&mut self, err: CaptureError) -> Result<(), CaptureError> {
        log::error!("SessionLoop: camera error ({}): {}", err.code(), err);
        self.phase = SessionPhase::Idle;
        self.state = SessionState::default();
        self.last_error = Some(err.clone());
        Err(err)
    }

    /// Cancel the pending tick and any in-flight detection, release the
    /// camera and reset the session state. Does nothing when idle.
    pub fn stop(&mut self) {
        if self.phase == SessionPhase::Idle {
            return;
        }
        if let Some(handle) = self.pending_tick.take() {
            self.scheduler.cancel_tick(handle);
        }
        if self.in_flight.take().is_some() {
            match lock_source(&self.landmarker) {
                Ok(mut source) => source.cancel_pending(),
                Err(err) => log::warn!("SessionLoop: cannot cancel detection: {}", err),
            }
        }
        if let Some(stream) = self.stream.take() {
            self.camera.release(stream);
        }
        self.sink.clear();

        log::info!(
            "SessionLoop: stopped after {} classified frames ({} tech-neck detections)",
            self.state.frames_classified,
            self.state.detection_count
        );
        self.state = SessionState::default();
        self.phase = SessionPhase::Idle;
        self.mode_configured = false;
    }

    /// Handle a fired tick. `now_ms` is the host's presentation time.
    pub fn on_tick(&mut self, handle: TickHandle, now_ms: f64) -> TickOutcome {
        if !self.state.running || self.phase == SessionPhase::Idle {
            log::trace!("SessionLoop: tick {:?} after stop ignored", handle);
            return TickOutcome::Ignored;
        }
        if self.pending_tick != Some(handle) {
            log::trace!("SessionLoop: stale tick {:?} ignored", handle);
            return TickOutcome::Ignored;
        }
        self.pending_tick = None;

        let outcome = self.advance(now_ms);

        if self.state.running {
            self.pending_tick = Some(self.scheduler.request_tick());
        }
        outcome
    }

    fn advance(&mut self, now_ms: f64) -> TickOutcome {
        if let Some(in_flight) = self.in_flight {
            let poll = lock_source(&self.landmarker).map(|mut source| source.poll());
            return match poll {
                Ok(DetectionPoll::Pending) => TickOutcome::AwaitingResult,
                Ok(DetectionPoll::Ready(result)) => {
                    self.finish_detection(in_flight.timestamp_ms, result)
                }
                Err(err) => {
                    self.in_flight = None;
                    log::warn!("SessionLoop: prediction error: {:#}", err);
                    TickOutcome::InferenceFailed
                }
            };
        }

        let step = self.pull_and_submit(now_ms);
        match step {
            FrameStep::NotReady => TickOutcome::WaitingForFrame,
            FrameStep::Lost(err) => self.capture_lost(err),
            FrameStep::ModeSwitchFailed(err) => {
                log::warn!("SessionLoop: switching to video mode failed: {:#}", err);
                TickOutcome::ModeSwitchFailed
            }
            FrameStep::Duplicate => TickOutcome::DuplicateFrame,
            FrameStep::SubmitFailed(err) => {
                log::warn!("SessionLoop: prediction error: {:#}", err);
                TickOutcome::InferenceFailed
            }
            FrameStep::Submitted => {
                self.in_flight = Some(InFlight {
                    timestamp_ms: now_ms,
                });
                TickOutcome::Submitted
            }
            FrameStep::Completed(result) => self.finish_detection(now_ms, result),
        }
    }

    fn pull_and_submit(&mut self, now_ms: f64) -> FrameStep {
        let Some(stream) = self.stream.as_mut() else {
            return FrameStep::Lost(CaptureError::Other("no capture stream".to_string()));
        };
        let frame = match stream.current_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameStep::NotReady,
            Err(err) => return FrameStep::Lost(err),
        };

        if self.phase == SessionPhase::Starting {
            log::info!("SessionLoop: video loaded, starting predictions");
            self.phase = SessionPhase::Active;
        }

        let mut source = match lock_source(&self.landmarker) {
            Ok(source) => source,
            Err(err) => return FrameStep::SubmitFailed(err),
        };

        if !self.mode_configured {
            if let Err(err) = source.set_running_mode(RunningMode::Video) {
                return FrameStep::ModeSwitchFailed(err);
            }
            self.mode_configured = true;
            log::info!("SessionLoop: {} switched to video mode", source.name());
        }

        if self.state.last_frame_timestamp == Some(frame.media_time) {
            return FrameStep::Duplicate;
        }
        self.state.last_frame_timestamp = Some(frame.media_time);

        if let Err(err) = source.submit(frame, now_ms) {
            return FrameStep::SubmitFailed(err);
        }
        match source.poll() {
            DetectionPoll::Pending => FrameStep::Submitted,
            DetectionPoll::Ready(result) => FrameStep::Completed(result),
        }
    }

    fn finish_detection(
        &mut self,
        timestamp_ms: f64,
        result: Result<PoseDetectionResult>,
    ) -> TickOutcome {
        self.in_flight = None;
        let detection = match result {
            Ok(detection) => detection,
            Err(err) => {
                log::warn!("SessionLoop: prediction error: {:#}", err);
                return TickOutcome::InferenceFailed;
            }
        };

        let assessment = detection.primary().map(assess);
        let classification = assessment.as_ref().map(PostureAssessment::result);
        self.state.detected_poses = detection.pose_count();
        self.state.last_result = classification;
        match assessment {
            Some(PostureAssessment::Measured(measurement)) => {
                self.state.frames_classified += 1;
                if measurement.result.has_tech_neck {
                    self.state.detection_count += 1;
                }
            }
            Some(PostureAssessment::Undetected(reason)) => {
                log::debug!("SessionLoop: primary skeleton not measurable: {:?}", reason);
                self.state.frames_undetected += 1;
            }
            None => {}
        }

        self.sink.render(&RenderFrame {
            timestamp_ms,
            skeletons: &detection.landmarks,
            classification,
            detection_count: self.state.detection_count,
        });

        match assessment {
            Some(PostureAssessment::Measured(measurement)) => {
                TickOutcome::Classified(measurement.result)
            }
            Some(PostureAssessment::Undetected(reason)) => TickOutcome::Undetected(reason),
            None => TickOutcome::NoPose,
        }
    }

    fn capture_lost(&mut self, err: CaptureError) -> TickOutcome {
        log::error!("SessionLoop: capture lost ({}): {}", err.code(), err);
        self.stop();
        self.last_error = Some(err.clone());
        TickOutcome::CaptureLost(err)
    }
}

impl Drop for SessionLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_scheduler_hands_out_fresh_handles() {
        let mut scheduler = QueuedScheduler::new();
        let first = scheduler.request_tick();
        let second = scheduler.request_tick();
        assert_ne!(first, second);
        assert_eq!(scheduler.pending(), 2);

        scheduler.cancel_tick(first);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(scheduler.take_due(), vec![second]);
        assert_eq!(scheduler.pending(), 0);

        scheduler.cancel_tick(second);
        assert_eq!(scheduler.cancelled(), 1);
    }

    #[test]
    fn clones_share_one_queue() {
        let host = QueuedScheduler::new();
        let mut session_side = host.clone();
        let handle = session_side.request_tick();
        assert_eq!(host.take_due(), vec![handle]);
    }
}
