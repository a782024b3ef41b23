use std::collections::VecDeque;

use anyhow::{anyhow, bail, Result};

use crate::capture::VideoFrame;
use crate::detect::source::{DetectionPoll, LandmarkSource, RunningMode};
use crate::landmark::PoseDetectionResult;

/// What the scripted source answers to the next submission.
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    /// Completes on the first poll.
    Poses(PoseDetectionResult),
    /// `submit` itself fails.
    Failure(String),
    /// Stays pending for `polls` polls, then completes.
    Deferred {
        polls: u32,
        result: PoseDetectionResult,
    },
}

/// A submission as seen by the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubmittedFrame {
    pub media_time: f64,
    pub timestamp_ms: f64,
}

struct PendingDetection {
    polls_left: u32,
    result: Result<PoseDetectionResult>,
}

/// Landmark source that replays queued responses and records every call.
///
/// Submissions past the end of the script return no poses. Like a real
/// video-mode estimator, it refuses frames while in `Image` mode and while a
/// detection is already in flight.
pub struct ScriptedLandmarkSource {
    mode: RunningMode,
    responses: VecDeque<ScriptedResponse>,
    pending: Option<PendingDetection>,
    submissions: Vec<SubmittedFrame>,
    mode_changes: Vec<RunningMode>,
    cancellations: u32,
    failing_mode_switches: u32,
}

impl ScriptedLandmarkSource {
    pub fn new() -> Self {
        Self {
            mode: RunningMode::Image,
            responses: VecDeque::new(),
            pending: None,
            submissions: Vec::new(),
            mode_changes: Vec::new(),
            cancellations: 0,
            failing_mode_switches: 0,
        }
    }

    pub fn with_responses(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        let mut source = Self::new();
        source.responses.extend(responses);
        source
    }

    pub fn push(&mut self, response: ScriptedResponse) {
        self.responses.push_back(response);
    }

    /// Make the next `count` mode switches fail.
    pub fn fail_mode_switches(&mut self, count: u32) {
        self.failing_mode_switches = count;
    }

    pub fn submissions(&self) -> &[SubmittedFrame] {
        &self.submissions
    }

    /// Every successful `set_running_mode` call, in order.
    pub fn mode_changes(&self) -> &[RunningMode] {
        &self.mode_changes
    }

    pub fn cancellations(&self) -> u32 {
        self.cancellations
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for ScriptedLandmarkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkSource for ScriptedLandmarkSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn running_mode(&self) -> RunningMode {
        self.mode
    }

    fn set_running_mode(&mut self, mode: RunningMode) -> Result<()> {
        if self.failing_mode_switches > 0 {
            self.failing_mode_switches -= 1;
            bail!("scripted mode switch failure");
        }
        self.mode = mode;
        self.mode_changes.push(mode);
        Ok(())
    }

    fn submit(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<()> {
        if self.mode != RunningMode::Video {
            bail!("video detection requires video running mode");
        }
        if self.pending.is_some() {
            bail!("detection already in flight");
        }
        self.submissions.push(SubmittedFrame {
            media_time: frame.media_time,
            timestamp_ms,
        });

        let pending = match self.responses.pop_front() {
            None => PendingDetection {
                polls_left: 0,
                result: Ok(PoseDetectionResult::empty()),
            },
            Some(ScriptedResponse::Poses(result)) => PendingDetection {
                polls_left: 0,
                result: Ok(result),
            },
            Some(ScriptedResponse::Deferred { polls, result }) => PendingDetection {
                polls_left: polls,
                result: Ok(result),
            },
            Some(ScriptedResponse::Failure(message)) => {
                return Err(anyhow!(message));
            }
        };
        self.pending = Some(pending);
        Ok(())
    }

    fn poll(&mut self) -> DetectionPoll {
        let Some(pending) = self.pending.as_mut() else {
            return DetectionPoll::Pending;
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return DetectionPoll::Pending;
        }
        match self.pending.take() {
            Some(pending) => DetectionPoll::Ready(pending.result),
            None => DetectionPoll::Pending,
        }
    }

    fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            self.cancellations += 1;
        }
    }
}
