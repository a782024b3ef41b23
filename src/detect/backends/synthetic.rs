use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::capture::VideoFrame;
use crate::detect::source::{DetectionPoll, LandmarkSource, LandmarkerOptions, RunningMode};
use crate::landmark::{Landmark, PoseDetectionResult, PoseLandmark, Skeleton, POSE_LANDMARK_COUNT};

/// Seconds for one slump-and-recover cycle of the simulated person.
const POSTURE_CYCLE_SECS: f64 = 20.0;
/// Peak forward ratio reached at the bottom of the slump.
const PEAK_FORWARD_RATIO: f64 = 0.3;
/// Tracking noise added to every coordinate.
const JITTER: f64 = 0.004;

const SHOULDER_Y: f64 = 0.62;
const EAR_Y: f64 = 0.40;

/// Landmark source for `stub://` models.
///
/// Ignores pixel content and simulates one seated person whose head drifts
/// forward and back over a fixed cycle, keyed on the frame's media time.
pub struct SyntheticLandmarkSource {
    mode: RunningMode,
    rng: StdRng,
    pending: Option<PoseDetectionResult>,
    last_timestamp_ms: Option<f64>,
}

impl SyntheticLandmarkSource {
    pub fn new(options: &LandmarkerOptions) -> Self {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Deterministic jitter for tests.
    pub fn seeded(options: &LandmarkerOptions, seed: u64) -> Self {
        Self::with_rng(options, StdRng::seed_from_u64(seed))
    }

    fn with_rng(options: &LandmarkerOptions, rng: StdRng) -> Self {
        Self {
            mode: options.running_mode,
            rng,
            pending: None,
            last_timestamp_ms: None,
        }
    }

    /// Forward ratio the simulated person holds at `media_time`.
    pub fn forward_ratio_at(media_time: f64) -> f64 {
        let phase = (media_time / POSTURE_CYCLE_SECS) * std::f64::consts::TAU;
        let wave = (1.0 - phase.cos()) / 2.0;
        PEAK_FORWARD_RATIO * wave
    }

    fn simulate(&mut self, media_time: f64) -> Skeleton {
        let neck_length = SHOULDER_Y - EAR_Y;
        let head_x = 0.5 + Self::forward_ratio_at(media_time) * neck_length;

        let mut skeleton =
            Skeleton::from_landmarks(vec![Landmark::new(0.5, 0.9, 0.0); POSE_LANDMARK_COUNT]);
        let layout = [
            (PoseLandmark::Nose, head_x + 0.02, 0.37),
            (PoseLandmark::LeftEye, head_x + 0.01, 0.34),
            (PoseLandmark::RightEye, head_x + 0.03, 0.34),
            (PoseLandmark::LeftEar, head_x - 0.03, EAR_Y),
            (PoseLandmark::RightEar, head_x + 0.03, EAR_Y),
            (PoseLandmark::MouthLeft, head_x, 0.43),
            (PoseLandmark::MouthRight, head_x + 0.03, 0.43),
            (PoseLandmark::LeftShoulder, 0.38, SHOULDER_Y),
            (PoseLandmark::RightShoulder, 0.62, SHOULDER_Y),
            (PoseLandmark::LeftElbow, 0.34, 0.78),
            (PoseLandmark::RightElbow, 0.66, 0.78),
            (PoseLandmark::LeftHip, 0.42, 0.95),
            (PoseLandmark::RightHip, 0.58, 0.95),
        ];
        for (landmark, x, y) in layout {
            let x = x + self.rng.gen_range(-JITTER..=JITTER);
            let y = y + self.rng.gen_range(-JITTER..=JITTER);
            let visibility = self.rng.gen_range(0.85..=1.0);
            skeleton.set(
                landmark,
                Some(Landmark::new(x, y, -0.05).with_visibility(visibility)),
            );
        }
        skeleton
    }
}

impl LandmarkSource for SyntheticLandmarkSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn running_mode(&self) -> RunningMode {
        self.mode
    }

    fn set_running_mode(&mut self, mode: RunningMode) -> Result<()> {
        if self.mode != mode {
            log::debug!("SyntheticLandmarkSource: running mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        self.last_timestamp_ms = None;
        Ok(())
    }

    fn submit(&mut self, frame: &VideoFrame, timestamp_ms: f64) -> Result<()> {
        if self.mode != RunningMode::Video {
            bail!("video detection requires video running mode");
        }
        if self.pending.is_some() {
            bail!("detection already in flight");
        }
        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms <= last {
                bail!(
                    "timestamps must increase in video mode ({} <= {})",
                    timestamp_ms,
                    last
                );
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);
        let skeleton = self.simulate(frame.media_time);
        self.pending = Some(PoseDetectionResult::new(vec![skeleton]));
        Ok(())
    }

    fn poll(&mut self) -> DetectionPoll {
        match self.pending.take() {
            Some(result) => DetectionPoll::Ready(Ok(result)),
            None => DetectionPoll::Pending,
        }
    }

    fn cancel_pending(&mut self) {
        self.pending = None;
    }
}
