//! Render sink contract and drawing helpers.
//!
//! Drawing is the host's job; the session loop only hands over what to draw.

use crate::landmark::{Landmark, Skeleton};
use crate::posture::ClassificationResult;

/// Landmark index pairs joined when drawing a skeleton.
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

/// What one classified frame hands to the sink.
#[derive(Clone, Copy, Debug)]
pub struct RenderFrame<'a> {
    /// Host tick time the frame was submitted at.
    pub timestamp_ms: f64,
    /// Every detected skeleton; only the first one is classified.
    pub skeletons: &'a [Skeleton],
    /// `None` when no skeleton was detected.
    pub classification: Option<ClassificationResult>,
    /// Flagged frames so far in this session.
    pub detection_count: u64,
}

/// Consumer of the session loop's per-frame output.
pub trait RenderSink: Send {
    fn render(&mut self, frame: &RenderFrame<'_>);

    /// Called once when the session stops.
    fn clear(&mut self) {}
}

/// Linear map of `value` from `[from, to]` onto `[min, max]`, clamped.
pub fn lerp(value: f64, from: f64, to: f64, min: f64, max: f64) -> f64 {
    if from == to {
        return min;
    }
    let t = ((value - from) / (to - from)).clamp(0.0, 1.0);
    min + t * (max - min)
}

/// Dot radius for a landmark at depth `z`: nearer joints draw larger.
pub fn landmark_radius(z: f64) -> f64 {
    lerp(z, -0.15, 0.1, 5.0, 1.0)
}

/// A landmark dot in normalized image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dot {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Primitives for one frame's skeleton overlay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub dots: Vec<Dot>,
    /// Segment endpoints as `((x, y), (x, y))`.
    pub lines: Vec<((f64, f64), (f64, f64))>,
}

impl DrawList {
    /// Dots for every present landmark and lines for every connection whose
    /// endpoints are both present.
    pub fn from_skeletons(skeletons: &[Skeleton]) -> Self {
        let mut list = Self::default();
        for skeleton in skeletons {
            let points: Vec<Option<&Landmark>> = skeleton.iter().collect();
            list.dots.extend(points.iter().flatten().map(|landmark| Dot {
                x: landmark.x,
                y: landmark.y,
                radius: landmark_radius(landmark.z),
            }));
            for (a, b) in POSE_CONNECTIONS {
                if let (Some(Some(from)), Some(Some(to))) = (points.get(a), points.get(b)) {
                    list.lines.push(((from.x, from.y), (to.x, to.y)));
                }
            }
        }
        list
    }
}

/// Sink that writes verdict changes to the log.
#[derive(Debug, Default)]
pub struct LogSink {
    last_flag: Option<bool>,
    frames: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderSink for LogSink {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self.frames += 1;
        let overlay = DrawList::from_skeletons(frame.skeletons);
        log::trace!(
            "frame @{:.0}ms: overlay dots={} lines={}",
            frame.timestamp_ms,
            overlay.dots.len(),
            overlay.lines.len()
        );
        let Some(result) = frame.classification else {
            log::debug!("frame @{:.0}ms: no pose", frame.timestamp_ms);
            return;
        };
        log::debug!(
            "frame @{:.0}ms: poses={} tech_neck={} score={}",
            frame.timestamp_ms,
            frame.skeletons.len(),
            result.has_tech_neck,
            result.score
        );
        if self.last_flag != Some(result.has_tech_neck) {
            if result.has_tech_neck {
                log::warn!(
                    "tech neck detected (score {}, {} detections this session)",
                    result.score,
                    frame.detection_count
                );
            } else {
                log::info!("posture ok (score {})", result.score);
            }
            self.last_flag = Some(result.has_tech_neck);
        }
    }

    fn clear(&mut self) {
        self.last_flag = None;
    }
}
