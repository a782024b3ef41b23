//! Body landmark types produced by a landmark source.
//!
//! A `Skeleton` is one detected person for one frame: 33 positional entries in
//! the standard body model. Entries may be missing when the estimator did not
//! emit them; consumers must treat a short or holey skeleton as undetectable.

use serde::{Deserialize, Serialize};

/// Number of landmarks in the standard body model.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// A normalized joint position. `x`/`y` are image-relative (roughly 0..1),
/// `z` is depth relative to the hips.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// Named indices of the body model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One person's landmarks for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skeleton {
    landmarks: Vec<Option<Landmark>>,
}

impl Skeleton {
    /// Build from raw entries; `None` marks a landmark the estimator did not emit.
    pub fn new(landmarks: Vec<Option<Landmark>>) -> Self {
        Self { landmarks }
    }

    /// Build from a fully populated landmark list.
    pub fn from_landmarks(landmarks: impl IntoIterator<Item = Landmark>) -> Self {
        Self {
            landmarks: landmarks.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, landmark: PoseLandmark) -> Option<&Landmark> {
        self.landmarks
            .get(landmark.index())
            .and_then(|entry| entry.as_ref())
    }

    pub fn set(&mut self, landmark: PoseLandmark, value: Option<Landmark>) {
        let index = landmark.index();
        if self.landmarks.len() <= index {
            self.landmarks.resize(index + 1, None);
        }
        self.landmarks[index] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Landmark>> {
        self.landmarks.iter().map(|entry| entry.as_ref())
    }
}

/// Output of one detection call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseDetectionResult {
    /// Normalized image-space skeletons, most prominent first.
    pub landmarks: Vec<Skeleton>,
    /// Metric world-space skeletons, parallel to `landmarks` when provided.
    #[serde(default)]
    pub world_landmarks: Vec<Skeleton>,
}

impl PoseDetectionResult {
    pub fn new(landmarks: Vec<Skeleton>) -> Self {
        Self {
            landmarks,
            world_landmarks: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The skeleton that gets classified. Additional skeletons are only rendered.
    pub fn primary(&self) -> Option<&Skeleton> {
        self.landmarks.first()
    }

    pub fn pose_count(&self) -> usize {
        self.landmarks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_short_or_missing_entries() {
        let mut skeleton = Skeleton::from_landmarks(vec![Landmark::new(0.5, 0.5, 0.0); 8]);
        assert!(skeleton.get(PoseLandmark::LeftEar).is_some());
        assert!(skeleton.get(PoseLandmark::LeftShoulder).is_none());

        skeleton.set(PoseLandmark::LeftEar, None);
        assert!(skeleton.get(PoseLandmark::LeftEar).is_none());
        assert_eq!(skeleton.len(), 8);
    }

    #[test]
    fn set_grows_skeleton_to_reach_index() {
        let mut skeleton = Skeleton::default();
        skeleton.set(PoseLandmark::RightShoulder, Some(Landmark::new(0.1, 0.2, 0.0)));
        assert_eq!(skeleton.len(), 13);
        assert_eq!(skeleton.iter().filter(|entry| entry.is_some()).count(), 1);
    }

    #[test]
    fn deserializes_null_entries_as_missing() -> anyhow::Result<()> {
        let raw = r#"{"landmarks":[[{"x":0.1,"y":0.2,"z":0.0,"visibility":0.9},null]]}"#;
        let result: PoseDetectionResult = serde_json::from_str(raw)?;
        let primary = result.primary().expect("primary skeleton");
        assert_eq!(primary.len(), 2);
        assert_eq!(
            primary.get(PoseLandmark::Nose).and_then(|lm| lm.visibility),
            Some(0.9)
        );
        assert!(primary.get(PoseLandmark::LeftEyeInner).is_none());
        assert!(result.world_landmarks.is_empty());
        Ok(())
    }
}
