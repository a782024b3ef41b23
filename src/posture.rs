//! Tech-neck classification over one skeleton.
//!
//! The heuristic compares the horizontal ear-to-shoulder offset with the
//! vertical ear-to-shoulder distance (the "forward ratio"). It is pure and
//! frame-local: no smoothing, no calibration, no memory between frames.

use serde::Serialize;

use crate::landmark::{Landmark, PoseLandmark, Skeleton, POSE_LANDMARK_COUNT};

/// Forward ratio above which a frame is flagged as tech neck (strict `>`).
pub const TECH_NECK_RATIO_THRESHOLD: f64 = 0.15;

/// Forward ratio at which the posture score reaches zero.
///
/// Independent of `TECH_NECK_RATIO_THRESHOLD`: a frame at ratio 0.2 is flagged
/// and still scores about 33.
pub const SCORE_ZERO_RATIO: f64 = 0.3;

/// Landmarks that must be present for a skeleton to be classified. The nose
/// takes no part in the geometry but is still required.
pub const REQUIRED_LANDMARKS: [PoseLandmark; 5] = [
    PoseLandmark::Nose,
    PoseLandmark::LeftEar,
    PoseLandmark::RightEar,
    PoseLandmark::LeftShoulder,
    PoseLandmark::RightShoulder,
];

/// Verdict for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub has_tech_neck: bool,
    /// Posture score, 0..=100, higher is better.
    pub score: u8,
}

impl ClassificationResult {
    /// Returned for skeletons that cannot be measured. Shares its shape with a
    /// measured score of 0; use [`assess`] to tell the two apart.
    pub const UNDETECTABLE: Self = Self {
        has_tech_neck: false,
        score: 0,
    };
}

/// Why a skeleton could not be measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndetectedReason {
    TooFewLandmarks { found: usize },
    MissingLandmark(PoseLandmark),
    /// Ears and shoulders share the same average height.
    DegenerateGeometry,
    /// A coordinate was NaN or infinite.
    NonFiniteGeometry,
}

/// Intermediate geometry of a measured skeleton.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostureMeasurement {
    pub head_forward_distance: f64,
    pub neck_length: f64,
    pub forward_ratio: f64,
    pub result: ClassificationResult,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostureAssessment {
    Undetected(UndetectedReason),
    Measured(PostureMeasurement),
}

impl PostureAssessment {
    pub fn result(&self) -> ClassificationResult {
        match self {
            PostureAssessment::Undetected(_) => ClassificationResult::UNDETECTABLE,
            PostureAssessment::Measured(measurement) => measurement.result,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PostureAssessment::Measured(_))
    }
}

/// Classify one skeleton. Invalid or degenerate input yields
/// [`ClassificationResult::UNDETECTABLE`]; this never fails.
pub fn classify(skeleton: &Skeleton) -> ClassificationResult {
    assess(skeleton).result()
}

/// Classify one skeleton, keeping the reason when it cannot be measured.
pub fn assess(skeleton: &Skeleton) -> PostureAssessment {
    if skeleton.len() < POSE_LANDMARK_COUNT {
        return PostureAssessment::Undetected(UndetectedReason::TooFewLandmarks {
            found: skeleton.len(),
        });
    }
    if let Some(missing) = REQUIRED_LANDMARKS
        .iter()
        .copied()
        .find(|landmark| skeleton.get(*landmark).is_none())
    {
        return PostureAssessment::Undetected(UndetectedReason::MissingLandmark(missing));
    }

    // Presence checked above.
    let pick = |landmark| skeleton.get(landmark).copied().unwrap_or(Landmark::new(0.0, 0.0, 0.0));
    let left_ear = pick(PoseLandmark::LeftEar);
    let right_ear = pick(PoseLandmark::RightEar);
    let left_shoulder = pick(PoseLandmark::LeftShoulder);
    let right_shoulder = pick(PoseLandmark::RightShoulder);

    let avg_ear_x = (left_ear.x + right_ear.x) / 2.0;
    let avg_shoulder_x = (left_shoulder.x + right_shoulder.x) / 2.0;
    let avg_ear_y = (left_ear.y + right_ear.y) / 2.0;
    let avg_shoulder_y = (left_shoulder.y + right_shoulder.y) / 2.0;

    let head_forward_distance = (avg_ear_x - avg_shoulder_x).abs();
    let neck_length = (avg_ear_y - avg_shoulder_y).abs();

    if !head_forward_distance.is_finite() || !neck_length.is_finite() {
        return PostureAssessment::Undetected(UndetectedReason::NonFiniteGeometry);
    }
    if neck_length == 0.0 {
        return PostureAssessment::Undetected(UndetectedReason::DegenerateGeometry);
    }

    let forward_ratio = head_forward_distance / neck_length;
    let has_tech_neck = forward_ratio > TECH_NECK_RATIO_THRESHOLD;
    let raw_score = ((1.0 - forward_ratio / SCORE_ZERO_RATIO) * 100.0).round();
    let score = raw_score.clamp(0.0, 100.0) as u8;

    PostureAssessment::Measured(PostureMeasurement {
        head_forward_distance,
        neck_length,
        forward_ratio,
        result: ClassificationResult {
            has_tech_neck,
            score,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Full skeleton with both ears at (`ear_x`, `ear_y`) and both shoulders at
    /// (`shoulder_x`, `shoulder_y`).
    fn skeleton(ear_x: f64, ear_y: f64, shoulder_x: f64, shoulder_y: f64) -> Skeleton {
        let mut skeleton =
            Skeleton::from_landmarks(vec![Landmark::new(0.5, 0.5, 0.0); POSE_LANDMARK_COUNT]);
        let ear = Landmark::new(ear_x, ear_y, 0.0);
        let shoulder = Landmark::new(shoulder_x, shoulder_y, 0.0);
        skeleton.set(PoseLandmark::LeftEar, Some(ear));
        skeleton.set(PoseLandmark::RightEar, Some(ear));
        skeleton.set(PoseLandmark::LeftShoulder, Some(shoulder));
        skeleton.set(PoseLandmark::RightShoulder, Some(shoulder));
        skeleton
    }

    #[test]
    fn upright_posture_scores_full_marks() {
        let result = classify(&skeleton(0.5, 0.3, 0.5, 0.6));
        assert_eq!(
            result,
            ClassificationResult {
                has_tech_neck: false,
                score: 100
            }
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let input = skeleton(0.58, 0.31, 0.5, 0.62);
        let first = classify(&input);
        for _ in 0..10 {
            assert_eq!(classify(&input), first);
        }
    }

    #[test]
    fn short_skeleton_is_undetectable() {
        let short = Skeleton::from_landmarks(vec![Landmark::new(0.5, 0.5, 0.0); 32]);
        assert_eq!(classify(&short), ClassificationResult::UNDETECTABLE);
        assert_eq!(
            assess(&short),
            PostureAssessment::Undetected(UndetectedReason::TooFewLandmarks { found: 32 })
        );
    }

    #[test]
    fn missing_required_landmark_is_undetectable() {
        for landmark in [
            PoseLandmark::LeftEar,
            PoseLandmark::RightEar,
            PoseLandmark::LeftShoulder,
            PoseLandmark::RightShoulder,
            PoseLandmark::Nose,
        ] {
            let mut input = skeleton(0.9, 0.0, 0.0, 1.0);
            input.set(landmark, None);
            assert_eq!(classify(&input), ClassificationResult::UNDETECTABLE);
            assert_eq!(
                assess(&input),
                PostureAssessment::Undetected(UndetectedReason::MissingLandmark(landmark))
            );
        }
    }

    #[test]
    fn unused_landmark_may_be_missing() {
        let mut input = skeleton(0.5, 0.3, 0.5, 0.6);
        input.set(PoseLandmark::LeftHip, None);
        assert_eq!(classify(&input).score, 100);
    }

    #[test]
    fn level_ears_and_shoulders_are_degenerate() {
        for ear_x in [0.0, 0.2, 0.9] {
            let input = skeleton(ear_x, 0.4, 0.1, 0.4);
            assert_eq!(classify(&input), ClassificationResult::UNDETECTABLE);
            assert_eq!(
                assess(&input),
                PostureAssessment::Undetected(UndetectedReason::DegenerateGeometry)
            );
        }
    }

    #[test]
    fn non_finite_coordinates_are_undetectable() {
        let input = skeleton(f64::NAN, 0.0, 0.0, 1.0);
        assert_eq!(classify(&input), ClassificationResult::UNDETECTABLE);
        assert!(!assess(&input).is_detected());
    }

    #[test]
    fn threshold_is_strict() {
        let at_threshold = classify(&skeleton(0.15, 0.0, 0.0, 1.0));
        assert!(!at_threshold.has_tech_neck);
        assert_eq!(at_threshold.score, 50);

        let above = classify(&skeleton(0.1501, 0.0, 0.0, 1.0));
        assert!(above.has_tech_neck);
    }

    #[test]
    fn offset_just_past_threshold_is_flagged() {
        // 0.65 - 0.5 lands one ulp above 0.15 in double precision.
        let result = classify(&skeleton(0.65, 0.0, 0.5, 1.0));
        assert!(result.has_tech_neck);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn flagged_frame_can_still_score_above_zero() {
        let result = classify(&skeleton(0.2, 0.0, 0.0, 1.0));
        assert!(result.has_tech_neck);
        assert_eq!(result.score, 33);
    }

    #[test]
    fn score_clamps_at_both_ends() {
        assert_eq!(classify(&skeleton(0.0, 0.0, 0.0, 1.0)).score, 100);
        assert_eq!(classify(&skeleton(0.3, 0.0, 0.0, 1.0)).score, 0);
        assert_eq!(classify(&skeleton(0.8, 0.0, 0.0, 1.0)).score, 0);
    }

    #[test]
    fn score_is_non_increasing_with_forward_distance() {
        let mut previous = u8::MAX;
        for step in 0..=40 {
            let forward = step as f64 * 0.01;
            let score = classify(&skeleton(0.1 + forward, 0.2, 0.1, 0.7)).score;
            assert!(score <= previous, "score rose at forward={forward}");
            previous = score;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn measurement_exposes_geometry() {
        let PostureAssessment::Measured(measurement) = assess(&skeleton(0.25, 0.0, 0.0, 0.5))
        else {
            panic!("expected a measurement");
        };
        assert_eq!(measurement.head_forward_distance, 0.25);
        assert_eq!(measurement.neck_length, 0.5);
        assert_eq!(measurement.forward_ratio, 0.5);
        assert!(measurement.result.has_tech_neck);
        assert_eq!(measurement.result.score, 0);
    }
}
