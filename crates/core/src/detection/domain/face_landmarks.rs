//! 5-point face landmarks (eyes, nose, mouth corners) with the geometric
//! helpers the analyzers need.
//!
//! Points with x <= 0 are treated as invisible; the detector writes (0, 0)
//! for keypoints below its confidence threshold.

/// Index of each keypoint in the landmark array, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keypoint {
    LeftEye = 0,
    RightEye = 1,
    Nose = 2,
    LeftMouth = 3,
    RightMouth = 4,
}

pub const NUM_KEYPOINTS: usize = 5;

/// Centroid weights: [left_eye, right_eye, nose, left_mouth, right_mouth].
const WEIGHTS: [f64; NUM_KEYPOINTS] = [2.0, 2.0, 3.0, 1.0, 1.0];

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [(f64, f64); NUM_KEYPOINTS],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); NUM_KEYPOINTS]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); NUM_KEYPOINTS] {
        &self.points
    }

    pub fn point(&self, keypoint: Keypoint) -> Option<(f64, f64)> {
        let p = self.points[keypoint as usize];
        (p.0 > 0.0).then_some(p)
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(|(x, _)| *x > 0.0)
    }

    /// True when both eyes, the nose, and both mouth corners are visible.
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(|(x, _)| *x > 0.0)
    }

    /// Weighted centroid of visible landmarks, nose weighted heaviest.
    pub fn center(&self) -> Option<(f64, f64)> {
        let (mut wx, mut wy, mut w_sum) = (0.0, 0.0, 0.0);
        for (i, (x, y)) in self.points.iter().enumerate() {
            if *x > 0.0 {
                wx += x * WEIGHTS[i];
                wy += y * WEIGHTS[i];
                w_sum += WEIGHTS[i];
            }
        }
        (w_sum > 0.0).then(|| (wx / w_sum, wy / w_sum))
    }

    pub fn eye_midpoint(&self) -> Option<(f64, f64)> {
        let l = self.point(Keypoint::LeftEye)?;
        let r = self.point(Keypoint::RightEye)?;
        Some(midpoint(l, r))
    }

    pub fn mouth_midpoint(&self) -> Option<(f64, f64)> {
        let l = self.point(Keypoint::LeftMouth)?;
        let r = self.point(Keypoint::RightMouth)?;
        Some(midpoint(l, r))
    }

    /// Euclidean distance between the eyes, in pixels.
    pub fn eye_distance(&self) -> Option<f64> {
        let l = self.point(Keypoint::LeftEye)?;
        let r = self.point(Keypoint::RightEye)?;
        Some(((r.0 - l.0).powi(2) + (r.1 - l.1).powi(2)).sqrt())
    }

    /// How far the head is turned: 0.0 frontal, 1.0 full profile.
    ///
    /// Nose offset from the eye midpoint relative to the horizontal eye span;
    /// 0.0 when the eyes or nose are not visible.
    pub fn profile_ratio(&self) -> f64 {
        let (Some(l), Some(r), Some(nose)) = (
            self.point(Keypoint::LeftEye),
            self.point(Keypoint::RightEye),
            self.point(Keypoint::Nose),
        ) else {
            return 0.0;
        };
        let span = (r.0 - l.0).abs();
        if span <= 0.0 {
            return 0.0;
        }
        ((nose.0 - (l.0 + r.0) / 2.0).abs() / span).min(1.0)
    }
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}
