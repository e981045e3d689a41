use crate::detection::domain::face_landmarks::{FaceLandmarks, NUM_KEYPOINTS};

pub const DEFAULT_ALPHA: f64 = 0.6;

/// EMA smoother for the primary face's landmarks across frames.
///
/// `ema[t] = alpha * current + (1 - alpha) * ema[t-1]`, per keypoint.
/// Invisible keypoints pass through and leave their history untouched.
pub struct LandmarkSmoother {
    alpha: f64,
    state: Option<[(f64, f64); NUM_KEYPOINTS]>,
}

impl LandmarkSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    pub fn smooth(&mut self, landmarks: &FaceLandmarks) -> FaceLandmarks {
        let current = *landmarks.points();
        let Some(prev) = self.state.as_mut() else {
            self.state = Some(current);
            return landmarks.clone();
        };

        let mut out = current;
        for (i, (x, y)) in current.iter().enumerate() {
            if *x <= 0.0 {
                continue;
            }
            let (px, py) = prev[i];
            if px > 0.0 {
                out[i] = (
                    self.alpha * x + (1.0 - self.alpha) * px,
                    self.alpha * y + (1.0 - self.alpha) * py,
                );
            }
            prev[i] = out[i];
        }
        FaceLandmarks::new(out)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
