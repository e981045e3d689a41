use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::GrayFrame;

/// Default confidence threshold for a face to count as detected.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// Per-call detection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionParams {
    pub confidence: f64,
    /// Upper bound on faces returned, highest confidence first.
    pub max_faces: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            max_faces: 1,
        }
    }
}

/// One detected face in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    /// `[x1, y1, x2, y2]`.
    pub bbox: [f64; 4],
    pub confidence: f64,
    pub landmarks: FaceLandmarks,
}

/// Outcome of detection on one frame. A frame with no faces is a failed
/// detection, which is a normal per-frame result rather than an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    pub faces: Vec<FaceDetection>,
}

impl Detection {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Highest-confidence face.
    pub fn primary(&self) -> Option<&FaceDetection> {
        self.faces.first()
    }

    pub fn confidence(&self) -> f64 {
        self.primary().map_or(0.0, |f| f.confidence)
    }
}

/// Domain interface for facial landmark detection on grayscale frames.
///
/// Implementations may keep temporal state across frames, cleared by
/// [`LandmarkDetector::reset`].
pub trait LandmarkDetector: Send {
    fn detect(
        &mut self,
        frame: &GrayFrame,
        params: &DetectionParams,
    ) -> Result<Detection, Box<dyn std::error::Error>>;

    fn reset(&mut self);
}
