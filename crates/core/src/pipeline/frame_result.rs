use crate::analysis::domain::features::{FaceAnalysis, GazeAngle};
use crate::detection::domain::landmark_detector::Detection;
use crate::shared::frame::Frame;

/// One frame's pipeline output, built once per loop iteration and handed to
/// the recorder and the presenter.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub frame: Frame,
    pub detection: Detection,
    pub analysis: FaceAnalysis,
    pub gaze: Option<GazeAngle>,
}

impl FrameResult {
    pub fn success(&self) -> bool {
        self.detection.success()
    }
}
