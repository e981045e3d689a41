use crate::analysis::domain::features::{FaceAnalysis, GazeAngle};
use crate::detection::domain::landmark_detector::Detection;
use crate::shared::camera_intrinsics::CameraIntrinsics;
use crate::shared::frame::Frame;

/// Derives appearance and geometry features from a frame and its detection.
///
/// Must tolerate a failed detection by returning degraded output
/// (usually [`FaceAnalysis::neutral`]) rather than an error.
pub trait FaceAnalyzer: Send {
    fn analyze(
        &mut self,
        frame: &Frame,
        detection: &Detection,
        intrinsics: &CameraIntrinsics,
    ) -> Result<FaceAnalysis, Box<dyn std::error::Error>>;

    fn reset(&mut self);
}

/// Estimates gaze once appearance analysis is done.
pub trait GazeAnalyzer: Send {
    fn estimate(
        &mut self,
        frame: &Frame,
        detection: &Detection,
        analysis: &FaceAnalysis,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Option<GazeAngle>, Box<dyn std::error::Error>>;

    fn reset(&mut self);
}
