use crate::analysis::domain::face_analyzer::GazeAnalyzer;
use crate::analysis::domain::features::{FaceAnalysis, GazeAngle};
use crate::detection::domain::landmark_detector::Detection;
use crate::shared::camera_intrinsics::CameraIntrinsics;
use crate::shared::frame::Frame;

pub const DEFAULT_GAZE_ALPHA: f64 = 0.5;

/// Approximates gaze with the head direction (`x = yaw`, `y = pitch`),
/// EMA-smoothed across frames.
pub struct HeadPoseGazeAnalyzer {
    alpha: f64,
    last: Option<GazeAngle>,
}

impl HeadPoseGazeAnalyzer {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, last: None }
    }
}

impl Default for HeadPoseGazeAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_GAZE_ALPHA)
    }
}

impl GazeAnalyzer for HeadPoseGazeAnalyzer {
    fn estimate(
        &mut self,
        _frame: &Frame,
        detection: &Detection,
        analysis: &FaceAnalysis,
        _intrinsics: &CameraIntrinsics,
    ) -> Result<Option<GazeAngle>, Box<dyn std::error::Error>> {
        let Some(pose) = analysis.pose.filter(|_| detection.success()) else {
            return Ok(None);
        };
        let raw = GazeAngle {
            x: pose.yaw,
            y: pose.pitch,
        };
        let smoothed = match self.last {
            Some(prev) => GazeAngle {
                x: self.alpha * raw.x + (1.0 - self.alpha) * prev.x,
                y: self.alpha * raw.y + (1.0 - self.alpha) * prev.y,
            },
            None => raw,
        };
        self.last = Some(smoothed);
        Ok(Some(smoothed))
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::features::HeadPose;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::detection::domain::landmark_detector::FaceDetection;
    use approx::assert_relative_eq;

    fn detected() -> Detection {
        Detection {
            faces: vec![FaceDetection {
                bbox: [0.0, 0.0, 10.0, 10.0],
                confidence: 0.8,
                landmarks: FaceLandmarks::new([(1.0, 1.0); 5]),
            }],
        }
    }

    fn with_pose(yaw: f64, pitch: f64) -> FaceAnalysis {
        FaceAnalysis {
            pose: Some(HeadPose {
                yaw,
                pitch,
                ..HeadPose::default()
            }),
            ..FaceAnalysis::neutral()
        }
    }

    fn estimate(analyzer: &mut HeadPoseGazeAnalyzer, analysis: &FaceAnalysis) -> Option<GazeAngle> {
        let frame = Frame::empty();
        let k = CameraIntrinsics::estimate(640, 480);
        analyzer.estimate(&frame, &detected(), analysis, &k).unwrap()
    }

    #[test]
    fn test_first_estimate_is_head_direction() {
        let mut analyzer = HeadPoseGazeAnalyzer::default();
        let gaze = estimate(&mut analyzer, &with_pose(0.2, -0.1)).unwrap();
        assert_relative_eq!(gaze.x, 0.2);
        assert_relative_eq!(gaze.y, -0.1);
    }

    #[test]
    fn test_subsequent_estimates_are_smoothed() {
        let mut analyzer = HeadPoseGazeAnalyzer::new(0.5);
        estimate(&mut analyzer, &with_pose(0.0, 0.0));
        let gaze = estimate(&mut analyzer, &with_pose(0.4, 0.2)).unwrap();
        assert_relative_eq!(gaze.x, 0.2);
        assert_relative_eq!(gaze.y, 0.1);
    }

    #[test]
    fn test_reset_clears_smoothing() {
        let mut analyzer = HeadPoseGazeAnalyzer::new(0.5);
        estimate(&mut analyzer, &with_pose(1.0, 1.0));
        analyzer.reset();
        let gaze = estimate(&mut analyzer, &with_pose(0.4, 0.2)).unwrap();
        assert_relative_eq!(gaze.x, 0.4);
    }

    #[test]
    fn test_no_pose_means_no_gaze() {
        let mut analyzer = HeadPoseGazeAnalyzer::default();
        assert!(estimate(&mut analyzer, &FaceAnalysis::neutral()).is_none());
    }

    #[test]
    fn test_failed_detection_means_no_gaze() {
        let mut analyzer = HeadPoseGazeAnalyzer::default();
        let k = CameraIntrinsics::estimate(640, 480);
        let gaze = analyzer
            .estimate(&Frame::empty(), &Detection::failed(), &with_pose(0.1, 0.1), &k)
            .unwrap();
        assert!(gaze.is_none());
    }
}
