use std::path::{Path, PathBuf};

use crate::analysis::domain::face_analyzer::{FaceAnalyzer, GazeAnalyzer};
use crate::analysis::infrastructure::geometric_face_analyzer::GeometricFaceAnalyzer;
use crate::analysis::infrastructure::head_pose_gaze_analyzer::HeadPoseGazeAnalyzer;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::detection::domain::landmark_smoother::LandmarkSmoother;
use crate::detection::infrastructure::onnx_landmark_detector::OnnxLandmarkDetector;
use crate::pipeline::components::PipelineComponents;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger, StdoutPipelineLogger};
use crate::recording::domain::recorder::Recorder;
use crate::recording::infrastructure::json_lines_recorder::JsonLinesRecorder;
use crate::source::domain::frame_source::{FrameSource, MediaInput, SourceOpener};
use crate::source::infrastructure::media_source_opener::MediaSourceOpener;

/// Production wiring: ffmpeg and image-file sources, the ONNX landmark
/// model, geometric pose analysis, and JSON Lines recordings.
pub struct DefaultComponents {
    model_path: PathBuf,
    opener: MediaSourceOpener,
    stdout_throttle: Option<u64>,
}

impl DefaultComponents {
    pub fn new(model_path: &Path) -> Self {
        Self {
            model_path: model_path.to_path_buf(),
            opener: MediaSourceOpener,
            stdout_throttle: None,
        }
    }

    /// Logs progress every `throttle_frames` frames and a timing summary
    /// after each input.
    pub fn with_stdout_logger(mut self, throttle_frames: u64) -> Self {
        self.stdout_throttle = Some(throttle_frames);
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl PipelineComponents for DefaultComponents {
    fn open_source(&self, input: &MediaInput) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
        self.opener.open(input)
    }

    fn landmark_detector(&self) -> Result<Box<dyn LandmarkDetector>, Box<dyn std::error::Error>> {
        if !self.model_path.is_file() {
            return Err(format!("model not found: {}", self.model_path.display()).into());
        }
        let detector = OnnxLandmarkDetector::new(&self.model_path, LandmarkSmoother::default())?;
        Ok(Box::new(detector))
    }

    fn face_analyzer(&self) -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>> {
        Ok(Box::new(GeometricFaceAnalyzer::default()))
    }

    fn gaze_analyzer(&self) -> Result<Box<dyn GazeAnalyzer>, Box<dyn std::error::Error>> {
        Ok(Box::new(HeadPoseGazeAnalyzer::default()))
    }

    fn recorder(&self) -> Result<Box<dyn Recorder>, Box<dyn std::error::Error>> {
        Ok(Box::new(JsonLinesRecorder::new()))
    }

    fn logger(&self) -> Box<dyn PipelineLogger> {
        match self.stdout_throttle {
            Some(throttle) => Box::new(StdoutPipelineLogger::new(throttle)),
            None => Box::new(NullPipelineLogger),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_detector_creation() {
        let components = DefaultComponents::new(Path::new("/nonexistent/model.onnx"));
        assert!(components.landmark_detector().is_err());
    }

    #[test]
    fn test_missing_source_fails_to_open() {
        let components = DefaultComponents::new(Path::new("/nonexistent/model.onnx"));
        let input = MediaInput::Video(PathBuf::from("/nonexistent/clip.mp4"));
        assert!(components.open_source(&input).is_err());
    }

    #[test]
    fn test_analyzers_and_recorder_need_no_model() {
        let components = DefaultComponents::new(Path::new("/nonexistent/model.onnx"));
        assert!(components.face_analyzer().is_ok());
        assert!(components.gaze_analyzer().is_ok());
        assert!(components.recorder().is_ok());
    }
}
