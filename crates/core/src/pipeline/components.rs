use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::domain::face_analyzer::{FaceAnalyzer, GazeAnalyzer};
use crate::detection::domain::landmark_detector::{DetectionParams, LandmarkDetector};
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::recording::domain::recorder::{Recorder, RecordingFlags};
use crate::shared::camera_intrinsics::IntrinsicsSetting;
use crate::shared::constants::{
    DEFAULT_PUBLISH_INTERVAL, FRAME_DELIVERY_BUDGET, MODE_CHANGE_BUDGET, PAUSE_POLL_INTERVAL,
};
use crate::source::domain::frame_source::{FrameSource, MediaInput};

/// Factory for the collaborators of one run. Called on the worker thread.
pub trait PipelineComponents: Send + Sync {
    fn open_source(&self, input: &MediaInput) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>>;

    fn landmark_detector(&self) -> Result<Box<dyn LandmarkDetector>, Box<dyn std::error::Error>>;

    fn face_analyzer(&self) -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>>;

    fn gaze_analyzer(&self) -> Result<Box<dyn GazeAnalyzer>, Box<dyn std::error::Error>>;

    /// A fresh recorder; one is created per input.
    fn recorder(&self) -> Result<Box<dyn Recorder>, Box<dyn std::error::Error>>;

    fn logger(&self) -> Box<dyn PipelineLogger> {
        Box::new(NullPipelineLogger)
    }
}

/// What a run processes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSpec {
    /// Video files processed one after another.
    Videos(Vec<PathBuf>),
    /// A directory of images treated as one stream.
    Sequence(PathBuf),
    /// Independent still images.
    Images(Vec<PathBuf>),
}

impl InputSpec {
    /// Still-image batches run without pause/step.
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Images(_))
    }

    pub fn inputs(&self) -> Vec<MediaInput> {
        match self {
            Self::Videos(paths) => paths.iter().cloned().map(MediaInput::Video).collect(),
            Self::Sequence(dir) => vec![MediaInput::Sequence(dir.clone())],
            Self::Images(paths) => paths.iter().cloned().map(MediaInput::Image).collect(),
        }
    }
}

/// What the worker puts into presentation snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationFlags {
    /// The source frame itself.
    pub video: bool,
    /// Face boxes and landmarks over the frame.
    pub landmarks: bool,
    pub aligned_face: bool,
    pub descriptor: bool,
}

impl Default for VisualizationFlags {
    fn default() -> Self {
        Self {
            video: true,
            landmarks: true,
            aligned_face: true,
            descriptor: true,
        }
    }
}

/// Per-run configuration.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Where recordings go; `None` writes next to each input.
    pub output_dir: Option<PathBuf>,
    /// Whether a recorder is attached at all.
    pub record: bool,
    pub recording: RecordingFlags,
    /// Whether snapshots are published.
    pub visualize: bool,
    pub visualization: VisualizationFlags,
    pub intrinsics: IntrinsicsSetting,
    pub detection: DetectionParams,
    pub poll_interval: Duration,
    pub publish_interval: Duration,
    pub frame_budget: Duration,
    pub mode_budget: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            record: true,
            recording: RecordingFlags::default(),
            visualize: true,
            visualization: VisualizationFlags::default(),
            intrinsics: IntrinsicsSetting::Auto,
            detection: DetectionParams::default(),
            poll_interval: PAUSE_POLL_INTERVAL,
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            frame_budget: FRAME_DELIVERY_BUDGET,
            mode_budget: MODE_CHANGE_BUDGET,
        }
    }
}

/// Detection and analysis stages, created once per run and reset before
/// each independent input.
pub struct PipelineStages {
    pub detector: Box<dyn LandmarkDetector>,
    pub analyzer: Box<dyn FaceAnalyzer>,
    pub gaze: Box<dyn GazeAnalyzer>,
}

impl PipelineStages {
    pub fn create(components: &dyn PipelineComponents) -> Result<Self, PipelineError> {
        let setup = |what: &str, e: Box<dyn std::error::Error>| {
            PipelineError::Setup(format!("{what}: {e}"))
        };
        Ok(Self {
            detector: components
                .landmark_detector()
                .map_err(|e| setup("landmark detector", e))?,
            analyzer: components
                .face_analyzer()
                .map_err(|e| setup("face analyzer", e))?,
            gaze: components
                .gaze_analyzer()
                .map_err(|e| setup("gaze analyzer", e))?,
        })
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        self.analyzer.reset();
        self.gaze.reset();
    }
}
