//! In-memory collaborators that record what the pipeline did to them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use facetrace_core::analysis::domain::face_analyzer::{FaceAnalyzer, GazeAnalyzer};
use facetrace_core::analysis::domain::features::{FaceAnalysis, GazeAngle};
use facetrace_core::detection::domain::landmark_detector::{
    Detection, DetectionParams, LandmarkDetector,
};
use facetrace_core::pipeline::components::{PipelineComponents, RunOptions};
use facetrace_core::pipeline::frame_result::FrameResult;
use facetrace_core::presentation::presenter::PresentationReceiver;
use facetrace_core::presentation::snapshot::{SessionEvent, UiMode};
use facetrace_core::recording::domain::recorder::{Recorder, RecordingFlags};
use facetrace_core::shared::camera_intrinsics::CameraIntrinsics;
use facetrace_core::shared::frame::{Frame, GrayFrame};
use facetrace_core::shared::source_metadata::SourceMetadata;
use facetrace_core::source::domain::frame_source::{FrameSource, MediaInput};

type BoxErr = Box<dyn std::error::Error>;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub output: PathBuf,
    pub index: u64,
    pub timestamp: f64,
}

/// Everything the stubs observed, shared with the test body.
#[derive(Default)]
pub struct Probe {
    pub opened: Vec<PathBuf>,
    pub closed: Vec<PathBuf>,
    pub recorder_opened: Vec<(PathBuf, RecordingFlags)>,
    pub recorded: Vec<RecordedFrame>,
    pub finished: Vec<PathBuf>,
    pub detector_resets: usize,
}

#[derive(Clone)]
pub struct StubComponents {
    pub frames: usize,
    pub fps: f64,
    pub frame_delay: Duration,
    /// Detection fails with an error at this one-based frame index.
    pub fail_detection_at: Option<u64>,
    /// The source yields an empty frame on this one-based read.
    pub empty_at: Option<usize>,
    /// The source returns a read error on this one-based read.
    pub fail_read_at: Option<usize>,
    pub probe: Arc<Mutex<Probe>>,
}

impl StubComponents {
    pub fn new(frames: usize, fps: f64) -> Self {
        Self {
            frames,
            fps,
            frame_delay: Duration::ZERO,
            fail_detection_at: None,
            empty_at: None,
            fail_read_at: None,
            probe: Arc::new(Mutex::new(Probe::default())),
        }
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn probe(&self) -> MutexGuard<'_, Probe> {
        self.probe.lock().unwrap()
    }

    pub fn recorded_count(&self) -> usize {
        self.probe().recorded.len()
    }
}

impl PipelineComponents for StubComponents {
    fn open_source(&self, input: &MediaInput) -> Result<Box<dyn FrameSource>, BoxErr> {
        let path = input.path().to_path_buf();
        if path.to_string_lossy().contains("missing") {
            return Err(format!("cannot open {}", path.display()).into());
        }
        self.probe().opened.push(path.clone());
        Ok(Box::new(StubSource {
            remaining: self.frames,
            produced: 0,
            empty_at: self.empty_at,
            fail_read_at: self.fail_read_at,
            delay: self.frame_delay,
            metadata: SourceMetadata {
                width: 8,
                height: 6,
                fps: self.fps,
                total_frames: Some(self.frames),
                source_path: Some(path.clone()),
            },
            path,
            closed: false,
            probe: Arc::clone(&self.probe),
        }))
    }

    fn landmark_detector(&self) -> Result<Box<dyn LandmarkDetector>, BoxErr> {
        Ok(Box::new(StubDetector {
            frame: 0,
            fail_at: self.fail_detection_at,
            probe: Arc::clone(&self.probe),
        }))
    }

    fn face_analyzer(&self) -> Result<Box<dyn FaceAnalyzer>, BoxErr> {
        Ok(Box::new(StubAnalyzer))
    }

    fn gaze_analyzer(&self) -> Result<Box<dyn GazeAnalyzer>, BoxErr> {
        Ok(Box::new(StubAnalyzer))
    }

    fn recorder(&self) -> Result<Box<dyn Recorder>, BoxErr> {
        Ok(Box::new(StubRecorder {
            output: None,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct StubSource {
    path: PathBuf,
    remaining: usize,
    produced: usize,
    empty_at: Option<usize>,
    fail_read_at: Option<usize>,
    delay: Duration,
    metadata: SourceMetadata,
    closed: bool,
    probe: Arc<Mutex<Probe>>,
}

impl FrameSource for StubSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, BoxErr> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.remaining -= 1;
        self.produced += 1;
        if self.fail_read_at == Some(self.produced) {
            return Err("corrupt packet".into());
        }
        if self.empty_at == Some(self.produced) {
            return Ok(Some(Frame::empty()));
        }
        Ok(Some(Frame::new(vec![128; 8 * 6 * 3], 8, 6, self.produced - 1)))
    }

    fn progress(&self) -> Option<f64> {
        let total = self.metadata.total_frames?;
        Some(self.produced as f64 / total.max(1) as f64)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.probe.lock().unwrap().closed.push(self.path.clone());
        }
    }
}

struct StubDetector {
    frame: u64,
    fail_at: Option<u64>,
    probe: Arc<Mutex<Probe>>,
}

impl LandmarkDetector for StubDetector {
    fn detect(&mut self, _frame: &GrayFrame, _params: &DetectionParams) -> Result<Detection, BoxErr> {
        self.frame += 1;
        if self.fail_at == Some(self.frame) {
            return Err("model exploded".into());
        }
        Ok(Detection::failed())
    }

    fn reset(&mut self) {
        self.frame = 0;
        self.probe.lock().unwrap().detector_resets += 1;
    }
}

struct StubAnalyzer;

impl FaceAnalyzer for StubAnalyzer {
    fn analyze(
        &mut self,
        _frame: &Frame,
        _detection: &Detection,
        _intrinsics: &CameraIntrinsics,
    ) -> Result<FaceAnalysis, BoxErr> {
        Ok(FaceAnalysis::neutral())
    }

    fn reset(&mut self) {}
}

impl GazeAnalyzer for StubAnalyzer {
    fn estimate(
        &mut self,
        _frame: &Frame,
        _detection: &Detection,
        _analysis: &FaceAnalysis,
        _intrinsics: &CameraIntrinsics,
    ) -> Result<Option<GazeAngle>, BoxErr> {
        Ok(None)
    }

    fn reset(&mut self) {}
}

struct StubRecorder {
    output: Option<PathBuf>,
    probe: Arc<Mutex<Probe>>,
}

impl Recorder for StubRecorder {
    fn open(&mut self, path: &Path, flags: &RecordingFlags) -> Result<(), BoxErr> {
        self.output = Some(path.to_path_buf());
        self.probe
            .lock()
            .unwrap()
            .recorder_opened
            .push((path.to_path_buf(), flags.clone()));
        Ok(())
    }

    fn record_frame(&mut self, frame_index: u64, timestamp: f64, _result: &FrameResult) -> Result<(), BoxErr> {
        let output = self.output.clone().ok_or("recorder not open")?;
        self.probe.lock().unwrap().recorded.push(RecordedFrame {
            output,
            index: frame_index,
            timestamp,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BoxErr> {
        let output = self.output.clone().ok_or("recorder not open")?;
        self.probe.lock().unwrap().finished.push(output);
        Ok(())
    }
}

/// Short budgets so runs without a UI thread do not wait on mode acks.
pub fn fast_options() -> RunOptions {
    RunOptions {
        output_dir: Some(PathBuf::from("/out")),
        poll_interval: Duration::from_millis(2),
        publish_interval: Duration::ZERO,
        mode_budget: Duration::from_millis(10),
        ..RunOptions::default()
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub fn drain_events(receiver: &PresentationReceiver) -> Vec<SessionEvent> {
    std::iter::from_fn(|| receiver.try_event()).collect()
}

/// Drains pending mode requests, acknowledging each.
pub fn drain_modes(receiver: &PresentationReceiver) -> Vec<UiMode> {
    std::iter::from_fn(|| receiver.try_mode())
        .map(|request| {
            let mode = request.mode;
            request.acknowledge();
            mode
        })
        .collect()
}
