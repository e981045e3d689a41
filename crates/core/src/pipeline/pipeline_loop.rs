//! The per-frame loop shared by every input mode.
//!
//! One iteration: control gate, pull a frame, detect on its grayscale
//! variant, analyze, estimate gaze, record, publish. Continuous streams and
//! still-image batches differ only in [`LoopSettings`].

use std::time::{Duration, Instant};

use crate::detection::domain::landmark_detector::DetectionParams;
use crate::pipeline::components::{PipelineStages, VisualizationFlags};
use crate::pipeline::control_state::{ControlState, Permit};
use crate::pipeline::error::{PipelineError, Stage};
use crate::pipeline::frame_result::FrameResult;
use crate::pipeline::pipeline_logger::{stage, PipelineLogger};
use crate::pipeline::publish_throttle::PublishThrottle;
use crate::pipeline::session::Session;
use crate::presentation::presenter::Presenter;
use crate::presentation::snapshot::{FaceOverlay, FrameSnapshot, Readouts};
use crate::recording::domain::recorder::Recorder;
use crate::source::domain::frame_source::FrameSource;

#[derive(Clone, Debug)]
pub struct LoopSettings {
    /// Honour pause and step. Off for still-image batches, which only
    /// observe stop.
    pub playback_control: bool,
    pub visualize: bool,
    pub visualization: VisualizationFlags,
    pub detection: DetectionParams,
    pub poll_interval: Duration,
    pub publish_interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    EndOfStream,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopOutcome {
    pub exit: LoopExit,
    pub frames: u64,
}

/// Runs the loop until end of stream, a stop request, or a stage fault. A
/// failed or empty read ends the stream.
///
/// The recorder, when present, sees every processed frame exactly once in
/// index order. Teardown of the source and recorder is the caller's job.
#[allow(clippy::too_many_arguments)]
pub fn run_pipeline(
    source: &mut dyn FrameSource,
    stages: &mut PipelineStages,
    mut recorder: Option<&mut dyn Recorder>,
    session: &mut Session,
    control: &ControlState,
    presenter: &Presenter,
    logger: &mut dyn PipelineLogger,
    settings: &LoopSettings,
) -> Result<LoopOutcome, PipelineError> {
    let total = source.metadata().total_frames.map(|t| t as u64);
    let mut throttle = PublishThrottle::new(settings.publish_interval);

    loop {
        let permit = if settings.playback_control {
            control.await_permit(settings.poll_interval)
        } else if control.is_running() {
            Permit::Advance
        } else {
            Permit::Stop
        };
        if permit == Permit::Stop {
            return Ok(LoopOutcome {
                exit: LoopExit::Stopped,
                frames: session.frames(),
            });
        }

        let t = Instant::now();
        let next = source.next_frame().unwrap_or_else(|e| {
            log::warn!("Source read failed after frame {}: {e}", session.frames());
            None
        });
        let Some(frame) = next.filter(|f| !f.is_empty()) else {
            return Ok(LoopOutcome {
                exit: LoopExit::EndOfStream,
                frames: session.frames(),
            });
        };
        logger.timing(stage::READ, elapsed_ms(t));

        let index = session.advance();
        let intrinsics = session.ensure_intrinsics(frame.width(), frame.height());

        let t = Instant::now();
        let gray = frame.to_gray();
        let detection = stages
            .detector
            .detect(&gray, &settings.detection)
            .map_err(|e| PipelineError::stage(Stage::Detection, index, e))?;
        logger.timing(stage::DETECT, elapsed_ms(t));
        logger.metric("faces", detection.faces.len() as f64);

        let t = Instant::now();
        let analysis = stages
            .analyzer
            .analyze(&frame, &detection, &intrinsics)
            .map_err(|e| PipelineError::stage(Stage::Analysis, index, e))?;
        logger.timing(stage::ANALYZE, elapsed_ms(t));

        let t = Instant::now();
        let gaze = stages
            .gaze
            .estimate(&frame, &detection, &analysis, &intrinsics)
            .map_err(|e| PipelineError::stage(Stage::Gaze, index, e))?;
        logger.timing(stage::GAZE, elapsed_ms(t));

        let result = FrameResult {
            frame,
            detection,
            analysis,
            gaze,
        };

        if let Some(recorder) = recorder.as_mut() {
            let t = Instant::now();
            recorder
                .record_frame(index, session.timestamp(index), &result)
                .map_err(|e| PipelineError::stage(Stage::Recording, index, e))?;
            logger.timing(stage::RECORD, elapsed_ms(t));
        }

        logger.progress(index, total);

        let stepping = permit == Permit::Step;
        if settings.visualize && throttle.should_publish(stepping) {
            presenter.publish(build_snapshot(
                &result,
                index,
                session,
                source.progress(),
                &settings.visualization,
            ));
        }

        if stepping {
            control.complete_step();
        }
    }
}

fn build_snapshot(
    result: &FrameResult,
    index: u64,
    session: &Session,
    progress: Option<f64>,
    flags: &VisualizationFlags,
) -> FrameSnapshot {
    let faces = if flags.landmarks {
        result
            .detection
            .faces
            .iter()
            .map(|face| FaceOverlay {
                bbox: face.bbox,
                landmarks: face
                    .landmarks
                    .points()
                    .iter()
                    .copied()
                    .filter(|(x, _)| *x > 0.0)
                    .collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    FrameSnapshot {
        sequence: 0,
        frame_index: index,
        image: flags.video.then(|| result.frame.clone()),
        faces,
        aligned_face: result
            .analysis
            .aligned_face
            .clone()
            .filter(|_| flags.aligned_face),
        descriptor: result
            .analysis
            .descriptor
            .clone()
            .filter(|_| flags.descriptor),
        readouts: Readouts {
            success: result.success(),
            confidence: result.detection.confidence(),
            pose: result.analysis.pose,
            gaze: result.gaze,
            action_units: result.analysis.action_units.clone(),
            timestamp: session.timestamp(index),
            fps: session.tracker().fps(),
            elapsed: session.tracker().elapsed(),
            progress,
        },
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
