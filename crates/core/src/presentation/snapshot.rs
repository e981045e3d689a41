use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::domain::features::{GazeAngle, HeadPose};
use crate::shared::frame::Frame;

/// Immutable per-frame bundle handed from the worker to the UI thread.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    /// Stamped by the presenter; strictly increasing across publishes.
    pub sequence: u64,
    /// One-based index of the frame within its input.
    pub frame_index: u64,
    pub image: Option<Frame>,
    pub faces: Vec<FaceOverlay>,
    pub aligned_face: Option<Frame>,
    pub descriptor: Option<Frame>,
    pub readouts: Readouts,
}

/// Overlay geometry for one detected face, in frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceOverlay {
    pub bbox: [f64; 4],
    pub landmarks: Vec<(f64, f64)>,
}

/// Numeric values shown next to the video.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Readouts {
    pub success: bool,
    pub confidence: f64,
    pub pose: Option<HeadPose>,
    pub gaze: Option<GazeAngle>,
    pub action_units: BTreeMap<String, f64>,
    pub timestamp: f64,
    /// Processing rate over the recent window.
    pub fps: f64,
    pub elapsed: Duration,
    /// Source position in `[0, 1]`, `None` when unknown.
    pub progress: Option<f64>,
}

/// What the UI is doing, as far as the worker is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    /// A run is active. Batch runs are not pausable.
    Processing { pausable: bool },
    /// No run; configuration is available and the view is neutral.
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Control {
    /// Input selection, options, and panel configuration.
    Configure,
    Start,
    Pause,
    Step,
    Stop,
}

/// The set of enabled controls for a mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlSet(BTreeSet<Control>);

impl ControlSet {
    pub fn for_mode(mode: UiMode, paused: bool) -> Self {
        let controls: &[Control] = match mode {
            UiMode::Idle => &[Control::Configure, Control::Start],
            UiMode::Processing { pausable: false } => &[Control::Stop],
            UiMode::Processing { pausable: true } if paused => {
                &[Control::Pause, Control::Step, Control::Stop]
            }
            UiMode::Processing { pausable: true } => &[Control::Pause, Control::Stop],
        };
        Self(controls.iter().copied().collect())
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.0.contains(&control)
    }

    pub fn iter(&self) -> impl Iterator<Item = Control> + '_ {
        self.0.iter().copied()
    }
}

/// Out-of-band notifications from the worker. Never coalesced or dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    InputStarted { input: PathBuf },
    InputFinished { input: PathBuf, frames: u64 },
    /// Recoverable: the input was skipped.
    SourceOpenFailed { input: PathBuf, reason: String },
    /// Fatal to the run: remaining inputs are abandoned.
    SessionFailed { reason: String },
    SessionEnded,
}
