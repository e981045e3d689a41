use std::path::{Path, PathBuf};

use crate::pipeline::fps_tracker::FpsTracker;
use crate::shared::camera_intrinsics::{CameraIntrinsics, IntrinsicsSetting};
use crate::shared::source_metadata::effective_fps;
use crate::source::domain::frame_source::MediaInput;

/// How frame timestamps advance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameClock {
    /// Continuous stream at the source's effective rate.
    Stream,
    /// Independent still image: every frame is at time zero.
    Still,
}

/// Worker-owned state for one run over one input stream.
pub struct Session {
    input: MediaInput,
    intrinsics_setting: IntrinsicsSetting,
    intrinsics: Option<CameraIntrinsics>,
    output_path: Option<PathBuf>,
    frames: u64,
    fps: f64,
    clock: FrameClock,
    tracker: FpsTracker,
}

impl Session {
    pub fn new(
        input: MediaInput,
        intrinsics_setting: IntrinsicsSetting,
        output_path: Option<PathBuf>,
        reported_fps: f64,
        clock: FrameClock,
    ) -> Self {
        Self {
            input,
            intrinsics_setting,
            intrinsics: None,
            output_path,
            frames: 0,
            fps: effective_fps(reported_fps),
            clock,
            tracker: FpsTracker::default(),
        }
    }

    pub fn input(&self) -> &MediaInput {
        &self.input
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Effective frame rate used for timestamps.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Resolves intrinsics from the first frame's dimensions; later calls
    /// return the same value regardless of size.
    pub fn ensure_intrinsics(&mut self, width: u32, height: u32) -> CameraIntrinsics {
        *self
            .intrinsics
            .get_or_insert_with(|| self.intrinsics_setting.resolve(width, height))
    }

    pub fn intrinsics(&self) -> Option<CameraIntrinsics> {
        self.intrinsics
    }

    /// Counts a frame and returns its one-based index.
    pub fn advance(&mut self) -> u64 {
        self.frames += 1;
        self.tracker.tick();
        self.frames
    }

    /// Timestamp in seconds of the frame with one-based `index`.
    pub fn timestamp(&self, index: u64) -> f64 {
        match self.clock {
            FrameClock::Stream => index.saturating_sub(1) as f64 / self.fps,
            FrameClock::Still => 0.0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn tracker(&self) -> &FpsTracker {
        &self.tracker
    }
}
