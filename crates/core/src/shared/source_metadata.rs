use std::path::PathBuf;

use crate::shared::constants::DEFAULT_FPS;

/// Stream properties reported by a frame source when it is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMetadata {
    pub width: u32,
    pub height: u32,
    /// Native frame rate; 0 when the container does not say.
    pub fps: f64,
    /// Frame count if known up front.
    pub total_frames: Option<usize>,
    pub source_path: Option<PathBuf>,
}

impl SourceMetadata {
    /// Frame rate used for timestamps: the native rate, or [`DEFAULT_FPS`]
    /// when the source reports a non-positive one.
    pub fn effective_fps(&self) -> f64 {
        effective_fps(self.fps)
    }
}

pub fn effective_fps(reported: f64) -> f64 {
    if reported.is_finite() && reported > 0.0 {
        reported
    } else {
        DEFAULT_FPS
    }
}
