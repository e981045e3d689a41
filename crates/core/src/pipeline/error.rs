use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage that raised an internal fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Detection,
    Analysis,
    Gaze,
    Recording,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detection => "detection",
            Stage::Analysis => "analysis",
            Stage::Gaze => "gaze",
            Stage::Recording => "recording",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Recoverable: the input is skipped and the run continues.
    #[error("failed to open {}: {reason}", input.display())]
    SourceOpen { input: PathBuf, reason: String },
    /// Fatal to the run.
    #[error("{stage} failed at frame {frame}: {reason}")]
    Stage {
        stage: Stage,
        frame: u64,
        reason: String,
    },
    #[error("pipeline setup failed: {0}")]
    Setup(String),
    #[error("pipeline worker panicked")]
    WorkerPanicked,
}

impl PipelineError {
    pub fn stage(stage: Stage, frame: u64, err: impl fmt::Display) -> Self {
        Self::Stage {
            stage,
            frame,
            reason: err.to_string(),
        }
    }

    /// Whether the run can continue with its next input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SourceOpen { .. })
    }
}
