use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::frame_result::FrameResult;
use crate::source::domain::frame_source::MediaInput;

/// Which features a recorder writes per frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingFlags {
    pub pose: bool,
    pub landmarks: bool,
    pub action_units: bool,
    pub gaze: bool,
    /// Write each frame's aligned face crop as an image file.
    pub aligned_faces: bool,
    pub timestamps: bool,
}

impl Default for RecordingFlags {
    fn default() -> Self {
        Self {
            pose: true,
            landmarks: true,
            action_units: true,
            gaze: true,
            aligned_faces: false,
            timestamps: true,
        }
    }
}

/// Append-only sink for per-frame results.
///
/// The pipeline calls [`Recorder::record_frame`] once per frame in strictly
/// increasing index order and [`Recorder::finish`] exactly once at teardown.
pub trait Recorder: Send {
    fn open(&mut self, path: &Path, flags: &RecordingFlags) -> Result<(), Box<dyn std::error::Error>>;

    fn record_frame(
        &mut self,
        frame_index: u64,
        timestamp: f64,
        result: &FrameResult,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

/// Output file for an input: `<output_dir or input's parent>/<stem>.jsonl`.
pub fn output_path(input: &MediaInput, output_dir: Option<&Path>) -> PathBuf {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    dir.join(format!("{}.jsonl", input.output_stem()))
}

/// `path` if nothing in `taken` uses it, otherwise `<stem>-<n>.jsonl` with
/// the smallest free `n` from 2.
pub fn unclaimed_output_path(path: PathBuf, taken: &HashSet<PathBuf>) -> PathBuf {
    if !taken.contains(&path) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (2..)
        .map(|n| path.with_file_name(format!("{stem}-{n}.jsonl")))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(path)
}
