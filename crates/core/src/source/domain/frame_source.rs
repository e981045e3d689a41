use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Pulls decoded frames from a video, an image sequence, or still images.
///
/// A source is positioned at its first frame when opened and owned by one
/// pipeline session until [`FrameSource::close`] is called.
pub trait FrameSource: Send {
    fn metadata(&self) -> &SourceMetadata;

    /// Returns the next frame, or `None` at end of stream. An empty frame
    /// is also treated as end of stream by the pipeline.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Playback position in `[0, 1]`, or `None` when the length is unknown.
    fn progress(&self) -> Option<f64>;

    fn fps(&self) -> f64 {
        self.metadata().fps
    }

    fn dimensions(&self) -> (u32, u32) {
        let meta = self.metadata();
        (meta.width, meta.height)
    }

    /// Releases decoder and file handles. Safe to call more than once.
    fn close(&mut self);
}

/// One openable input stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaInput {
    Video(PathBuf),
    /// A directory of images processed as one continuous stream.
    Sequence(PathBuf),
    /// A single still image.
    Image(PathBuf),
}

impl MediaInput {
    pub fn path(&self) -> &Path {
        match self {
            Self::Video(p) | Self::Sequence(p) | Self::Image(p) => p,
        }
    }

    /// Base name for output files: the file stem, or the directory name for
    /// a sequence.
    pub fn output_stem(&self) -> String {
        let name = match self {
            Self::Sequence(dir) => dir.file_name(),
            Self::Video(file) | Self::Image(file) => file.file_stem(),
        };
        name.map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "output".to_string())
    }
}

/// Opens sources for inputs. Failure to open is recoverable: the pipeline
/// reports it and moves to the next input.
pub trait SourceOpener: Send + Sync {
    fn open(&self, input: &MediaInput) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>>;
}
