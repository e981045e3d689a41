use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::source::domain::frame_source::FrameSource;

/// Still images decoded one at a time with the `image` crate.
///
/// Used both for a directory of images treated as one synthetic stream and
/// for a single still in batch mode. Reports `fps = 0`, so timestamps fall
/// back to the default rate. Only the first image must decode; later
/// unreadable files are logged and skipped.
pub struct ImageFileSource {
    paths: Vec<PathBuf>,
    /// First image, decoded eagerly at open so unreadable inputs fail early.
    first: Option<Frame>,
    consumed: usize,
    metadata: SourceMetadata,
    closed: bool,
}

impl ImageFileSource {
    /// Opens a list of image files, keeping the order given.
    pub fn open_images(paths: &[PathBuf]) -> Result<Self, Box<dyn std::error::Error>> {
        let first_path = paths.first().ok_or("No images to open")?;
        let first = load_frame(first_path, 0)?;

        let source_path = if paths.len() == 1 {
            Some(first_path.clone())
        } else {
            first_path.parent().map(Path::to_path_buf)
        };

        Ok(Self {
            metadata: SourceMetadata {
                width: first.width(),
                height: first.height(),
                fps: 0.0,
                total_frames: Some(paths.len()),
                source_path,
            },
            paths: paths.to_vec(),
            first: Some(first),
            consumed: 0,
            closed: false,
        })
    }

    /// Opens every image file in `dir`, sorted by file name.
    pub fn open_sequence(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let paths = list_images(dir)?;
        if paths.is_empty() {
            return Err(format!("No image files in {}", dir.display()).into());
        }
        let mut source = Self::open_images(&paths)?;
        source.metadata.source_path = Some(dir.to_path_buf());
        Ok(source)
    }
}

impl FrameSource for ImageFileSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.closed {
            return Err("ImageFileSource: already closed".into());
        }
        if let Some(frame) = self.first.take() {
            self.consumed += 1;
            return Ok(Some(frame));
        }
        while let Some(path) = self.paths.get(self.consumed) {
            let index = self.consumed;
            self.consumed += 1;
            match load_frame(path, index) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => log::warn!("Skipping unreadable image: {e}"),
            }
        }
        Ok(None)
    }

    fn progress(&self) -> Option<f64> {
        Some(self.consumed as f64 / self.paths.len() as f64)
    }

    fn close(&mut self) {
        self.first = None;
        self.closed = true;
    }
}

/// Image files in `dir` whose extension is in [`IMAGE_EXTENSIONS`], sorted.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    paths.sort();
    Ok(paths)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_frame(path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?
        .to_rgb8();
    Ok(Frame::from_rgb_image(img, index))
}
