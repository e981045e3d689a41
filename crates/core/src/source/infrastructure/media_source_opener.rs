use crate::source::domain::frame_source::{FrameSource, MediaInput, SourceOpener};

use super::ffmpeg_source::FfmpegSource;
use super::image_file_source::ImageFileSource;

/// Opens videos through ffmpeg and stills/sequences through the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct MediaSourceOpener;

impl SourceOpener for MediaSourceOpener {
    fn open(&self, input: &MediaInput) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
        let source: Box<dyn FrameSource> = match input {
            MediaInput::Video(path) => Box::new(FfmpegSource::open(path)?),
            MediaInput::Sequence(dir) => Box::new(ImageFileSource::open_sequence(dir)?),
            MediaInput::Image(path) => {
                Box::new(ImageFileSource::open_images(std::slice::from_ref(path))?)
            }
        };
        Ok(source)
    }
}
