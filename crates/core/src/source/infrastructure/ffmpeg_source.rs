use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::source::domain::frame_source::FrameSource;

/// Video file source backed by ffmpeg-next (libavformat + libavcodec).
///
/// Frames are decoded lazily, one per [`FrameSource::next_frame`] call, and
/// converted to RGB24.
pub struct FfmpegSource {
    decode: Option<DecodeState>,
    metadata: SourceMetadata,
    frames_read: usize,
}

// Safety: the source is owned by exactly one worker thread at a time; the
// raw ffmpeg pointers inside never cross threads concurrently.
unsafe impl Send for FfmpegSource {}

struct DecodeState {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
    done: bool,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let (video_stream_index, decoder, fps, frame_count) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            let decoder = codec_ctx.decoder().video()?;

            let rate = stream.rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };
            (stream.index(), decoder, fps, stream.frames())
        };

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(format!("Video has no frame size: {}", path.display()).into());
        }

        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {} ({width}x{height}, {fps:.2} fps, {frame_count} frames)",
            path.display()
        );

        Ok(Self {
            decode: Some(DecodeState {
                ictx,
                decoder,
                scaler,
                video_stream_index,
                width,
                height,
                flushing: false,
                done: false,
            }),
            metadata: SourceMetadata {
                width,
                height,
                fps,
                total_frames: (frame_count > 0).then_some(frame_count as usize),
                source_path: Some(path.to_path_buf()),
            },
            frames_read: 0,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(decode) = self.decode.as_mut() else {
            return Err("FfmpegSource: already closed".into());
        };
        let frame = decode.next(self.frames_read)?;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    fn progress(&self) -> Option<f64> {
        self.metadata
            .total_frames
            .map(|total| (self.frames_read as f64 / total as f64).min(1.0))
    }

    fn close(&mut self) {
        self.decode = None;
    }
}

impl DecodeState {
    fn next(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.try_receive(index)? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                let frame = self.try_receive(index)?;
                self.done = frame.is_none();
                return Ok(frame);
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            // Corrupt packets are skipped rather than ending the stream.
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive(index)? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = Video::empty();
        self.scaler.run(&decoded, &mut rgb)?;
        let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, index)))
    }
}

/// Copies pixel rows out of an ffmpeg frame, dropping per-row stride padding.
fn extract_rgb_pixels(rgb: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * Frame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
