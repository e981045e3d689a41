//! Converts snapshot frames into image handles for the view.

use iced::widget::image::Handle;

use facetrace_core::presentation::snapshot::FaceOverlay;
use facetrace_core::shared::frame::Frame;

const BOX_COLOR: [u8; 4] = [0x30, 0xd1, 0x58, 0xff];
const LANDMARK_COLOR: [u8; 4] = [0xff, 0x45, 0x3a, 0xff];
const LANDMARK_RADIUS: i64 = 2;

/// RGBA pixels of `frame` with face boxes and landmarks drawn over it.
pub fn frame_handle(frame: &Frame, faces: &[FaceOverlay]) -> Handle {
    let mut pixels = to_rgba(frame);
    draw_overlays(&mut pixels, frame.width(), frame.height(), faces);
    Handle::from_rgba(frame.width(), frame.height(), pixels)
}

pub fn plain_handle(frame: &Frame) -> Handle {
    Handle::from_rgba(frame.width(), frame.height(), to_rgba(frame))
}

pub fn to_rgba(frame: &Frame) -> Vec<u8> {
    frame
        .data()
        .chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], 0xff])
        .collect()
}

pub fn draw_overlays(pixels: &mut [u8], width: u32, height: u32, faces: &[FaceOverlay]) {
    let mut canvas = Canvas {
        pixels,
        width: i64::from(width),
        height: i64::from(height),
    };
    for face in faces {
        let [x1, y1, x2, y2] = face.bbox.map(|v| v.round() as i64);
        for x in x1..=x2 {
            canvas.put(x, y1, BOX_COLOR);
            canvas.put(x, y2, BOX_COLOR);
        }
        for y in y1..=y2 {
            canvas.put(x1, y, BOX_COLOR);
            canvas.put(x2, y, BOX_COLOR);
        }
        for &(lx, ly) in &face.landmarks {
            let (cx, cy) = (lx.round() as i64, ly.round() as i64);
            for dy in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
                for dx in -LANDMARK_RADIUS..=LANDMARK_RADIUS {
                    if dx * dx + dy * dy <= LANDMARK_RADIUS * LANDMARK_RADIUS {
                        canvas.put(cx + dx, cy + dy, LANDMARK_COLOR);
                    }
                }
            }
        }
    }
}

struct Canvas<'a> {
    pixels: &'a mut [u8],
    width: i64,
    height: i64,
}

impl Canvas<'_> {
    fn put(&mut self, x: i64, y: i64, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        if let Some(px) = self.pixels.get_mut(offset..offset + 4) {
            px.copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_adds_opaque_alpha() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, 0);
        assert_eq!(to_rgba(&frame), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_box_outline_drawn_and_clipped() {
        let (w, h) = (8u32, 8u32);
        let mut pixels = vec![0u8; (w * h * 4) as usize];
        let faces = [FaceOverlay {
            bbox: [2.0, 2.0, 20.0, 5.0],
            landmarks: Vec::new(),
        }];
        draw_overlays(&mut pixels, w, h, &faces);

        let at = |x: u32, y: u32| &pixels[((y * w + x) * 4) as usize..((y * w + x) * 4 + 4) as usize];
        assert_eq!(at(2, 2), BOX_COLOR);
        assert_eq!(at(7, 5), BOX_COLOR);
        assert_eq!(at(4, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn test_landmark_dot_drawn() {
        let (w, h) = (10u32, 10u32);
        let mut pixels = vec![0u8; (w * h * 4) as usize];
        let faces = [FaceOverlay {
            bbox: [-5.0, -5.0, -1.0, -1.0],
            landmarks: vec![(5.0, 5.0)],
        }];
        draw_overlays(&mut pixels, w, h, &faces);
        let center = ((5 * w + 5) * 4) as usize;
        assert_eq!(&pixels[center..center + 4], LANDMARK_COLOR);
    }
}
