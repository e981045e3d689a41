use ndarray::{ArrayView2, ArrayView3};

/// ITU-R BT.601 luma weights.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// A single decoded frame: contiguous RGB bytes in row-major order.
///
/// Sources convert to this layout at the I/O boundary; the pipeline never
/// sees codec-specific pixel formats.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A zero-sized frame. Sources may return one to signal end-of-stream.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            index: 0,
        }
    }

    pub fn from_rgb_image(img: image::RgbImage, index: usize) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decode-order index assigned by the source.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, Self::CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    pub fn to_gray(&self) -> GrayFrame {
        let data = self
            .data
            .chunks_exact(Self::CHANNELS)
            .map(|px| {
                let luma =
                    LUMA_R * px[0] as f32 + LUMA_G * px[1] as f32 + LUMA_B * px[2] as f32;
                luma.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayFrame::new(data, self.width, self.height)
    }

    /// Copies the frame into an `image` buffer for resizing and encoding.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// Single-channel luma view of a [`Frame`], consumed by detection.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.data)
            .expect("GrayFrame data length must match dimensions")
    }

    /// Expands the luma plane back to three identical channels.
    pub fn to_rgb(&self) -> Frame {
        let data = self.data.iter().flat_map(|&v| [v, v, v]).collect();
        Frame::new(data, self.width, self.height, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_empty_frame() {
        assert!(Frame::empty().is_empty());
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_to_gray_uses_luma_weights() {
        // white, red, green, blue
        let data = vec![255, 255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255];
        let gray = Frame::new(data, 4, 1, 0).to_gray();
        assert_eq!(gray.data(), &[255, 76, 150, 29]);
        assert_eq!(gray.width(), 4);
        assert_eq!(gray.height(), 1);
    }

    #[test]
    fn test_gray_to_rgb_replicates_channels() {
        let gray = GrayFrame::new(vec![10, 200], 2, 1);
        let rgb = gray.to_rgb();
        assert_eq!(rgb.data(), &[10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_rgb_image_round_trip_keeps_pixels() {
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgb([1, 2, 3]));
        let frame = Frame::from_rgb_image(img.clone(), 7);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.to_rgb_image().unwrap(), img);
    }
}
