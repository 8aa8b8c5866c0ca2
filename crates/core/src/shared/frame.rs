use std::time::Duration;

use ndarray::{s, ArrayView3};

use crate::shared::bounding_box::{FrameSize, PixelRect};

/// A single video frame: contiguous RGB bytes in row-major order.
///
/// `timestamp` is the offset from the start of the stream; the tracker's
/// timeout logic runs on it rather than on wall-clock time so recorded
/// sessions replay deterministically.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp: Duration,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp: Duration::ZERO,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
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

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `rect` into a new frame.
    ///
    /// The rectangle is clamped to this frame; `None` if nothing remains.
    pub fn crop(&self, rect: &PixelRect) -> Option<Frame> {
        let x1 = rect.x.min(self.width) as usize;
        let y1 = rect.y.min(self.height) as usize;
        let x2 = rect.right().min(self.width) as usize;
        let y2 = rect.bottom().min(self.height) as usize;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let view = self.as_ndarray();
        let data: Vec<u8> = view.slice(s![y1..y2, x1..x2, ..]).iter().copied().collect();
        Some(
            Frame::new(
                data,
                (x2 - x1) as u32,
                (y2 - y1) as u32,
                self.channels,
                self.index,
            )
            .with_timestamp(self.timestamp),
        )
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x3 frame where every pixel's red channel holds `row * 10 + col`.
    fn gradient_frame() -> Frame {
        let (w, h) = (4u32, 3u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for row in 0..h {
            for col in 0..w {
                data.extend_from_slice(&[(row * 10 + col) as u8, 0, 0]);
            }
        }
        Frame::new(data, w, h, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert_eq!(frame.timestamp(), Duration::ZERO);
        assert_eq!(frame.size(), FrameSize::new(2, 2));
    }

    #[test]
    fn test_with_timestamp() {
        let frame = Frame::new(vec![0u8; 3], 1, 1, 3, 0).with_timestamp(Duration::from_millis(40));
        assert_eq!(frame.timestamp(), Duration::from_millis(40));
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = gradient_frame();
        assert_eq!(frame.as_ndarray().shape(), &[3, 4, 3]);
    }

    #[test]
    fn test_crop_copies_region() {
        let frame = gradient_frame();
        let crop = frame
            .crop(&PixelRect {
                x: 1,
                y: 1,
                width: 2,
                height: 2,
            })
            .unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 11);
        assert_eq!(arr[[0, 1, 0]], 12);
        assert_eq!(arr[[1, 0, 0]], 21);
        assert_eq!(arr[[1, 1, 0]], 22);
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = gradient_frame();
        let crop = frame
            .crop(&PixelRect {
                x: 2,
                y: 2,
                width: 10,
                height: 10,
            })
            .unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 1);
        assert_eq!(crop.data().len(), 2 * 3);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = gradient_frame();
        assert!(frame
            .crop(&PixelRect {
                x: 4,
                y: 0,
                width: 2,
                height: 2,
            })
            .is_none());
    }
}
