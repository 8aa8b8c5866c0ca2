use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::frame::Frame;
use crate::shared::session_manifest::SessionManifest;
use crate::video::domain::frame_source::FrameSource;

/// Frames decoded lazily from a list of image files.
///
/// Images are converted to RGB8 whatever their stored format.
pub struct ImageSequenceSource {
    entries: Vec<(PathBuf, Duration)>,
}

impl ImageSequenceSource {
    pub fn new(entries: Vec<(PathBuf, Duration)>) -> Self {
        Self { entries }
    }

    pub fn from_manifest(manifest: &SessionManifest) -> Self {
        Self::new(
            manifest
                .frames()
                .iter()
                .map(|f| (f.image.clone(), f.timestamp))
                .collect(),
        )
    }
}

fn decode(
    path: &Path,
    index: usize,
    timestamp: Duration,
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("failed to decode {}: {e}", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index).with_timestamp(timestamp))
}

impl FrameSource for ImageSequenceSource {
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(
            self.entries
                .iter()
                .enumerate()
                .map(|(index, (path, timestamp))| decode(path, index, *timestamp)),
        )
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }

    fn close(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_frames_in_order_with_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_image(dir.path(), "a.png", 4, 2, [10, 20, 30]);
        let b = write_image(dir.path(), "b.png", 4, 2, [40, 50, 60]);
        let mut source = ImageSequenceSource::new(vec![
            (a, Duration::ZERO),
            (b, Duration::from_millis(250)),
        ]);
        assert_eq!(source.len_hint(), Some(2));

        let frames: Vec<Frame> = source.frames().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].index(), 1);
        assert_eq!(frames[1].timestamp(), Duration::from_millis(250));
        assert_eq!(frames[1].channels(), 3);
        assert_eq!(&frames[1].data()[..3], &[40, 50, 60]);
    }

    #[test]
    fn test_grayscale_is_converted_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(3, 3, image::Luma([77])).save(&path).unwrap();
        let mut source = ImageSequenceSource::new(vec![(path, Duration::ZERO)]);

        let frame = source.frames().next().unwrap().unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[77, 77, 77]);
    }

    #[test]
    fn test_missing_image_is_error() {
        let mut source =
            ImageSequenceSource::new(vec![(PathBuf::from("/nonexistent/x.png"), Duration::ZERO)]);
        assert!(source.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_close_empties_source() {
        let mut source =
            ImageSequenceSource::new(vec![(PathBuf::from("x.png"), Duration::ZERO)]);
        source.close();
        assert_eq!(source.frames().count(), 0);
    }
}
