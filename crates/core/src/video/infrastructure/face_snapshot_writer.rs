use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;

/// Saves face crops as numbered JPEGs so a person can look at them.
///
/// Crops are scaled so their longer side is `thumbnail_size`, keeping the
/// aspect ratio.
pub struct FaceSnapshotWriter {
    dir: PathBuf,
    thumbnail_size: u32,
    written: usize,
}

impl FaceSnapshotWriter {
    pub fn new(dir: PathBuf, thumbnail_size: u32) -> Self {
        Self {
            dir,
            thumbnail_size: thumbnail_size.max(1),
            written: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&mut self, face: &Frame) -> Result<PathBuf, Box<dyn std::error::Error>> {
        if face.channels() != 3 {
            return Err(format!("expected an RGB crop, got {} channels", face.channels()).into());
        }
        std::fs::create_dir_all(&self.dir)?;

        let img = image::RgbImage::from_raw(face.width(), face.height(), face.data().to_vec())
            .ok_or("crop does not match its dimensions")?;
        let (w, h) = fit_longest_side(face.width(), face.height(), self.thumbnail_size);
        let img = image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle);

        self.written += 1;
        let path = self.dir.join(format!("face-{:04}.jpg", self.written));
        img.save(&path)?;
        Ok(path)
    }
}

fn fit_longest_side(width: u32, height: u32, target: u32) -> (u32, u32) {
    let longest = width.max(height).max(1) as f64;
    let scale = target as f64 / longest;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}
