//! Recorded session description: frame images plus the detector output
//! captured for each of them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::tracking::domain::detection::Detection;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("frame {index} has a negative or non-finite timestamp")]
    Timestamp { index: usize },
    #[error("frame {index} goes back in time")]
    OutOfOrder { index: usize },
}

#[derive(Clone, Debug, Deserialize)]
struct RawManifest {
    frames: Vec<RawFrame>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawFrame {
    image: PathBuf,
    timestamp: f64,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawDetection {
    #[serde(default)]
    confidence: f64,
    x_min: f64,
    y_min: f64,
    width: f64,
    height: f64,
}

/// One recorded frame, with its image path resolved against the manifest.
#[derive(Clone, Debug)]
pub struct ManifestFrame {
    pub image: PathBuf,
    pub timestamp: Duration,
    pub detections: Vec<Detection>,
}

#[derive(Clone, Debug)]
pub struct SessionManifest {
    frames: Vec<ManifestFrame>,
}

impl SessionManifest {
    /// Loads a JSON manifest. Relative image paths are resolved against the
    /// manifest's directory.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&json, base).map_err(|e| match e {
            ManifestError::Parse { source, .. } => ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(json: &str, base_dir: &Path) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_str(json).map_err(|e| ManifestError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;

        let mut frames = Vec::with_capacity(raw.frames.len());
        let mut previous = Duration::ZERO;
        for (index, frame) in raw.frames.into_iter().enumerate() {
            if !frame.timestamp.is_finite() || frame.timestamp < 0.0 {
                return Err(ManifestError::Timestamp { index });
            }
            let timestamp = Duration::try_from_secs_f64(frame.timestamp)
                .map_err(|_| ManifestError::Timestamp { index })?;
            if timestamp < previous {
                return Err(ManifestError::OutOfOrder { index });
            }
            previous = timestamp;

            frames.push(ManifestFrame {
                image: base_dir.join(frame.image),
                timestamp,
                detections: frame
                    .detections
                    .into_iter()
                    .map(|d| Detection {
                        confidence: d.confidence,
                        bbox: BoundingBox::new(d.x_min, d.y_min, d.width, d.height),
                    })
                    .collect(),
            });
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[ManifestFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MANIFEST: &str = r#"{
        "frames": [
            { "image": "f0.png", "timestamp": 0.0,
              "detections": [ { "confidence": 0.9, "x_min": 0.1, "y_min": 0.1, "width": 0.2, "height": 0.2 } ] },
            { "image": "f1.png", "timestamp": 0.1 },
            { "image": "/abs/f2.png", "timestamp": 1.5,
              "detections": [ { "x_min": 0.5, "y_min": 0.5, "width": 0.1, "height": 0.1 } ] }
        ]
    }"#;

    #[test]
    fn test_parse_frames_and_detections() {
        let manifest = SessionManifest::parse(MANIFEST, Path::new("/data/session")).unwrap();
        assert_eq!(manifest.len(), 3);

        let first = &manifest.frames()[0];
        assert_eq!(first.image, PathBuf::from("/data/session/f0.png"));
        assert_eq!(first.timestamp, Duration::ZERO);
        assert_eq!(first.detections.len(), 1);
        assert_relative_eq!(first.detections[0].confidence, 0.9);
        assert_relative_eq!(first.detections[0].bbox.width, 0.2);

        assert!(manifest.frames()[1].detections.is_empty());
        assert_eq!(manifest.frames()[2].image, PathBuf::from("/abs/f2.png"));
        assert_eq!(manifest.frames()[2].timestamp, Duration::from_millis(1500));
        assert_relative_eq!(manifest.frames()[2].detections[0].confidence, 0.0);
    }

    #[test]
    fn test_parse_rejects_negative_timestamp() {
        let json = r#"{ "frames": [ { "image": "a.png", "timestamp": -1.0 } ] }"#;
        let result = SessionManifest::parse(json, Path::new(""));
        assert!(matches!(result, Err(ManifestError::Timestamp { index: 0 })));
    }

    #[test]
    fn test_parse_rejects_timestamp_too_large_for_duration() {
        let json = r#"{ "frames": [ { "image": "a.png", "timestamp": 1e300 } ] }"#;
        let result = SessionManifest::parse(json, Path::new(""));
        assert!(matches!(result, Err(ManifestError::Timestamp { index: 0 })));
    }

    #[test]
    fn test_parse_rejects_out_of_order_frames() {
        let json = r#"{ "frames": [
            { "image": "a.png", "timestamp": 1.0 },
            { "image": "b.png", "timestamp": 0.5 } ] }"#;
        let result = SessionManifest::parse(json, Path::new(""));
        assert!(matches!(result, Err(ManifestError::OutOfOrder { index: 1 })));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let result = SessionManifest::parse("{ \"frames\": 3 }", Path::new(""));
        assert!(matches!(result, Err(ManifestError::Parse { .. })));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        match SessionManifest::load(&path) {
            Err(ManifestError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_load_resolves_relative_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, MANIFEST).unwrap();
        let manifest = SessionManifest::load(&path).unwrap();
        assert_eq!(manifest.frames()[0].image, dir.path().join("f0.png"));
    }
}
