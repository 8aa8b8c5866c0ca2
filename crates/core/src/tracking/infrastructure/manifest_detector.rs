use std::collections::HashMap;

use crate::shared::frame::Frame;
use crate::shared::session_manifest::SessionManifest;
use crate::tracking::domain::detection::Detection;
use crate::tracking::domain::face_detector::FaceDetector;

/// Replays detector output recorded in a session manifest.
///
/// Frames are looked up by index; frames the manifest has no entry for
/// yield no detections.
pub struct ManifestDetector {
    detections: HashMap<usize, Vec<Detection>>,
}

impl ManifestDetector {
    pub fn new(manifest: &SessionManifest) -> Self {
        let detections = manifest
            .frames()
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.detections.clone()))
            .collect();
        Self { detections }
    }
}

impl FaceDetector for ManifestDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self
            .detections
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_replays_detections_by_frame_index() {
        let json = r#"{ "frames": [
            { "image": "a.png", "timestamp": 0.0,
              "detections": [ { "x_min": 0.1, "y_min": 0.1, "width": 0.2, "height": 0.2 } ] },
            { "image": "b.png", "timestamp": 0.1 } ] }"#;
        let manifest = SessionManifest::parse(json, Path::new("")).unwrap();
        let mut detector = ManifestDetector::new(&manifest);

        let frame0 = Frame::new(vec![0; 3], 1, 1, 3, 0);
        let frame1 = Frame::new(vec![0; 3], 1, 1, 3, 1);
        let frame9 = Frame::new(vec![0; 3], 1, 1, 3, 9);

        assert_eq!(detector.detect(&frame0).unwrap().len(), 1);
        assert!(detector.detect(&frame1).unwrap().is_empty());
        assert!(detector.detect(&frame9).unwrap().is_empty());
    }
}
