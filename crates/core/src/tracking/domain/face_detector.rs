use crate::shared::frame::Frame;
use crate::tracking::domain::detection::Detection;

/// Domain interface for face detection.
///
/// Boxes are normalized to the frame. Implementations may keep state
/// between frames, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
