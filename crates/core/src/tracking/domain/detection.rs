use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;

/// One face found by the detector in a single frame.
///
/// `confidence` is carried for diagnostics only; filtering weak detections
/// is the detector's job and the tracker never looks at it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(confidence: f64, bbox: BoundingBox) -> Self {
        Self { confidence, bbox }
    }
}
