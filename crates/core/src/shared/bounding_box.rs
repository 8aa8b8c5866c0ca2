//! Normalized face boxes and their pixel-space projection.
//!
//! Detectors report boxes relative to the frame (`[0, 1]` on both axes);
//! cropping and overlays need absolute pixel rectangles for a concrete
//! frame size.

use serde::{Deserialize, Serialize};

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned box in normalized frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub width: f64,
    pub height: f64,
}

/// Absolute pixel rectangle, always inside the frame it was computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, width: f64, height: f64) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }

    /// Corner form `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f64; 4] {
        [
            self.x_min,
            self.y_min,
            self.x_min + self.width,
            self.y_min + self.height,
        ]
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the box can take part in overlap scoring.
    pub fn is_usable(&self) -> bool {
        self.corners().iter().all(|c| c.is_finite()) && self.width > 0.0 && self.height > 0.0
    }

    /// Intersection-over-Union with `other`, in `[0, 1]`.
    ///
    /// Returns 0 when the union has no area (degenerate boxes).
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let a = self.corners();
        let b = other.corners();

        let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
        let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
        let inter = inter_w * inter_h;

        let union = self.area() + other.area() - inter;
        if union <= 0.0 || !union.is_finite() {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }

    /// Projects onto a frame, truncating to whole pixels and clamping to the
    /// frame bounds. `None` when nothing of the box is left on the frame.
    pub fn to_pixels(&self, size: FrameSize) -> Option<PixelRect> {
        if !self.is_usable() {
            return None;
        }
        let fw = size.width as f64;
        let fh = size.height as f64;

        let x1 = (self.x_min * fw).trunc();
        let y1 = (self.y_min * fh).trunc();
        let x2 = x1 + (self.width * fw).trunc();
        let y2 = y1 + (self.height * fh).trunc();

        let x1 = x1.clamp(0.0, fw);
        let y1 = y1.clamp(0.0, fh);
        let x2 = x2.clamp(0.0, fw);
        let y2 = y2.clamp(0.0, fh);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(PixelRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bbox(x: f64, y: f64, w: f64, h: f64) -> BoundingBox {
        BoundingBox::new(x, y, w, h)
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical_boxes() {
        let a = bbox(0.1, 0.1, 0.2, 0.2);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = bbox(0.0, 0.0, 0.1, 0.1);
        let b = bbox(0.5, 0.5, 0.1, 0.1);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = bbox(0.0, 0.0, 0.5, 0.5);
        let b = bbox(0.5, 0.0, 0.5, 0.5);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 0.19 * 0.19, union 0.04 + 0.04 - 0.0361
        let a = bbox(0.1, 0.1, 0.2, 0.2);
        let b = bbox(0.11, 0.11, 0.2, 0.2);
        assert_relative_eq!(a.iou(&b), 0.0361 / 0.0439, epsilon = 1e-9);
        assert!(a.iou(&b) > 0.8);
    }

    #[test]
    fn test_iou_contained() {
        let a = bbox(0.0, 0.0, 0.4, 0.4);
        let b = bbox(0.1, 0.1, 0.2, 0.2);
        assert_relative_eq!(a.iou(&b), 0.04 / 0.16, epsilon = 1e-9);
    }

    #[rstest]
    #[case(bbox(0.0, 0.0, 0.3, 0.3), bbox(0.1, 0.2, 0.3, 0.1))]
    #[case(bbox(0.2, 0.2, 0.1, 0.4), bbox(0.25, 0.0, 0.5, 0.5))]
    #[case(bbox(0.0, 0.0, 0.0, 0.3), bbox(0.0, 0.0, 0.3, 0.3))]
    fn test_iou_is_symmetric(#[case] a: BoundingBox, #[case] b: BoundingBox) {
        assert_relative_eq!(a.iou(&b), b.iou(&a));
    }

    #[rstest]
    #[case::zero_width(bbox(0.1, 0.1, 0.0, 0.2))]
    #[case::zero_height(bbox(0.1, 0.1, 0.2, 0.0))]
    #[case::point(bbox(0.1, 0.1, 0.0, 0.0))]
    fn test_iou_degenerate_with_itself_is_zero(#[case] a: BoundingBox) {
        assert_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_iou_non_finite_is_zero() {
        let a = bbox(f64::NAN, 0.1, 0.2, 0.2);
        let b = bbox(0.1, 0.1, 0.2, 0.2);
        assert_eq!(a.iou(&b), 0.0);
    }

    // ── Pixel projection ─────────────────────────────────────────────

    #[test]
    fn test_to_pixels_truncates() {
        let rect = bbox(0.1, 0.2, 0.25, 0.5)
            .to_pixels(FrameSize::new(100, 50))
            .unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 10,
                y: 10,
                width: 25,
                height: 25
            }
        );
    }

    #[test]
    fn test_to_pixels_clamps_to_frame() {
        let rect = bbox(-0.1, 0.9, 0.3, 0.3)
            .to_pixels(FrameSize::new(100, 100))
            .unwrap();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.right(), 20);
        assert_eq!(rect.y, 90);
        assert_eq!(rect.bottom(), 100);
    }

    #[test]
    fn test_to_pixels_outside_frame_is_none() {
        assert!(bbox(1.2, 0.1, 0.1, 0.1)
            .to_pixels(FrameSize::new(100, 100))
            .is_none());
    }

    #[test]
    fn test_to_pixels_sub_pixel_box_is_none() {
        assert!(bbox(0.5, 0.5, 0.001, 0.001)
            .to_pixels(FrameSize::new(100, 100))
            .is_none());
    }

    #[test]
    fn test_is_usable() {
        assert!(bbox(0.1, 0.1, 0.1, 0.1).is_usable());
        assert!(!bbox(0.1, 0.1, 0.0, 0.1).is_usable());
        assert!(!bbox(0.1, f64::INFINITY, 0.1, 0.1).is_usable());
    }
}
