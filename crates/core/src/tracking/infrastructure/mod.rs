pub mod iou_tracker;
pub mod manifest_detector;
