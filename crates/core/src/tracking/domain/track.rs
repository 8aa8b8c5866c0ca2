use std::time::Instant;

use serde::Serialize;

use crate::shared::bounding_box::{BoundingBox, FrameSize, PixelRect};

pub type TrackId = u64;

/// A face followed across frames, optionally bound to a known identity.
#[derive(Clone, Debug)]
pub struct Track {
    id: TrackId,
    bbox: BoundingBox,
    rect: Option<PixelRect>,
    identity: Option<String>,
    last_seen: Instant,
}

impl Track {
    pub(crate) fn new(id: TrackId, bbox: BoundingBox, frame_size: FrameSize, now: Instant) -> Self {
        Self {
            id,
            bbox,
            rect: bbox.to_pixels(frame_size),
            identity: None,
            last_seen: now,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Pixel rectangle for the frame size at the last update; `None` when
    /// the box fell entirely outside that frame.
    pub fn rect(&self) -> Option<PixelRect> {
        self.rect
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Overlay text: the identity once known, the track id before that.
    pub fn label(&self) -> String {
        match &self.identity {
            Some(name) => format!("Name: {name}"),
            None => format!("ID: {}", self.id),
        }
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            id: self.id,
            label: self.label(),
            identity: self.identity.clone(),
            bbox: self.bbox,
            rect: self.rect,
        }
    }

    pub(crate) fn observe(&mut self, bbox: BoundingBox, frame_size: FrameSize, now: Instant) {
        self.bbox = bbox;
        self.rect = bbox.to_pixels(frame_size);
        self.last_seen = now;
    }

    /// Binds the identity if none is set yet. Returns whether it was bound.
    pub(crate) fn resolve(&mut self, name: &str) -> bool {
        if self.identity.is_some() {
            return false;
        }
        self.identity = Some(name.to_string());
        true
    }
}

/// Read-only copy of a track's state for renderers and reports.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub label: String,
    pub identity: Option<String>,
    pub bbox: BoundingBox,
    pub rect: Option<PixelRect>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track::new(
            3,
            BoundingBox::new(0.1, 0.1, 0.2, 0.2),
            FrameSize::new(100, 100),
            Instant::now(),
        )
    }

    #[test]
    fn test_new_track_is_unresolved() {
        let t = track();
        assert_eq!(t.id(), 3);
        assert!(!t.is_resolved());
        assert_eq!(t.identity(), None);
        assert_eq!(
            t.rect(),
            Some(PixelRect {
                x: 10,
                y: 10,
                width: 20,
                height: 20
            })
        );
    }

    #[test]
    fn test_label_switches_to_name_once_resolved() {
        let mut t = track();
        assert_eq!(t.label(), "ID: 3");
        assert!(t.resolve("Alice"));
        assert_eq!(t.label(), "Name: Alice");
    }

    #[test]
    fn test_resolve_is_one_shot() {
        let mut t = track();
        assert!(t.resolve("Alice"));
        assert!(!t.resolve("Bob"));
        assert_eq!(t.identity(), Some("Alice"));
    }

    #[test]
    fn test_observe_refreshes_geometry_and_time() {
        let mut t = track();
        let later = t.last_seen() + std::time::Duration::from_millis(100);
        t.observe(BoundingBox::new(0.5, 0.5, 0.1, 0.1), FrameSize::new(200, 100), later);
        assert_eq!(t.last_seen(), later);
        assert_eq!(t.rect().map(|r| (r.x, r.y)), Some((100, 50)));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut t = track();
        t.resolve("Alice");
        let json = serde_json::to_value(t.snapshot()).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["identity"], "Alice");
        assert_eq!(json["label"], "Name: Alice");
        assert_eq!(json["rect"]["width"], 20);
    }
}
