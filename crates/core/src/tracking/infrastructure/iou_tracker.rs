/// Greedy IoU multi-face tracker.
///
/// Existing tracks are visited in id order; each claims the still-unclaimed
/// detection it overlaps most, provided the overlap strictly exceeds the
/// threshold. Leftover detections start new tracks, and tracks unseen for
/// longer than the timeout are dropped. Lower ids win contested detections.
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::shared::bounding_box::{BoundingBox, FrameSize};
use crate::shared::constants::{DEFAULT_IOU_THRESHOLD, DEFAULT_TRACK_TIMEOUT_SECS};
use crate::tracking::domain::detection::Detection;
use crate::tracking::domain::track::{Track, TrackId, TrackSnapshot};

pub struct IouTracker {
    tracks: BTreeMap<TrackId, Track>,
    next_id: TrackId,
    iou_threshold: f64,
    track_timeout: Duration,
}

impl IouTracker {
    pub fn new(iou_threshold: f64, track_timeout: Duration) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 0,
            iou_threshold,
            track_timeout,
        }
    }

    /// Folds one frame of detections into the track set.
    ///
    /// Must be called for every processed frame, including frames without
    /// detections, so stale tracks get evicted.
    pub fn update(&mut self, detections: &[Detection], frame_size: FrameSize, now: Instant) {
        let mut consumed = vec![false; detections.len()];

        self.match_existing(detections, &mut consumed, frame_size, now);
        let created = self.create_new_tracks(detections, &consumed, frame_size, now);
        let evicted = self.evict_stale(now);

        if created > 0 || evicted > 0 {
            log::debug!(
                "Tracker: {created} new, {evicted} evicted, {} live",
                self.tracks.len()
            );
        }
    }

    fn match_existing(
        &mut self,
        detections: &[Detection],
        consumed: &mut [bool],
        frame_size: FrameSize,
        now: Instant,
    ) {
        for track in self.tracks.values_mut() {
            if !track.bbox().is_usable() {
                continue;
            }
            if let Some(di) = best_match(track.bbox(), detections, consumed, self.iou_threshold) {
                consumed[di] = true;
                track.observe(detections[di].bbox, frame_size, now);
            }
        }
    }

    fn create_new_tracks(
        &mut self,
        detections: &[Detection],
        consumed: &[bool],
        frame_size: FrameSize,
        now: Instant,
    ) -> usize {
        let mut created = 0;
        for (det, _) in detections.iter().zip(consumed).filter(|(_, used)| !**used) {
            let id = self.next_id;
            self.next_id += 1;
            self.tracks.insert(id, Track::new(id, det.bbox, frame_size, now));
            created += 1;
        }
        created
    }

    fn evict_stale(&mut self, now: Instant) -> usize {
        let before = self.tracks.len();
        let timeout = self.track_timeout;
        self.tracks
            .retain(|_, t| now.saturating_duration_since(t.last_seen()) <= timeout);
        before - self.tracks.len()
    }

    /// Binds `name` to a live, still-unresolved track.
    ///
    /// Returns `false` when the track is gone or already has an identity.
    pub fn assign_identity(&mut self, id: TrackId, name: &str) -> bool {
        self.tracks.get_mut(&id).is_some_and(|t| t.resolve(name))
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Live tracks in id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks.values().map(Track::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(
            DEFAULT_IOU_THRESHOLD,
            Duration::from_secs_f64(DEFAULT_TRACK_TIMEOUT_SECS),
        )
    }
}

/// Index of the unclaimed detection overlapping `bbox` most, if any beats
/// `threshold`. Ties keep the earlier detection.
fn best_match(
    bbox: &BoundingBox,
    detections: &[Detection],
    consumed: &[bool],
    threshold: f64,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_iou = threshold;
    for (i, det) in detections.iter().enumerate() {
        if consumed[i] || !det.bbox.is_usable() {
            continue;
        }
        let iou = bbox.iou(&det.bbox);
        if iou > best_iou {
            best_iou = iou;
            best = Some(i);
        }
    }
    best
}
