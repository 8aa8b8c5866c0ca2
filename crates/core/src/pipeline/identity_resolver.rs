use std::collections::HashSet;

use crate::attendance::attendance_session::AttendanceSession;
use crate::pipeline::embedding_backend::{EmbeddingBackend, EmbeddingRequest, EmbeddingResult};
use crate::recognition::domain::decision_surface::{Decision, DecisionSurface};
use crate::recognition::domain::identity::{Embedding, Identity, KnownIdentities};
use crate::recognition::domain::identity_store::{IdentityStore, StoreError};
use crate::shared::constants::{DEFAULT_MIN_FACE_SIZE, MATCH_SIMILARITY_THRESHOLD};
use crate::shared::frame::Frame;
use crate::tracking::domain::track::TrackId;
use crate::tracking::infrastructure::iou_tracker::IouTracker;

/// How a track got its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionKind {
    /// The embedding matched a known identity.
    Matched,
    /// A new identity was created from the face.
    Enrolled,
    /// The face was added as another sample of an existing identity.
    Attached,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub track_id: TrackId,
    pub name: String,
    pub group: String,
    pub kind: ResolutionKind,
}

/// Attaches names to tracks.
///
/// Work is split in two phases so the embedder can run off the frame loop:
/// [`dispatch`](Self::dispatch) submits crops of unresolved tracks, and
/// [`collect`](Self::collect) applies whatever embeddings have finished.
/// Results are joined back to tracks by id, so a result for a track that
/// was evicted or resolved in the meantime is dropped.
///
/// A track has at most one request in flight, and the decision surface is
/// consulted at most once per request.
pub struct IdentityResolver {
    known: KnownIdentities,
    store: Box<dyn IdentityStore>,
    backend: Box<dyn EmbeddingBackend>,
    surface: Box<dyn DecisionSurface>,
    pending: HashSet<TrackId>,
    min_face_size: u32,
    threshold: f64,
}

impl IdentityResolver {
    /// Loads the known identities from `store`.
    pub fn new(
        store: Box<dyn IdentityStore>,
        backend: Box<dyn EmbeddingBackend>,
        surface: Box<dyn DecisionSurface>,
    ) -> Result<Self, StoreError> {
        let known = KnownIdentities::new(store.find_all()?);
        log::info!("Loaded {} known identities", known.len());
        Ok(Self {
            known,
            store,
            backend,
            surface,
            pending: HashSet::new(),
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            threshold: MATCH_SIMILARITY_THRESHOLD,
        })
    }

    /// Crops with either side below `size` pixels are not embedded.
    pub fn with_min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }

    pub fn known_identities(&self) -> &KnownIdentities {
        &self.known
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: TrackId) -> bool {
        self.pending.contains(&id)
    }

    /// Submits a crop for every unresolved track that has no request in
    /// flight. Returns how many were submitted.
    pub fn dispatch(&mut self, tracker: &IouTracker, frame: &Frame) -> usize {
        let mut submitted = 0;
        for track in tracker.tracks() {
            if track.is_resolved() || self.pending.contains(&track.id()) {
                continue;
            }
            let Some(rect) = track.rect() else {
                continue;
            };
            if rect.width < self.min_face_size || rect.height < self.min_face_size {
                log::debug!(
                    "Track {} too small to embed ({}x{})",
                    track.id(),
                    rect.width,
                    rect.height
                );
                continue;
            }
            let Some(face) = frame.crop(&rect) else {
                continue;
            };
            let request = EmbeddingRequest {
                track_id: track.id(),
                face,
            };
            match self.backend.submit(request) {
                Ok(()) => {
                    self.pending.insert(track.id());
                    submitted += 1;
                }
                Err(e) => log::debug!("Embedding request for track {} not accepted: {e}", track.id()),
            }
        }
        submitted
    }

    /// Applies finished embeddings without waiting for the rest.
    pub fn collect(
        &mut self,
        tracker: &mut IouTracker,
        session: &mut AttendanceSession,
    ) -> Vec<Resolution> {
        let results = self.backend.poll();
        self.apply_all(results, tracker, session)
    }

    /// Waits for every request in flight and applies the results.
    pub fn finish(
        &mut self,
        tracker: &mut IouTracker,
        session: &mut AttendanceSession,
    ) -> Vec<Resolution> {
        let results = self.backend.drain();
        let resolutions = self.apply_all(results, tracker, session);
        self.pending.clear();
        resolutions
    }

    fn apply_all(
        &mut self,
        results: Vec<EmbeddingResult>,
        tracker: &mut IouTracker,
        session: &mut AttendanceSession,
    ) -> Vec<Resolution> {
        results
            .into_iter()
            .filter_map(|result| self.apply(result, tracker, session))
            .collect()
    }

    fn apply(
        &mut self,
        result: EmbeddingResult,
        tracker: &mut IouTracker,
        session: &mut AttendanceSession,
    ) -> Option<Resolution> {
        let track_id = result.track_id;
        self.pending.remove(&track_id);

        match tracker.get(track_id) {
            None => {
                log::debug!("Discarding embedding for evicted track {track_id}");
                return None;
            }
            Some(track) if track.is_resolved() => {
                log::debug!("Discarding embedding for resolved track {track_id}");
                return None;
            }
            Some(_) => {}
        }

        let embedding = match result.outcome {
            Ok(Some(embedding)) => embedding,
            Ok(None) => {
                log::debug!("No embedding for track {track_id}");
                return None;
            }
            Err(e) => {
                log::warn!("Embedding failed for track {track_id}: {e}");
                return None;
            }
        };

        let (name, group, kind) = match self.known.find_match(&embedding, self.threshold) {
            Some(identity) => (
                identity.name().to_string(),
                identity.group().to_string(),
                ResolutionKind::Matched,
            ),
            None => self.ask(track_id, &result.face, embedding)?,
        };

        if !tracker.assign_identity(track_id, &name) {
            return None;
        }
        session.record(&name, &group);
        log::info!("Track {track_id} resolved as {name} ({kind:?})");
        Some(Resolution {
            track_id,
            name,
            group,
            kind,
        })
    }

    fn ask(
        &mut self,
        track_id: TrackId,
        face: &Frame,
        embedding: Embedding,
    ) -> Option<(String, String, ResolutionKind)> {
        let decision = match self.surface.decide(face, &self.known) {
            Ok(decision) => decision,
            Err(e) => {
                log::warn!("Decision surface failed for track {track_id}: {e}");
                return None;
            }
        };

        match decision {
            Decision::Enroll { name, group } => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    log::warn!("Ignoring enrollment with an empty name for track {track_id}");
                    return None;
                }
                if self.known.get(&name).is_some() {
                    return self.attach(name, embedding);
                }
                self.enroll(name, group.trim().to_string(), embedding)
            }
            Decision::AttachTo(name) => self.attach(name, embedding),
            Decision::Decline => {
                log::debug!("Track {track_id} left unresolved");
                None
            }
        }
    }

    fn enroll(
        &mut self,
        name: String,
        group: String,
        embedding: Embedding,
    ) -> Option<(String, String, ResolutionKind)> {
        let identity: Identity = match self.store.create(&name, &group, embedding) {
            Ok(identity) => identity,
            Err(e) => {
                log::warn!("Could not enroll {name}: {e}");
                return None;
            }
        };
        log::info!("Enrolled {name} ({group})");
        self.known.insert(identity);
        Some((name, group, ResolutionKind::Enrolled))
    }

    fn attach(
        &mut self,
        name: String,
        embedding: Embedding,
    ) -> Option<(String, String, ResolutionKind)> {
        let Some(group) = self.known.get(&name).map(|i| i.group().to_string()) else {
            log::warn!("Cannot attach to unknown identity {name}");
            return None;
        };
        if let Err(e) = self.store.append_embedding(&name, &embedding) {
            log::warn!("Could not add embedding to {name}: {e}");
            return None;
        }
        self.known.append(&name, embedding);
        Some((name, group, ResolutionKind::Attached))
    }
}
