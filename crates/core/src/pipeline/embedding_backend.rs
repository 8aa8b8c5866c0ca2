use thiserror::Error;

use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::recognition::domain::identity::Embedding;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::TrackId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedder failed: {0}")]
    Embedder(String),
    #[error("embedding queue is full")]
    Busy,
    #[error("embedding worker is gone")]
    Disconnected,
}

/// A face crop waiting for an embedding, keyed by the track it came from.
#[derive(Clone, Debug)]
pub struct EmbeddingRequest {
    pub track_id: TrackId,
    pub face: Frame,
}

#[derive(Clone, Debug)]
pub struct EmbeddingResult {
    pub track_id: TrackId,
    pub face: Frame,
    pub outcome: Result<Option<Embedding>, EmbeddingError>,
}

/// Where embedding work runs.
///
/// Results come back keyed by track id; they may arrive frames after the
/// request, by which time the track may have been evicted.
pub trait EmbeddingBackend: Send {
    /// Queues a request. On error the request was not accepted.
    fn submit(&mut self, request: EmbeddingRequest) -> Result<(), EmbeddingError>;

    /// Results finished since the last call, without blocking.
    fn poll(&mut self) -> Vec<EmbeddingResult>;

    /// Blocks until every accepted request has a result.
    fn drain(&mut self) -> Vec<EmbeddingResult>;
}

/// Runs the embedder on the caller's thread during `submit`.
pub struct InlineEmbeddingBackend {
    embedder: Box<dyn FaceEmbedder>,
    ready: Vec<EmbeddingResult>,
}

impl InlineEmbeddingBackend {
    pub fn new(embedder: Box<dyn FaceEmbedder>) -> Self {
        Self {
            embedder,
            ready: Vec::new(),
        }
    }
}

impl EmbeddingBackend for InlineEmbeddingBackend {
    fn submit(&mut self, request: EmbeddingRequest) -> Result<(), EmbeddingError> {
        let outcome = self
            .embedder
            .embed(&request.face)
            .map_err(|e| EmbeddingError::Embedder(e.to_string()));
        self.ready.push(EmbeddingResult {
            track_id: request.track_id,
            face: request.face,
            outcome,
        });
        Ok(())
    }

    fn poll(&mut self) -> Vec<EmbeddingResult> {
        std::mem::take(&mut self.ready)
    }

    fn drain(&mut self) -> Vec<EmbeddingResult> {
        self.poll()
    }
}
