use std::collections::HashSet;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, RecvError, Sender, TryRecvError, TrySendError};

use crate::pipeline::embedding_backend::{
    EmbeddingBackend, EmbeddingError, EmbeddingRequest, EmbeddingResult,
};
use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::shared::frame::Frame;
use crate::tracking::domain::track::TrackId;

const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Runs the embedder on a dedicated worker thread.
///
/// Layout: `frame loop → [requests] → worker → [results] → frame loop`
///
/// The request queue is bounded; when it is full `submit` refuses instead of
/// blocking the frame loop, and the caller retries on a later cycle.
///
/// If the worker dies, every request still in flight comes back as an
/// [`EmbeddingError::Disconnected`] result so its track can be retried.
pub struct ThreadedEmbeddingBackend {
    request_tx: Option<Sender<EmbeddingRequest>>,
    result_rx: Receiver<EmbeddingResult>,
    worker: Option<JoinHandle<()>>,
    in_flight: HashSet<TrackId>,
}

impl ThreadedEmbeddingBackend {
    pub fn new(embedder: Box<dyn FaceEmbedder>) -> Self {
        Self::with_capacity(embedder, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(embedder: Box<dyn FaceEmbedder>, capacity: usize) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::bounded(capacity.max(1));
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let worker = spawn_worker(embedder, request_rx, result_tx);
        Self {
            request_tx: Some(request_tx),
            result_rx,
            worker: Some(worker),
            in_flight: HashSet::new(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.in_flight.len()
    }

    fn received(&mut self, result: EmbeddingResult) -> EmbeddingResult {
        self.in_flight.remove(&result.track_id);
        result
    }

    /// Failed results for everything the dead worker never answered.
    fn lost(&mut self) -> Vec<EmbeddingResult> {
        if !self.in_flight.is_empty() {
            log::warn!(
                "Embedding worker exited with {} requests outstanding",
                self.in_flight.len()
            );
        }
        self.in_flight
            .drain()
            .map(|track_id| EmbeddingResult {
                track_id,
                face: Frame::new(Vec::new(), 0, 0, 3, 0),
                outcome: Err(EmbeddingError::Disconnected),
            })
            .collect()
    }
}

impl EmbeddingBackend for ThreadedEmbeddingBackend {
    fn submit(&mut self, request: EmbeddingRequest) -> Result<(), EmbeddingError> {
        let tx = self.request_tx.as_ref().ok_or(EmbeddingError::Disconnected)?;
        let track_id = request.track_id;
        match tx.try_send(request) {
            Ok(()) => {
                self.in_flight.insert(track_id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(EmbeddingError::Busy),
            Err(TrySendError::Disconnected(_)) => Err(EmbeddingError::Disconnected),
        }
    }

    fn poll(&mut self) -> Vec<EmbeddingResult> {
        let mut results = Vec::new();
        loop {
            match self.result_rx.try_recv() {
                Ok(result) => results.push(self.received(result)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    results.extend(self.lost());
                    break;
                }
            }
        }
        results
    }

    fn drain(&mut self) -> Vec<EmbeddingResult> {
        let mut results = Vec::with_capacity(self.in_flight.len());
        while !self.in_flight.is_empty() {
            match self.result_rx.recv() {
                Ok(result) => results.push(self.received(result)),
                Err(RecvError) => results.extend(self.lost()),
            }
        }
        results
    }
}

impl Drop for ThreadedEmbeddingBackend {
    fn drop(&mut self) {
        drop(self.request_tx.take());
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Embedding worker panicked");
            }
        }
    }
}

fn spawn_worker(
    mut embedder: Box<dyn FaceEmbedder>,
    request_rx: Receiver<EmbeddingRequest>,
    result_tx: Sender<EmbeddingResult>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for request in request_rx {
            let outcome = embedder
                .embed(&request.face)
                .map_err(|e| EmbeddingError::Embedder(e.to_string()));
            let result = EmbeddingResult {
                track_id: request.track_id,
                face: request.face,
                outcome,
            };
            if result_tx.send(result).is_err() {
                break;
            }
        }
    })
}
