use crate::recognition::domain::identity::Embedding;
use crate::shared::frame::Frame;

/// Domain interface for turning a face crop into an embedding.
///
/// `Ok(None)` means the crop holds no usable face; callers treat it as a
/// transient miss, not a failure.
pub trait FaceEmbedder: Send {
    fn embed(&mut self, face: &Frame) -> Result<Option<Embedding>, Box<dyn std::error::Error>>;
}
