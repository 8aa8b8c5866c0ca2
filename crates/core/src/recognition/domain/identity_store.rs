use thiserror::Error;

use crate::recognition::domain::identity::{Embedding, Identity};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity '{0}' already exists")]
    DuplicateName(String),
    #[error("identity '{0}' does not exist")]
    UnknownIdentity(String),
    #[error("embedding must not be empty")]
    EmptyEmbedding,
    #[error("stored embedding for '{name}' is corrupt ({len} bytes)")]
    CorruptEmbedding { name: String, len: usize },
    #[error("identity store backend error: {0}")]
    Backend(#[from] rusqlite::Error),
}

/// Durable storage of identities and their embeddings.
///
/// Names are unique keys. An identity is only ever written together with
/// its first embedding, so a stored identity always has at least one.
pub trait IdentityStore: Send {
    /// Every identity, in creation order.
    fn find_all(&self) -> Result<Vec<Identity>, StoreError>;

    fn create(&mut self, name: &str, group: &str, embedding: Embedding)
        -> Result<Identity, StoreError>;

    fn append_embedding(&mut self, name: &str, embedding: &[f32]) -> Result<(), StoreError>;
}
