use crate::recognition::domain::identity::{Embedding, Identity};
use crate::recognition::domain::identity_store::{IdentityStore, StoreError};

/// Volatile identity store for dry runs and tests.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: Vec<Identity>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identities(identities: Vec<Identity>) -> Self {
        Self { identities }
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_all(&self) -> Result<Vec<Identity>, StoreError> {
        Ok(self.identities.clone())
    }

    fn create(
        &mut self,
        name: &str,
        group: &str,
        embedding: Embedding,
    ) -> Result<Identity, StoreError> {
        if embedding.is_empty() {
            return Err(StoreError::EmptyEmbedding);
        }
        if self.identities.iter().any(|i| i.name() == name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        let identity = Identity::new(name, group, embedding);
        self.identities.push(identity.clone());
        Ok(identity)
    }

    fn append_embedding(&mut self, name: &str, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.is_empty() {
            return Err(StoreError::EmptyEmbedding);
        }
        let identity = self
            .identities
            .iter_mut()
            .find(|i| i.name() == name)
            .ok_or_else(|| StoreError::UnknownIdentity(name.to_string()))?;
        identity.push_embedding(embedding.to_vec());
        Ok(())
    }
}
