/// SQLite-backed identity store.
///
/// Two tables: `identities` (unique name + group) and `embeddings`, one row
/// per enrollment photo. Vectors are stored as raw native-endian `f32` bytes.
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::recognition::domain::identity::{Embedding, Identity};
use crate::recognition::domain::identity_store::{IdentityStore, StoreError};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS identities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        grp TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS embeddings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        identity_id INTEGER NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
        vector BLOB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_embeddings_identity ON embeddings(identity_id);
";

pub struct SqliteIdentityStore {
    conn: Connection,
}

impl SqliteIdentityStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn identity_id(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM identities WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn find_all(&self) -> Result<Vec<Identity>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT i.name, i.grp, e.vector
             FROM identities i JOIN embeddings e ON e.identity_id = i.id
             ORDER BY i.id, e.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut identities: Vec<Identity> = Vec::new();
        for row in rows {
            let (name, group, blob) = row?;
            let embedding = decode(&name, &blob)?;
            match identities.last_mut() {
                Some(last) if last.name() == name => last.push_embedding(embedding),
                _ => identities.push(Identity::new(name, group, embedding)),
            }
        }
        Ok(identities)
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
        if self.identity_id(name)?.is_some() {
            return Err(StoreError::DuplicateName(name.to_string()));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO identities (name, grp) VALUES (?1, ?2)",
            params![name, group],
        )?;
        let identity_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO embeddings (identity_id, vector) VALUES (?1, ?2)",
            params![identity_id, encode(&embedding)],
        )?;
        tx.commit()?;

        Ok(Identity::new(name, group, embedding))
    }

    fn append_embedding(&mut self, name: &str, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.is_empty() {
            return Err(StoreError::EmptyEmbedding);
        }
        let identity_id = self
            .identity_id(name)?
            .ok_or_else(|| StoreError::UnknownIdentity(name.to_string()))?;
        self.conn.execute(
            "INSERT INTO embeddings (identity_id, vector) VALUES (?1, ?2)",
            params![identity_id, encode(embedding)],
        )?;
        Ok(())
    }
}

fn encode(embedding: &[f32]) -> &[u8] {
    bytemuck::cast_slice(embedding)
}

fn decode(name: &str, blob: &[u8]) -> Result<Embedding, StoreError> {
    if blob.is_empty() || blob.len() % std::mem::size_of::<f32>() != 0 {
        return Err(StoreError::CorruptEmbedding {
            name: name.to_string(),
            len: blob.len(),
        });
    }
    Ok(bytemuck::pod_collect_to_vec(blob))
}
