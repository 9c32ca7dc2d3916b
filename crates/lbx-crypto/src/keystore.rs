//! # Key Store
//!
//! Abstracts key lookup, registration and revocation behind a trait so the
//! signing service can be handed any backend explicitly.
//!
//! - [`InMemoryKeyStore`]: concurrent map for tests, the CLI and embedded
//!   use.
//!
//! ## Security Invariants
//!
//! - Revocation is monotonic. [`KeyStore::upsert_key`] never clears a
//!   revocation, and once [`KeyStore::revoke_key`] returns every later
//!   lookup for that id observes it.
//! - Each operation is atomic per key id. There are no cross-key
//!   transactions.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use lbx_core::Timestamp;

use crate::error::KeyStoreError;
use crate::key::SigningKey;

/// Storage backend for signing keys.
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// concurrent signing and verification call.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up a key by id.
    async fn get_key(&self, key_id: &str) -> Result<Option<SigningKey>, KeyStoreError>;

    /// All keys, ordered by key id.
    async fn list_keys(&self) -> Result<Vec<SigningKey>, KeyStoreError>;

    /// Insert or replace a key. A stored revocation is kept.
    async fn upsert_key(&self, key: SigningKey) -> Result<(), KeyStoreError>;

    /// Revoke a key. Revoking an already revoked key is a no-op.
    async fn revoke_key(&self, key_id: &str) -> Result<(), KeyStoreError>;

    /// Whether the key is known and revoked.
    async fn is_revoked(&self, key_id: &str) -> Result<bool, KeyStoreError> {
        Ok(self
            .get_key(key_id)
            .await?
            .is_some_and(|key| key.revoked))
    }
}

// ─── InMemoryKeyStore ────────────────────────────────────────────────────

/// Key store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: DashMap<String, SigningKey>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn check_id(key_id: &str) -> Result<(), KeyStoreError> {
    if key_id.trim().is_empty() {
        return Err(KeyStoreError::EmptyKeyId);
    }
    Ok(())
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get_key(&self, key_id: &str) -> Result<Option<SigningKey>, KeyStoreError> {
        check_id(key_id)?;
        Ok(self.keys.get(key_id).map(|entry| entry.value().clone()))
    }

    async fn list_keys(&self) -> Result<Vec<SigningKey>, KeyStoreError> {
        let mut keys: Vec<SigningKey> = self.keys.iter().map(|e| e.value().clone()).collect();
        keys.sort_by(|a, b| a.key_id.cmp(&b.key_id));
        Ok(keys)
    }

    async fn upsert_key(&self, mut key: SigningKey) -> Result<(), KeyStoreError> {
        check_id(&key.key_id)?;
        match self.keys.entry(key.key_id.clone()) {
            MapEntry::Occupied(mut existing) => {
                let stored = existing.get();
                if stored.revoked {
                    key.revoked = true;
                    key.revoked_at = key.revoked_at.or(stored.revoked_at);
                }
                existing.insert(key);
            }
            MapEntry::Vacant(slot) => {
                slot.insert(key);
            }
        }
        Ok(())
    }

    async fn revoke_key(&self, key_id: &str) -> Result<(), KeyStoreError> {
        check_id(key_id)?;
        let mut key = self
            .keys
            .get_mut(key_id)
            .ok_or_else(|| KeyStoreError::NotFound(key_id.to_string()))?;
        if !key.revoked {
            key.revoked = true;
            key.revoked_at = Some(Timestamp::now());
            tracing::info!(key_id, "key revoked");
        }
        Ok(())
    }
}
