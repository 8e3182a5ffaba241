//! The durable archive: sessions that outlived their cache TTL.
//!
//! Records are keyed by handle and carry no expiry. Writes are upserts,
//! so archiving the same handle twice leaves exactly one record, and
//! nothing in Playgate ever deletes from the archive.

use std::collections::HashMap;
use std::future::Future;

use playgate_protocol::PlayerHandle;
use tokio::sync::Mutex;

use crate::{SessionError, SessionRecord};

/// A keyed, non-expiring store of [`SessionRecord`]s.
pub trait Archive: Send + Sync + 'static {
    /// Inserts `record`, or replaces the identity of an existing record
    /// with the same handle.
    fn upsert(
        &self,
        record: &SessionRecord,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Looks up a single record.
    fn get(
        &self,
        handle: &PlayerHandle,
    ) -> impl Future<Output = Result<Option<SessionRecord>, SessionError>> + Send;

    /// Returns every record. Used once per process by the startup sync.
    fn scan_all(&self) -> impl Future<Output = Result<Vec<SessionRecord>, SessionError>> + Send;

    /// Number of archived records.
    fn len(&self) -> impl Future<Output = Result<usize, SessionError>> + Send;
}

/// In-process [`Archive`], for tests and single-node development.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    records: Mutex<HashMap<PlayerHandle, String>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Archive for MemoryArchive {
    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.records
            .lock()
            .await
            .insert(record.handle.clone(), record.external_identity.clone());
        Ok(())
    }

    async fn get(&self, handle: &PlayerHandle) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self
            .records
            .lock()
            .await
            .get(handle)
            .map(|identity| SessionRecord::new(handle.clone(), identity.clone())))
    }

    async fn scan_all(&self) -> Result<Vec<SessionRecord>, SessionError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .map(|(handle, identity)| SessionRecord::new(handle.clone(), identity.clone()))
            .collect())
    }

    async fn len(&self) -> Result<usize, SessionError> {
        Ok(self.records.lock().await.len())
    }
}
