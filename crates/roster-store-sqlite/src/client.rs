use std::sync::Arc;
use std::time::Duration;

use roster_core::{Record, Snapshot};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{SnapshotDocument, SnapshotStore, StoreError};

/// Result of the startup read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(Snapshot),
    /// Reachable store, but the document has never been written.
    Absent,
    NotConfigured,
    /// Connectivity or backend failure other than permission and timeout.
    Unavailable { reason: String },
}

/// Async front for a [`SnapshotStore`]: runs blocking backend calls off the runtime and
/// bounds reads by the configured timeout.
#[derive(Debug)]
pub struct SnapshotClient<S> {
    store: Arc<S>,
    read_timeout: Option<Duration>,
}

impl<S> Clone for SnapshotClient<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), read_timeout: self.read_timeout }
    }
}

impl<S: SnapshotStore> SnapshotClient<S> {
    pub fn new(store: S, read_timeout: Option<Duration>) -> Self {
        Self { store: Arc::new(store), read_timeout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn configured(&self) -> bool {
        self.store.configured()
    }

    /// Read the snapshot document once.
    ///
    /// A read still in flight when the timeout fires is abandoned; its late result is
    /// discarded.
    ///
    /// # Errors
    /// [`StoreError::PermissionDenied`] and [`StoreError::Timeout`] are surfaced as errors
    /// so callers can report them distinctly. Every other failure becomes
    /// [`ReadOutcome::Unavailable`].
    pub async fn read(&self) -> Result<ReadOutcome, StoreError> {
        if !self.store.configured() {
            return Ok(ReadOutcome::NotConfigured);
        }

        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || store.fetch());
        let joined = match self.read_timeout {
            Some(limit) => match timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_ms = %limit.as_millis(), "snapshot read timed out");
                    return Err(StoreError::Timeout(limit));
                }
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(Some(snapshot))) => {
                debug!(records = snapshot.records.len(), "snapshot read");
                Ok(ReadOutcome::Found(snapshot))
            }
            Ok(Ok(None)) => Ok(ReadOutcome::Absent),
            Ok(Err(StoreError::NotConfigured)) => Ok(ReadOutcome::NotConfigured),
            Ok(Err(err @ (StoreError::PermissionDenied(_) | StoreError::Timeout(_)))) => Err(err),
            Ok(Err(StoreError::Backend(reason))) => {
                warn!(%reason, "snapshot store unavailable");
                Ok(ReadOutcome::Unavailable { reason })
            }
            Err(err) => {
                warn!(error = %err, "snapshot read task failed");
                Ok(ReadOutcome::Unavailable { reason: err.to_string() })
            }
        }
    }

    /// Replace the stored document with `records` and `last_updated`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotConfigured`] without contacting the backend when the store
    /// has no credentials, otherwise whatever the backend reports.
    pub async fn write(&self, records: &[Record], last_updated: &str) -> Result<(), StoreError> {
        if !self.store.configured() {
            return Err(StoreError::NotConfigured);
        }

        let document = SnapshotDocument::from_records(records, last_updated)?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.write(&document))
            .await
            .map_err(|err| StoreError::Backend(format!("snapshot write task failed: {err}")))?
    }
}
