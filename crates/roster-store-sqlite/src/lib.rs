//! Single-slot snapshot persistence.
//!
//! Exactly one roster document lives at a fixed `(collection, document)` address. It is
//! overwritten wholesale on every publish and read once when a session starts.

mod client;
mod sqlite;

use std::path::PathBuf;
use std::time::Duration;

use roster_core::{Record, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::{ReadOutcome, SnapshotClient};
pub use sqlite::SqliteSnapshotStore;

/// Credential value shipped in sample configuration; treated as "not configured".
pub const PLACEHOLDER_ACCESS_KEY: &str = "YOUR_API_KEY";
pub const DEFAULT_COLLECTION: &str = "app_data";
pub const DEFAULT_DOCUMENT: &str = "employee_records";
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 8_000;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum StoreError {
    #[error("snapshot store is not configured")]
    NotConfigured,
    #[error("permission denied by snapshot store: {0}")]
    PermissionDenied(String),
    #[error("snapshot store read timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("snapshot store error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSettings {
    pub database: Option<PathBuf>,
    pub access_key: Option<String>,
    pub collection: String,
    pub document: String,
    /// `None` waits for the store indefinitely.
    pub read_timeout_ms: Option<u64>,
    pub read_only: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: None,
            access_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            document: DEFAULT_DOCUMENT.to_string(),
            read_timeout_ms: Some(DEFAULT_READ_TIMEOUT_MS),
            read_only: false,
        }
    }
}

impl StoreSettings {
    /// True when a database location and a real (non-placeholder) access key are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        let key_ok = self
            .access_key
            .as_deref()
            .map(str::trim)
            .is_some_and(|key| !key.is_empty() && key != PLACEHOLDER_ACCESS_KEY);
        key_ok && self.database.is_some()
    }

    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

/// Wire form of the stored document: `{ "data": [...], "lastUpdated": "..." }`.
///
/// Records are held as plain JSON values so that nothing but serializable data reaches
/// the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotDocument {
    pub data: Vec<Value>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

impl SnapshotDocument {
    /// Deep-copy `records` through a plain-data round trip.
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when a record cannot be represented as JSON.
    pub fn from_records(records: &[Record], last_updated: &str) -> Result<Self, StoreError> {
        let data = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StoreError::Backend(format!("failed to serialize records: {err}")))?;
        Ok(Self { data, last_updated: last_updated.to_string() })
    }
}

/// Blocking backend contract. Implementations do not apply timeouts or fallback policy;
/// [`SnapshotClient`] does.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Whether valid connection credentials are present.
    fn configured(&self) -> bool;

    /// Read the single snapshot document; `Ok(None)` when it has never been written.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be reached or rejects the read.
    fn fetch(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the single snapshot document.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be reached or rejects the write.
    fn write(&self, document: &SnapshotDocument) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::sample_records;

    #[test]
    fn placeholder_or_missing_credentials_are_not_configured() {
        let mut settings = StoreSettings::default();
        assert!(!settings.has_credentials());

        settings.database = Some(PathBuf::from("roster.sqlite3"));
        assert!(!settings.has_credentials());

        settings.access_key = Some(PLACEHOLDER_ACCESS_KEY.to_string());
        assert!(!settings.has_credentials());

        settings.access_key = Some("   ".to_string());
        assert!(!settings.has_credentials());

        settings.access_key = Some("k-123".to_string());
        assert!(settings.has_credentials());
    }

    #[test]
    fn default_read_timeout_is_bounded() {
        assert_eq!(
            StoreSettings::default().read_timeout(),
            Some(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS))
        );
    }

    #[test]
    fn document_uses_wire_member_names() -> anyhow::Result<()> {
        let document = SnapshotDocument::from_records(&sample_records(), "08:00:00 - 1/1/2026")?;
        let value = serde_json::to_value(&document)?;

        assert_eq!(value.get("data").and_then(Value::as_array).map(Vec::len), Some(3));
        assert_eq!(
            value.get("lastUpdated").and_then(Value::as_str),
            Some("08:00:00 - 1/1/2026")
        );
        Ok(())
    }
}
