use std::path::Path;

use roster_core::Snapshot;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::{SnapshotDocument, SnapshotStore, StoreError, StoreSettings};

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
  collection TEXT NOT NULL,
  document_id TEXT NOT NULL,
  body_json TEXT NOT NULL,
  body_sha256 TEXT NOT NULL,
  written_at TEXT NOT NULL,
  PRIMARY KEY (collection, document_id)
);
";

const UPSERT_DOCUMENT_SQL: &str = r"
INSERT INTO documents(collection, document_id, body_json, body_sha256, written_at)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(collection, document_id) DO UPDATE SET
  body_json = excluded.body_json,
  body_sha256 = excluded.body_sha256,
  written_at = excluded.written_at
";

const SELECT_DOCUMENT_SQL: &str =
    "SELECT body_json, body_sha256 FROM documents WHERE collection = ?1 AND document_id = ?2";

/// Embedded SQLite backend holding the roster document as a JSON body.
///
/// A connection is opened per operation so the store can be shared across blocking tasks
/// without interior locking.
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    settings: StoreSettings,
}

impl SqliteSnapshotStore {
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    fn database_path(&self) -> Result<&Path, StoreError> {
        if !self.settings.has_credentials() {
            return Err(StoreError::NotConfigured);
        }
        self.settings.database.as_deref().ok_or(StoreError::NotConfigured)
    }

    fn open(&self, path: &Path, read_only: bool) -> Result<Connection, StoreError> {
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };
        let conn = Connection::open_with_flags(path, flags).map_err(map_sqlite_error)?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;").map_err(map_sqlite_error)?;
        Ok(conn)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn configured(&self) -> bool {
        self.settings.has_credentials()
    }

    fn fetch(&self) -> Result<Option<Snapshot>, StoreError> {
        let path = self.database_path()?;
        if !path.exists() {
            return Ok(None);
        }

        let conn = self.open(path, true)?;
        if !table_exists(&conn, "documents")? {
            return Ok(None);
        }

        let row = conn
            .query_row(
                SELECT_DOCUMENT_SQL,
                params![self.settings.collection, self.settings.document],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(map_sqlite_error)?;

        let Some((body_json, stored_digest)) = row else {
            return Ok(None);
        };

        if sha256_hex(&body_json) != stored_digest {
            return Err(StoreError::Backend(format!(
                "document {}/{} failed digest verification",
                self.settings.collection, self.settings.document
            )));
        }

        let body: Value = serde_json::from_str(&body_json).map_err(|err| {
            StoreError::Backend(format!("stored document is not valid JSON: {err}"))
        })?;
        Ok(Some(Snapshot::from_document(&body)))
    }

    fn write(&self, document: &SnapshotDocument) -> Result<(), StoreError> {
        let path = self.database_path()?;
        if self.settings.read_only {
            return Err(StoreError::PermissionDenied(format!(
                "{} is opened read-only",
                path.display()
            )));
        }

        let mut conn = self.open(path, false)?;
        migrate(&mut conn)?;

        let body_json = serde_json::to_string(document)
            .map_err(|err| StoreError::Backend(format!("failed to encode document: {err}")))?;
        let digest = sha256_hex(&body_json);

        let tx = conn.transaction().map_err(map_sqlite_error)?;
        tx.execute(
            UPSERT_DOCUMENT_SQL,
            params![
                self.settings.collection,
                self.settings.document,
                body_json,
                digest,
                now_rfc3339()?
            ],
        )
        .map_err(map_sqlite_error)?;
        tx.commit().map_err(map_sqlite_error)?;

        debug!(
            collection = %self.settings.collection,
            document = %self.settings.document,
            records = document.data.len(),
            "snapshot document replaced"
        );
        Ok(())
    }
}

fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL).map_err(map_sqlite_error)?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .map_err(map_sqlite_error)?;
    if version >= LATEST_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction().map_err(map_sqlite_error)?;
    tx.execute_batch(MIGRATION_001_SQL).map_err(map_sqlite_error)?;
    tx.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        params![1_i64, now_rfc3339()?],
    )
    .map_err(map_sqlite_error)?;
    tx.commit().map_err(map_sqlite_error)
}

fn table_exists(conn: &Connection, table_name: &str) -> Result<bool, StoreError> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table_name],
            |row| row.get::<_, i64>(0),
        )
        .map_err(map_sqlite_error)?;
    Ok(exists == 1)
}

fn map_sqlite_error(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied,
        ) => StoreError::PermissionDenied(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn sha256_hex(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn now_rfc3339() -> Result<String, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| StoreError::Backend(format!("failed to format timestamp: {err}")))
}
