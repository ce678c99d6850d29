//! Session orchestration for the roster: startup read with fallback, administrator
//! sign-in, and spreadsheet import publishing through the snapshot store.

pub mod auth;
pub mod config;
pub mod context;
pub mod session;

use roster_store_sqlite::{SnapshotClient, SqliteSnapshotStore};

pub use auth::{
    AuthError, AuthSettings, Authenticator, FixedCredentialAuthenticator, Role,
    DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME,
};
pub use config::RosterConfig;
pub use context::ClientContext;
pub use session::{
    DataOrigin, ImportError, ImportSummary, Notice, NoticeLevel, ReadStatus, RosterSession,
    SessionStatus, SyncState, DEMO_MODE_NOTICE,
};

/// Session backed by the embedded SQLite store and the configured administrator pair.
#[must_use]
pub fn sqlite_session(config: &RosterConfig) -> RosterSession<SqliteSnapshotStore> {
    let store = SqliteSnapshotStore::new(config.store.clone());
    let client = SnapshotClient::new(store, config.store.read_timeout());
    RosterSession::new(client, FixedCredentialAuthenticator::new(config.auth.clone()))
}
