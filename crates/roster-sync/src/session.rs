use roster_core::{
    derive_view, sample_records, timestamp_label, DerivedView, Record, RecordField, SortSpec,
    ViewControls,
};
use roster_ingest_xlsx::parse_workbook_bytes;
use roster_store_sqlite::{ReadOutcome, SnapshotClient, SnapshotStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::{AuthError, Authenticator, FixedCredentialAuthenticator, Role};
use crate::context::ClientContext;

pub const DEMO_MODE_NOTICE: &str = "Đang chạy ở chế độ Demo (Offline).";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Error,
}

/// Where the current record set came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    #[default]
    Sample,
    Remote,
    Imported,
}

/// What the startup read observed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    /// Startup has not run yet.
    #[default]
    Pending,
    NotConfigured,
    Found,
    Absent,
    Unavailable,
    TimedOut,
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Dismissible banner shown to the user. Never fatal.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("administrator sign-in is required to import")]
    AuthenticationRequired,
    #[error("failed to read spreadsheet: {0}")]
    Parse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ImportSummary {
    pub imported: usize,
    pub last_updated: String,
}

/// Serializable snapshot of everything the presentation layer shows besides the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SyncState,
    pub role: Role,
    pub origin: DataOrigin,
    pub read_status: ReadStatus,
    pub store_configured: bool,
    pub record_count: usize,
    pub last_updated: Option<String>,
    pub notice: Option<Notice>,
    pub auth_error: Option<String>,
    pub controls: ViewControls,
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Owns the authoritative record set and drives it through startup, authentication and
/// import. The record set is always last-known-good: the built-in sample at worst.
///
/// The session embeds one [`ClientContext`] for single-operator use. Hosts serving many
/// clients keep a context per client and go through the `*_for`, [`import_as`] and
/// [`view_with`] variants instead.
///
/// [`import_as`]: RosterSession::import_as
/// [`view_with`]: RosterSession::view_with
pub struct RosterSession<S, A = FixedCredentialAuthenticator> {
    client: SnapshotClient<S>,
    authenticator: A,
    clock: fn() -> OffsetDateTime,
    state: SyncState,
    records: Vec<Record>,
    last_updated: Option<String>,
    origin: DataOrigin,
    read_status: ReadStatus,
    notice: Option<Notice>,
    local: ClientContext,
}

impl<S: SnapshotStore, A: Authenticator> RosterSession<S, A> {
    pub fn new(client: SnapshotClient<S>, authenticator: A) -> Self {
        Self {
            client,
            authenticator,
            clock: local_now,
            state: SyncState::Uninitialized,
            records: Vec::new(),
            last_updated: None,
            origin: DataOrigin::Sample,
            read_status: ReadStatus::Pending,
            notice: None,
            local: ClientContext::default(),
        }
    }

    /// Replace the clock used for publish labels.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        self.client.store()
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.local.role
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn auth_error(&self) -> Option<&str> {
        self.local.auth_error.as_deref()
    }

    /// Load the initial record set. Always ends in [`SyncState::Ready`]; read failures
    /// fall back to the sample roster and leave a notice describing the cause.
    pub async fn start(&mut self) {
        self.state = SyncState::Loading;
        self.notice = None;

        match self.client.read().await {
            Ok(ReadOutcome::Found(snapshot)) => {
                info!(records = snapshot.records.len(), "loaded roster from snapshot store");
                self.records = snapshot.records;
                self.last_updated = Some(snapshot.last_updated);
                self.origin = DataOrigin::Remote;
                self.read_status = ReadStatus::Found;
            }
            Ok(ReadOutcome::Absent) => {
                info!("snapshot store has no roster yet; showing sample data");
                self.load_sample(ReadStatus::Absent);
            }
            Ok(ReadOutcome::NotConfigured) | Err(StoreError::NotConfigured) => {
                info!("snapshot store not configured; running in demo mode");
                self.load_sample(ReadStatus::NotConfigured);
                self.notice = Some(Notice::new(NoticeLevel::Info, DEMO_MODE_NOTICE));
            }
            Ok(ReadOutcome::Unavailable { reason }) | Err(StoreError::Backend(reason)) => {
                warn!(%reason, "falling back to sample roster");
                self.load_sample(ReadStatus::Unavailable);
                self.notice = Some(Notice::new(
                    NoticeLevel::Warning,
                    format!(
                        "Không thể đọc dữ liệu từ kho lưu trữ: {reason}. \
                         Đang hiển thị dữ liệu mẫu."
                    ),
                ));
            }
            Err(StoreError::Timeout(limit)) => {
                warn!(timeout_ms = %limit.as_millis(), "falling back to sample roster");
                self.load_sample(ReadStatus::TimedOut);
                self.notice = Some(Notice::new(
                    NoticeLevel::Warning,
                    format!(
                        "Kết nối kho lưu trữ quá hạn (Timeout sau {} ms). \
                         Đang hiển thị dữ liệu mẫu.",
                        limit.as_millis()
                    ),
                ));
            }
            Err(StoreError::PermissionDenied(detail)) => {
                warn!(%detail, "snapshot read denied; falling back to sample roster");
                self.load_sample(ReadStatus::PermissionDenied);
                self.notice = Some(Notice::new(
                    NoticeLevel::Error,
                    format!("Lỗi quyền truy cập kho lưu trữ (Permission Denied): {detail}"),
                ));
            }
        }

        self.state = SyncState::Ready;
    }

    fn load_sample(&mut self, read_status: ReadStatus) {
        self.records = sample_records();
        self.last_updated = None;
        self.origin = DataOrigin::Sample;
        self.read_status = read_status;
    }

    /// Attempt an administrator sign-in. A rejected attempt keeps the current role and
    /// records the failure message; the sync state is never touched.
    ///
    /// # Errors
    /// Returns the authenticator's [`AuthError`] on mismatch.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<Role, AuthError> {
        self.local.authenticate(&self.authenticator, username, password)
    }

    /// Sign-in on behalf of a separately held client context.
    ///
    /// # Errors
    /// Returns the authenticator's [`AuthError`] on mismatch.
    pub fn authenticate_for(
        &self,
        context: &mut ClientContext,
        username: &str,
        password: &str,
    ) -> Result<Role, AuthError> {
        context.authenticate(&self.authenticator, username, password)
    }

    pub fn logout(&mut self) {
        self.local.logout();
    }

    /// Ingest a spreadsheet as the embedded client, publish it, then adopt it.
    ///
    /// # Errors
    /// See [`RosterSession::import_as`].
    pub async fn import(&mut self, workbook: Vec<u8>) -> Result<ImportSummary, ImportError> {
        self.import_as(self.local.role, workbook).await
    }

    /// Ingest a spreadsheet on behalf of a client holding `role`, publish it, then adopt it.
    ///
    /// The authoritative set changes only after the store accepted the write.
    ///
    /// # Errors
    /// [`ImportError::AuthenticationRequired`] for non-administrators (nothing else
    /// happens). Ingestion and store failures leave the records unchanged, set
    /// [`SyncState::Error`] and raise an error notice.
    pub async fn import_as(
        &mut self,
        role: Role,
        workbook: Vec<u8>,
    ) -> Result<ImportSummary, ImportError> {
        if role != Role::Admin {
            warn!("import rejected: administrator sign-in required");
            return Err(ImportError::AuthenticationRequired);
        }

        self.state = SyncState::Loading;
        self.notice = None;

        match self.ingest_and_publish(workbook).await {
            Ok((records, label)) => {
                info!(records = records.len(), last_updated = %label, "roster imported");
                let summary =
                    ImportSummary { imported: records.len(), last_updated: label.clone() };
                self.records = records;
                self.last_updated = Some(label);
                self.origin = DataOrigin::Imported;
                self.state = SyncState::Ready;
                Ok(summary)
            }
            Err(err) => {
                warn!(error = %err, "roster import failed");
                self.state = SyncState::Error;
                self.notice = Some(Notice::new(NoticeLevel::Error, import_failure_message(&err)));
                Err(err)
            }
        }
    }

    async fn ingest_and_publish(
        &self,
        workbook: Vec<u8>,
    ) -> Result<(Vec<Record>, String), ImportError> {
        let records = tokio::task::spawn_blocking(move || parse_workbook_bytes(&workbook))
            .await
            .map_err(|err| ImportError::Parse(format!("spreadsheet task failed: {err}")))?
            .map_err(|err| ImportError::Parse(err.to_string()))?;

        let label = timestamp_label((self.clock)());
        self.client.write(&records, &label).await?;
        Ok((records, label))
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.local.set_search_term(term);
    }

    /// `None` restores the filter order.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.local.set_sort(sort);
    }

    pub fn toggle_sort(&mut self, key: RecordField) -> SortSpec {
        self.local.toggle_sort(key)
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Filtered, sorted view of the current records with aggregates.
    pub fn view(&self) -> DerivedView {
        self.view_with(&self.local.controls)
    }

    pub fn view_with(&self, controls: &ViewControls) -> DerivedView {
        derive_view(&self.records, controls)
    }

    pub fn status(&self) -> SessionStatus {
        self.status_for(&self.local)
    }

    /// Shared session state as seen by one client: its role, its last sign-in error,
    /// its view controls, and the notice unless that client dismissed it.
    pub fn status_for(&self, context: &ClientContext) -> SessionStatus {
        SessionStatus {
            state: self.state,
            role: context.role,
            origin: self.origin,
            read_status: self.read_status,
            store_configured: self.client.configured(),
            record_count: self.records.len(),
            last_updated: self.last_updated.clone(),
            notice: context.visible_notice(self.notice.as_ref()).cloned(),
            auth_error: context.auth_error.clone(),
            controls: context.controls.clone(),
        }
    }
}

fn import_failure_message(err: &ImportError) -> String {
    match err {
        ImportError::Store(StoreError::PermissionDenied(detail)) => {
            format!("Lỗi quyền (Permission Denied): {detail}")
        }
        ImportError::Store(StoreError::NotConfigured) => {
            "Kho lưu trữ chưa được cấu hình; không thể đồng bộ dữ liệu.".to_string()
        }
        other => format!("Nhập dữ liệu thất bại: {other}"),
    }
}
