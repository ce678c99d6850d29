//! Shared helpers for roster session integration tests.

use std::sync::Mutex;
use std::time::Duration;

use roster_core::{Record, SequenceNumber, Snapshot};
use roster_ingest_xlsx::fixtures::{header_row, roster_row, workbook_bytes, FixtureCell};
use roster_store_sqlite::{SnapshotClient, SnapshotDocument, SnapshotStore, StoreError};
use roster_sync::{FixedCredentialAuthenticator, RosterSession};
use time::OffsetDateTime;

#[allow(dead_code)]
pub const TEST_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// 2024-10-04 08:05:09 UTC.
#[allow(dead_code)]
pub fn fixed_clock() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000) + time::Duration::seconds(29_109)
}

#[allow(dead_code)]
pub const FIXED_CLOCK_LABEL: &str = "08:05:09 - 4/10/2024";

/// In-memory store with scripted failures that records every write it receives.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeStore {
    configured: bool,
    snapshot: Mutex<Option<Snapshot>>,
    fetch_error: Option<StoreError>,
    fetch_delay: Option<Duration>,
    write_error: Option<StoreError>,
    writes: Mutex<Vec<SnapshotDocument>>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self { configured: true, ..Self::default() }
    }

    pub fn holding(snapshot: Snapshot) -> Self {
        Self { configured: true, snapshot: Mutex::new(Some(snapshot)), ..Self::default() }
    }

    #[must_use]
    pub fn failing_reads(mut self, err: StoreError) -> Self {
        self.fetch_error = Some(err);
        self
    }

    #[must_use]
    pub fn slow_reads(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn failing_writes(mut self, err: StoreError) -> Self {
        self.write_error = Some(err);
        self
    }

    pub fn writes(&self) -> Vec<SnapshotDocument> {
        self.writes.lock().map(|writes| writes.clone()).unwrap_or_default()
    }
}

impl SnapshotStore for FakeStore {
    fn configured(&self) -> bool {
        self.configured
    }

    fn fetch(&self) -> Result<Option<Snapshot>, StoreError> {
        if let Some(delay) = self.fetch_delay {
            std::thread::sleep(delay);
        }
        if let Some(err) = &self.fetch_error {
            return Err(err.clone());
        }
        self.snapshot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|err| StoreError::Backend(err.to_string()))
    }

    fn write(&self, document: &SnapshotDocument) -> Result<(), StoreError> {
        if let Some(err) = &self.write_error {
            return Err(err.clone());
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(document.clone());
        }
        if let Ok(mut slot) = self.snapshot.lock() {
            let body = serde_json::to_value(document)
                .map_err(|err| StoreError::Backend(err.to_string()))?;
            *slot = Some(Snapshot::from_document(&body));
        }
        Ok(())
    }
}

#[allow(dead_code)]
pub fn session(store: FakeStore) -> RosterSession<FakeStore> {
    RosterSession::new(
        SnapshotClient::new(store, Some(TEST_READ_TIMEOUT)),
        FixedCredentialAuthenticator::default(),
    )
    .with_clock(fixed_clock)
}

#[allow(dead_code)]
pub fn numbered_records(count: i64) -> Vec<Record> {
    (1..=count)
        .map(|stt| Record {
            sequence_number: SequenceNumber::Number(stt),
            full_name: format!("Nhân viên {stt}"),
            unit: format!("Phòng {}", stt % 5),
            status: if stt % 2 == 0 { "Đã đăng nhập" } else { "Chưa đăng nhập" }.to_string(),
            ..Record::default()
        })
        .collect()
}

/// Workbook with a header and one row per entry; an empty name leaves the cell blank.
#[allow(dead_code)]
pub fn workbook_with_names(names: &[&str]) -> Vec<u8> {
    let mut rows: Vec<Vec<FixtureCell>> = vec![header_row()];
    for (index, name) in names.iter().enumerate() {
        let stt = i64::try_from(index + 1).unwrap_or(i64::MAX);
        rows.push(roster_row(stt, name, "Phòng Kỹ thuật", "Đã đăng nhập"));
    }
    match workbook_bytes(&[("Sheet1", rows)]) {
        Ok(bytes) => bytes,
        Err(err) => panic!("failed to build fixture workbook: {err}"),
    }
}
