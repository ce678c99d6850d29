//! Roster data model and the pure derived-view engine.

pub mod record;
pub mod sample;
pub mod status;
pub mod view;

use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization;

pub use record::{Record, RecordField, SequenceNumber, Snapshot, UNKNOWN_TIMESTAMP_LABEL};
pub use sample::sample_records;
pub use status::{classify, StatusClass, DEFAULT_STATUS};
pub use view::{
    aggregate, derive_view, filter_records, sort_records, Aggregates, DerivedView,
    SortDirection, SortSpec, ViewControls, ViewRow,
};

/// Canonical form used for every case-insensitive comparison: NFC, then lowercase.
///
/// Spreadsheet exports mix precomposed and decomposed Vietnamese diacritics, so
/// lowercasing alone is not enough for substring matching.
#[must_use]
pub fn fold_for_match(value: &str) -> String {
    value.nfc().collect::<String>().to_lowercase()
}

/// Human-readable publish label, `HH:MM:SS - D/M/YYYY`.
#[must_use]
pub fn timestamp_label(at: OffsetDateTime) -> String {
    format!(
        "{:02}:{:02}:{:02} - {}/{}/{}",
        at.hour(),
        at.minute(),
        at.second(),
        at.day(),
        u8::from(at.month()),
        at.year()
    )
}
