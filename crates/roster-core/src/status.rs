//! Best-effort classification of free-text status labels.
//!
//! Status is stored as whatever text the operator typed into the spreadsheet. Two
//! different readings of it exist:
//!
//! - [`classify`] drives presentation tone and accepts a broad set of markers.
//! - [`is_logged_in`] / [`is_logged_out`] drive the aggregate counters and only accept
//!   the exact login markers.

use serde::{Deserialize, Serialize};

use crate::fold_for_match;

/// Status written for rows whose status cell is blank ("active").
pub const DEFAULT_STATUS: &str = "Hoạt động";

/// Substring counted as "logged in" by the aggregates.
pub const LOGGED_IN_MARKER: &str = "đã đăng nhập";

/// Substring counted as "logged out" by the aggregates.
pub const LOGGED_OUT_MARKER: &str = "chưa đăng nhập";

const LOGGED_IN_TONE_MARKERS: [&str; 3] = [LOGGED_IN_MARKER, "hoạt động", "active"];

// Checked before the logged-in markers because "inactive" contains "active". The two
// login markers do not overlap.
const LOGGED_OUT_TONE_MARKERS: [&str; 3] = [LOGGED_OUT_MARKER, "nghỉ", "inactive"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    LoggedIn,
    LoggedOut,
    Other,
}

impl StatusClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoggedIn => "logged_in",
            Self::LoggedOut => "logged_out",
            Self::Other => "other",
        }
    }
}

/// Classify a status label by case-insensitive substring match.
#[must_use]
pub fn classify(status: &str) -> StatusClass {
    let folded = fold_for_match(status);
    if LOGGED_OUT_TONE_MARKERS.iter().any(|marker| folded.contains(marker)) {
        StatusClass::LoggedOut
    } else if LOGGED_IN_TONE_MARKERS.iter().any(|marker| folded.contains(marker)) {
        StatusClass::LoggedIn
    } else {
        StatusClass::Other
    }
}

#[must_use]
pub fn is_logged_in(status: &str) -> bool {
    fold_for_match(status).contains(LOGGED_IN_MARKER)
}

#[must_use]
pub fn is_logged_out(status: &str) -> bool {
    fold_for_match(status).contains(LOGGED_OUT_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_login_markers_in_any_case() {
        assert_eq!(classify("Đã đăng nhập"), StatusClass::LoggedIn);
        assert_eq!(classify("ĐÃ ĐĂNG NHẬP lúc 8h"), StatusClass::LoggedIn);
        assert_eq!(classify("Chưa đăng nhập"), StatusClass::LoggedOut);
    }

    #[test]
    fn classify_uses_broad_tone_markers() {
        assert_eq!(classify(DEFAULT_STATUS), StatusClass::LoggedIn);
        assert_eq!(classify("Active"), StatusClass::LoggedIn);
        assert_eq!(classify("Nghỉ phép"), StatusClass::LoggedOut);
    }

    #[test]
    fn inactive_is_not_mistaken_for_active() {
        assert_eq!(classify("INACTIVE"), StatusClass::LoggedOut);
    }

    #[test]
    fn login_markers_do_not_contain_each_other() {
        assert!(!LOGGED_OUT_MARKER.contains(LOGGED_IN_MARKER));
        assert!(!LOGGED_IN_MARKER.contains(LOGGED_OUT_MARKER));
        assert_eq!(classify("Đã đăng nhập (active)"), StatusClass::LoggedIn);
    }

    #[test]
    fn unknown_labels_are_other() {
        assert_eq!(classify(""), StatusClass::Other);
        assert_eq!(classify("Đang công tác"), StatusClass::Other);
    }

    #[test]
    fn aggregate_markers_are_strict() {
        assert!(is_logged_in("đã đăng nhập"));
        assert!(!is_logged_in(DEFAULT_STATUS));
        assert!(!is_logged_in("Chưa đăng nhập"));
        assert!(is_logged_out("Chưa Đăng Nhập"));
        assert!(!is_logged_out("Đã đăng nhập"));
    }

    #[test]
    fn decomposed_input_matches_composed_markers() {
        let decomposed = "Đa\u{0303} đăng nhập";
        assert!(is_logged_in(decomposed));
    }
}
