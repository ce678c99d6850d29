use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::fold_for_match;
use crate::record::{Record, RecordField};
use crate::status::{classify, is_logged_in, is_logged_out, StatusClass};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ascending" | "asc" => Some(Self::Ascending),
            "descending" | "desc" => Some(Self::Descending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct SortSpec {
    pub key: RecordField,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn ascending(key: RecordField) -> Self {
        Self { key, direction: SortDirection::Ascending }
    }

    #[must_use]
    pub fn descending(key: RecordField) -> Self {
        Self { key, direction: SortDirection::Descending }
    }

    /// Column-header behaviour: re-selecting the active ascending key flips it to
    /// descending, anything else starts ascending.
    #[must_use]
    pub fn toggle(current: Option<Self>, key: RecordField) -> Self {
        match current {
            Some(spec) if spec.key == key && spec.direction == SortDirection::Ascending => {
                Self::descending(key)
            }
            _ => Self::ascending(key),
        }
    }
}

/// Transient viewer controls applied on top of the authoritative record set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewControls {
    pub search_term: String,
    pub sort: Option<SortSpec>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Aggregates {
    pub total: usize,
    pub logged_in: usize,
    pub logged_out: usize,
    pub distinct_units: usize,
}

/// A visible record together with the tone its status is presented in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewRow {
    #[serde(flatten)]
    pub record: Record,
    pub status_class: StatusClass,
}

impl From<Record> for ViewRow {
    fn from(record: Record) -> Self {
        let status_class = classify(&record.status);
        Self { record, status_class }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedView {
    pub records: Vec<ViewRow>,
    pub aggregates: Aggregates,
    pub search_term: String,
    pub sort: Option<SortSpec>,
}

/// `folded_term` must already be passed through [`fold_for_match`].
fn matches_folded(record: &Record, folded_term: &str) -> bool {
    RecordField::ALL
        .iter()
        .any(|field| fold_for_match(&record.display_value(*field)).contains(folded_term))
}

/// Keep the records where any field contains `term`, ignoring case and
/// normalization form. An empty term keeps everything. Order is preserved.
#[must_use]
pub fn filter_records(records: &[Record], term: &str) -> Vec<Record> {
    if term.is_empty() {
        return records.to_vec();
    }

    let folded_term = fold_for_match(term);
    records.iter().filter(|record| matches_folded(record, &folded_term)).cloned().collect()
}

pub fn sort_records(records: &mut [Record], spec: SortSpec) {
    match spec.direction {
        SortDirection::Ascending => records.sort_by(|a, b| a.cmp_by(b, spec.key)),
        SortDirection::Descending => records.sort_by(|a, b| b.cmp_by(a, spec.key)),
    }
}

#[must_use]
pub fn aggregate(records: &[Record]) -> Aggregates {
    let distinct_units =
        records.iter().map(|record| record.unit.as_str()).collect::<BTreeSet<_>>().len();

    Aggregates {
        total: records.len(),
        logged_in: records.iter().filter(|record| is_logged_in(&record.status)).count(),
        logged_out: records.iter().filter(|record| is_logged_out(&record.status)).count(),
        distinct_units,
    }
}

/// Filter, then sort, then aggregate over the filtered set. Each visible row carries
/// its [`classify`] reading.
#[must_use]
pub fn derive_view(records: &[Record], controls: &ViewControls) -> DerivedView {
    let mut visible = filter_records(records, &controls.search_term);
    if let Some(spec) = controls.sort {
        sort_records(&mut visible, spec);
    }
    let aggregates = aggregate(&visible);

    DerivedView {
        records: visible.into_iter().map(ViewRow::from).collect(),
        aggregates,
        search_term: controls.search_term.clone(),
        sort: controls.sort,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::record::SequenceNumber;
    use crate::sample::sample_records;

    fn mk_record(stt: SequenceNumber, name: &str, unit: &str, status: &str) -> Record {
        Record {
            sequence_number: stt,
            full_name: name.to_string(),
            unit: unit.to_string(),
            parent_unit: String::new(),
            date_of_birth: String::new(),
            phone: String::new(),
            status: status.to_string(),
        }
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records.iter().map(|record| record.full_name.as_str()).collect()
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let records = sample_records();

        assert_eq!(
            names(&filter_records(&records, "PHÒNG NHÂN SỰ")),
            vec!["Trần Thị B (Dữ liệu mẫu)"]
        );
        assert_eq!(filter_records(&records, "0987").len(), 1);
        assert_eq!(filter_records(&records, "1988").len(), 1);
        assert_eq!(filter_records(&records, "KINH doanh").len(), 1);
        assert_eq!(filter_records(&records, "dữ liệu mẫu").len(), 3);
    }

    #[test]
    fn search_without_matches_yields_empty_view() {
        let view = derive_view(
            &sample_records(),
            &ViewControls { search_term: "zzz-no-match".to_string(), sort: None },
        );
        assert!(view.records.is_empty());
        assert_eq!(view.aggregates, Aggregates::default());
    }

    #[test]
    fn search_matches_decomposed_term_against_composed_data() {
        let records = vec![mk_record(SequenceNumber::Number(1), "Nguyễn Văn A", "", "")];
        assert_eq!(filter_records(&records, "nguye\u{0302}\u{0303}n").len(), 1);
    }

    #[test]
    fn sequence_number_sorts_numerically() {
        let mut records = vec![
            mk_record(SequenceNumber::Number(10), "ten", "", ""),
            mk_record(SequenceNumber::Number(9), "nine", "", ""),
            mk_record(SequenceNumber::Number(100), "hundred", "", ""),
        ];
        sort_records(&mut records, SortSpec::ascending(RecordField::SequenceNumber));
        assert_eq!(names(&records), vec!["nine", "ten", "hundred"]);
    }

    #[test]
    fn mixed_sequence_numbers_sort_numbers_before_text() {
        let mut records = vec![
            mk_record(SequenceNumber::Text("5".to_string()), "text five", "", ""),
            mk_record(SequenceNumber::Number(10), "ten", "", ""),
            mk_record(SequenceNumber::Text("10".to_string()), "text ten", "", ""),
            mk_record(SequenceNumber::Number(9), "nine", "", ""),
            mk_record(SequenceNumber::Decimal(9.5), "nine and a half", "", ""),
        ];
        sort_records(&mut records, SortSpec::ascending(RecordField::SequenceNumber));
        assert_eq!(
            names(&records),
            vec!["nine", "nine and a half", "ten", "text ten", "text five"]
        );
    }

    #[test]
    fn view_rows_carry_their_status_class() {
        let records = vec![
            mk_record(SequenceNumber::Number(1), "An", "", "Đã đăng nhập"),
            mk_record(SequenceNumber::Number(2), "Bình", "", "Inactive"),
            mk_record(SequenceNumber::Number(3), "Cường", "", "Đang công tác"),
        ];
        let view = derive_view(&records, &ViewControls::default());

        let classes: Vec<StatusClass> = view.records.iter().map(|row| row.status_class).collect();
        assert_eq!(
            classes,
            vec![StatusClass::LoggedIn, StatusClass::LoggedOut, StatusClass::Other]
        );
        assert_eq!(view.records[1].record, records[1]);
    }

    #[test]
    fn view_rows_serialize_flat_with_status_class() {
        let view = derive_view(&sample_records(), &ViewControls::default());
        let value = match serde_json::to_value(&view.records[0]) {
            Ok(value) => value,
            Err(err) => panic!("row did not serialize: {err}"),
        };
        assert_eq!(value.get("stt"), Some(&serde_json::json!(1)));
        assert_eq!(value.get("status_class"), Some(&serde_json::json!("logged_in")));
    }

    #[test]
    fn text_fields_sort_lexically() {
        let mut records = vec![
            mk_record(SequenceNumber::Number(1), "b", "", ""),
            mk_record(SequenceNumber::Number(2), "C", "", ""),
            mk_record(SequenceNumber::Number(3), "a", "", ""),
        ];
        sort_records(&mut records, SortSpec::descending(RecordField::FullName));
        assert_eq!(names(&records), vec!["b", "a", "C"]);
    }

    #[test]
    fn aggregates_cover_only_the_filtered_set() {
        let records = vec![
            mk_record(SequenceNumber::Number(1), "An", "Kỹ thuật", "Đã đăng nhập"),
            mk_record(SequenceNumber::Number(2), "Bình", "Kỹ thuật", "Chưa đăng nhập"),
            mk_record(SequenceNumber::Number(3), "Cường", "Nhân sự", "Hoạt động"),
            mk_record(SequenceNumber::Number(4), "Dũng", "", "đã đăng nhập"),
        ];

        let all = aggregate(&records);
        assert_eq!(
            all,
            Aggregates { total: 4, logged_in: 2, logged_out: 1, distinct_units: 3 }
        );

        let view = derive_view(
            &records,
            &ViewControls { search_term: "kỹ thuật".to_string(), sort: None },
        );
        assert_eq!(
            view.aggregates,
            Aggregates { total: 2, logged_in: 1, logged_out: 1, distinct_units: 1 }
        );
    }

    #[test]
    fn derive_view_does_not_touch_source() {
        let records = sample_records();
        let before = records.clone();
        let _ = derive_view(
            &records,
            &ViewControls {
                search_term: String::new(),
                sort: Some(SortSpec::descending(RecordField::FullName)),
            },
        );
        assert_eq!(records, before);
    }

    #[test]
    fn toggle_flips_only_the_active_ascending_key() {
        let first = SortSpec::toggle(None, RecordField::Unit);
        assert_eq!(first, SortSpec::ascending(RecordField::Unit));

        let second = SortSpec::toggle(Some(first), RecordField::Unit);
        assert_eq!(second, SortSpec::descending(RecordField::Unit));

        let third = SortSpec::toggle(Some(second), RecordField::Unit);
        assert_eq!(third, SortSpec::ascending(RecordField::Unit));

        let other = SortSpec::toggle(Some(first), RecordField::Phone);
        assert_eq!(other, SortSpec::ascending(RecordField::Phone));
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            any::<i64>(),
            "[a-zA-Zà-ỹ ]{0,10}",
            "[a-z]{0,6}",
            prop_oneof![
                Just("Đã đăng nhập".to_string()),
                Just("Chưa đăng nhập".to_string()),
                "[a-z ]{0,8}"
            ],
        )
            .prop_map(|(stt, name, unit, status)| {
                mk_record(SequenceNumber::Number(stt), &name, &unit, &status)
            })
    }

    fn arb_sequence_number() -> impl Strategy<Value = SequenceNumber> {
        prop_oneof![
            (-50_i64..50).prop_map(SequenceNumber::Number),
            prop_oneof![(-50.0_f64..50.0), Just(f64::NAN), Just(-0.0)]
                .prop_map(SequenceNumber::Decimal),
            "[0-9a-z]{0,3}".prop_map(SequenceNumber::Text),
        ]
    }

    proptest! {
        #[test]
        fn property_empty_search_returns_everything_in_order(
            records in proptest::collection::vec(arb_record(), 0..30)
        ) {
            prop_assert_eq!(filter_records(&records, ""), records);
        }

        #[test]
        fn property_filtering_is_idempotent(
            records in proptest::collection::vec(arb_record(), 0..30),
            term in "[a-z]{0,3}"
        ) {
            let once = filter_records(&records, &term);
            let twice = filter_records(&once, &term);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn property_descending_reverses_ascending_for_distinct_values(
            names in proptest::collection::btree_set("[a-z]{1,8}", 1..25)
                .prop_map(|set| set.into_iter().collect::<Vec<_>>())
                .prop_shuffle()
        ) {
            let records = names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let stt = i64::try_from(index).unwrap_or(i64::MAX);
                    mk_record(SequenceNumber::Number(stt), name, "", "")
                })
                .collect::<Vec<_>>();

            let mut ascending = records.clone();
            sort_records(&mut ascending, SortSpec::ascending(RecordField::FullName));
            let mut descending = records;
            sort_records(&mut descending, SortSpec::descending(RecordField::FullName));

            descending.reverse();
            prop_assert_eq!(ascending, descending);
        }

        #[test]
        fn property_mixed_sequence_numbers_sort_into_order(
            stts in proptest::collection::vec(arb_sequence_number(), 0..40),
            descending in any::<bool>()
        ) {
            let mut records = stts
                .into_iter()
                .map(|stt| mk_record(stt, "row", "", ""))
                .collect::<Vec<_>>();
            let spec = if descending {
                SortSpec::descending(RecordField::SequenceNumber)
            } else {
                SortSpec::ascending(RecordField::SequenceNumber)
            };
            sort_records(&mut records, spec);

            for pair in records.windows(2) {
                let ordering = pair[0].cmp_by(&pair[1], RecordField::SequenceNumber);
                let expected_out_of_order =
                    if descending { std::cmp::Ordering::Less } else { std::cmp::Ordering::Greater };
                prop_assert_ne!(ordering, expected_out_of_order);
            }
        }

        #[test]
        fn property_sequence_order_is_antisymmetric_and_transitive(
            a in arb_sequence_number(),
            b in arb_sequence_number(),
            c in arb_sequence_number()
        ) {
            prop_assert_eq!(a.natural_cmp(&b), b.natural_cmp(&a).reverse());
            if a.natural_cmp(&b).is_le() && b.natural_cmp(&c).is_le() {
                prop_assert!(a.natural_cmp(&c).is_le());
            }
        }

        #[test]
        fn property_aggregate_counts_are_bounded_by_total(
            records in proptest::collection::vec(arb_record(), 0..30)
        ) {
            let aggregates = aggregate(&records);
            prop_assert_eq!(aggregates.total, records.len());
            prop_assert!(aggregates.logged_in + aggregates.logged_out <= aggregates.total);
            prop_assert!(aggregates.distinct_units <= aggregates.total);
        }
    }
}
