//! Edge case tests for unusual request sheets

use crate::common::{header, load, sample_data, RequestRow, TestFixture};
use dreqdiff::record::Column;
use dreqdiff::{DreqConfig, DreqError, SnapshotDiffer, SnapshotLoader};

#[test]
fn test_missing_columns_are_all_reported() {
    let fixture = TestFixture::new().unwrap();
    let titles: Vec<&str> = header()
        .into_iter()
        .filter(|t| *t != "title" && *t != "positive")
        .collect();
    let path = fixture
        .create_file("request.csv", &format!("{}\n", titles.join(",")))
        .unwrap();

    let profile = DreqConfig::default().profile().unwrap();
    let error = SnapshotLoader::new(&profile).load(&path).unwrap_err();
    match error {
        DreqError::MissingColumns { titles } => assert_eq!(titles, vec!["title", "positive"]),
        other => panic!("Expected missing columns, got {:?}", other),
    }
    assert!(DreqError::missing_columns(vec!["title".to_string()]).is_structural());
}

#[test]
fn test_blank_first_title_is_cmor_label() {
    let fixture = TestFixture::new().unwrap();
    let mut titles = header();
    titles[0] = "";
    let row = RequestRow::new("Amon", "tas");
    let values: Vec<&str> = Column::ALL.iter().map(|c| row.value(*c)).collect();
    let path = fixture
        .create_workbook("request.xlsx", "Diagnostics", &[titles, values])
        .unwrap();

    let snapshot = load(&path);
    assert_eq!(snapshot.records()[0].identifier(), "Amon_tas");
}

#[test]
fn test_titles_match_loosely() {
    let fixture = TestFixture::new().unwrap();
    let titles: Vec<String> = header()
        .into_iter()
        .map(|t| match t {
            "UKESM_component" => "Ukesm Component".to_string(),
            "cf_std_name" => "CF_STD_NAME".to_string(),
            other => other.to_string(),
        })
        .collect();
    let row = RequestRow::new("Omon", "tos").set(Column::UkesmComponent, "ocean");
    let title_refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let values: Vec<&str> = Column::ALL.iter().map(|c| row.value(*c)).collect();
    let path = fixture
        .create_workbook("request.xlsx", "Diagnostics", &[title_refs, values])
        .unwrap();

    let snapshot = load(&path);
    assert_eq!(snapshot.records()[0].ukesm_component(), Some("ocean"));
}

#[test]
fn test_header_only_sheet_is_empty_snapshot() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_request_csv("request.csv", &[]).unwrap();

    let snapshot = load(&path);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.sheet_dimensions(), (1, Column::ALL.len()));
    assert!(snapshot.table_names().is_empty());
}

#[test]
fn test_empty_sheet_has_no_header() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_file("request.csv", "").unwrap();

    let profile = DreqConfig::default().profile().unwrap();
    let error = SnapshotLoader::new(&profile).load(&path).unwrap_err();
    assert!(matches!(error, DreqError::EmptySheet { .. }));
}

#[test]
fn test_blank_cells_are_null() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_request_csv(
            "request.csv",
            &[RequestRow::new("Amon", "tas")
                .clear(Column::Plan)
                .clear(Column::Dimension)
                .clear(Column::VariableMapping)
                .set(Column::Priority, "high")],
        )
        .unwrap();

    let snapshot = load(&path);
    let record = &snapshot.records()[0];
    assert_eq!(record.plan(), None);
    assert_eq!(record.inferred_plan(), None);
    assert_eq!(record.dimension(), None);
    assert!(record.stash_codes().is_empty());
    assert_eq!(record.stash_codes_needed(), None);
    assert_eq!(record.priority(), None);
    assert_eq!(record.groups(), [""]);
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_request_csv(
            "request.csv",
            &[RequestRow::new(" Amon ", "tas  ").set(Column::Plan, " available ")],
        )
        .unwrap();

    let snapshot = load(&path);
    let record = &snapshot.records()[0];
    assert_eq!(record.identifier(), "Amon_tas");
    assert_eq!(record.plan(), Some("available"));
}

#[test]
fn test_duplicate_identifiers_collide_when_diffing() {
    let fixture = TestFixture::new().unwrap();
    let old = fixture
        .create_request_csv(
            "old.csv",
            &[
                RequestRow::new("Amon", "tas").set(Column::Units, "degC"),
                RequestRow::new("Amon", "tas"),
            ],
        )
        .unwrap();
    let new = fixture
        .create_request_csv("new.csv", &[RequestRow::new("Amon", "tas")])
        .unwrap();

    let old = load(&old);
    let new = load(&new);
    assert_eq!(old.duplicate_identifiers(), vec!["Amon_tas"]);
    assert!(!SnapshotDiffer::diff(&old, &new).has_changes());
}

#[test]
fn test_row_validation_skips_deleted_rows_when_enabled() {
    let fixture = TestFixture::new().unwrap();
    let mut config = DreqConfig::default();
    config.row_validation.enabled = true;
    // last_update is the 19th column
    config.row_validation.marker_column = 18;

    let path = fixture
        .create_request_csv(
            "request.csv",
            &[
                RequestRow::new("Amon", "tas"),
                RequestRow::new("Amon", "pr").set(Column::LastUpdate, "01.00.17:DELETE"),
                RequestRow::new("Amon", "").clear(Column::CmorLabel),
            ],
        )
        .unwrap();

    let profile = config.profile().unwrap();
    let snapshot = SnapshotLoader::new(&profile).load(&path).unwrap();
    let ids: Vec<&str> = snapshot.iter().map(|r| r.identifier()).collect();
    assert_eq!(ids, vec!["Amon_tas"]);

    // Disabled by default: every row is kept
    assert_eq!(load(&path).len(), 3);
}

#[test]
fn test_sample_request_loads_from_both_formats() {
    let fixture = TestFixture::new().unwrap();
    let csv = fixture
        .create_request_csv("request.csv", &sample_data::old_request())
        .unwrap();
    let xlsx = fixture
        .create_request_xlsx("request.xlsx", &sample_data::old_request())
        .unwrap();

    let from_csv = load(&csv);
    let from_xlsx = load(&xlsx);
    assert_eq!(from_csv.records(), from_xlsx.records());
}
