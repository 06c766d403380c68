//! Functional tests for record derivation and a full request comparison

use crate::common::{load, sample_data, RequestRow, TestFixture};
use dreqdiff::change_detection::{ComparedField, FieldChange, NormalizedValue};
use dreqdiff::filter::{not_deleted, FilterPipeline};
use dreqdiff::record::Column;
use dreqdiff::{DreqConfig, Record, RequestSnapshot, SnapshotDiffer, SnapshotLoader};

fn single(row: RequestRow) -> Record {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_request_csv("request.csv", &[row]).unwrap();
    load(&path).records()[0].clone()
}

fn ids(records: &[&Record]) -> Vec<String> {
    records.iter().map(|r| r.identifier().to_string()).collect()
}

#[test]
fn test_arithmetic_mapping_codes_are_sorted() {
    let record = single(
        RequestRow::new("Amon", "rsut").set(Column::VariableMapping, "m01s08i248 * m01s03i395 * 100"),
    );
    assert_eq!(record.stash_codes(), ["m01s03i395", "m01s08i248"]);
    assert_eq!(record.stash_codes_needed().as_deref(), Some("m01s03i395,m01s08i248"));
}

#[test]
fn test_model_level_fields_need_orography() {
    let record = single(
        RequestRow::new("CFmon", "ta")
            .set(Column::Dimension, "longitude latitude alev time")
            .set(Column::VariableMapping, "m01s30i204"),
    );
    assert_eq!(record.stash_codes(), ["m01s30i204", "m01s00i033"]);
}

#[test]
fn test_range_expansion() {
    let record = single(RequestRow::new("Amon", "x").set(Column::VariableMapping, "m01s30i201:i203 + m01s30i202"));
    assert_eq!(record.stash_codes(), ["m01s30i201", "m01s30i202", "m01s30i203"]);
}

#[test]
fn test_blank_group_membership_gives_one_empty_group() {
    let record = single(RequestRow::new("Amon", "tas").clear(Column::RequestGroupMembership));
    assert_eq!(record.groups(), [""]);

    let record = single(
        RequestRow::new("Amon", "tas")
            .set(Column::RequestGroupMembership, r#""CMIP:rvg1", "DAMIP:rvg2""#),
    );
    assert_eq!(record.groups(), ["CMIP:rvg1", "DAMIP:rvg2"]);
}

#[test]
fn test_notes_override_mapping_and_priority() {
    let record = single(
        RequestRow::new("Amon", "tas")
            .set(Column::VariableMapping, "m01s03i236")
            .set(
                Column::Notes,
                "HadGEM3_variable_mapping:m01s03i328: MO_priority:3: checked",
            ),
    );
    assert_eq!(record.stash_codes(), ["m01s03i328"]);
    assert_eq!(record.priority(), Some(3));
}

#[test]
fn test_manual_edit_forces_available_plan() {
    let record = single(
        RequestRow::new("Amon", "tas")
            .set(Column::Plan, "do-not-produce")
            .set(Column::ManualEdit, "mapping fixed"),
    );
    assert_eq!(record.plan(), Some("do-not-produce"));
    assert_eq!(record.inferred_plan().map(|p| p.to_string()).as_deref(), Some("available"));

    let record = single(RequestRow::new("Amon", "tas").set(Column::Plan, "vn10.7"));
    assert_eq!(record.inferred_plan().map(|p| p.to_string()).as_deref(), Some("vn10.7"));
}

#[test]
fn test_applicability_exclusions() {
    let chemistry = single(RequestRow::new("AERmon", "o3").set(Column::UkesmComponent, "chemistry"));
    assert!(!chemistry.is_applicable());

    let section19 = single(RequestRow::new("Lmon", "gpp").set(Column::VariableMapping, "m01s19i102"));
    assert!(!section19.is_applicable());

    let excluded = single(RequestRow::new("Amon", "co2").set(Column::VariableMapping, "m01s00i252"));
    assert!(!excluded.is_applicable());

    assert!(single(RequestRow::new("Amon", "tas")).is_applicable());
}

#[test]
fn test_standard_filter_on_loaded_request() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_request_csv(
            "request.csv",
            &[
                RequestRow::new("Amon", "tas"),
                RequestRow::new("fx", "orog").set(Column::Frequency, "fx"),
                RequestRow::new("CFsubhr", "ta").set(Column::Dimension, "site time1"),
                RequestRow::new("Omon", "dms").set(Column::VariableMapping, "DMS_SURF"),
                RequestRow::new("Amon", "cl").set(Column::Plan, "do-not-produce"),
                RequestRow::new("Lmon", "gpp").set(Column::VariableMapping, "m01s19i102"),
            ],
        )
        .unwrap();

    let config = DreqConfig::default();
    let profile = config.profile().unwrap();
    let snapshot = SnapshotLoader::new(&profile)
        .with_filter(FilterPipeline::standard(&config))
        .load(&path)
        .unwrap();

    let kept: Vec<&str> = snapshot.iter().map(|r| r.identifier()).collect();
    assert_eq!(kept, vec!["Amon_tas"]);
    assert_eq!(snapshot.sheet_dimensions(), (7, Column::ALL.len()));
}

#[test]
fn test_full_request_comparison() {
    let fixture = TestFixture::new().unwrap();
    let old_path = fixture
        .create_request_xlsx("old.xlsx", &sample_data::old_request())
        .unwrap();
    let new_path = fixture
        .create_request_xlsx("new.xlsx", &sample_data::new_request())
        .unwrap();

    let keep = not_deleted(&DreqConfig::default());
    let old: RequestSnapshot = load(&old_path).retain(&keep);
    let new: RequestSnapshot = load(&new_path).retain(&keep);
    assert_eq!(new.len(), 4);

    let diff = SnapshotDiffer::diff(&old, &new);

    // pr only changed inside its cell_methods comment
    assert_eq!(diff.updated.len(), 1);
    let update = &diff.updated[0];
    assert_eq!(update.new.identifier(), "Amon_tas");
    assert_eq!(update.changes.len(), 1);
    assert_eq!(
        update.changes[&ComparedField::Units],
        FieldChange {
            new: NormalizedValue::Text("degC".to_string()),
            old: NormalizedValue::Text("K".to_string()),
        }
    );

    assert_eq!(diff.moved.len(), 1);
    assert_eq!(diff.moved[0].new.identifier(), "CFmon_hus");
    assert_eq!(diff.moved[0].old.identifier(), "Amon_hus");

    assert_eq!(ids(&diff.added), vec!["Amon_ts"]);
    assert_eq!(ids(&diff.removed), vec!["Omon_tos"]);
    assert_eq!(diff.total_changes(), 4);
}

#[test]
fn test_tables_group_by_miptable() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_request_csv("request.csv", &sample_data::old_request())
        .unwrap();
    let snapshot = load(&path);

    assert_eq!(snapshot.table_names(), vec!["Amon", "Omon"]);
    let amon = snapshot.table("Amon").unwrap();
    assert_eq!(amon.uniques(), vec!["Amon_tas", "Amon_pr", "Amon_hus"]);
    assert_eq!(
        amon.stashs(),
        vec![
            Some("m01s03i236".to_string()),
            Some("m01s05i216".to_string()),
            Some("m01s30i205,m01s00i033".to_string()),
        ]
    );
    assert_eq!(snapshot.tables().len(), 2);
}
