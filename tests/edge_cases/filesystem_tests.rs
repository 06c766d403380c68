//! Edge case tests for filesystem-related scenarios

use crate::common::{sample_data, CliTestRunner};
use dreqdiff::DreqError;

#[test]
fn test_nonexistent_input_file() {
    let runner = CliTestRunner::new().unwrap();

    let error = runner.expect_failure(&["show", "/nonexistent/path/request.xlsx", "--quiet"]);
    let error_msg = error.to_string().to_lowercase();
    assert!(error_msg.contains("not found"), "Expected file not found error, got: {}", error);
}

#[test]
fn test_unsupported_input_format() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner.fixture().create_file("request.txt", "cmor_label\n").unwrap();

    let error = runner.expect_failure(&["export", path.to_str().unwrap()]);
    assert!(matches!(error, DreqError::UnsupportedFormat { .. }));
}

#[test]
fn test_corrupted_workbook() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_file("request.xlsx", "\u{0}\u{1}\u{2}invalid_data")
        .unwrap();

    let error = runner.expect_failure(&["show", path.to_str().unwrap(), "--quiet"]);
    assert!(error.is_structural(), "Expected a structural error, got: {}", error);
}

#[test]
fn test_missing_sheet() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_workbook("request.xlsx", "Sheet1", &[vec!["cmor_label"]])
        .unwrap();

    let error = runner.expect_failure(&["show", path.to_str().unwrap(), "--quiet"]);
    assert!(matches!(error, DreqError::SheetNotFound { .. }));
}

#[test]
fn test_removed_csv_in_missing_directory() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let old = fixture
        .create_request_csv("old.csv", &sample_data::old_request())
        .unwrap();
    let target = fixture.path("no_such_dir").join("removed.csv");

    let error = runner.expect_failure(&[
        "diff",
        old.to_str().unwrap(),
        old.to_str().unwrap(),
        "--removed-csv",
        target.to_str().unwrap(),
        "--quiet",
    ]);
    assert!(matches!(error, DreqError::Io(_)));
}

#[test]
fn test_missing_config_file() {
    let runner = CliTestRunner::new().unwrap();
    let error = runner.expect_failure(&["--config", "/nonexistent/dreq.json", "config"]);
    assert!(error.to_string().contains("Failed to read config file"));
}
