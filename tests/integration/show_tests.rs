//! Integration tests for the show and config commands

use crate::common::{sample_data, CliTestRunner};
use dreqdiff::{DreqConfig, DreqError};

#[test]
fn test_show_command_summary() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_request_xlsx("request.xlsx", &sample_data::old_request())
        .unwrap();

    runner.expect_success(&["show", path.to_str().unwrap(), "--quiet"]);
    runner.expect_success(&["show", path.to_str().unwrap(), "--format", "json", "--quiet"]);
}

#[test]
fn test_show_command_single_table() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_request_csv("request.csv", &sample_data::old_request())
        .unwrap();

    runner.expect_success(&["show", path.to_str().unwrap(), "--table", "Amon", "--quiet"]);
    runner.expect_success(&[
        "show",
        path.to_str().unwrap(),
        "--table",
        "Omon",
        "--format",
        "json",
        "--quiet",
    ]);
}

#[test]
fn test_show_command_unknown_table() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_request_csv("request.csv", &sample_data::old_request())
        .unwrap();

    let error = runner.expect_failure(&["show", path.to_str().unwrap(), "--table", "3hr", "--quiet"]);
    assert!(matches!(error, DreqError::InvalidInput { .. }));
}

#[test]
fn test_config_command_writes_defaults() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner.fixture().path("dreq.json");

    runner.expect_success(&["config", "--output", path.to_str().unwrap()]);
    assert_eq!(DreqConfig::load(&path).unwrap().model, "HadGEM3");

    let error = runner.expect_failure(&["config", "--output", path.to_str().unwrap()]);
    assert!(matches!(error, DreqError::Config { .. }));
    runner.expect_success(&["config", "--output", path.to_str().unwrap(), "--force"]);
}

#[test]
fn test_config_command_prints_to_stdout() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_success(&["config"]);
}
