//! Unit tests for configuration loading and model profiles

use crate::common::TestFixture;
use dreqdiff::{DreqConfig, DreqError};

#[test]
fn test_config_round_trips_through_file() {
    let fixture = TestFixture::new().unwrap();
    let config = DreqConfig {
        model: "UKESM1".to_string(),
        excluded_frequencies: vec!["fx".to_string(), "subhrPt".to_string()],
        ..DreqConfig::default()
    };
    let path = fixture.write_config("dreq.json", &config).unwrap();

    let loaded = DreqConfig::load(&path).unwrap();
    assert_eq!(loaded.model, "UKESM1");
    assert_eq!(loaded.excluded_frequencies, vec!["fx", "subhrPt"]);
    assert_eq!(loaded.sheet_name, "Diagnostics");
}

#[test]
fn test_partial_config_uses_defaults() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_file("dreq.json", r#"{ "model": "UKESM1" }"#)
        .unwrap();

    let loaded = DreqConfig::load(&path).unwrap();
    assert_eq!(loaded.model, "UKESM1");
    assert_eq!(loaded.orography_code, "m01s00i033");
    assert_eq!(loaded.excluded_section, 19);
}

#[test]
fn test_invalid_config_is_rejected() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_file("dreq.json", r#"{ "model": "" }"#).unwrap();
    assert!(DreqConfig::load(&path).is_err());

    let path = fixture.create_file("broken.json", "{ not json").unwrap();
    assert!(DreqConfig::load(&path).is_err());
}

#[test]
fn test_save_refuses_to_overwrite_without_force() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_file("dreq.json", "{}").unwrap();
    let config = DreqConfig::default();

    assert!(matches!(config.save(&path, false), Err(DreqError::Config { .. })));
    config.save(&path, true).unwrap();
    assert_eq!(DreqConfig::load(&path).unwrap().model, "HadGEM3");
}

#[test]
fn test_profile_uses_model_name() {
    let config = DreqConfig {
        model: "UKESM1".to_string(),
        ..DreqConfig::default()
    };
    let profile = config.profile().unwrap();
    assert_eq!(profile.model(), "UKESM1");
    assert_eq!(
        profile.mapping_override("UKESM1_variable_mapping:m01s01i001: other"),
        Some("m01s01i001")
    );
    assert_eq!(profile.mapping_override("HadGEM3_variable_mapping:m01s01i001:"), None);
}
