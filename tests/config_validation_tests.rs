//! Config Validation Tests
//!
//! Loading from disk, typo detection, and value validation, exercised
//! independently from the engine.

use std::io::Write;

use ipv6_sentry::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use ipv6_sentry::config::{ConfigError, SentryConfig};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_interface_section_warns_with_suggestion() {
    let toml_str = r#"
[interfaces.primary]
devce = "en0"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "interfaces.primary.devce");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("interfaces.primary.device")
    );
}

#[test]
fn misspelled_section_warns_for_section_and_children() {
    let toml_str = r#"
[shedule]
interval_secs = 120
"#;
    let warnings = validate_unknown_keys(toml_str);
    let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
    assert!(fields.contains(&"shedule"));
    assert!(fields.contains(&"shedule.interval_secs"));
    let section = warnings.iter().find(|w| w.field == "shedule").unwrap();
    assert_eq!(section.suggestion.as_deref(), Some("schedule"));
}

#[test]
fn unrelated_key_has_no_suggestion() {
    let warnings = validate_unknown_keys("[probe]\ncompletely_unrelated_setting = 1\n");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].suggestion.is_none());
}

#[test]
fn valid_full_config_has_no_warnings() {
    let text = SentryConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&text).is_empty(), "defaults serialize to known keys only");
}

#[test]
fn malformed_toml_yields_no_warnings() {
    assert!(validate_unknown_keys("[repair\ncooldown_secs = ").is_empty());
}

#[test]
fn suggestion_is_deterministic() {
    let known = known_config_keys();
    let first = suggest_correction("repair.setle_secs", &known);
    for _ in 0..10 {
        assert_eq!(suggest_correction("repair.setle_secs", &known), first);
    }
    assert_eq!(first.as_deref(), Some("repair.settle_secs"));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn load_from_file_applies_values_and_defaults() {
    let file = write_config(
        r#"
[interfaces.primary]
device = "en5"
service = "USB 10/100/1000 LAN"

[interfaces.secondary]
device = "en0"
service = "Wi-Fi"

[repair]
auto_fix = false
cooldown_secs = 300

[server]
addr = "127.0.0.1:9900"
"#,
    );

    let config = SentryConfig::load_from_file(file.path()).unwrap();
    let primary = config.interfaces.primary.to_interface_id();
    assert_eq!(primary.device, "en5");
    assert_eq!(primary.service, "USB 10/100/1000 LAN");
    assert!(!config.repair.auto_fix);
    assert_eq!(config.repair.cooldown_secs, 300);
    assert_eq!(config.server.addr, "127.0.0.1:9900");
    // untouched sections keep their defaults
    assert_eq!(config.schedule.interval_secs, 300);
    assert_eq!(config.probe.targets.len(), 2);
}

#[test]
fn load_from_file_reports_path_on_parse_error() {
    let file = write_config("[repair]\ncooldown_secs = \"soon\"\n");
    let err = SentryConfig::load_from_file(file.path()).unwrap_err();
    match &err {
        ConfigError::Parse(path, _) => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other}"),
    }
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn typo_does_not_fail_loading() {
    let file = write_config("[repair]\ncooldwn_secs = 5\n");
    let config = SentryConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.repair.cooldown_secs, 60);
}

// ============================================================================
// Value Validation
// ============================================================================

#[test]
fn every_problem_is_reported_at_once() {
    let file = write_config(
        r#"
[probe]
targets = ["ftp://example.com/"]
timeout_secs = 0

[log]
max_entries = 0
"#,
    );
    let err = SentryConfig::load_from_file(file.path()).unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert_eq!(errors.len(), 3, "got: {errors:?}");
            assert!(errors.iter().any(|e| e.contains("ftp://example.com/")));
            assert!(errors.iter().any(|e| e.contains("probe.timeout_secs")));
            assert!(errors.iter().any(|e| e.contains("log.max_entries")));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn empty_primary_device_is_rejected() {
    let err = SentryConfig::from_toml_str("[interfaces.primary]\ndevice = \"\"\n").unwrap_err();
    assert!(err.to_string().contains("interfaces.primary.device"));
}

#[test]
fn missing_service_falls_back_to_device() {
    let config = SentryConfig::from_toml_str("[interfaces.secondary]\ndevice = \"wlan1\"\n").unwrap();
    let id = config.interfaces.secondary.to_interface_id();
    assert_eq!(id.device, "wlan1");
    assert_eq!(id.service, "wlan1");
}
