// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_parse_minimal_config() {
    let yaml = r#"
api: hostnfs/v0
"#;
    let config = HostConfig::from_yaml(yaml).expect("Should parse minimal config");
    assert_eq!(config, HostConfig::default());
}

#[rstest]
fn test_empty_config_is_default() {
    let config = HostConfig::from_yaml("").expect("Should accept an empty file");
    assert_eq!(config.exports_path, PathBuf::from("/etc/exports"));
    assert_eq!(config.marker, "VAGRANT");
    assert_eq!(config.elevate_with, vec!["sudo"]);
    assert_eq!(config.probe.attempts, 10);
}

#[rstest]
fn test_parse_full_config() {
    let yaml = r#"
api: hostnfs/v0
exports_path: /tmp/exports
marker: HOSTNFS
backup_suffix: null
elevate_with: [doas]
service:
  apply: exportfs -ra
  status: [systemctl, is-active, --quiet, nfs-server]
  start: systemctl start nfs-server
probe:
  command: grep -qw nfsd /proc/filesystems
  attempts: 3
  delay_ms: 250
"#;
    let config = HostConfig::from_yaml(yaml).expect("Should parse full config");
    assert_eq!(config.exports_path, PathBuf::from("/tmp/exports"));
    assert_eq!(config.marker, "HOSTNFS");
    assert_eq!(config.backup_suffix, None);
    assert_eq!(config.elevate_with, vec!["doas"]);
    assert_eq!(config.service.apply.to_string(), "exportfs -ra");
    assert_eq!(
        config.service.status.to_string(),
        "systemctl is-active --quiet nfs-server"
    );
    assert_eq!(config.probe.policy().max_attempts, 3);
    assert_eq!(config.probe.policy().delay, Duration::from_millis(250));
}

#[rstest]
fn test_partial_service_section_keeps_defaults() {
    let yaml = r#"
service:
  start: systemctl start nfs-server
"#;
    let config = HostConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.service.start.to_string(), "systemctl start nfs-server");
    assert_eq!(config.service.apply.to_string(), "/usr/sbin/exportfs -r");
}

#[rstest]
#[case("marker: ''")]
#[case("marker: two words")]
#[case("backup_suffix: ''")]
#[case("probe:\n  attempts: 0")]
#[case("service:\n  apply: ''")]
fn test_invalid_values(#[case] yaml: &str) {
    assert!(HostConfig::from_yaml(yaml).is_err());
}

#[rstest]
fn test_parse_invalid_yaml() {
    let yaml = r#"
api: hostnfs/v0
elevate_with: [
  unclosed bracket
"#;
    let result = HostConfig::from_yaml(yaml);
    assert!(matches!(result, Err(crate::Error::InvalidYaml { .. })));
}

#[rstest]
fn test_unknown_api_version() {
    let result = HostConfig::from_yaml("api: hostnfs/v9\n");
    assert!(result.is_err());
}

#[rstest]
fn test_default_round_trips() {
    let yaml = serde_yaml::to_string(&HostConfig::default()).unwrap();
    let back = HostConfig::from_yaml(yaml).unwrap();
    assert_eq!(back, HostConfig::default());
}

#[rstest]
fn test_load_records_source_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, "marker: TEST\n").unwrap();

    let config = HostConfig::load(&path).unwrap();
    assert_eq!(config.marker, "TEST");
    assert_eq!(config.source_path, Some(path.clone()));

    let explicit = HostConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(explicit.marker, "TEST");
}

#[rstest]
fn test_load_missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = HostConfig::load(tmp.path().join("nope.yaml"));
    assert!(matches!(result, Err(crate::Error::ReadFailed { .. })));
}

#[rstest]
fn test_exports_file_backup_path() {
    let config = HostConfig::default();
    let file = config.exports_file();
    assert_eq!(file.path(), Path::new("/etc/exports"));
    assert_eq!(file.backup_path(), Some(PathBuf::from("/etc/exports.bak")));

    let no_backup = HostConfig {
        backup_suffix: None,
        ..HostConfig::default()
    };
    assert_eq!(no_backup.exports_file().backup_path(), None);
}
