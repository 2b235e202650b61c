// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_parse_command_line() {
    let cmd = CommandLine::parse("/usr/sbin/exportfs   -r").unwrap();
    assert_eq!(cmd.program(), "/usr/sbin/exportfs");
    assert_eq!(cmd.args(), ["-r"]);
    assert_eq!(cmd.to_string(), "/usr/sbin/exportfs -r");
}

#[rstest]
#[case("")]
#[case("   ")]
fn test_parse_empty_command(#[case] line: &str) {
    assert!(matches!(
        CommandLine::parse(line),
        Err(Error::ValidationFailed(_))
    ));
}

#[rstest]
fn test_deserialize_string_and_list() {
    let line: CommandLine = serde_yaml::from_str("systemctl restart nfs-server").unwrap();
    let argv: CommandLine = serde_yaml::from_str("[systemctl, restart, nfs-server]").unwrap();
    assert_eq!(line, argv);
}

#[rstest]
fn test_serialize_keeps_arguments_with_spaces() {
    let cmd = CommandLine::new("sh", ["-c", "exit 0"]);
    let yaml = serde_yaml::to_string(&cmd).unwrap();
    let back: CommandLine = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, cmd);
}

#[rstest]
fn test_run_reports_exit_status() {
    let executor = SystemExecutor::new(Vec::new());
    let out = executor
        .run(&CommandLine::new("sh", ["-c", "echo hello; exit 3"]))
        .unwrap();
    assert_eq!(out.status, Some(3));
    assert!(!out.success());
    assert!(out.output.contains("hello"));

    let err = out
        .check(&CommandLine::new("sh", ["-c", "exit 3"]))
        .expect_err("non-zero exit should fail the check");
    assert!(matches!(err, Error::CommandFailed { status: Some(3), .. }));
}

#[rstest]
fn test_run_missing_program() {
    let executor = SystemExecutor::new(Vec::new());
    let err = executor
        .run(&CommandLine::new("/nonexistent/hostnfs-test-program", Vec::<String>::new()))
        .expect_err("program does not exist");
    assert!(matches!(err, Error::SpawnFailed { .. }));
    assert!(err.is_transient());
}

#[rstest]
fn test_run_elevated_uses_prefix() {
    // `env` runs the command unchanged, standing in for sudo.
    let executor = SystemExecutor::new(vec!["env".to_string()]);
    let out = executor
        .run_elevated(&CommandLine::new("sh", ["-c", "exit 0"]))
        .unwrap();
    assert!(out.success());
}

#[rstest]
#[case::direct(Vec::new())]
#[case::elevated(vec!["env".to_string()])]
fn test_replace_file_keeps_backup(#[case] elevate_with: Vec<String>) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("exports");
    let backup = tmp.path().join("exports.bak");
    std::fs::write(&path, "old\n").unwrap();

    let executor = SystemExecutor::new(elevate_with);
    executor
        .replace_file_elevated(&path, Some("old\n"), "new\n", Some(&backup))
        .unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    assert_eq!(std::fs::read_to_string(&backup).unwrap(), "old\n");
}

#[rstest]
#[case::direct(Vec::new())]
#[case::elevated(vec!["env".to_string()])]
fn test_replace_file_creates_missing_file(#[case] elevate_with: Vec<String>) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("exports");
    let backup = tmp.path().join("exports.bak");

    let executor = SystemExecutor::new(elevate_with);
    executor
        .replace_file_elevated(&path, None, "line\n", Some(&backup))
        .unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    assert!(!backup.exists());
}

#[rstest]
#[case::direct(Vec::new())]
#[case::elevated(vec!["env".to_string()])]
fn test_replace_file_missing_directory(#[case] elevate_with: Vec<String>) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing").join("exports");

    let executor = SystemExecutor::new(elevate_with);
    let err = executor
        .replace_file_elevated(&path, None, "line\n", None)
        .expect_err("parent directory does not exist");
    assert!(matches!(err, Error::WriteFailed { .. }));
}

#[rstest]
#[case::direct(Vec::new())]
#[case::elevated(vec!["env".to_string()])]
fn test_replace_file_refuses_changed_file(#[case] elevate_with: Vec<String>) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("exports");
    std::fs::write(&path, "old\n/srv/foreign 10.9.9.9(ro)\n").unwrap();

    let executor = SystemExecutor::new(elevate_with);
    let err = executor
        .replace_file_elevated(&path, Some("old\n"), "new\n", None)
        .expect_err("file no longer matches what was read");

    assert!(matches!(err, Error::FileChanged { .. }));
    assert!(!err.is_transient());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "old\n/srv/foreign 10.9.9.9(ro)\n"
    );
}

#[rstest]
#[case::direct(Vec::new())]
#[case::elevated(vec!["env".to_string()])]
fn test_replace_file_refuses_file_created_meanwhile(#[case] elevate_with: Vec<String>) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("exports");
    std::fs::write(&path, "/srv/foreign 10.9.9.9(ro)\n").unwrap();

    let executor = SystemExecutor::new(elevate_with);
    let err = executor
        .replace_file_elevated(&path, None, "new\n", None)
        .expect_err("file appeared after it was read");
    assert!(matches!(err, Error::FileChanged { .. }));
}

#[rstest]
fn test_replace_file_detects_edit_made_during_elevation() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("exports");
    std::fs::write(&path, "old\n").unwrap();

    // The prefix edits the target before handing over, like another program
    // writing while a password is typed. "$5" is the target path.
    let executor = SystemExecutor::new(vec![
        "sh".to_string(),
        "-c".to_string(),
        r#"printf '/srv/foreign 10.9.9.9(ro)\n' >> "$5"; exec "$@""#.to_string(),
        "wrap".to_string(),
    ]);
    let err = executor
        .replace_file_elevated(&path, Some("old\n"), "new\n", None)
        .expect_err("edit during elevation must be detected");

    assert!(matches!(err, Error::FileChanged { .. }));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "old\n/srv/foreign 10.9.9.9(ro)\n"
    );
}

#[rstest]
fn test_replace_file_reports_script_stderr() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing").join("exports");

    let executor = SystemExecutor::new(vec!["env".to_string()]);
    let err = executor
        .replace_file_elevated(&path, None, &"x".repeat(1 << 20), None)
        .expect_err("parent directory does not exist");

    match err {
        Error::WriteFailed { error, .. } => {
            let message = error.to_string();
            assert!(message.contains("mktemp"), "unexpected reason: {message}");
        }
        other => panic!("expected WriteFailed, got {other:?}"),
    }
}
