// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for hostnfs operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with hostnfs Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing NFS exports.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The exports file could not be replaced
    #[error("Failed to write exports file: {path:?}")]
    #[diagnostic(
        code(hostnfs::write_failed),
        help("Check that the parent directory exists and that elevation is permitted")
    )]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The file changed between reading it and replacing it
    #[error("File changed while it was being edited: {path:?}")]
    #[diagnostic(
        code(hostnfs::file_changed),
        help("Another program edited the file at the same time; run the command again")
    )]
    FileChanged { path: PathBuf },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(hostnfs::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// An external command exited unsuccessfully
    #[error("Command failed ({}): {command}", status_message(.status))]
    #[diagnostic(code(hostnfs::command_failed))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    /// An external command could not be launched
    #[error("Failed to run command: {command}")]
    #[diagnostic(
        code(hostnfs::spawn_failed),
        help("Check that the program exists and is executable")
    )]
    SpawnFailed {
        command: String,
        #[source]
        error: std::io::Error,
    },

    /// The NFS capability probe never produced a definitive answer
    #[error("NFS support could not be determined after {attempts} attempts")]
    #[diagnostic(code(hostnfs::probe_inconclusive))]
    ProbeInconclusive { attempts: u32 },

    /// Export identifier cannot be embedded in a marker line
    #[error("Invalid export id {id:?}: {reason}")]
    #[diagnostic(code(hostnfs::invalid_id))]
    InvalidId { id: String, reason: &'static str },

    /// Rendered export text carries markers for another export
    #[error("Rendered block for {id:?} contains a foreign marker: {line:?}")]
    #[diagnostic(
        code(hostnfs::malformed_block),
        help("Export templates must not emit BEGIN/END markers of other exports")
    )]
    MalformedBlock { id: String, line: String },

    /// Folder mapping could not be parsed
    #[error("Invalid folder mapping: {0}")]
    #[diagnostic(
        code(hostnfs::invalid_folder),
        help("Use HOST:GUEST or HOST:GUEST:key=value,key=value")
    )]
    InvalidFolder(String),

    /// Invalid YAML in config file
    #[error("Invalid hostnfs config: {error}")]
    #[diagnostic(
        code(hostnfs::invalid_yaml),
        help("Check YAML syntax and ensure 'api: hostnfs/v0' is present")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(hostnfs::validation_failed))]
    ValidationFailed(String),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(hostnfs::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that may succeed when the same check is repeated.
    ///
    /// Used as the retry predicate of the capability probe.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::SpawnFailed { .. } | Error::CommandFailed { .. } | Error::Io(_)
        )
    }
}

fn status_message(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}
