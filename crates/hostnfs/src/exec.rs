// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Running host commands, optionally with elevated privileges.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./exec_test.rs"]
mod exec_test;

/// Exit status of [`REPLACE_FILE_SCRIPT`] when the target no longer holds
/// the expected contents.
const FILE_CHANGED_STATUS: i32 = 75;

/// Replaces the target file atomically from stdin while elevated.
///
/// `$1` is the target, `$2` the backup path (empty for none) and `$3` a file
/// holding the contents the caller expects the target to have (empty when
/// the target should not exist). The comparison runs after elevation, so
/// edits made while waiting for a password are detected instead of lost.
/// The new contents land in a temporary file beside the target that
/// inherits the target's mode and owner, and are renamed into place only
/// once complete.
const REPLACE_FILE_SCRIPT: &str = r#"set -e
target="$1"
backup="$2"
expected="$3"
if [ -n "$expected" ]; then
  [ -e "$target" ] && cmp -s "$expected" "$target" || exit 75
elif [ -e "$target" ]; then
  exit 75
fi
tmp=$(mktemp "$target.XXXXXX")
trap 'rm -f "$tmp"' EXIT
if [ -e "$target" ]; then
  [ -z "$backup" ] || cp -p "$target" "$backup"
  cp -p "$target" "$tmp"
else
  chmod 644 "$tmp"
fi
cat > "$tmp"
mv -f "$tmp" "$target"
"#;

/// A program and its arguments.
///
/// In configuration files a command is either a single string, split on
/// whitespace, or a list of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "CommandSpec", into = "CommandSpec")]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command on whitespace. No shell quoting is interpreted.
    pub fn parse(line: &str) -> Result<Self> {
        Self::from_argv(line.split_whitespace().map(String::from).collect())
    }

    fn from_argv(argv: Vec<String>) -> Result<Self> {
        let mut argv = argv.into_iter();
        match argv.next() {
            Some(program) if !program.is_empty() => Ok(Self {
                program,
                args: argv.collect(),
            }),
            _ => Err(Error::ValidationFailed("command must not be empty".to_string())),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl TryFrom<CommandSpec> for CommandLine {
    type Error = Error;

    fn try_from(spec: CommandSpec) -> Result<Self> {
        match spec {
            CommandSpec::Line(line) => Self::parse(&line),
            CommandSpec::Argv(argv) => Self::from_argv(argv),
        }
    }
}

impl From<CommandLine> for CommandSpec {
    fn from(command: CommandLine) -> Self {
        if command.args.iter().any(|a| a.contains(char::is_whitespace)) {
            let mut argv = vec![command.program];
            argv.extend(command.args);
            CommandSpec::Argv(argv)
        } else {
            CommandSpec::Line(command.to_string())
        }
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn an unsuccessful exit into [`Error::CommandFailed`].
    pub fn check(self, command: &CommandLine) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                status: self.status,
                output: self.output,
            })
        }
    }
}

/// The capability to run commands on the host.
///
/// A non-zero exit status is reported through [`CommandOutput`], not as an
/// error; only failing to launch the program is an error.
pub trait Executor: Send + Sync {
    /// Run a command with the caller's privileges.
    fn run(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Run a command with elevated privileges.
    fn run_elevated(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Replace `path` with `contents` in one elevated step, first copying the
    /// old file to `backup` when given.
    ///
    /// `expected` is what the caller last read from `path`, `None` when it
    /// did not exist. If the file no longer matches at the moment of writing
    /// nothing is changed and [`Error::FileChanged`] is returned. Any other
    /// failure is [`Error::WriteFailed`].
    fn replace_file_elevated(
        &self,
        path: &Path,
        expected: Option<&str>,
        contents: &str,
        backup: Option<&Path>,
    ) -> Result<()>;
}

/// Runs commands as real host processes.
///
/// Elevation prefixes the command with `elevate_with` (for example `sudo`).
/// With an empty prefix everything runs directly, which is what a process
/// that is already root wants.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    elevate_with: Vec<String>,
}

impl SystemExecutor {
    pub fn new(elevate_with: Vec<String>) -> Self {
        Self { elevate_with }
    }

    fn elevated(&self, command: &CommandLine) -> Command {
        match self.elevate_with.split_first() {
            Some((program, prefix)) => {
                let mut cmd = Command::new(program);
                cmd.args(prefix).arg(&command.program).args(&command.args);
                cmd
            }
            None => command.to_command(),
        }
    }

    fn execute(&self, mut cmd: Command, shown: String) -> Result<CommandOutput> {
        tracing::debug!(command = %shown, "Running");
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|error| Error::SpawnFailed {
                command: shown.clone(),
                error,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let status = output.status.code();
        tracing::debug!(command = %shown, ?status, "Finished");
        Ok(CommandOutput {
            status,
            output: text,
        })
    }

    fn replace_directly(
        &self,
        path: &Path,
        expected: Option<&str>,
        contents: &str,
        backup: Option<&Path>,
    ) -> Result<()> {
        let write_failed = |error| Error::WriteFailed {
            path: path.to_path_buf(),
            error,
        };
        let current = match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
            Err(error) => return Err(write_failed(error)),
        };
        if current.as_deref() != expected.map(str::as_bytes) {
            return Err(Error::FileChanged {
                path: path.to_path_buf(),
            });
        }

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let existing = std::fs::metadata(path).ok();
        let write = || -> std::io::Result<()> {
            if let (Some(backup), Some(_)) = (backup, &existing) {
                std::fs::copy(path, backup)?;
            }

            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(contents.as_bytes())?;
            match &existing {
                Some(meta) => tmp.as_file().set_permissions(meta.permissions())?,
                None => {
                    use std::os::unix::fs::PermissionsExt;
                    tmp.as_file()
                        .set_permissions(std::fs::Permissions::from_mode(0o644))?;
                }
            }
            tmp.as_file().sync_all()?;
            tmp.persist(path).map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(write_failed)
    }

    fn replace_elevated(
        &self,
        path: &Path,
        expected: Option<&str>,
        contents: &str,
        backup: Option<&Path>,
    ) -> Result<()> {
        let write_failed = |error| Error::WriteFailed {
            path: path.to_path_buf(),
            error,
        };

        // The snapshot is handed over as a file; stdin carries the new contents.
        let snapshot = match expected {
            Some(expected) => {
                let mut file = NamedTempFile::new().map_err(write_failed)?;
                file.write_all(expected.as_bytes()).map_err(write_failed)?;
                file.as_file().sync_all().map_err(write_failed)?;
                Some(file)
            }
            None => None,
        };
        let arg = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_default();
        let script = CommandLine::new(
            "sh",
            [
                "-c".to_string(),
                REPLACE_FILE_SCRIPT.to_string(),
                "sh".to_string(),
                path.display().to_string(),
                arg(backup),
                arg(snapshot.as_ref().map(|file| file.path())),
            ],
        );

        let mut child = self
            .elevated(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(write_failed)?;
        // The script may exit before reading stdin; its status and stderr
        // say why, so the child is always waited on.
        let piped = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(contents.as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output().map_err(write_failed)?;

        match output.status.code() {
            Some(0) => piped.map_err(write_failed),
            Some(FILE_CHANGED_STATUS) => Err(Error::FileChanged {
                path: path.to_path_buf(),
            }),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let reason = match (stderr.trim(), &piped) {
                    ("", Err(error)) => error.to_string(),
                    (stderr, _) => stderr.to_string(),
                };
                Err(write_failed(std::io::Error::other(format!(
                    "elevated replace exited with {}: {reason}",
                    output.status
                ))))
            }
        }
    }
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(vec!["sudo".to_string()])
    }
}

impl Executor for SystemExecutor {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.execute(command.to_command(), command.to_string())
    }

    fn run_elevated(&self, command: &CommandLine) -> Result<CommandOutput> {
        let shown = if self.elevate_with.is_empty() {
            command.to_string()
        } else {
            format!("{} {command}", self.elevate_with.join(" "))
        };
        self.execute(self.elevated(command), shown)
    }

    fn replace_file_elevated(
        &self,
        path: &Path,
        expected: Option<&str>,
        contents: &str,
        backup: Option<&Path>,
    ) -> Result<()> {
        if self.elevate_with.is_empty() {
            self.replace_directly(path, expected, contents, backup)
        } else {
            tracing::debug!(path = ?path, "Replacing file with elevated privileges");
            self.replace_elevated(path, expected, contents, backup)
        }
    }
}
