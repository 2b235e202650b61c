// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for host collaborators.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::exec::{CommandLine, CommandOutput, Executor};
use crate::notify::{Notice, Notifier};
use crate::render::LinuxExportsRenderer;
use crate::{Error, HostConfig, NfsHost, Result};

/// One call made against a [`FakeExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(String),
    Elevated(String),
    Replace(PathBuf),
}

enum Response {
    Status(i32),
    SpawnFailure,
}

#[derive(Default)]
struct FakeState {
    invocations: Vec<Invocation>,
    responses: HashMap<String, VecDeque<Response>>,
    fail_writes: bool,
    interleaved: VecDeque<String>,
}

/// Records every command instead of running it.
///
/// Commands exit 0 unless scripted otherwise. Scripted responses are used in
/// order and the last one repeats. File replacement writes straight to disk
/// after the same snapshot check the real executor makes.
#[derive(Default)]
pub struct FakeExecutor {
    state: Mutex<FakeState>,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, command: &str, statuses: &[i32]) {
        let mut state = self.state.lock().unwrap();
        let queue = state.responses.entry(command.to_string()).or_default();
        queue.extend(statuses.iter().copied().map(Response::Status));
    }

    pub fn fail_spawn(&self, command: &str) {
        let mut state = self.state.lock().unwrap();
        let queue = state.responses.entry(command.to_string()).or_default();
        queue.push_back(Response::SpawnFailure);
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    /// Append `text` to the target just before the next replacement, as
    /// another program would while the password prompt is up.
    pub fn append_before_write(&self, text: &str) {
        self.state
            .lock()
            .unwrap()
            .interleaved
            .push_back(text.to_string());
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().unwrap().invocations.clone()
    }

    pub fn runs(&self) -> Vec<String> {
        self.filtered(|i| match i {
            Invocation::Run(cmd) => Some(cmd.clone()),
            _ => None,
        })
    }

    pub fn elevated(&self) -> Vec<String> {
        self.filtered(|i| match i {
            Invocation::Elevated(cmd) => Some(cmd.clone()),
            _ => None,
        })
    }

    pub fn replacements(&self) -> usize {
        self.filtered(|i| match i {
            Invocation::Replace(path) => Some(path.clone()),
            _ => None,
        })
        .len()
    }

    fn filtered<T>(&self, f: impl Fn(&Invocation) -> Option<T>) -> Vec<T> {
        self.invocations().iter().filter_map(f).collect()
    }

    fn respond_to(&self, invocation: Invocation, command: &CommandLine) -> Result<CommandOutput> {
        let mut state = self.state.lock().unwrap();
        state.invocations.push(invocation);
        let key = command.to_string();
        let response = match state.responses.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().map(|r| match r {
                Response::Status(code) => Response::Status(*code),
                Response::SpawnFailure => Response::SpawnFailure,
            }),
            None => None,
        };
        match response.unwrap_or(Response::Status(0)) {
            Response::Status(code) => Ok(CommandOutput {
                status: Some(code),
                output: String::new(),
            }),
            Response::SpawnFailure => Err(Error::SpawnFailed {
                command: key,
                error: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.respond_to(Invocation::Run(command.to_string()), command)
    }

    fn run_elevated(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.respond_to(Invocation::Elevated(command.to_string()), command)
    }

    fn replace_file_elevated(
        &self,
        path: &Path,
        expected: Option<&str>,
        contents: &str,
        backup: Option<&Path>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.invocations.push(Invocation::Replace(path.to_path_buf()));
        let write_failed = |error| Error::WriteFailed {
            path: path.to_path_buf(),
            error,
        };
        if state.fail_writes {
            return Err(write_failed(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )));
        }
        if let Some(text) = state.interleaved.pop_front() {
            let mut current = std::fs::read_to_string(path).unwrap_or_default();
            current.push_str(&text);
            std::fs::write(path, current).map_err(write_failed)?;
        }

        let current = std::fs::read_to_string(path).ok();
        if current.as_deref() != expected {
            return Err(Error::FileChanged {
                path: path.to_path_buf(),
            });
        }
        if let Some(backup) = backup {
            if path.exists() {
                std::fs::copy(path, backup).map_err(write_failed)?;
            }
        }
        std::fs::write(path, contents).map_err(write_failed)
    }
}

/// Collects notices for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Default config with the exports file inside `dir`.
pub fn test_config(dir: &Path) -> HostConfig {
    HostConfig {
        exports_path: dir.join("exports"),
        ..HostConfig::default()
    }
}

/// A host backed by fakes, exporting into `dir`.
pub fn fake_host(
    dir: &Path,
    executor: &Arc<FakeExecutor>,
    notifier: &Arc<RecordingNotifier>,
) -> NfsHost {
    let config = test_config(dir);
    let renderer = Arc::new(LinuxExportsRenderer::new(config.markers()));
    NfsHost::with_collaborators(config, executor.clone(), renderer, notifier.clone())
}

/// The default status command, for scripting service state.
pub const STATUS_COMMAND: &str = "/etc/init.d/nfs-kernel-server status";

/// The default reload command.
pub const APPLY_COMMAND: &str = "/usr/sbin/exportfs -r";

/// The default start command.
pub const START_COMMAND: &str = "/etc/init.d/nfs-kernel-server start";

/// The default probe command.
pub const PROBE_COMMAND: &str = "grep -qw nfsd /proc/filesystems";
