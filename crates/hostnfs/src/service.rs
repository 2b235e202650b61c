// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Bringing the NFS service in line with the exports file.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::exec::{CommandLine, Executor};
use crate::retry::RetryPolicy;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./service_test.rs"]
mod service_test;

/// Commands used to inspect and drive the NFS server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceCommands {
    /// Re-export the current table without interrupting the server.
    pub apply: CommandLine,
    /// Exits zero when the server is running.
    pub status: CommandLine,
    /// Starts a stopped server.
    pub start: CommandLine,
}

impl Default for ServiceCommands {
    fn default() -> Self {
        Self {
            apply: CommandLine::new("/usr/sbin/exportfs", ["-r"]),
            status: CommandLine::new("/etc/init.d/nfs-kernel-server", ["status"]),
            start: CommandLine::new("/etc/init.d/nfs-kernel-server", ["start"]),
        }
    }
}

/// What [`ServiceActivator::activate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The running server re-read the exports table.
    Reloaded,
    /// The server was stopped and has been started.
    Started,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Reloaded => f.write_str("reloaded"),
            Activation::Started => f.write_str("started"),
        }
    }
}

/// Probes and activates the NFS service. Holds no state between calls.
#[derive(Clone)]
pub struct ServiceActivator {
    executor: Arc<dyn Executor>,
    commands: ServiceCommands,
    probe_command: CommandLine,
    probe_policy: RetryPolicy,
}

impl ServiceActivator {
    pub fn new(
        executor: Arc<dyn Executor>,
        commands: ServiceCommands,
        probe_command: CommandLine,
        probe_policy: RetryPolicy,
    ) -> Self {
        Self {
            executor,
            commands,
            probe_command,
            probe_policy,
        }
    }

    pub fn commands(&self) -> &ServiceCommands {
        &self.commands
    }

    /// Whether the kernel supports serving NFS.
    ///
    /// An inconclusive probe counts as unsupported.
    pub fn probe(&self) -> bool {
        match self.try_probe() {
            Ok(supported) => supported,
            Err(err) => {
                tracing::warn!("Assuming NFS is unsupported: {err}");
                false
            }
        }
    }

    /// Like [`ServiceActivator::probe`], but reports an exhausted retry
    /// budget as [`Error::ProbeInconclusive`].
    ///
    /// The probe command exits 0 when nfsd is listed and 1 when it is not.
    /// Any other outcome is treated as transient and retried.
    pub fn try_probe(&self) -> Result<bool> {
        let result = self.probe_policy.run(
            |attempt| {
                tracing::trace!(attempt, "Probing for nfsd support");
                let out = self.executor.run(&self.probe_command)?;
                match out.status {
                    Some(0) => Ok(true),
                    Some(1) => Ok(false),
                    _ => out.check(&self.probe_command).map(|_| false),
                }
            },
            Error::is_transient,
        );

        match result {
            Err(err) if err.is_transient() => {
                tracing::debug!("Last probe failure: {err}");
                Err(Error::ProbeInconclusive {
                    attempts: self.probe_policy.max_attempts.max(1),
                })
            }
            other => other,
        }
    }

    /// Whether the NFS server is currently running. Never fails.
    pub fn is_running(&self) -> bool {
        match self.executor.run(&self.commands.status) {
            Ok(out) => out.success(),
            Err(err) => {
                tracing::debug!("Treating NFS server as stopped: {err}");
                false
            }
        }
    }

    /// Make the server serve the current exports file.
    ///
    /// A running server only re-reads its table; a stopped one is started.
    pub fn activate(&self) -> Result<Activation> {
        let (command, activation) = if self.is_running() {
            (&self.commands.apply, Activation::Reloaded)
        } else {
            (&self.commands.start, Activation::Started)
        };

        tracing::debug!(%command, %activation, "Activating NFS exports");
        self.executor.run_elevated(command)?.check(command)?;
        Ok(activation)
    }
}

impl fmt::Debug for ServiceActivator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceActivator")
            .field("commands", &self.commands)
            .field("probe_command", &self.probe_command)
            .field("probe_policy", &self.probe_policy)
            .finish_non_exhaustive()
    }
}
