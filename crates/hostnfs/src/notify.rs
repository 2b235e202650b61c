// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! User-facing notices.

use std::fmt;

/// The only messages meant for the person at the keyboard. Everything else is
/// diagnostic output through `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// An export is about to edit the exports file.
    ExportStarting,
    /// Stale entries are about to be removed from the exports file.
    PruningInvalid,
}

impl Notice {
    /// Stable key for translation layers.
    pub fn key(&self) -> &'static str {
        match self {
            Notice::ExportStarting => "hostnfs.nfs_export",
            Notice::PruningInvalid => "hostnfs.nfs_prune",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::ExportStarting => {
                "Preparing to edit the NFS exports file. Administrator privileges will be required..."
            }
            Notice::PruningInvalid => {
                "Pruning invalid NFS exports. Administrator privileges will be required..."
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Receives user-facing notices. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::info!(key = notice.key(), "{notice}");
    }
}
