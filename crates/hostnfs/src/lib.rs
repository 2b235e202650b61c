// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! hostnfs - Host NFS Export Management
//!
//! This crate manages the NFS exports a host offers to guest virtual machines
//! so that they can mount host folders.
//!
//! # Overview
//!
//! Each export request is identified by a unique id and recorded as a
//! delimited block in the shared exports file (`/etc/exports`), leaving every
//! other line of that file alone. Exporting the same id again replaces its
//! block, pruning removes the blocks of ids that are no longer wanted, and
//! after each export the NFS server is either told to re-read its table or
//! started if it was not running. Edits need administrator rights and are
//! made in one elevated step per operation.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashSet;
//!
//! use hostnfs::{ExportId, FolderMapping, HostConfig, NfsHost};
//!
//! # fn main() -> hostnfs::Result<()> {
//! let host = NfsHost::new(HostConfig::load_or_default(None)?)?;
//! if host.nfs_supported() {
//!     let id = ExportId::new("1f0e6b8a-7c3d-4a5e-9b21-0c8d7e6f5a4b")?;
//!     let folders = vec![FolderMapping::new("/home/me/project", "/vagrant")];
//!     host.export(&id, "192.168.56.10", &folders)?;
//!
//!     let valid: HashSet<String> = [id.to_string()].into_iter().collect();
//!     host.prune(&valid)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod exports;
pub mod folder;
pub mod host;
pub mod id;
pub mod notify;
pub mod reconcile;
pub mod render;
pub mod retry;
pub mod service;

#[cfg(test)]
mod fixtures;

pub use config::{HostConfig, ProbeConfig, default_config_path};
pub use error::{Error, Result};
pub use exec::{CommandLine, CommandOutput, Executor, SystemExecutor};
pub use exports::{ExportsDocument, ExportsFile, Markers};
pub use folder::FolderMapping;
pub use host::NfsHost;
pub use id::ExportId;
pub use notify::{LogNotifier, Notice, Notifier};
pub use reconcile::{ExportReconciler, ExportReport, PruneReport};
pub use render::{ExportRenderer, ExportRequest, LinuxExportsRenderer};
pub use retry::RetryPolicy;
pub use service::{Activation, ServiceActivator, ServiceCommands};

/// Well-known location of the exports file.
pub const DEFAULT_EXPORTS_PATH: &str = "/etc/exports";

/// Default word in block markers, shared with existing exports files.
pub const DEFAULT_MARKER: &str = "VAGRANT";

/// Well-known filename for the host configuration.
pub const CONFIG_FILENAME: &str = "config.yaml";
