// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Keeping the exports file in sync with the exports that should exist.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::exec::Executor;
use crate::exports::{ExportsDocument, ExportsFile};
use crate::notify::{Notice, Notifier};
use crate::render::{ExportRenderer, ExportRequest};
use crate::retry::RetryPolicy;
use crate::service::{Activation, ServiceActivator};
use crate::{Error, ExportId, FolderMapping, Result};

#[cfg(test)]
#[path = "./reconcile_test.rs"]
mod reconcile_test;

/// Times an edit is attempted when the exports file keeps changing under it.
pub const COMMIT_ATTEMPTS: u32 = 3;

/// Outcome of a successful [`ExportReconciler::export`].
#[derive(Debug)]
pub struct ExportReport {
    pub id: ExportId,
    /// Activation is attempted after the exports file has been written. A
    /// failure here leaves the file correct but the server possibly stale.
    pub activation: Result<Activation>,
}

impl ExportReport {
    pub fn activated(&self) -> bool {
        self.activation.is_ok()
    }
}

/// Outcome of a successful [`ExportReconciler::prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Ids whose blocks were removed, in file order.
    pub pruned: Vec<String>,
    /// Ids that were found and kept.
    pub kept: Vec<String>,
}

/// Owns the delimited blocks of the exports file.
///
/// All mutating operations are serialized by an internal lock and commit
/// their changes with a single elevated replace of the whole file.
pub struct ExportReconciler {
    exports: ExportsFile,
    executor: Arc<dyn Executor>,
    renderer: Arc<dyn ExportRenderer>,
    notifier: Arc<dyn Notifier>,
    activator: ServiceActivator,
    lock: Mutex<()>,
}

impl ExportReconciler {
    pub fn new(
        exports: ExportsFile,
        executor: Arc<dyn Executor>,
        renderer: Arc<dyn ExportRenderer>,
        notifier: Arc<dyn Notifier>,
        activator: ServiceActivator,
    ) -> Self {
        Self {
            exports,
            executor,
            renderer,
            notifier,
            activator,
            lock: Mutex::new(()),
        }
    }

    pub fn exports_file(&self) -> &ExportsFile {
        &self.exports
    }

    pub fn activator(&self) -> &ServiceActivator {
        &self.activator
    }

    /// Export `folders` to `client_address` under `id`, then activate.
    ///
    /// Any existing block for `id` (complete or not) is replaced, so
    /// repeating an export never duplicates it. The removal and the new
    /// block are written together in one elevated step. Write failures
    /// abort before activation; activation failures are returned in the
    /// report.
    pub fn export(
        &self,
        id: &ExportId,
        client_address: &str,
        folders: &[FolderMapping],
    ) -> Result<ExportReport> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let rendered = self.renderer.render(&ExportRequest {
            id,
            client_address,
            folders,
        })?;

        self.notifier.notify(Notice::ExportStarting);
        self.commit(|document| {
            let mut document = document
                .unwrap_or_else(|| ExportsDocument::new(self.exports.markers().clone()));
            if document.remove(id.as_str()) {
                tracing::debug!(%id, "Removed previous export block");
            }
            document.append_block(id, &rendered)?;
            Ok((Some(document), ()))
        })?;
        tracing::info!(%id, client = client_address, folders = folders.len(), "Exported folders");

        let activation = self.activator.activate();
        if let Err(err) = &activation {
            tracing::warn!(%id, "Exports file updated but NFS service was not activated: {err}");
        }
        Ok(ExportReport {
            id: id.clone(),
            activation,
        })
    }

    /// Remove every block whose id is not in `valid_ids`.
    ///
    /// Kept ids end up with exactly one terminated block and stray `END`
    /// markers are dropped. A missing exports file has nothing to prune. The
    /// user is notified at most once per call, and only when something is
    /// removed.
    pub fn prune(&self, valid_ids: &HashSet<String>) -> Result<PruneReport> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut notified = false;
        self.commit(|document| {
            let Some(mut document) = document else {
                return Ok((None, PruneReport::default()));
            };

            tracing::info!("Pruning invalid NFS entries...");
            let mut report = PruneReport::default();
            for id in document.ids() {
                if valid_ids.contains(&id) {
                    tracing::debug!(%id, "Valid ID");
                    report.kept.push(id);
                    continue;
                }

                if !notified {
                    self.notifier.notify(Notice::PruningInvalid);
                    notified = true;
                }
                tracing::info!(%id, "Invalid ID, pruning");
                document.remove(&id);
                report.pruned.push(id);
            }

            let repaired = document.repair();
            if repaired {
                tracing::info!("Repaired malformed export blocks");
            }
            let changed = repaired || !report.pruned.is_empty();
            Ok((changed.then_some(document), report))
        })
    }

    /// Remove the block for `id`.
    ///
    /// Returns whether anything was removed. When there is no block (or no
    /// file) nothing is written at all.
    pub fn cleanup(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let removed = self.commit(|document| match document {
            Some(mut document) => {
                if document.remove(id) {
                    Ok((Some(document), true))
                } else {
                    Ok((None, false))
                }
            }
            None => Ok((None, false)),
        })?;
        if removed {
            tracing::debug!(%id, "Removed export block");
        }
        Ok(removed)
    }

    /// Load the exports file, apply `edit` and store the document it returns.
    ///
    /// When the file changes between the read and the elevated write the
    /// whole edit is redone against the new contents.
    fn commit<T, F>(&self, mut edit: F) -> Result<T>
    where
        F: FnMut(Option<ExportsDocument>) -> Result<(Option<ExportsDocument>, T)>,
    {
        RetryPolicy::new(COMMIT_ATTEMPTS, Duration::ZERO).run(
            |attempt| {
                let (document, value) = edit(self.exports.load()?)?;
                if let Some(document) = document {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Exports file changed, editing again");
                    }
                    self.exports.store(&document, self.executor.as_ref())?;
                }
                Ok(value)
            },
            |err| matches!(err, Error::FileChanged { .. }),
        )
    }

    /// Ids currently recorded in the exports file, in file order.
    pub fn exported_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .exports
            .load()?
            .map(|document| document.ids())
            .unwrap_or_default())
    }
}
