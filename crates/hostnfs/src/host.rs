// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Wiring the reconciler and service activator together for one host.

use std::collections::HashSet;
use std::sync::Arc;

use crate::exec::{Executor, SystemExecutor};
use crate::notify::{LogNotifier, Notifier};
use crate::reconcile::{ExportReconciler, ExportReport, PruneReport};
use crate::render::{ExportRenderer, LinuxExportsRenderer};
use crate::service::{Activation, ServiceActivator};
use crate::{ExportId, FolderMapping, HostConfig, Result};

#[cfg(test)]
#[path = "./host_test.rs"]
mod host_test;

/// NFS export management for the local host.
pub struct NfsHost {
    config: HostConfig,
    reconciler: ExportReconciler,
}

impl NfsHost {
    /// Build a host that runs real commands, renders Linux exports and
    /// logs notices.
    pub fn new(config: HostConfig) -> Result<Self> {
        config.validate()?;
        let executor = Arc::new(SystemExecutor::new(config.elevate_with.clone()));
        let renderer = Arc::new(LinuxExportsRenderer::new(config.markers()));
        Ok(Self::with_collaborators(
            config,
            executor,
            renderer,
            Arc::new(LogNotifier),
        ))
    }

    pub fn with_collaborators(
        config: HostConfig,
        executor: Arc<dyn Executor>,
        renderer: Arc<dyn ExportRenderer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let activator = ServiceActivator::new(
            executor.clone(),
            config.service.clone(),
            config.probe.command.clone(),
            config.probe.policy(),
        );
        let reconciler =
            ExportReconciler::new(config.exports_file(), executor, renderer, notifier, activator);
        Self { config, reconciler }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &ExportReconciler {
        &self.reconciler
    }

    /// Whether this host can serve NFS at all. Check before offering NFS
    /// folder sharing.
    pub fn nfs_supported(&self) -> bool {
        self.reconciler.activator().probe()
    }

    pub fn nfs_running(&self) -> bool {
        self.reconciler.activator().is_running()
    }

    pub fn activate(&self) -> Result<Activation> {
        self.reconciler.activator().activate()
    }

    pub fn export(
        &self,
        id: &ExportId,
        client_address: &str,
        folders: &[FolderMapping],
    ) -> Result<ExportReport> {
        self.reconciler.export(id, client_address, folders)
    }

    pub fn prune(&self, valid_ids: &HashSet<String>) -> Result<PruneReport> {
        self.reconciler.prune(valid_ids)
    }

    pub fn cleanup(&self, id: &str) -> Result<bool> {
        self.reconciler.cleanup(id)
    }

    pub fn exported_ids(&self) -> Result<Vec<String>> {
        self.reconciler.exported_ids()
    }
}
