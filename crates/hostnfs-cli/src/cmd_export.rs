// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs export` command.

use clap::Args;
use colored::Colorize;
use hostnfs::{ExportId, FolderMapping};
use miette::{IntoDiagnostic, Result};

/// Export folders to a guest, replacing any previous export with the same id
///
/// Exits 3 when the exports file was written but the NFS server could not be
/// reloaded or started.
#[derive(Debug, Args)]
pub struct CmdExport {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Unique id of the export (usually the guest machine id)
    #[clap(long)]
    id: ExportId,

    /// Address of the guest allowed to mount the folders
    #[clap(long)]
    ip: String,

    /// Folder to share as HOST:GUEST[:key=value,...]
    ///
    /// Recognized options are map_uid, map_gid and nfs_options. Relative
    /// host paths are taken from the current directory.
    #[clap(long = "folder", short = 'f')]
    folders: Vec<FolderMapping>,

    /// Do not check for NFS support first
    #[clap(long)]
    no_probe: bool,
}

impl CmdExport {
    pub fn run(&mut self) -> Result<i32> {
        let host = self.config.load_host()?;

        if !self.no_probe && !host.nfs_supported() {
            return Err(miette::miette!(
                help = "Install an NFS server (e.g. nfs-kernel-server), or pass --no-probe",
                "NFS is not supported on this host"
            ));
        }

        let cwd = std::env::current_dir().into_diagnostic()?;
        let folders = self
            .folders
            .iter()
            .map(|folder| folder.resolve(&cwd))
            .collect::<hostnfs::Result<Vec<_>>>()?;

        let report = host.export(&self.id, &self.ip, &folders)?;
        println!(
            "Exported {} folder(s) to {} as {}",
            folders.len(),
            self.ip.cyan(),
            report.id.to_string().green()
        );

        match report.activation {
            Ok(activation) => {
                println!("NFS server {activation}");
                Ok(0)
            }
            Err(err) => {
                eprintln!(
                    "{} exports file updated, but the NFS server was not activated: {err}",
                    "Warning:".yellow()
                );
                Ok(3)
            }
        }
    }
}
