// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs probe` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Check whether this host can serve NFS
///
/// Exits 0 when supported, 1 when not, and 2 when the probe never gave a
/// definite answer.
#[derive(Debug, Args)]
pub struct CmdProbe {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdProbe {
    pub fn run(&mut self) -> Result<i32> {
        let host = self.config.load_host()?;

        match host.reconciler().activator().try_probe() {
            Ok(true) => {
                println!("{} NFS is supported", "✓".green());
                Ok(0)
            }
            Ok(false) => {
                println!("{} NFS is not supported (nfsd is not available)", "✗".red());
                Ok(1)
            }
            Err(err @ hostnfs::Error::ProbeInconclusive { .. }) => {
                println!("{} {err}", "?".yellow());
                Ok(2)
            }
            Err(err) => Err(err.into()),
        }
    }
}
