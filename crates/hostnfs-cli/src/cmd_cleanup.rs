// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs cleanup` command.

use clap::Args;
use miette::Result;

/// Remove the export with the given id
#[derive(Debug, Args)]
pub struct CmdCleanup {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Id of the export to remove
    id: String,
}

impl CmdCleanup {
    pub fn run(&mut self) -> Result<i32> {
        let host = self.config.load_host()?;

        if host.cleanup(&self.id)? {
            println!("Removed export {}", self.id);
        } else {
            println!("No export recorded for {}", self.id);
        }
        Ok(0)
    }
}
