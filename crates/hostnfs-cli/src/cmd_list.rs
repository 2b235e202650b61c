// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs list` command.

use clap::Args;
use miette::Result;

/// List the ids recorded in the exports file, one per line
#[derive(Debug, Args)]
pub struct CmdList {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdList {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load_config()?;
        let exports = config.exports_file();

        // Reading needs no elevation, so skip building a host.
        if let Some(document) = exports.load()? {
            for id in document.ids() {
                println!("{id}");
            }
        }
        Ok(0)
    }
}
