// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs prune` command.

use std::collections::HashSet;

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Remove every export whose id is not listed
#[derive(Debug, Args)]
pub struct CmdPrune {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Ids of the exports to keep
    valid_ids: Vec<String>,
}

impl CmdPrune {
    pub fn run(&mut self) -> Result<i32> {
        let host = self.config.load_host()?;
        let valid: HashSet<String> = self.valid_ids.iter().cloned().collect();

        let report = host.prune(&valid)?;
        for id in &report.pruned {
            println!("  {} {}", "-".red(), id);
        }
        println!(
            "Pruned {} export(s), kept {}",
            report.pruned.len(),
            report.kept.len()
        );
        Ok(0)
    }
}
