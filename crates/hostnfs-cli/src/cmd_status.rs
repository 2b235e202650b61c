// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs status` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Show NFS support, server state and recorded exports
#[derive(Debug, Args)]
pub struct CmdStatus {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdStatus {
    pub fn run(&mut self) -> Result<i32> {
        let host = self.config.load_host()?;
        let config = host.config();

        let yes_no = |value: bool| {
            if value {
                "yes".green()
            } else {
                "no".red()
            }
        };

        println!("{}", "NFS Host:".bold());
        println!();
        let source = config
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string());
        println!("  Config:       {}", source.cyan());
        println!(
            "  Exports file: {}",
            config.exports_path.display().to_string().cyan()
        );
        println!("  Supported:    {}", yes_no(host.nfs_supported()));
        println!("  Running:      {}", yes_no(host.nfs_running()));
        println!();

        let ids = host.exported_ids()?;
        println!("{}", "Exports:".bold());
        println!();
        if ids.is_empty() {
            println!("  {}", "(none)".dimmed());
        } else {
            for (i, id) in ids.iter().enumerate() {
                println!("  {}. {}", i + 1, id.green());
            }
        }
        println!();
        println!("Total: {} export(s)", ids.len());

        Ok(0)
    }
}
