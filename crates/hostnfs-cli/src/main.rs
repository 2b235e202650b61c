// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! hostnfs - Host NFS Export Management CLI

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hostnfs::{HostConfig, LinuxExportsRenderer, NfsHost, Notice, Notifier, SystemExecutor};
use miette::Result;

mod cmd_cleanup;
mod cmd_export;
mod cmd_init;
mod cmd_list;
mod cmd_probe;
mod cmd_prune;
mod cmd_status;

#[cfg(test)]
mod fixtures;

use cmd_cleanup::CmdCleanup;
use cmd_export::CmdExport;
use cmd_init::CmdInit;
use cmd_list::CmdList;
use cmd_probe::CmdProbe;
use cmd_prune::CmdPrune;
use cmd_status::CmdStatus;

#[derive(Parser)]
#[clap(
    name = "hostnfs",
    about = "Host NFS Export Management",
    version,
    long_about = "Share host folders with guest machines through the host's NFS exports file"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug, Default)]
pub struct ConfigFlags {
    /// Host configuration file (defaults to the per-user config.yaml)
    #[clap(long = "config", short = 'c', env = "HOSTNFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Edit this exports file instead of the configured one
    #[clap(long = "exports-file", env = "HOSTNFS_EXPORTS_FILE")]
    pub exports_file: Option<PathBuf>,
}

impl ConfigFlags {
    pub fn load_config(&self) -> Result<HostConfig> {
        let mut config = HostConfig::load_or_default(self.config.as_deref())?;
        if let Some(path) = &self.exports_file {
            config.exports_path = path.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Build a host that prints notices to the terminal.
    pub fn load_host(&self) -> Result<NfsHost> {
        let config = self.load_config()?;
        tracing::debug!(
            config = ?config.source_path,
            exports = %config.exports_path.display(),
            "Loaded host configuration"
        );
        let executor = Arc::new(SystemExecutor::new(config.elevate_with.clone()));
        let renderer = Arc::new(LinuxExportsRenderer::new(config.markers()));
        Ok(NfsHost::with_collaborators(
            config,
            executor,
            renderer,
            Arc::new(ConsoleNotifier),
        ))
    }
}

/// Prints notices to stderr ahead of any password prompt.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{} {}", "==>".green().bold(), notice);
    }
}

#[derive(Subcommand)]
enum Command {
    /// Write a default host configuration file
    Init(CmdInit),

    /// Check whether this host can serve NFS
    Probe(CmdProbe),

    /// Export folders to a guest, replacing any previous export with the same id
    Export(CmdExport),

    /// Remove every export whose id is not listed
    Prune(CmdPrune),

    /// Remove the export with the given id
    Cleanup(CmdCleanup),

    /// List the ids recorded in the exports file
    List(CmdList),

    /// Show NFS support, server state and recorded exports
    Status(CmdStatus),
}

impl Opt {
    fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        match self.cmd {
            Command::Init(mut cmd) => cmd.run(),
            Command::Probe(mut cmd) => cmd.run(),
            Command::Export(mut cmd) => cmd.run(),
            Command::Prune(mut cmd) => cmd.run(),
            Command::Cleanup(mut cmd) => cmd.run(),
            Command::List(mut cmd) => cmd.run(),
            Command::Status(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
