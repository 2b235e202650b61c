// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `hostnfs init` command.

use std::path::PathBuf;

use clap::Args;
use hostnfs::HostConfig;
use miette::{IntoDiagnostic, Result};

/// Write a default host configuration file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Where to write the file (defaults to the per-user config.yaml)
    path: Option<PathBuf>,

    /// Exports file to manage
    #[clap(long)]
    exports_file: Option<PathBuf>,

    /// Run service commands directly instead of through sudo
    #[clap(long)]
    no_sudo: bool,
}

impl CmdInit {
    pub fn run(&mut self) -> Result<i32> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => hostnfs::default_config_path()
                .ok_or_else(|| miette::miette!("Cannot determine the user config directory"))?,
        };

        if path.exists() {
            return Err(miette::miette!(
                "{} already exists at {:?}",
                hostnfs::CONFIG_FILENAME,
                path
            ));
        }

        let content = self.render()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| miette::miette!("Failed to create {parent:?}: {e}"))?;
        }
        std::fs::write(&path, content)
            .map_err(|e| miette::miette!("Failed to write {path:?}: {e}"))?;

        println!("Created host configuration at {:?}", path);
        println!();
        println!("Next steps:");
        println!("  1. Adjust the service commands for your init system");
        println!("  2. Run 'hostnfs probe' to check NFS support");
        Ok(0)
    }

    fn render(&self) -> Result<String> {
        let mut config = HostConfig::default();
        if let Some(exports) = &self.exports_file {
            config.exports_path = exports.clone();
        }
        if self.no_sudo {
            config.elevate_with.clear();
        }
        config.validate()?;

        let body = serde_yaml::to_string(&config).into_diagnostic()?;
        Ok(format!("# hostnfs host configuration\n\n{body}"))
    }
}
