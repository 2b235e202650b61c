// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Config files for driving commands against a scratch directory.

use std::path::Path;

use hostnfs::{CommandLine, HostConfig, ProbeConfig, ServiceCommands};

use crate::ConfigFlags;

pub fn command(line: &str) -> CommandLine {
    CommandLine::parse(line).unwrap()
}

/// Service commands that report a running server and reload with `apply`.
pub fn running_service(apply: &str) -> ServiceCommands {
    ServiceCommands {
        apply: command(apply),
        status: command("true"),
        start: command("true"),
    }
}

/// A probe whose command exits with `status` every time.
pub fn probe_exiting(status: i32) -> ProbeConfig {
    ProbeConfig {
        command: CommandLine::new("sh", ["-c".to_string(), format!("exit {status}")]),
        attempts: 2,
        delay_ms: 0,
    }
}

/// Write a config for `dir/exports` that runs everything unelevated.
pub fn config_flags(dir: &Path, service: ServiceCommands, probe: ProbeConfig) -> ConfigFlags {
    let config = HostConfig {
        exports_path: dir.join("exports"),
        backup_suffix: None,
        elevate_with: Vec::new(),
        service,
        probe,
        ..HostConfig::default()
    };
    let path = dir.join(hostnfs::CONFIG_FILENAME);
    std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();
    ConfigFlags {
        config: Some(path),
        exports_file: None,
    }
}
