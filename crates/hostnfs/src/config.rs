// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Host configuration loaded from `config.yaml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::exec::CommandLine;
use crate::exports::{ExportsFile, Markers};
use crate::retry::RetryPolicy;
use crate::service::ServiceCommands;
use crate::{DEFAULT_EXPORTS_PATH, DEFAULT_MARKER};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// API version for config files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "hostnfs/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// Settings for the NFS capability probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Exits 0 when nfsd is supported, 1 when it is not.
    pub command: CommandLine,
    /// Attempts before the probe is declared inconclusive.
    pub attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl ProbeConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: CommandLine::new("grep", ["-qw", "nfsd", "/proc/filesystems"]),
            attempts: RetryPolicy::NFS_PROBE_ATTEMPTS,
            delay_ms: 0,
        }
    }
}

/// Where the exports live and how the NFS service is driven.
///
/// Every field has a default suited to a Debian-style Linux host, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// API version identifier.
    pub api: ApiVersion,

    /// The shared exports file.
    pub exports_path: PathBuf,

    /// Word used in block markers: `# <marker>-BEGIN: <id>`.
    pub marker: String,

    /// Suffix of the backup kept beside the exports file on every edit.
    /// `null` disables backups.
    pub backup_suffix: Option<String>,

    /// Command prefix used for elevation. Empty runs everything directly.
    pub elevate_with: Vec<String>,

    /// NFS service commands.
    pub service: ServiceCommands,

    /// Capability probe settings.
    pub probe: ProbeConfig,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api: ApiVersion::default(),
            exports_path: PathBuf::from(DEFAULT_EXPORTS_PATH),
            marker: DEFAULT_MARKER.to_string(),
            backup_suffix: Some(".bak".to_string()),
            elevate_with: vec!["sudo".to_string()],
            service: ServiceCommands::default(),
            probe: ProbeConfig::default(),
            source_path: None,
        }
    }
}

impl HostConfig {
    /// Parse config from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // An empty document is a config with every default.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // Stage 2: Deserialize based on version
        let config: Self = match with_version.api {
            ApiVersion::V0 => {
                serde_yaml::from_value(value).map_err(|e| crate::Error::InvalidYaml {
                    error: e,
                    yaml_content: yaml,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut config = Self::from_yaml(yaml)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load the given file, or the per-user config if it exists, or defaults.
    pub fn load_or_default(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Check values that YAML alone cannot constrain.
    pub fn validate(&self) -> crate::Result<()> {
        if self.marker.is_empty()
            || self
                .marker
                .contains(|c: char| c.is_whitespace() || c.is_control())
        {
            return Err(crate::Error::ValidationFailed(format!(
                "marker must be a single word, got {:?}",
                self.marker
            )));
        }

        if self.exports_path.as_os_str().is_empty() {
            return Err(crate::Error::ValidationFailed(
                "exports_path must not be empty".to_string(),
            ));
        }

        if matches!(self.backup_suffix.as_deref(), Some("")) {
            return Err(crate::Error::ValidationFailed(
                "backup_suffix must not be empty; use null to disable backups".to_string(),
            ));
        }

        if self.probe.attempts == 0 {
            return Err(crate::Error::ValidationFailed(
                "probe.attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn markers(&self) -> Markers {
        Markers::new(&self.marker)
    }

    pub fn exports_file(&self) -> ExportsFile {
        let file = ExportsFile::new(&self.exports_path, self.markers());
        match &self.backup_suffix {
            Some(suffix) => file.with_backup_suffix(suffix),
            None => file,
        }
    }
}

/// Per-user config location, `<config dir>/hostnfs/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hostnfs").join(crate::CONFIG_FILENAME))
}
