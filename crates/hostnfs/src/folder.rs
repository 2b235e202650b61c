// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Folder mappings shared with a guest over NFS.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "./folder_test.rs"]
mod folder_test;

/// Option key holding the uid that all guest access is squashed to.
pub const MAP_UID_OPTION: &str = "map_uid";

/// Option key holding the gid that all guest access is squashed to.
pub const MAP_GID_OPTION: &str = "map_gid";

/// Option key replacing the default export options entirely.
pub const NFS_OPTIONS_OPTION: &str = "nfs_options";

/// One host folder made available to a guest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderMapping {
    /// Path of the folder on the host.
    pub host_path: String,
    /// Path the guest mounts the folder at.
    pub guest_path: String,
    /// Free-form options interpreted by the export renderer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl FolderMapping {
    pub fn new<H: Into<String>, G: Into<String>>(host_path: H, guest_path: G) -> Self {
        Self {
            host_path: host_path.into(),
            guest_path: guest_path.into(),
            options: BTreeMap::new(),
        }
    }

    /// Add an option, replacing any previous value for the key.
    pub fn with_option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn map_uid(&self) -> Option<&str> {
        self.options.get(MAP_UID_OPTION).map(String::as_str)
    }

    pub fn map_gid(&self) -> Option<&str> {
        self.options.get(MAP_GID_OPTION).map(String::as_str)
    }

    /// Resolve the host path to a canonical absolute path.
    ///
    /// Accepts absolute, home-relative (`~` or `~/...`) and relative paths.
    /// Relative paths are resolved against `base_dir`. The folder must exist.
    /// Other users' homes (`~user`) are rejected.
    pub fn resolve(&self, base_dir: &Path) -> crate::Result<Self> {
        let host = if self.host_path == "~" || self.host_path.starts_with("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                Error::ValidationFailed("Cannot resolve ~ without HOME".to_string())
            })?;
            home.join(self.host_path.trim_start_matches('~').trim_start_matches('/'))
        } else if self.host_path.starts_with('~') {
            return Err(Error::InvalidFolder(format!(
                "~user paths are not supported: {}",
                self.host_path
            )));
        } else if Path::new(&self.host_path).is_absolute() {
            PathBuf::from(&self.host_path)
        } else {
            base_dir.join(&self.host_path)
        };

        let host = dunce::canonicalize(&host).map_err(|e| {
            Error::InvalidFolder(format!(
                "host folder not found or invalid: {} ({e})",
                host.display()
            ))
        })?;

        Ok(Self {
            host_path: host.display().to_string(),
            guest_path: self.guest_path.clone(),
            options: self.options.clone(),
        })
    }
}

impl FromStr for FolderMapping {
    type Err = Error;

    /// Parse `HOST:GUEST` or `HOST:GUEST:key=value,key=value`.
    fn from_str(s: &str) -> crate::Result<Self> {
        let mut parts = s.splitn(3, ':');
        let host = parts.next().unwrap_or_default();
        let guest = parts.next().unwrap_or_default();
        if host.is_empty() || guest.is_empty() {
            return Err(Error::InvalidFolder(format!(
                "expected HOST:GUEST, got {s:?}"
            )));
        }

        let mut folder = FolderMapping::new(host, guest);
        let mut last_key: Option<String> = None;
        for option in parts.next().unwrap_or_default().split(',') {
            if option.is_empty() {
                continue;
            }
            match (option.split_once('='), &last_key) {
                (Some((key, value)), _) => {
                    folder.options.insert(key.to_string(), value.to_string());
                    last_key = Some(key.to_string());
                }
                // a bare word continues the previous value, so that
                // `nfs_options=rw,sync` keeps its commas
                (None, Some(key)) => {
                    if let Some(value) = folder.options.get_mut(key) {
                        value.push(',');
                        value.push_str(option);
                    }
                }
                (None, None) => {
                    return Err(Error::InvalidFolder(format!(
                        "option {option:?} is not key=value"
                    )));
                }
            }
        }
        Ok(folder)
    }
}
