// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Rendering export requests into exports file text.

use crate::exports::Markers;
use crate::folder::{MAP_GID_OPTION, MAP_UID_OPTION, NFS_OPTIONS_OPTION};
use crate::{Error, ExportId, FolderMapping, Result};

#[cfg(test)]
#[path = "./render_test.rs"]
mod render_test;

/// Export options used when a folder does not provide its own.
pub const DEFAULT_NFS_OPTIONS: &str = "rw,no_subtree_check,all_squash";

/// Everything needed to render one export block.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub id: &'a ExportId,
    pub client_address: &'a str,
    pub folders: &'a [FolderMapping],
}

/// Produces the text of an export block, markers included.
pub trait ExportRenderer: Send + Sync {
    fn render(&self, request: &ExportRequest<'_>) -> Result<String>;
}

/// Renders the Linux `exports(5)` format, one line per folder:
///
/// ```text
/// "/home/me/project" 192.168.56.10(rw,no_subtree_check,all_squash,anonuid=1000,anongid=1000)
/// ```
#[derive(Debug, Clone)]
pub struct LinuxExportsRenderer {
    markers: Markers,
}

impl LinuxExportsRenderer {
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    fn folder_line(&self, client_address: &str, folder: &FolderMapping) -> Result<String> {
        let host_path = &folder.host_path;
        if host_path.is_empty() || host_path.contains(|c: char| c == '"' || c.is_control()) {
            return Err(Error::InvalidFolder(format!(
                "host path cannot be exported: {host_path:?}"
            )));
        }

        let mut options = option_value(
            folder,
            NFS_OPTIONS_OPTION,
            folder.options.get(NFS_OPTIONS_OPTION).map(String::as_str),
        )?
        .unwrap_or(DEFAULT_NFS_OPTIONS)
        .to_string();
        if let Some(uid) = option_value(folder, MAP_UID_OPTION, folder.map_uid())? {
            options.push_str(&format!(",anonuid={uid}"));
        }
        if let Some(gid) = option_value(folder, MAP_GID_OPTION, folder.map_gid())? {
            options.push_str(&format!(",anongid={gid}"));
        }

        Ok(format!("\"{host_path}\" {client_address}({options})"))
    }
}

/// Option values land inside the parenthesised option list, so they must not
/// be able to close it or start another line.
fn option_value<'a>(
    folder: &FolderMapping,
    key: &str,
    value: Option<&'a str>,
) -> Result<Option<&'a str>> {
    match value {
        Some(value)
            if value.is_empty()
                || value.contains(|c: char| {
                    c.is_whitespace() || c.is_control() || matches!(c, '(' | ')' | '"')
                }) =>
        {
            Err(Error::InvalidFolder(format!(
                "option {key} of {} cannot be exported: {value:?}",
                folder.host_path
            )))
        }
        other => Ok(other),
    }
}

impl ExportRenderer for LinuxExportsRenderer {
    fn render(&self, request: &ExportRequest<'_>) -> Result<String> {
        let client = request.client_address;
        if client.is_empty() || client.contains(|c: char| c.is_whitespace() || c.is_control()) {
            return Err(Error::ValidationFailed(format!(
                "invalid client address: {client:?}"
            )));
        }

        let mut out = String::new();
        out.push_str(&self.markers.begin(request.id.as_str()));
        out.push('\n');
        for folder in request.folders {
            out.push_str(&self.folder_line(client, folder)?);
            out.push('\n');
        }
        out.push_str(&self.markers.end(request.id.as_str()));
        out.push('\n');
        Ok(out)
    }
}
