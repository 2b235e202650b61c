// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The exports file as a small record store of delimited blocks.
//!
//! Each export owns exactly one region of the file:
//!
//! ```text
//! # VAGRANT-BEGIN: 1f0e6b8a-7c3d-4a5e-9b21-0c8d7e6f5a4b
//! "/home/me/project" 192.168.56.10(rw,no_subtree_check,all_squash,anonuid=1000,anongid=1000)
//! # VAGRANT-END: 1f0e6b8a-7c3d-4a5e-9b21-0c8d7e6f5a4b
//! ```
//!
//! Everything outside such regions belongs to somebody else and is written
//! back exactly as it was read.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::exec::Executor;
use crate::{Error, ExportId, Result};

#[cfg(test)]
#[path = "./exports_test.rs"]
mod exports_test;

/// Builds and recognizes the marker lines that delimit a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    marker: String,
}

/// A recognized marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLine<'a> {
    Begin(&'a str),
    End(&'a str),
}

impl Markers {
    pub fn new<S: Into<String>>(marker: S) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn begin(&self, id: &str) -> String {
        format!("# {}-BEGIN: {id}", self.marker)
    }

    pub fn end(&self, id: &str) -> String {
        format!("# {}-END: {id}", self.marker)
    }

    /// Recognize a marker line, returning the id it carries.
    ///
    /// The id is everything after the `: ` separator, compared verbatim.
    pub fn parse<'a>(&self, line: &'a str) -> Option<MarkerLine<'a>> {
        let rest = line
            .trim_end_matches('\r')
            .strip_prefix("# ")?
            .strip_prefix(self.marker.as_str())?;
        if let Some(id) = rest.strip_prefix("-BEGIN: ") {
            (!id.is_empty()).then_some(MarkerLine::Begin(id))
        } else if let Some(id) = rest.strip_prefix("-END: ") {
            (!id.is_empty()).then_some(MarkerLine::End(id))
        } else {
            None
        }
    }
}

/// Location of one block within the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    /// Index of the `BEGIN` line.
    pub start: usize,
    /// One past the last line of the block.
    pub end: usize,
    /// False when the `END` line is missing, e.g. after an interrupted append.
    pub terminated: bool,
}

/// In-memory copy of the exports file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportsDocument {
    markers: Markers,
    lines: Vec<String>,
    trailing_newline: bool,
    /// Text this document was parsed from, `None` for a new file.
    source: Option<String>,
}

impl ExportsDocument {
    /// An empty document, as for an exports file that does not exist yet.
    pub fn new(markers: Markers) -> Self {
        Self {
            markers,
            lines: Vec::new(),
            trailing_newline: true,
            source: None,
        }
    }

    pub fn parse(markers: Markers, text: &str) -> Self {
        let trailing_newline = text.is_empty() || text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n').map(String::from).collect()
        };
        Self {
            markers,
            lines,
            trailing_newline,
            source: Some(text.to_string()),
        }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// The text this document was parsed from, before any edits.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Locate every block in file order.
    ///
    /// A block runs from its `BEGIN` line to the first `END` line with the
    /// same id. When no such line appears before the next `BEGIN` (or the end
    /// of the file) the block is unterminated and stops right there, so a
    /// damaged block never swallows the one after it.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while i < self.lines.len() {
            let Some(MarkerLine::Begin(id)) = self.markers.parse(&self.lines[i]) else {
                i += 1;
                continue;
            };

            let mut j = i + 1;
            let mut terminated = false;
            while j < self.lines.len() {
                match self.markers.parse(&self.lines[j]) {
                    Some(MarkerLine::End(end)) if end == id => {
                        terminated = true;
                        j += 1;
                        break;
                    }
                    Some(MarkerLine::Begin(_)) => break,
                    _ => j += 1,
                }
            }

            blocks.push(Block {
                id: id.to_string(),
                start: i,
                end: j,
                terminated,
            });
            i = j;
        }
        blocks
    }

    /// Ids of all blocks, in file order, without duplicates.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for block in self.blocks() {
            if !ids.contains(&block.id) {
                ids.push(block.id);
            }
        }
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks().iter().any(|b| b.id == id)
    }

    /// Remove every block for `id`, and any stray `END` marker for it.
    ///
    /// Returns false, leaving the document untouched, when there is nothing
    /// to remove.
    pub fn remove(&mut self, id: &str) -> bool {
        let blocks = self.blocks();
        let mut doomed = vec![false; self.lines.len()];
        let mut inside = vec![false; self.lines.len()];
        for block in &blocks {
            for index in block.start..block.end {
                inside[index] = true;
                if block.id == id {
                    doomed[index] = true;
                }
            }
        }
        for (index, line) in self.lines.iter().enumerate() {
            if !inside[index] && self.markers.parse(line) == Some(MarkerLine::End(id)) {
                doomed[index] = true;
            }
        }

        if !doomed.contains(&true) {
            return false;
        }

        let mut index = 0;
        self.lines.retain(|_| {
            let keep = !doomed[index];
            index += 1;
            keep
        });
        true
    }

    /// Append a block for `id` holding the rendered export text.
    ///
    /// Marker lines for `id` in the rendered text are dropped and the block is
    /// wrapped in fresh markers. Markers for any other id are an error.
    pub fn append_block(&mut self, id: &ExportId, rendered: &str) -> Result<()> {
        let mut body = Vec::new();
        for line in rendered.lines() {
            match self.markers.parse(line) {
                Some(MarkerLine::Begin(other)) | Some(MarkerLine::End(other))
                    if other != id.as_str() =>
                {
                    return Err(Error::MalformedBlock {
                        id: id.to_string(),
                        line: line.to_string(),
                    });
                }
                Some(_) => continue,
                None => body.push(line.to_string()),
            }
        }

        self.lines.push(self.markers.begin(id.as_str()));
        self.lines.extend(body);
        self.lines.push(self.markers.end(id.as_str()));
        self.trailing_newline = true;
        Ok(())
    }

    /// Bring the managed blocks back to one well-formed block per id.
    ///
    /// Only the last block of a repeated id is kept, `END` markers outside
    /// any block are dropped and an unterminated block is closed where it
    /// stops. Returns whether anything changed.
    pub fn repair(&mut self) -> bool {
        let blocks = self.blocks();
        let mut last = HashMap::new();
        for (index, block) in blocks.iter().enumerate() {
            last.insert(block.id.as_str(), index);
        }

        let mut doomed = vec![false; self.lines.len()];
        let mut inside = vec![false; self.lines.len()];
        let mut closers = HashMap::new();
        for (index, block) in blocks.iter().enumerate() {
            inside[block.start..block.end].fill(true);
            if last.get(block.id.as_str()) != Some(&index) {
                tracing::debug!(id = %block.id, "Dropping duplicate export block");
                doomed[block.start..block.end].fill(true);
            } else if !block.terminated {
                tracing::debug!(id = %block.id, "Closing unterminated export block");
                closers.insert(block.end, self.markers.end(&block.id));
            }
        }
        for (index, line) in self.lines.iter().enumerate() {
            if !inside[index] && matches!(self.markers.parse(line), Some(MarkerLine::End(_))) {
                tracing::debug!(line = %line, "Dropping stray end marker");
                doomed[index] = true;
            }
        }

        if closers.is_empty() && !doomed.contains(&true) {
            return false;
        }

        let old = std::mem::take(&mut self.lines);
        for (index, line) in old.into_iter().enumerate() {
            if let Some(end) = closers.remove(&index) {
                self.lines.push(end);
            }
            if !doomed[index] {
                self.lines.push(line);
            }
        }
        self.lines.extend(closers.into_values());
        true
    }

    /// True when every block is terminated, no id appears twice and there
    /// are no `END` markers outside a block.
    pub fn is_well_formed(&self) -> bool {
        let blocks = self.blocks();
        let mut inside = vec![false; self.lines.len()];
        let mut seen = Vec::new();
        for block in &blocks {
            if !block.terminated || seen.contains(&block.id.as_str()) {
                return false;
            }
            seen.push(block.id.as_str());
            inside[block.start..block.end].fill(true);
        }
        self.lines.iter().enumerate().all(|(index, line)| {
            inside[index] || !matches!(self.markers.parse(line), Some(MarkerLine::End(_)))
        })
    }

    pub fn to_text(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }
}

impl fmt::Display for ExportsDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// The exports file on disk.
///
/// Reads are unprivileged; every replacement goes through a single elevated
/// [`Executor::replace_file_elevated`] call.
#[derive(Debug, Clone)]
pub struct ExportsFile {
    path: PathBuf,
    markers: Markers,
    backup_suffix: Option<String>,
}

impl ExportsFile {
    pub fn new<P: Into<PathBuf>>(path: P, markers: Markers) -> Self {
        Self {
            path: path.into(),
            markers,
            backup_suffix: None,
        }
    }

    /// Keep a copy of the previous file next to it, named `<path><suffix>`.
    pub fn with_backup_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.backup_suffix = Some(suffix.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn backup_path(&self) -> Option<PathBuf> {
        let suffix = self.backup_suffix.as_ref()?;
        let mut name = self.path.clone().into_os_string();
        name.push(suffix);
        Some(PathBuf::from(name))
    }

    /// Read and parse the file, or `None` when it does not exist.
    pub fn load(&self) -> Result<Option<ExportsDocument>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(ExportsDocument::parse(self.markers.clone(), &text))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(Error::ReadFailed {
                path: self.path.clone(),
                error,
            }),
        }
    }

    /// Atomically replace the file with the document's contents.
    ///
    /// Fails with [`Error::FileChanged`] when the file no longer holds the
    /// text the document was loaded from.
    pub fn store(&self, document: &ExportsDocument, executor: &dyn Executor) -> Result<()> {
        let backup = self.backup_path();
        tracing::debug!(path = ?self.path, backup = ?backup, "Replacing exports file");
        executor.replace_file_elevated(
            &self.path,
            document.source(),
            &document.to_text(),
            backup.as_deref(),
        )
    }
}
