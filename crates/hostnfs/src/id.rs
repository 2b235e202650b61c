// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Validated export identifiers.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./id_test.rs"]
mod id_test;

/// Identifier of one export request.
///
/// The id is embedded verbatim in the `BEGIN`/`END` marker lines of the
/// exports file and is only ever compared by exact equality. It must therefore
/// survive a round trip through a single line of text: it cannot be empty,
/// cannot contain control characters (newlines in particular), and cannot
/// start or end with whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExportId(String);

impl ExportId {
    pub fn new<S: Into<String>>(id: S) -> Result<Self> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id.chars().any(char::is_control) {
            Some("must not contain control characters")
        } else if id.trim() != id {
            Some("must not start or end with whitespace")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ExportId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for ExportId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
