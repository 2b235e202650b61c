// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Bounded retries for flaky host checks.

use std::time::Duration;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./retry_test.rs"]
mod retry_test;

/// How many times an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Attempts made by the NFS capability probe.
    pub const NFS_PROBE_ATTEMPTS: u32 = 10;

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy for reading kernel filesystem support, which has been seen to
    /// fail spuriously under load.
    pub fn nfs_probe() -> Self {
        Self::new(Self::NFS_PROBE_ATTEMPTS, Duration::ZERO)
    }

    /// Run `op` until it succeeds, fails with an error that `is_retryable`
    /// rejects, or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. The error of the final
    /// attempt is returned when every attempt failed. At least one attempt is
    /// always made.
    pub fn run<T, F, P>(&self, mut op: F, is_retryable: P) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
        P: Fn(&Error) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && is_retryable(&err) => {
                    tracing::debug!(attempt, attempts, "Retrying after error: {err}");
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::nfs_probe()
    }
}
