// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default wall-clock budget for one program execution
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for program execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wall-clock deadline for a whole execution, including every dispatch
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ExecutorConfig {
    /// Short deadline for interactive use
    pub fn interactive() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    /// Long deadline for batch chains over large graphs
    pub fn batch() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
