// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dispatch error types

use thiserror::Error;

/// Dispatch errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Query rejected ({rule_id}): {reason}")]
    Rejected { rule_id: String, reason: String },

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Handler for {endpoint} failed: {message}")]
    Handler { endpoint: String, message: String },

    #[error("Dispatch cancelled")]
    Cancelled,
}
