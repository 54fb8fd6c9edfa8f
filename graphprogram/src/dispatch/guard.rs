// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dispatch-time re-validation of query text
//!
//! Programs may be stored and executed long after they were validated, so
//! the write-keyword and path-bound scans run again right before a query
//! reaches the database.

use super::DispatchError;
use crate::ast::safety::{
    find_unbounded_paths, find_write_keywords, has_explicit_limit, strip_literals_and_comments,
};
use crate::ast::validator::rules;
use crate::ast::QueryOperation;

/// Refuse query text containing mutation keywords or unbounded paths
pub fn check_query(query: &str) -> Result<(), DispatchError> {
    if let Some(hit) = find_write_keywords(query).into_iter().next() {
        log::warn!("Refusing query with write keyword '{}'", hit.keyword);
        return Err(DispatchError::Rejected {
            rule_id: hit.rule_id.to_string(),
            reason: format!("write keyword '{}'", hit.keyword),
        });
    }
    if let Some(violation) = find_unbounded_paths(query).into_iter().next() {
        log::warn!("Refusing query with path '{}'", violation.pattern());
        return Err(DispatchError::Rejected {
            rule_id: rules::UNBOUNDED_PATH.to_string(),
            reason: violation.describe(),
        });
    }
    Ok(())
}

/// Query text up to its last code character, dropping trailing comments
/// and the statement terminator
fn code_body(query: &str) -> &str {
    let stripped = strip_literals_and_comments(query);
    let code_chars = stripped.trim_end().chars().count();
    let end = query
        .char_indices()
        .nth(code_chars)
        .map(|(offset, _)| offset)
        .unwrap_or(query.len());
    query[..end].trim_end().trim_end_matches(';').trim_end()
}

/// Append `LIMIT n` unless the query already has its own LIMIT
pub fn apply_result_cap(query: &str, limit: Option<u64>) -> String {
    match limit {
        Some(n) if !has_explicit_limit(query) => format!("{} LIMIT {}", code_body(query), n),
        _ => query.to_string(),
    }
}

/// Check a query operation and produce the text to send to the database
pub fn prepare_query(op: &QueryOperation) -> Result<String, DispatchError> {
    check_query(&op.query)?;
    Ok(apply_result_cap(&op.query, op.limit))
}
