// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Validator for graph programs
//!
//! A program must pass this gate before it may run. Validation runs four
//! layers in increasing cost order:
//!
//! ## 1. Deserialization (V000)
//! - The raw value must be a JSON object matching the AST shape
//! - Every mismatch is reported with its dotted field path
//! - Failure here skips all later layers
//!
//! ## 2. Structural (V001-V005)
//! - **V001**: `version` must equal 1
//! - **V002**: at least one statement
//! - **V003**: parameter names are identifiers, defaults match declared types
//! - **V004**: parameter names are unique
//! - **V005**: conditional `then` branches are non-empty, queries and
//!   endpoints are non-empty
//!
//! ## 3. Safety (V006-V030)
//! - **V006**: effective statement count (worst-case branch) at most [`MAX_STATEMENTS`]
//! - **V007**: conditional nesting depth at most [`MAX_NESTING_DEPTH`]
//! - **V010-V016**: no mutation keywords in query text
//! - **V020-V023**: API endpoints and parameters match the allowlist
//! - **V030**: variable-length paths carry an upper bound within
//!   [`MAX_TRAVERSAL_HOPS`]
//!
//! ## 4. Semantic
//! Reserved for parameter resolution and static boundedness checks.
//!
//! Errors accumulate so authors can fix a program in one pass. Advisory rules
//! (V022) produce warnings, which never make a program invalid.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use graphprogram::validate;
//! use serde_json::json;
//!
//! let result = validate(&json!({"version": 1, "statements": []}));
//! assert!(!result.valid);
//! for error in &result.errors {
//!     log::info!("{}: {}", error.rule_id, error.message);
//! }
//! ```

use super::ast::*;
use super::decode::decode_program;
use super::safety::{find_unbounded_paths, find_write_keywords, MAX_TRAVERSAL_HOPS};
use crate::catalog::endpoints::{self, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Maximum effective statement count of a program
pub const MAX_STATEMENTS: usize = 100;

/// Maximum conditional nesting depth
pub const MAX_NESTING_DEPTH: usize = 3;

/// Rule identifiers
pub mod rules {
    pub const DESERIALIZE: &str = "V000";
    pub const VERSION: &str = "V001";
    pub const EMPTY_PROGRAM: &str = "V002";
    pub const INVALID_PARAM: &str = "V003";
    pub const DUPLICATE_PARAM: &str = "V004";
    pub const EMPTY_BLOCK: &str = "V005";
    pub const TOO_MANY_STATEMENTS: &str = "V006";
    pub const NESTING_TOO_DEEP: &str = "V007";
    pub const UNKNOWN_ENDPOINT: &str = "V020";
    pub const MISSING_PARAM: &str = "V021";
    pub const UNKNOWN_PARAM: &str = "V022";
    pub const PARAM_TYPE: &str = "V023";
    pub const UNBOUNDED_PATH: &str = "V030";
}

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule_id: String,
    pub severity: Severity,
    /// Index of the top-level statement the issue belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<usize>,
    /// Dotted path of the offending field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(rule_id: &str, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity: Severity::Error,
            statement: None,
            field: None,
            message: message.into(),
        }
    }

    pub fn warning(rule_id: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule_id, message)
        }
    }

    pub fn at_statement(mut self, statement: usize) -> Self {
        self.statement = Some(statement);
        self
    }

    pub fn at_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.rule_id)?;
        if let Some(statement) = self.statement {
            write!(f, " statement {}", statement)?;
        }
        if let Some(field) = &self.field {
            write!(f, " ({})", field)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of validating a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an issue under errors or warnings according to its severity
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
        self.valid = self.errors.is_empty();
    }

    /// True if any error or warning carries the given rule id
    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .any(|issue| issue.rule_id == rule_id)
    }

    /// Rule ids of all errors, in report order
    pub fn error_rules(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.rule_id.as_str()).collect()
    }
}

/// Validate an untrusted program value
pub fn validate(raw: &Value) -> ValidationResult {
    match parse_validated(raw) {
        Ok((_, result)) => result,
        Err(result) => result,
    }
}

/// Validate an untrusted program value, returning the typed program and any
/// warnings when it is accepted
pub fn parse_validated(raw: &Value) -> Result<(GraphProgram, ValidationResult), ValidationResult> {
    let program = match decode_program(raw) {
        Ok(program) => program,
        Err(issues) => {
            let mut result = ValidationResult::new();
            for issue in issues {
                let mut entry = ValidationIssue::error(rules::DESERIALIZE, issue.message);
                entry.statement = issue.statement;
                entry.field = issue.path;
                result.push(entry);
            }
            log::debug!(
                "Program rejected at deserialization: {} issue(s)",
                result.errors.len()
            );
            return Err(result);
        }
    };

    let result = validate_ast(&program);
    if result.valid {
        Ok((program, result))
    } else {
        Err(result)
    }
}

/// Run the structural, safety and semantic layers on a typed program
pub fn validate_ast(program: &GraphProgram) -> ValidationResult {
    let mut result = ValidationResult::new();

    // 2. Structural validations
    validate_structure(program, &mut result);

    // 3. Safety validations
    validate_safety(program, &mut result);

    // 4. Semantic validations
    validate_semantics(program, &mut result);

    log::debug!(
        "Validation finished: {} error(s), {} warning(s)",
        result.errors.len(),
        result.warnings.len()
    );
    result
}

fn validate_structure(program: &GraphProgram, result: &mut ValidationResult) {
    if program.version != PROGRAM_VERSION {
        result.push(
            ValidationIssue::error(
                rules::VERSION,
                format!(
                    "Unsupported program version {}, expected {}",
                    program.version, PROGRAM_VERSION
                ),
            )
            .at_field("version"),
        );
    }

    if program.statements.is_empty() {
        result.push(
            ValidationIssue::error(rules::EMPTY_PROGRAM, "Program must contain at least one statement")
                .at_field("statements"),
        );
    }

    validate_param_declarations(program.param_declarations(), result);

    for (i, statement) in program.statements.iter().enumerate() {
        validate_statement_structure(statement, &format!("statements[{}]", i), i, result);
    }
}

fn validate_param_declarations(params: &[ParamDeclaration], result: &mut ValidationResult) {
    let mut seen = HashSet::new();

    for (i, param) in params.iter().enumerate() {
        let path = format!("params[{}]", i);

        if !IDENTIFIER.is_match(&param.name) {
            result.push(
                ValidationIssue::error(
                    rules::INVALID_PARAM,
                    format!("Parameter name '{}' is not a valid identifier", param.name),
                )
                .at_field(format!("{}.name", path)),
            );
        }

        if let Some(default) = &param.default {
            let matches = match param.param_type {
                ParamType::String => default.is_string(),
                ParamType::Number => default.is_number(),
            };
            if !matches {
                result.push(
                    ValidationIssue::error(
                        rules::INVALID_PARAM,
                        format!(
                            "Default for parameter '{}' must be a {}, found {}",
                            param.name,
                            param.param_type,
                            ValueKind::of(default)
                        ),
                    )
                    .at_field(format!("{}.default", path)),
                );
            }
        }

        if !seen.insert(param.name.as_str()) {
            result.push(
                ValidationIssue::error(
                    rules::DUPLICATE_PARAM,
                    format!("Duplicate parameter name '{}'", param.name),
                )
                .at_field(format!("{}.name", path)),
            );
        }
    }
}

fn validate_statement_structure(
    statement: &Statement,
    path: &str,
    top: usize,
    result: &mut ValidationResult,
) {
    match &statement.operation {
        Operation::Query(query) => {
            if query.query.trim().is_empty() {
                result.push(
                    ValidationIssue::error(rules::EMPTY_BLOCK, "Query must not be empty")
                        .at_statement(top)
                        .at_field(format!("{}.operation.query", path)),
                );
            }
        }
        Operation::Api(api) => {
            if api.endpoint.trim().is_empty() {
                result.push(
                    ValidationIssue::error(rules::EMPTY_BLOCK, "Endpoint must not be empty")
                        .at_statement(top)
                        .at_field(format!("{}.operation.endpoint", path)),
                );
            }
        }
        Operation::Conditional(cond) => {
            if cond.then.is_empty() {
                result.push(
                    ValidationIssue::error(
                        rules::EMPTY_BLOCK,
                        "Conditional 'then' branch must contain at least one statement",
                    )
                    .at_statement(top)
                    .at_field(format!("{}.operation.then", path)),
                );
            }
            for (i, inner) in cond.then.iter().enumerate() {
                validate_statement_structure(
                    inner,
                    &format!("{}.operation.then[{}]", path, i),
                    top,
                    result,
                );
            }
            for (i, inner) in cond.else_branch().iter().enumerate() {
                validate_statement_structure(
                    inner,
                    &format!("{}.operation.else[{}]", path, i),
                    top,
                    result,
                );
            }
        }
    }
}

/// Worst-case number of statements executed: a conditional contributes the
/// larger of its two branches
pub fn effective_statement_count(statements: &[Statement]) -> usize {
    statements
        .iter()
        .map(|statement| match &statement.operation {
            Operation::Conditional(cond) => effective_statement_count(&cond.then)
                .max(effective_statement_count(cond.else_branch())),
            _ => 1,
        })
        .sum()
}

/// Deepest conditional nesting level; a top-level conditional is depth 1
pub fn max_nesting_depth(statements: &[Statement]) -> usize {
    statements
        .iter()
        .map(|statement| match &statement.operation {
            Operation::Conditional(cond) => {
                1 + max_nesting_depth(&cond.then).max(max_nesting_depth(cond.else_branch()))
            }
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

fn validate_safety(program: &GraphProgram, result: &mut ValidationResult) {
    let effective = effective_statement_count(&program.statements);
    if effective > MAX_STATEMENTS {
        result.push(
            ValidationIssue::error(
                rules::TOO_MANY_STATEMENTS,
                format!(
                    "Program has an effective statement count of {}, maximum is {}",
                    effective, MAX_STATEMENTS
                ),
            )
            .at_field("statements"),
        );
    }

    let depth = max_nesting_depth(&program.statements);
    if depth > MAX_NESTING_DEPTH {
        result.push(
            ValidationIssue::error(
                rules::NESTING_TOO_DEEP,
                format!(
                    "Conditional nesting depth {} exceeds maximum of {}",
                    depth, MAX_NESTING_DEPTH
                ),
            )
            .at_field("statements"),
        );
    }

    for (i, statement) in program.statements.iter().enumerate() {
        validate_statement_safety(statement, &format!("statements[{}]", i), i, result);
    }
}

fn validate_statement_safety(
    statement: &Statement,
    path: &str,
    top: usize,
    result: &mut ValidationResult,
) {
    match &statement.operation {
        Operation::Query(query) => {
            validate_query_text(&query.query, &format!("{}.operation.query", path), top, result);
        }
        Operation::Api(api) => {
            validate_api_call(api, &format!("{}.operation", path), top, result);
        }
        Operation::Conditional(cond) => {
            for (i, inner) in cond.then.iter().enumerate() {
                validate_statement_safety(
                    inner,
                    &format!("{}.operation.then[{}]", path, i),
                    top,
                    result,
                );
            }
            for (i, inner) in cond.else_branch().iter().enumerate() {
                validate_statement_safety(
                    inner,
                    &format!("{}.operation.else[{}]", path, i),
                    top,
                    result,
                );
            }
        }
    }
}

fn validate_query_text(query: &str, field: &str, top: usize, result: &mut ValidationResult) {
    for hit in find_write_keywords(query) {
        result.push(
            ValidationIssue::error(
                hit.rule_id,
                format!(
                    "Query contains write keyword '{}'; programs are read-only",
                    hit.keyword
                ),
            )
            .at_statement(top)
            .at_field(field),
        );
    }

    for violation in find_unbounded_paths(query) {
        log::debug!(
            "Rejecting path quantifier '{}' (max {} hops)",
            violation.pattern(),
            MAX_TRAVERSAL_HOPS
        );
        result.push(
            ValidationIssue::error(rules::UNBOUNDED_PATH, violation.describe())
                .at_statement(top)
                .at_field(field),
        );
    }
}

fn validate_api_call(api: &ApiOperation, path: &str, top: usize, result: &mut ValidationResult) {
    let Some(spec) = endpoints::lookup(&api.endpoint) else {
        // Parameters of an unknown endpoint are not checked
        result.push(
            ValidationIssue::error(
                rules::UNKNOWN_ENDPOINT,
                format!("Endpoint '{}' is not in the allowlist", api.endpoint),
            )
            .at_statement(top)
            .at_field(format!("{}.endpoint", path)),
        );
        return;
    };

    for required in spec.required {
        if !api.params.contains_key(required.name) {
            result.push(
                ValidationIssue::error(
                    rules::MISSING_PARAM,
                    format!(
                        "Endpoint '{}' requires parameter '{}'",
                        spec.name, required.name
                    ),
                )
                .at_statement(top)
                .at_field(format!("{}.params.{}", path, required.name)),
            );
        }
    }

    for (name, value) in &api.params {
        let field = format!("{}.params.{}", path, name);
        match spec.param(name) {
            None => result.push(
                ValidationIssue::warning(
                    rules::UNKNOWN_PARAM,
                    format!(
                        "Parameter '{}' is not declared for endpoint '{}' and will be ignored",
                        name, spec.name
                    ),
                )
                .at_statement(top)
                .at_field(field),
            ),
            Some(param) if !param.accepts(value) => result.push(
                ValidationIssue::error(
                    rules::PARAM_TYPE,
                    format!(
                        "Parameter '{}' of endpoint '{}' expects {}, got {}",
                        name,
                        spec.name,
                        param.expected(),
                        ValueKind::of(value)
                    ),
                )
                .at_statement(top)
                .at_field(field),
            ),
            Some(_) => {}
        }
    }
}

fn validate_semantics(_program: &GraphProgram, _result: &mut ValidationResult) {
    // Parameter resolution and static boundedness checks are not implemented yet
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(q: &str) -> Statement {
        Statement::new(
            Operator::Union,
            Operation::Query(QueryOperation {
                query: q.to_string(),
                limit: None,
            }),
        )
    }

    fn conditional(then: Vec<Statement>, otherwise: Option<Vec<Statement>>) -> Statement {
        Statement::new(
            Operator::Union,
            Operation::Conditional(ConditionalOperation {
                condition: Condition::HasResults,
                then,
                otherwise,
            }),
        )
    }

    #[test]
    fn test_effective_count_uses_worst_branch() {
        let then: Vec<_> = (0..5).map(|_| query("MATCH (n) RETURN n")).collect();
        let otherwise: Vec<_> = (0..2).map(|_| query("MATCH (n) RETURN n")).collect();
        let statements = vec![conditional(then, Some(otherwise))];
        assert_eq!(effective_statement_count(&statements), 5);
    }

    #[test]
    fn test_nesting_depth() {
        let leaf = query("MATCH (n) RETURN n");
        assert_eq!(max_nesting_depth(&[leaf.clone()]), 0);

        let depth3 = conditional(
            vec![conditional(vec![conditional(vec![leaf.clone()], None)], None)],
            None,
        );
        assert_eq!(max_nesting_depth(&[depth3.clone()]), 3);

        let depth4 = conditional(vec![depth3], None);
        let result = validate_ast(&GraphProgram::new(vec![depth4]));
        assert!(result.has_rule(rules::NESTING_TOO_DEEP));
    }

    #[test]
    fn test_param_rules() {
        let mut program = GraphProgram::new(vec![query("MATCH (n) RETURN n")]);
        program.params = Some(vec![
            ParamDeclaration {
                name: "term".into(),
                param_type: ParamType::String,
                default: Some(json!("x")),
            },
            ParamDeclaration {
                name: "term".into(),
                param_type: ParamType::Number,
                default: Some(json!("not a number")),
            },
            ParamDeclaration {
                name: "9lives".into(),
                param_type: ParamType::Number,
                default: None,
            },
        ]);
        let result = validate_ast(&program);
        assert_eq!(
            result.error_rules(),
            vec![rules::INVALID_PARAM, rules::DUPLICATE_PARAM, rules::INVALID_PARAM]
        );
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let program = GraphProgram::new(vec![Statement::new(
            Operator::Union,
            Operation::Api(ApiOperation {
                endpoint: "/search/concepts".into(),
                params: json!({"query": "entropy", "flavour": "mint"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            }),
        )]);
        let result = validate_ast(&program);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].rule_id, rules::UNKNOWN_PARAM);
        assert_eq!(
            result.warnings[0].field.as_deref(),
            Some("statements[0].operation.params.flavour")
        );
    }
}
