// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shape checking and decoding of untrusted program JSON
//!
//! serde stops at the first mismatch and does not report where it was. To
//! let authors fix a program in one pass, the raw value is first walked by
//! hand and every mismatch is recorded with its dotted field path. Only when
//! the walk is clean is the typed AST built through serde.

use super::ast::GraphProgram;
use serde_json::{Map, Value};

/// One shape mismatch found while decoding
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeIssue {
    /// Dotted path of the offending field, `None` for the document root
    pub path: Option<String>,
    /// Index of the enclosing top-level statement, if any
    pub statement: Option<usize>,
    pub message: String,
}

const OPERATORS: &[&str] = &["+", "-", "&", "?", "!"];
const OPERATION_TYPES: &[&str] = &["query", "api", "conditional"];
const CONDITION_TESTS: &[&str] = &[
    "has_results",
    "empty",
    "count_gte",
    "count_lte",
    "has_ontology",
    "has_relationship",
];
const PARAM_TYPES: &[&str] = &["string", "number"];

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

struct ShapeChecker {
    issues: Vec<DecodeIssue>,
}

impl ShapeChecker {
    fn new() -> Self {
        Self { issues: Vec::new() }
    }

    fn report(&mut self, path: &str, statement: Option<usize>, message: String) {
        self.issues.push(DecodeIssue {
            path: if path.is_empty() {
                None
            } else {
                Some(path.to_string())
            },
            statement,
            message,
        });
    }

    /// Fetch a required field, reporting when absent
    fn required<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        path: &str,
        field: &str,
        statement: Option<usize>,
    ) -> Option<&'a Value> {
        match obj.get(field) {
            Some(value) => Some(value),
            None => {
                self.report(
                    &join(path, field),
                    statement,
                    format!("Missing required field '{}'", field),
                );
                None
            }
        }
    }

    fn expect_object<'a>(
        &mut self,
        value: &'a Value,
        path: &str,
        statement: Option<usize>,
    ) -> Option<&'a Map<String, Value>> {
        match value {
            Value::Object(obj) => Some(obj),
            other => {
                self.report(
                    path,
                    statement,
                    format!("Expected object, found {}", kind_name(other)),
                );
                None
            }
        }
    }

    fn expect_array<'a>(
        &mut self,
        value: &'a Value,
        path: &str,
        statement: Option<usize>,
    ) -> Option<&'a Vec<Value>> {
        match value {
            Value::Array(items) => Some(items),
            other => {
                self.report(
                    path,
                    statement,
                    format!("Expected array, found {}", kind_name(other)),
                );
                None
            }
        }
    }

    fn expect_string(&mut self, value: &Value, path: &str, statement: Option<usize>) -> bool {
        if value.is_string() {
            return true;
        }
        self.report(
            path,
            statement,
            format!("Expected string, found {}", kind_name(value)),
        );
        false
    }

    fn expect_one_of(
        &mut self,
        value: &Value,
        allowed: &[&str],
        path: &str,
        statement: Option<usize>,
    ) -> Option<String> {
        match value.as_str() {
            Some(s) if allowed.contains(&s) => Some(s.to_string()),
            Some(s) => {
                self.report(
                    path,
                    statement,
                    format!("Invalid value '{}', expected one of: {}", s, allowed.join(", ")),
                );
                None
            }
            None => {
                self.report(
                    path,
                    statement,
                    format!("Expected string, found {}", kind_name(value)),
                );
                None
            }
        }
    }

    fn expect_unsigned(&mut self, value: &Value, path: &str, statement: Option<usize>) {
        if value.as_u64().is_none() {
            self.report(
                path,
                statement,
                format!("Expected non-negative integer, found {}", kind_name(value)),
            );
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, path: &str, field: &str, statement: Option<usize>) {
        match obj.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => {
                self.expect_string(value, &join(path, field), statement);
            }
        }
    }

    fn check_program(&mut self, raw: &Value) {
        let Some(root) = self.expect_object(raw, "", None) else {
            return;
        };

        if let Some(version) = self.required(root, "", "version", None) {
            if version.as_i64().is_none() {
                self.report(
                    "version",
                    None,
                    format!("Expected integer, found {}", kind_name(version)),
                );
            }
        }

        if let Some(metadata) = root.get("metadata") {
            self.expect_object(metadata, "metadata", None);
        }

        match root.get("params") {
            None | Some(Value::Null) => {}
            Some(params) => {
                if let Some(items) = self.expect_array(params, "params", None) {
                    for (i, item) in items.iter().enumerate() {
                        self.check_param(item, &format!("params[{}]", i));
                    }
                }
            }
        }

        if let Some(statements) = self.required(root, "", "statements", None) {
            if let Some(items) = self.expect_array(statements, "statements", None) {
                for (i, item) in items.iter().enumerate() {
                    self.check_statement(item, &format!("statements[{}]", i), i);
                }
            }
        }
    }

    fn check_param(&mut self, value: &Value, path: &str) {
        let Some(obj) = self.expect_object(value, path, None) else {
            return;
        };
        if let Some(name) = self.required(obj, path, "name", None) {
            self.expect_string(name, &join(path, "name"), None);
        }
        if let Some(kind) = self.required(obj, path, "type", None) {
            self.expect_one_of(kind, PARAM_TYPES, &join(path, "type"), None);
        }
    }

    fn check_statement(&mut self, value: &Value, path: &str, top: usize) {
        let statement = Some(top);
        let Some(obj) = self.expect_object(value, path, statement) else {
            return;
        };
        if let Some(op) = self.required(obj, path, "op", statement) {
            self.expect_one_of(op, OPERATORS, &join(path, "op"), statement);
        }
        if let Some(operation) = self.required(obj, path, "operation", statement) {
            self.check_operation(operation, &join(path, "operation"), top);
        }
        self.optional_string(obj, path, "label", statement);
    }

    fn check_statement_list(&mut self, value: &Value, path: &str, top: usize) {
        if let Some(items) = self.expect_array(value, path, Some(top)) {
            for (i, item) in items.iter().enumerate() {
                self.check_statement(item, &format!("{}[{}]", path, i), top);
            }
        }
    }

    fn check_operation(&mut self, value: &Value, path: &str, top: usize) {
        let statement = Some(top);
        let Some(obj) = self.expect_object(value, path, statement) else {
            return;
        };
        let Some(tag) = self.required(obj, path, "type", statement) else {
            return;
        };
        let Some(tag) = self.expect_one_of(tag, OPERATION_TYPES, &join(path, "type"), statement)
        else {
            return;
        };

        match tag.as_str() {
            "query" => {
                if let Some(query) = self.required(obj, path, "query", statement) {
                    self.expect_string(query, &join(path, "query"), statement);
                }
                match obj.get("limit") {
                    None | Some(Value::Null) => {}
                    Some(limit) => self.expect_unsigned(limit, &join(path, "limit"), statement),
                }
            }
            "api" => {
                if let Some(endpoint) = self.required(obj, path, "endpoint", statement) {
                    self.expect_string(endpoint, &join(path, "endpoint"), statement);
                }
                if let Some(params) = obj.get("params") {
                    self.expect_object(params, &join(path, "params"), statement);
                }
            }
            _ => {
                if let Some(condition) = self.required(obj, path, "condition", statement) {
                    self.check_condition(condition, &join(path, "condition"), top);
                }
                if let Some(then) = self.required(obj, path, "then", statement) {
                    self.check_statement_list(then, &join(path, "then"), top);
                }
                match obj.get("else") {
                    None | Some(Value::Null) => {}
                    Some(otherwise) => self.check_statement_list(otherwise, &join(path, "else"), top),
                }
            }
        }
    }

    fn check_condition(&mut self, value: &Value, path: &str, top: usize) {
        let statement = Some(top);
        let Some(obj) = self.expect_object(value, path, statement) else {
            return;
        };
        let Some(test) = self.required(obj, path, "test", statement) else {
            return;
        };
        let Some(test) = self.expect_one_of(test, CONDITION_TESTS, &join(path, "test"), statement)
        else {
            return;
        };

        match test.as_str() {
            "count_gte" | "count_lte" => {
                if let Some(v) = self.required(obj, path, "value", statement) {
                    self.expect_unsigned(v, &join(path, "value"), statement);
                }
            }
            "has_ontology" => {
                if let Some(v) = self.required(obj, path, "ontology", statement) {
                    self.expect_string(v, &join(path, "ontology"), statement);
                }
            }
            "has_relationship" => {
                if let Some(v) = self.required(obj, path, "relationship_type", statement) {
                    self.expect_string(v, &join(path, "relationship_type"), statement);
                }
            }
            _ => {}
        }
    }
}

/// Decode an untrusted JSON value into a typed program, collecting every
/// shape mismatch on failure
pub fn decode_program(raw: &Value) -> Result<GraphProgram, Vec<DecodeIssue>> {
    let mut checker = ShapeChecker::new();
    checker.check_program(raw);
    if !checker.issues.is_empty() {
        return Err(checker.issues);
    }

    serde_json::from_value::<GraphProgram>(raw.clone()).map_err(|e| {
        vec![DecodeIssue {
            path: None,
            statement: None,
            message: format!("Program does not match the expected shape: {}", e),
        }]
    })
}
