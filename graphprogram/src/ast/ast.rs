// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Abstract Syntax Tree (AST) structures for graph programs
//!
//! A program is a finite list of statements. Each statement pairs a
//! set-algebra [`Operator`] with an [`Operation`] that produces (or, for
//! conditionals, selects) the graph fragment the operator is applied to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The only program format version accepted
pub const PROGRAM_VERSION: i64 = 1;

/// Set-algebra operator applied between the working graph and a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `+`: add result nodes/links not already present
    #[serde(rename = "+")]
    Union,
    /// `-`: remove nodes present in the result
    #[serde(rename = "-")]
    Difference,
    /// `&`: keep only nodes present in the result
    #[serde(rename = "&")]
    Intersect,
    /// `?`: union if the result is non-empty, otherwise no-op
    #[serde(rename = "?")]
    Optional,
    /// `!`: union if the result is non-empty, otherwise abort the program
    #[serde(rename = "!")]
    Assert,
}

impl Operator {
    /// The single-character tag used on the wire
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Union => "+",
            Operator::Difference => "-",
            Operator::Intersect => "&",
            Operator::Optional => "?",
            Operator::Assert => "!",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Operator::Union),
            "-" => Some(Operator::Difference),
            "&" => Some(Operator::Intersect),
            "?" => Some(Operator::Optional),
            "!" => Some(Operator::Assert),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Read-only graph query with an optional result-count cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOperation {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Call to an allowlisted API endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiOperation {
    pub endpoint: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Branch on a predicate over the current working graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOperation {
    pub condition: Condition,
    pub then: Vec<Statement>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Vec<Statement>>,
}

impl ConditionalOperation {
    /// The else branch, with an absent branch behaving as empty
    pub fn else_branch(&self) -> &[Statement] {
        self.otherwise.as_deref().unwrap_or(&[])
    }
}

/// The three operation kinds a statement may carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Query(QueryOperation),
    Api(ApiOperation),
    Conditional(ConditionalOperation),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Query(_) => OperationKind::Query,
            Operation::Api(_) => OperationKind::Api,
            Operation::Conditional(_) => OperationKind::Conditional,
        }
    }
}

/// Tag-only view of an [`Operation`], used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Api,
    Conditional,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => f.write_str("query"),
            OperationKind::Api => f.write_str("api"),
            OperationKind::Conditional => f.write_str("conditional"),
        }
    }
}

/// Predicate over the working graph's current contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Condition {
    HasResults,
    Empty,
    CountGte { value: u64 },
    CountLte { value: u64 },
    HasOntology { ontology: String },
    HasRelationship { relationship_type: String },
}

/// One operator + operation pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub op: Operator,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Opaque authoring-tool metadata, preserved but never interpreted
    #[serde(default, rename = "block", skip_serializing_if = "Option::is_none")]
    pub block_annotation: Option<Value>,
}

impl Statement {
    pub fn new(op: Operator, operation: Operation) -> Self {
        Self {
            op,
            operation,
            label: None,
            block_annotation: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Declared type of a program parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => f.write_str("string"),
            ParamType::Number => f.write_str("number"),
        }
    }
}

/// Program parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Free-form program metadata (name, description, author, ...)
pub type ProgramMetadata = Map<String, Value>;

/// Top-level program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphProgram {
    pub version: i64,
    #[serde(default)]
    pub metadata: ProgramMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<ParamDeclaration>>,
    pub statements: Vec<Statement>,
}

impl GraphProgram {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            version: PROGRAM_VERSION,
            metadata: ProgramMetadata::new(),
            params: None,
            statements,
        }
    }

    /// Program name from metadata, if any
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(Value::as_str)
    }

    pub fn param_declarations(&self) -> &[ParamDeclaration] {
        self.params.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_symbols() {
        for op in [
            Operator::Union,
            Operator::Difference,
            Operator::Intersect,
            Operator::Optional,
            Operator::Assert,
        ] {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operator::from_symbol("*"), None);
    }

    #[test]
    fn test_program_wire_shape() {
        let raw = json!({
            "version": 1,
            "metadata": {"name": "neighbourhood"},
            "statements": [
                {
                    "op": "+",
                    "operation": {"type": "query", "query": "MATCH (c:Concept) RETURN c", "limit": 10},
                    "label": "seed",
                    "block": {"x": 10, "y": 20}
                },
                {
                    "op": "?",
                    "operation": {
                        "type": "conditional",
                        "condition": {"test": "count_gte", "value": 3},
                        "then": [
                            {"op": "&", "operation": {"type": "api", "endpoint": "/search/concepts", "params": {"query": "x"}}}
                        ]
                    }
                }
            ]
        });

        let program: GraphProgram = serde_json::from_value(raw).unwrap();
        assert_eq!(program.name(), Some("neighbourhood"));
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0].label.as_deref(), Some("seed"));
        assert_eq!(
            program.statements[0].block_annotation,
            Some(json!({"x": 10, "y": 20}))
        );

        match &program.statements[1].operation {
            Operation::Conditional(cond) => {
                assert_eq!(cond.condition, Condition::CountGte { value: 3 });
                assert!(cond.else_branch().is_empty());
                assert_eq!(cond.then[0].op, Operator::Intersect);
            }
            other => panic!("expected conditional, got {:?}", other),
        }

        // Block annotations survive a round trip untouched
        let back = serde_json::to_value(&program).unwrap();
        assert_eq!(back["statements"][0]["block"], json!({"x": 10, "y": 20}));
    }
}
