//! JSON program builders

use graphprogram::{parse_validated, GraphProgram};
use serde_json::{json, Value};

pub fn query(op: &str, text: &str) -> Value {
    json!({"op": op, "operation": {"type": "query", "query": text}})
}

pub fn api(op: &str, endpoint: &str, params: Value) -> Value {
    json!({"op": op, "operation": {"type": "api", "endpoint": endpoint, "params": params}})
}

pub fn conditional(condition: Value, then: Vec<Value>, otherwise: Option<Vec<Value>>) -> Value {
    let mut operation = json!({"type": "conditional", "condition": condition, "then": then});
    if let Some(otherwise) = otherwise {
        operation["else"] = Value::Array(otherwise);
    }
    json!({"op": "+", "operation": operation})
}

pub fn program_json(statements: Vec<Value>) -> Value {
    json!({"version": 1, "metadata": {"name": "test"}, "statements": statements})
}

/// Validate and decode; panics on an invalid program
pub fn program(statements: Vec<Value>) -> GraphProgram {
    match parse_validated(&program_json(statements)) {
        Ok((program, _)) => program,
        Err(result) => panic!("program should validate: {:?}", result.errors),
    }
}
