// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runtime parameter bindings

use crate::ast::{ParamDeclaration, ParamType};
use crate::exec::error::ExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A runtime parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::String(_) => ParamType::String,
            ParamValue::Integer(_) | ParamValue::Float(_) => ParamType::Number,
        }
    }

    /// Convert a JSON value; only strings and numbers are representable
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ParamValue::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(ParamValue::Integer)
                .or_else(|| n.as_f64().map(ParamValue::Float)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Integer(i) => Value::from(*i),
            ParamValue::Float(f) => Value::from(*f),
            ParamValue::String(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

/// Parameter name to value
pub type ParamBindings = BTreeMap<String, ParamValue>;

/// Resolve runtime bindings against a program's declarations
///
/// Each declared parameter takes its runtime binding, falling back to its
/// default. Undeclared bindings are dropped.
pub fn resolve_bindings(
    declarations: &[ParamDeclaration],
    runtime: &ParamBindings,
) -> Result<ParamBindings, ExecutionError> {
    let mut resolved = ParamBindings::new();

    for decl in declarations {
        let value = match runtime.get(&decl.name) {
            Some(value) => value.clone(),
            None => match &decl.default {
                Some(default) => ParamValue::from_json(default).ok_or_else(|| {
                    ExecutionError::Parameter(format!(
                        "default for '{}' is not a string or number",
                        decl.name
                    ))
                })?,
                None => {
                    return Err(ExecutionError::Parameter(format!(
                        "no value bound for parameter '{}'",
                        decl.name
                    )))
                }
            },
        };

        if value.param_type() != decl.param_type {
            return Err(ExecutionError::Parameter(format!(
                "parameter '{}' expects a {}, got {}",
                decl.name, decl.param_type, value
            )));
        }
        resolved.insert(decl.name.clone(), value);
    }

    for name in runtime.keys() {
        if !resolved.contains_key(name) {
            log::warn!("Ignoring binding for undeclared parameter '{}'", name);
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decl(name: &str, param_type: ParamType, default: Option<Value>) -> ParamDeclaration {
        ParamDeclaration {
            name: name.to_string(),
            param_type,
            default,
        }
    }

    #[test]
    fn test_runtime_binding_overrides_default() {
        let decls = vec![decl("term", ParamType::String, Some(json!("entropy")))];
        let mut runtime = ParamBindings::new();
        runtime.insert("term".into(), "enthalpy".into());

        let resolved = resolve_bindings(&decls, &runtime).unwrap();
        assert_eq!(resolved["term"], ParamValue::String("enthalpy".into()));
    }

    #[test]
    fn test_default_used_and_undeclared_dropped() {
        let decls = vec![decl("limit", ParamType::Number, Some(json!(25)))];
        let mut runtime = ParamBindings::new();
        runtime.insert("stray".into(), ParamValue::Float(1.5));

        let resolved = resolve_bindings(&decls, &runtime).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["limit"], ParamValue::Integer(25));
    }

    #[test]
    fn test_missing_and_mistyped_bindings() {
        let decls = vec![decl("term", ParamType::String, None)];
        assert!(matches!(
            resolve_bindings(&decls, &ParamBindings::new()),
            Err(ExecutionError::Parameter(_))
        ));

        let mut runtime = ParamBindings::new();
        runtime.insert("term".into(), ParamValue::Integer(3));
        assert!(matches!(
            resolve_bindings(&decls, &runtime),
            Err(ExecutionError::Parameter(_))
        ));
    }

    #[test]
    fn test_untagged_json_shape() {
        let bindings: ParamBindings =
            serde_json::from_value(json!({"a": 1, "b": 2.5, "c": "x"})).unwrap();
        assert_eq!(bindings["a"], ParamValue::Integer(1));
        assert_eq!(bindings["b"], ParamValue::Float(2.5));
        assert_eq!(bindings["c"], ParamValue::String("x".into()));
    }
}
