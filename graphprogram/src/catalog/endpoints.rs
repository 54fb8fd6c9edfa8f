// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! API endpoint allowlist
//!
//! The table below is the single source of truth for which endpoints a
//! program may call and what parameters each accepts. The validator checks
//! API operations against it and the dispatch handler registry refuses to
//! register anything it does not list.

use serde_json::Value;
use std::fmt;

/// Version of the allowlist table; bump when entries change
pub const ALLOWLIST_VERSION: u32 = 1;

/// JSON value kinds a parameter may take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    Null,
}

impl ValueKind {
    /// Classify a JSON value. Numbers representable as i64/u64 are integers.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => ValueKind::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared parameter of an endpoint
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    /// Any of these kinds is acceptable
    pub kinds: &'static [ValueKind],
}

impl ParamSpec {
    pub fn accepts(&self, value: &Value) -> bool {
        self.kinds.contains(&ValueKind::of(value))
    }

    /// Human-readable expected type, e.g. `integer or float`
    pub fn expected(&self) -> String {
        self.kinds
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Contract of one allowlisted endpoint
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [ParamSpec],
    pub optional: &'static [ParamSpec],
}

impl EndpointSpec {
    /// Look up a declared parameter, required or optional
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|p| p.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|p| p.name == name)
    }
}

const STRING: &[ValueKind] = &[ValueKind::String];
const INTEGER: &[ValueKind] = &[ValueKind::Integer];
const NUMBER: &[ValueKind] = &[ValueKind::Integer, ValueKind::Float];
const BOOLEAN: &[ValueKind] = &[ValueKind::Boolean];
const STRING_LIST: &[ValueKind] = &[ValueKind::Array];

const fn param(name: &'static str, kinds: &'static [ValueKind]) -> ParamSpec {
    ParamSpec { name, kinds }
}

/// The allowlist table
pub static ENDPOINTS: &[EndpointSpec] = &[
    EndpointSpec {
        name: "/search/concepts",
        description: "Semantic search over concept embeddings",
        required: &[param("query", STRING)],
        optional: &[
            param("limit", INTEGER),
            param("min_similarity", NUMBER),
            param("ontology", STRING),
        ],
    },
    EndpointSpec {
        name: "/search/sources",
        description: "Semantic search over source passages, returning their concepts",
        required: &[param("query", STRING)],
        optional: &[
            param("limit", INTEGER),
            param("min_similarity", NUMBER),
            param("ontology", STRING),
        ],
    },
    EndpointSpec {
        name: "/concepts/details",
        description: "A single concept with its immediate relationships",
        required: &[param("concept_id", STRING)],
        optional: &[param("include_sources", BOOLEAN)],
    },
    EndpointSpec {
        name: "/concepts/related",
        description: "Concepts reachable from a concept within a bounded depth",
        required: &[param("concept_id", STRING)],
        optional: &[
            param("max_depth", INTEGER),
            param("relationship_types", STRING_LIST),
            param("limit", INTEGER),
        ],
    },
    EndpointSpec {
        name: "/concepts/similar",
        description: "Vector-similarity neighbours of a concept",
        required: &[param("concept_id", STRING)],
        optional: &[param("limit", INTEGER), param("min_similarity", NUMBER)],
    },
    EndpointSpec {
        name: "/graph/connection",
        description: "Shortest bounded connection between two concepts",
        required: &[param("from_id", STRING), param("to_id", STRING)],
        optional: &[param("max_hops", INTEGER)],
    },
    EndpointSpec {
        name: "/ontology/concepts",
        description: "Concepts belonging to one ontology",
        required: &[param("ontology", STRING)],
        optional: &[param("limit", INTEGER)],
    },
];

/// Find an endpoint's contract by exact name
pub fn lookup(endpoint: &str) -> Option<&'static EndpointSpec> {
    ENDPOINTS.iter().find(|spec| spec.name == endpoint)
}
