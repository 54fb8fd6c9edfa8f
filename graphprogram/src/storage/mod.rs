// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Working graph storage
//!
//! In-memory node and link sets keyed by concept id and compound link key.

pub mod working_graph;

pub use working_graph::{
    GraphError, GraphLink, GraphNode, GraphSnapshot, LinkKey, WorkingGraph,
};
