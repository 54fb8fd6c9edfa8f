// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Static catalogs shared by validation and dispatch

pub mod endpoints;

pub use endpoints::{EndpointSpec, ParamSpec, ValueKind, ALLOWLIST_VERSION};
