// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! AST subsystem: program model, decoding, safety scanning and validation

#[allow(clippy::module_inception)]
mod ast;
pub use ast::*;
pub mod decode;
pub mod safety;
pub mod validator;
