//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Decodex.
//! The Decodex project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Decodex Error Module
//!
//! This module defines the error types used throughout Decodex for parsing
//! rule bodies and executing them against a context.
//!
//! ## Error Categories
//!
//! - **Parse-time**: unknown function names, unbalanced blocks, malformed loop
//!   headers and conditions that have no supported form. Parsing aborts on the
//!   first one.
//! - **Decode-time**: missing decoders, poor argument lists, invalid loop
//!   operators, senseless comparisons and accessor failures. Decoding aborts on
//!   the first one; writes already applied to destinations stay in place.
//!
//! Loop control (break, lazybreak, continue) is never reported through this
//! type, see [`crate::interp::DxFlow`].
//!
//! ## Usage
//!
//! ```rust
//! use decodex::errors::{DxError, Result};
//!
//! fn check(args: &[u8]) -> Result<()> {
//!     if args.is_empty() {
//!         return Err(DxError::poor_args("crc32", 1, 0));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Decodex.
pub type Result<T> = std::result::Result<T, DxError>;

/// Canonical error enumeration for Decodex.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum DxError {
    /// Generic syntax error inside a rule body.
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// A referenced callback, getter, modifier, helper or accessor is not registered.
    #[error("unknown {kind} function '{name}' at offset {offset}")]
    UnknownFunction {
        kind: String,
        name: String,
        offset: usize,
    },

    /// EOF reached before every opened block was closed.
    #[error("unbalanced control structures")]
    UnbalancedControl,

    /// A closing brace without a matching open block.
    #[error("unexpected close at offset {offset}")]
    UnexpectedClose { offset: usize },

    /// A `for` header matching neither the range nor the counter form.
    #[error("couldn't parse loop control structure '{header}' at offset {offset}")]
    MalformedLoop { offset: usize, header: String },

    /// A boolean expression too complex to evaluate without a helper.
    #[error("too complex condition '{condition}' at offset {offset}, use a condition helper")]
    ComplexCondition { offset: usize, condition: String },

    #[error("decoder not found: {0}")]
    DecoderNotFound(String),

    /// A document node required by a function is empty or absent.
    #[error("provided node is empty: {0}")]
    EmptyNode(String),

    #[error("function '{function}' requires at least {expected} argument(s), got {got}")]
    PoorArgs {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("unknown loop condition operator '{0}'")]
    LoopCondition(String),

    #[error("unknown loop increment operator '{0}'")]
    LoopIncrement(String),

    #[error("loop limit '{0}' is not an integer")]
    LoopLimit(String),

    #[error("senseless comparison of two static values '{left}' and '{right}'")]
    SenselessComparison { left: String, right: String },

    #[error("condition helper not found: {0}")]
    HelperNotFound(String),

    /// Failure raised by a field accessor while reading or writing a host value.
    #[error("accessor '{accessor}' failed: {message}")]
    Accessor { accessor: String, message: String },

    /// A raw document couldn't be parsed into a node tree.
    #[error("{format} document error: {message}")]
    Document { format: String, message: String },

    #[error("unknown lock policy: {0}")]
    UnknownPolicy(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for DxError {
    fn from(err: serde_json::Error) -> Self {
        DxError::document("json", err.to_string())
    }
}

impl From<serde_yaml::Error> for DxError {
    fn from(err: serde_yaml::Error) -> Self {
        DxError::document("yaml", err.to_string())
    }
}

impl DxError {
    /// Helper to construct syntax errors.
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        DxError::Parse {
            offset,
            message: message.into(),
        }
    }

    pub fn unknown_function(kind: &str, name: impl Into<String>, offset: usize) -> Self {
        DxError::UnknownFunction {
            kind: kind.to_string(),
            name: name.into(),
            offset,
        }
    }

    pub fn poor_args(function: impl Into<String>, expected: usize, got: usize) -> Self {
        DxError::PoorArgs {
            function: function.into(),
            expected,
            got,
        }
    }

    /// Helper to construct accessor errors.
    pub fn accessor(accessor: impl Into<String>, message: impl Into<String>) -> Self {
        DxError::Accessor {
            accessor: accessor.into(),
            message: message.into(),
        }
    }

    /// Helper to construct document errors.
    pub fn document(format: impl Into<String>, message: impl Into<String>) -> Self {
        DxError::Document {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        DxError::Internal(message.into())
    }
}
