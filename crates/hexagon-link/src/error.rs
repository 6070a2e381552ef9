// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the accelerator link.

use crate::GraphId;

/// Errors raised by an accelerator link.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    /// The vendor runtime library could not be loaded.
    #[error("accelerator runtime not available: {0}")]
    Unavailable(String),

    /// A required symbol is missing from the vendor runtime.
    #[error("symbol '{symbol}' missing from accelerator runtime: {detail}")]
    MissingSymbol { symbol: &'static str, detail: String },

    /// A runtime call returned a non-zero status code.
    #[error("{call} failed with code {code}")]
    Call { call: &'static str, code: i32 },

    /// The runtime does not know an operation name.
    #[error("accelerator does not implement op '{0}'")]
    UnknownOp(&'static str),

    /// A graph id does not name a live graph.
    #[error("unknown accelerator graph {0}")]
    UnknownGraph(GraphId),

    /// The recording link could not evaluate a graph.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Converts a native status code into a `Result`.
pub fn check_status(code: i32, call: &'static str) -> Result<(), LinkError> {
    if code == 0 {
        Ok(())
    } else {
        Err(LinkError::Call { call, code })
    }
}
