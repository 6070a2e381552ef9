// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model descriptions and requests.

/// Errors that can occur when building or validating a model description.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model manifest file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// An operand entry is inconsistent.
    #[error("invalid operand {index}: {detail}")]
    InvalidOperand { index: usize, detail: String },

    /// An operation entry is inconsistent.
    #[error("invalid operation {index} ({kind}): {detail}")]
    InvalidOperation {
        index: usize,
        kind: String,
        detail: String,
    },

    /// The model as a whole is malformed (missing inputs/outputs, ...).
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    /// An execution request does not match the model it targets.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
