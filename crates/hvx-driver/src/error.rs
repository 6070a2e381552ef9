// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph lowering and execution.

use hexagon_link::LinkError;
use memory_pools::PoolError;
use nn_model::{ModelError, OperationKind};
use tensor_shape::{ExplicitPadding, OperandType, ShapeError};

/// Errors raised while validating, lowering, compiling or executing a model.
#[derive(Debug, thiserror::Error)]
pub enum LoweringError {
    /// The model cannot be lowered as described (operand counts, ranks,
    /// zero dimensions, activation codes, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// No lowering exists for this operation on this representation.
    #[error("{kind} on {ty} operands is not supported")]
    Unsupported { kind: OperationKind, ty: OperandType },

    /// Explicit padding that has no implicit accelerator equivalent.
    #[error("{op}: explicit padding {padding:?} has no accelerator equivalent")]
    UnknownPadding {
        op: &'static str,
        padding: ExplicitPadding,
    },

    /// An operation references an operand that does not exist.
    #[error("operand {index} out of range ({count} operands)")]
    OperandOutOfRange { index: u32, count: usize },

    /// An operand's accelerator tensor was bound twice.
    #[error("operand {0} already has an accelerator tensor")]
    AlreadyBound(u32),

    /// An operand was consumed before anything produced it.
    #[error("operand {0} has no accelerator tensor")]
    NotBound(u32),

    /// The accelerator rejected a node.
    #[error("lowering failed: {0}")]
    Lowering(String),

    /// The accelerator refused to compile the graph.
    #[error("graph compilation failed: {0}")]
    Compile(#[source] LinkError),

    /// An execution could not be set up or did not complete.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The accelerator could not allocate a graph.
    #[error("graph allocation failed: {0}")]
    Allocation(String),

    /// A call was made in the wrong build state.
    #[error("model is {found}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    /// The driver is not available on this device.
    #[error("accelerator unavailable: {0}")]
    Unavailable(String),

    /// A background worker died.
    #[error("worker failed: {0}")]
    Worker(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("memory pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("accelerator error: {0}")]
    Link(#[from] LinkError),
}

impl LoweringError {
    /// `true` for errors detected before any accelerator node exists.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Unsupported { .. }
                | Self::UnknownPadding { .. }
                | Self::OperandOutOfRange { .. }
                | Self::Shape(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(LoweringError::Validation("x".into()).is_validation());
        assert!(LoweringError::Shape(ShapeError::UnknownPaddingCode(9)).is_validation());
        assert!(!LoweringError::NotBound(3).is_validation());
        assert!(!LoweringError::Compile(LinkError::Call {
            call: "hexagon_nn_prepare",
            code: -1
        })
        .is_validation());
    }

    #[test]
    fn test_messages() {
        let e = LoweringError::Unsupported {
            kind: OperationKind::Tanh,
            ty: OperandType::TensorQuant8Asymm,
        };
        assert_eq!(e.to_string(), "TANH on tensor_quant8_asymm operands is not supported");
    }
}
