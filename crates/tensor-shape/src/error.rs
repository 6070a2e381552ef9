// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape arithmetic.

use crate::Shape;

/// Errors produced while inferring or aligning operand shapes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    /// An operand has a different rank than the operation requires.
    #[error("{op}: expected rank {expected}, got {actual}")]
    RankMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An operand exceeds the maximum supported rank.
    #[error("rank {rank} exceeds the maximum of {max}")]
    RankTooLarge { rank: usize, max: usize },

    /// Two operands have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// A hyper-parameter (stride, filter size, axis, ...) is out of range.
    #[error("{op}: invalid parameter {name} = {value}")]
    InvalidParameter {
        op: &'static str,
        name: &'static str,
        value: i64,
    },

    /// The filter (plus padding) does not fit inside the input.
    #[error("{op}: filter {filter} larger than padded input {padded}")]
    FilterTooLarge {
        op: &'static str,
        filter: u32,
        padded: u32,
    },

    /// An implicit padding code is not recognised.
    #[error("unknown implicit padding code {0}")]
    UnknownPaddingCode(i32),
}
