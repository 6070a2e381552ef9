// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise shape rules.

use crate::{Shape, ShapeError};

/// Broadcasts two shapes for a binary elementwise operation (ADD, MUL).
///
/// Dimensions are aligned from the innermost axis; a pair is compatible when
/// the sizes are equal or either is 1.
///
/// # Errors
/// Returns [`ShapeError::ShapeMismatch`] for incompatible dimensions.
pub fn broadcast(op: &'static str, lhs: &Shape, rhs: &Shape) -> Result<Shape, ShapeError> {
    let rank = lhs.rank().max(rhs.rank());
    let mut dims = vec![1u32; rank];

    for (i, out) in dims.iter_mut().rev().enumerate() {
        let a = lhs.rank().checked_sub(i + 1).map_or(1, |j| lhs.dims[j]);
        let b = rhs.rank().checked_sub(i + 1).map_or(1, |j| rhs.dims[j]);
        *out = match (a, b) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(ShapeError::ShapeMismatch {
                    op,
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                })
            }
        };
    }

    Ok(Shape { dims, ..lhs.clone() })
}

/// Output shape of a shape-preserving operation (activations, softmax, LRN).
pub fn unary(input: &Shape) -> Shape {
    input.clone()
}
