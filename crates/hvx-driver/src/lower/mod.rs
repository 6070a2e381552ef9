// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-operation lowerings, one module per numeric representation.
//!
//! A lowering runs after its check succeeded, so operand counts and
//! argument values are already known to be valid. It appends the nodes for
//! one operation and binds the operation's outputs.

pub mod float32;
pub mod quant8;

use hexagon_link::NodeInput;
use nn_model::Operation;
use tensor_shape::{Shape, Window2d};

use crate::catalog::OperandCatalog;
use crate::LoweringError;

/// Window and stride descriptors of a windowed operation.
pub(crate) fn window_args(
    catalog: &mut OperandCatalog,
    window: &Window2d,
) -> Result<(NodeInput, NodeInput), LoweringError> {
    let shape = catalog.create_shape(1, window.filter_height, window.filter_width, 1)?;
    let stride = stride_arg(catalog, window)?;
    Ok((shape, stride))
}

/// Stride descriptor of a windowed operation.
pub(crate) fn stride_arg(
    catalog: &mut OperandCatalog,
    window: &Window2d,
) -> Result<NodeInput, LoweringError> {
    catalog.create_shape(1, window.stride_height, window.stride_width, 1)
}

/// Concatenation axis of the rank-4 aligned tensors.
pub(crate) fn aligned_axis(shape: &Shape, axis: i32) -> Result<i32, LoweringError> {
    let rank = shape.rank() as i32;
    let axis = if axis < 0 { axis + rank } else { axis };
    if !(0..rank).contains(&axis) {
        return Err(LoweringError::Validation(format!(
            "concatenation axis {axis} out of range for rank {rank}"
        )));
    }
    Ok(axis + (tensor_shape::MAX_RANK as i32 - rank))
}

/// Splits a CONCATENATION's inputs into tensors and the axis operand.
pub(crate) fn concat_inputs(op: &Operation) -> (&[u32], u32) {
    let (tensors, axis) = op.inputs.split_at(op.inputs.len().saturating_sub(1));
    (tensors, axis.first().copied().unwrap_or_default())
}
