// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution and fully-connected shape rules.

use super::expect_rank;
use crate::{Shape, ShapeError, Window2d};

fn check_bias(op: &'static str, bias: &Shape, channels: u32) -> Result<(), ShapeError> {
    expect_rank(op, bias, 1)?;
    if bias.dims[0] != channels {
        return Err(ShapeError::InvalidParameter {
            op,
            name: "bias length",
            value: i64::from(bias.dims[0]),
        });
    }
    Ok(())
}

/// Output shape of CONV_2D.
///
/// `input` is `[N, H, W, I]`, `filter` is `[O, FH, FW, I]`, `bias` is `[O]`.
/// The output is `[N, OH, OW, O]`. The window's filter size must be the
/// filter's spatial size.
pub fn conv2d(
    input: &Shape,
    filter: &Shape,
    bias: &Shape,
    window: &Window2d,
) -> Result<Shape, ShapeError> {
    expect_rank("conv2d", input, 4)?;
    expect_rank("conv2d", filter, 4)?;
    let out_channels = filter.dims[0];
    if filter.dims[3] != input.dims[3] {
        return Err(ShapeError::ShapeMismatch {
            op: "conv2d",
            lhs: input.clone(),
            rhs: filter.clone(),
        });
    }
    check_bias("conv2d", bias, out_channels)?;

    let (out_h, out_w) = window.output_hw(input.dims[1], input.dims[2])?;
    Ok(Shape {
        dims: vec![input.dims[0], out_h, out_w, out_channels],
        ..input.clone()
    })
}

/// Output shape of DEPTHWISE_CONV_2D.
///
/// `input` is `[N, H, W, I]`, `filter` is `[1, FH, FW, I * multiplier]`,
/// `bias` is `[I * multiplier]`.
pub fn depthwise_conv2d(
    input: &Shape,
    filter: &Shape,
    bias: &Shape,
    window: &Window2d,
    multiplier: u32,
) -> Result<Shape, ShapeError> {
    expect_rank("depthwise_conv2d", input, 4)?;
    expect_rank("depthwise_conv2d", filter, 4)?;
    if multiplier == 0 {
        return Err(ShapeError::InvalidParameter {
            op: "depthwise_conv2d",
            name: "depth multiplier",
            value: 0,
        });
    }
    let out_channels = filter.dims[3];
    if filter.dims[0] != 1 || input.dims[3] * multiplier != out_channels {
        return Err(ShapeError::ShapeMismatch {
            op: "depthwise_conv2d",
            lhs: input.clone(),
            rhs: filter.clone(),
        });
    }
    check_bias("depthwise_conv2d", bias, out_channels)?;

    let (out_h, out_w) = window.output_hw(input.dims[1], input.dims[2])?;
    Ok(Shape {
        dims: vec![input.dims[0], out_h, out_w, out_channels],
        ..input.clone()
    })
}

/// Output shape of FULLY_CONNECTED.
///
/// `weights` is `[N, K]`; the input is flattened to `[elements / K, K]` and
/// the output is `[elements / K, N]`.
pub fn fully_connected(input: &Shape, weights: &Shape, bias: &Shape) -> Result<Shape, ShapeError> {
    expect_rank("fully_connected", weights, 2)?;
    let (units, input_size) = (weights.dims[0], weights.dims[1]);
    let elements = input.num_elements();
    if input_size == 0 || elements % input_size as usize != 0 {
        return Err(ShapeError::ShapeMismatch {
            op: "fully_connected",
            lhs: input.clone(),
            rhs: weights.clone(),
        });
    }
    check_bias("fully_connected", bias, units)?;

    let batch = (elements / input_size as usize) as u32;
    Ok(Shape {
        dims: vec![batch, units],
        ..input.clone()
    })
}
