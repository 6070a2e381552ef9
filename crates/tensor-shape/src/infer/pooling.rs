// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 2-D pooling shape rule.

use super::expect_rank;
use crate::{Shape, ShapeError, Window2d};

/// Output shape of AVERAGE/MAX/L2 pooling over an NHWC input.
///
/// # Errors
/// Returns [`ShapeError::RankMismatch`] for a non 4-D input, or the window
/// arithmetic error when the filter does not fit.
pub fn pool2d(input: &Shape, window: &Window2d) -> Result<Shape, ShapeError> {
    expect_rank("pool2d", input, 4)?;
    let (batches, height, width, depth) = (input.dims[0], input.dims[1], input.dims[2], input.dims[3]);
    let (out_h, out_w) = window.output_hw(height, width)?;
    Ok(Shape {
        dims: vec![batches, out_h, out_w, depth],
        ..input.clone()
    })
}
