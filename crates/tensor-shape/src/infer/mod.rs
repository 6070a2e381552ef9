// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Output-shape inference for the operations the driver lowers.
//!
//! Every function takes the input shapes (and already-decoded scalar
//! hyper-parameters) and returns the output shape. Type and quantization
//! parameters of the result are copied from the primary input; callers that
//! own a pre-declared output operand keep its own type and only take the
//! dimensions.

mod conv;
mod elementwise;
mod layout;
mod pooling;

pub use conv::{conv2d, depthwise_conv2d, fully_connected};
pub use elementwise::{broadcast, unary};
pub use layout::{concatenation, dequantize, reshape, resize_bilinear};
pub use pooling::pool2d;

use crate::{Shape, ShapeError};

pub(crate) fn expect_rank(op: &'static str, shape: &Shape, rank: usize) -> Result<(), ShapeError> {
    if shape.rank() != rank {
        return Err(ShapeError::RankMismatch {
            op,
            expected: rank,
            actual: shape.rank(),
        });
    }
    Ok(())
}
