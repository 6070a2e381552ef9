// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Padding schemes and sliding-window output-size arithmetic.
//!
//! Windowed operations (pooling, convolution) accept either an implicit
//! padding code or four explicit padding amounts. The accelerator only
//! understands the implicit schemes, so explicit padding has to be
//! reconciled back to one of them.

use crate::ShapeError;

/// Implicit padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingScheme {
    /// Output spatial size is `ceil(in / stride)`.
    Same,
    /// No padding; the window never leaves the input.
    Valid,
}

impl PaddingScheme {
    /// Numeric code carried by the 7-argument (implicit) operation form.
    pub const SAME_CODE: i32 = 1;
    /// See [`PaddingScheme::SAME_CODE`].
    pub const VALID_CODE: i32 = 2;

    /// Parses an implicit padding code.
    pub fn from_code(code: i32) -> Result<Self, ShapeError> {
        match code {
            Self::SAME_CODE => Ok(Self::Same),
            Self::VALID_CODE => Ok(Self::Valid),
            other => Err(ShapeError::UnknownPaddingCode(other)),
        }
    }

    /// Output size along one axis under this scheme.
    pub fn output_size(self, input: u32, filter: u32, stride: u32) -> Result<u32, ShapeError> {
        check_stride("padding", stride)?;
        match self {
            PaddingScheme::Same => Ok(input.div_ceil(stride)),
            PaddingScheme::Valid => {
                if filter > input {
                    return Err(ShapeError::FilterTooLarge {
                        op: "padding",
                        filter,
                        padded: input,
                    });
                }
                Ok((input - filter + 1).div_ceil(stride))
            }
        }
    }

    /// Head/tail amounts this scheme implies along one axis.
    pub fn explicit(self, input: u32, filter: u32, stride: u32) -> Result<(u32, u32), ShapeError> {
        match self {
            PaddingScheme::Valid => Ok((0, 0)),
            PaddingScheme::Same => {
                let out = self.output_size(input, filter, stride)?;
                let needed = out
                    .saturating_sub(1)
                    .saturating_mul(stride)
                    .saturating_add(filter);
                let total = needed.saturating_sub(input);
                Ok((total / 2, total - total / 2))
            }
        }
    }
}

/// Explicit padding amounts of the 10-argument operation form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExplicitPadding {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl ExplicitPadding {
    pub fn new(left: u32, right: u32, top: u32, bottom: u32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }
}

/// Padding of a windowed operation, in either form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding2d {
    Implicit(PaddingScheme),
    Explicit(ExplicitPadding),
}

/// Filter and stride of a windowed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window2d {
    pub filter_width: u32,
    pub filter_height: u32,
    pub stride_width: u32,
    pub stride_height: u32,
    pub padding: Padding2d,
}

impl Window2d {
    /// Output `(height, width)` for an input of `(height, width)`.
    pub fn output_hw(&self, in_height: u32, in_width: u32) -> Result<(u32, u32), ShapeError> {
        match self.padding {
            Padding2d::Implicit(scheme) => Ok((
                scheme.output_size(in_height, self.filter_height, self.stride_height)?,
                scheme.output_size(in_width, self.filter_width, self.stride_width)?,
            )),
            Padding2d::Explicit(pad) => Ok((
                explicit_output_size(
                    in_height,
                    self.filter_height,
                    self.stride_height,
                    pad.top,
                    pad.bottom,
                )?,
                explicit_output_size(
                    in_width,
                    self.filter_width,
                    self.stride_width,
                    pad.left,
                    pad.right,
                )?,
            )),
        }
    }

    /// The implicit scheme this window is lowered with, or `None` when
    /// explicit padding cannot be expressed as one.
    pub fn scheme(&self, in_height: u32, in_width: u32) -> Option<PaddingScheme> {
        match self.padding {
            Padding2d::Implicit(scheme) => Some(scheme),
            Padding2d::Explicit(pad) => reconcile_padding(
                in_height,
                in_width,
                self.filter_height,
                self.filter_width,
                self.stride_height,
                self.stride_width,
                pad,
            ),
        }
    }
}

fn check_stride(op: &'static str, stride: u32) -> Result<(), ShapeError> {
    if stride == 0 {
        return Err(ShapeError::InvalidParameter {
            op,
            name: "stride",
            value: 0,
        });
    }
    Ok(())
}

/// Output size along one axis with explicit padding:
/// `ceil((input + head + tail - filter) / stride) + 1`.
///
/// # Examples
/// ```
/// use tensor_shape::explicit_output_size;
/// assert_eq!(explicit_output_size(7, 3, 2, 0, 1).unwrap(), 4);
/// ```
pub fn explicit_output_size(
    input: u32,
    filter: u32,
    stride: u32,
    head: u32,
    tail: u32,
) -> Result<u32, ShapeError> {
    check_stride("padding", stride)?;
    let padded = input
        .checked_add(head)
        .and_then(|v| v.checked_add(tail))
        .ok_or(ShapeError::InvalidParameter {
            op: "padding",
            name: "padding",
            value: i64::from(head) + i64::from(tail),
        })?;
    if filter == 0 || filter > padded {
        return Err(ShapeError::FilterTooLarge {
            op: "padding",
            filter,
            padded,
        });
    }
    Ok((padded - filter).div_ceil(stride) + 1)
}

/// Maps explicit padding onto an implicit scheme.
///
/// All-zero padding is [`PaddingScheme::Valid`]. Non-zero padding is
/// [`PaddingScheme::Same`] when, on both axes, the output size is
/// `ceil(in / stride)` and neither the head nor the tail exceeds the amount
/// SAME pads there (see [`PaddingScheme::explicit`]). Padding less than SAME
/// on one side, such as `(0, 1)` where SAME pads `(1, 1)`, is accepted.
/// Anything else has no accelerator equivalent and yields `None`.
pub fn reconcile_padding(
    in_height: u32,
    in_width: u32,
    filter_height: u32,
    filter_width: u32,
    stride_height: u32,
    stride_width: u32,
    pad: ExplicitPadding,
) -> Option<PaddingScheme> {
    if pad.is_zero() {
        return Some(PaddingScheme::Valid);
    }
    let fits = fits_same(in_height, filter_height, stride_height, pad.top, pad.bottom)
        && fits_same(in_width, filter_width, stride_width, pad.left, pad.right);
    fits.then_some(PaddingScheme::Same)
}

fn fits_same(input: u32, filter: u32, stride: u32, head: u32, tail: u32) -> bool {
    let Ok((same_head, same_tail)) = PaddingScheme::Same.explicit(input, filter, stride) else {
        return false;
    };
    if head > same_head || tail > same_tail {
        return false;
    }
    let out = explicit_output_size(input, filter, stride, head, tail);
    let same = PaddingScheme::Same.output_size(input, filter, stride);
    matches!((out, same), (Ok(a), Ok(b)) if a == b)
}
