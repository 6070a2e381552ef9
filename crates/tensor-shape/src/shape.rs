// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operand shape descriptors and dimension utilities.

use crate::{OperandType, ShapeError};
use std::fmt;

/// Maximum operand rank understood by the accelerator.
pub const MAX_RANK: usize = 4;

/// Type, dimensions and quantization parameters of an operand.
///
/// Dimensions follow the portable model convention: 4-D tensors are laid out
/// as `[batches, height, width, depth]`. A zero dimension means "not yet
/// known" and is filled in by shape inference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    /// Numeric representation.
    pub ty: OperandType,
    /// Ordered dimensions, outermost first.
    pub dims: Vec<u32>,
    /// Quantization scale (meaningful for quantized types only).
    pub scale: f32,
    /// Quantization zero point (meaningful for quantized types only).
    pub zero_point: i32,
}

impl Shape {
    /// Creates an unquantized shape.
    ///
    /// # Examples
    /// ```
    /// use tensor_shape::{OperandType, Shape};
    /// let s = Shape::new(OperandType::TensorFloat32, vec![1, 7, 7, 3]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), 147);
    /// ```
    pub fn new(ty: OperandType, dims: Vec<u32>) -> Self {
        Self {
            ty,
            dims,
            scale: 0.0,
            zero_point: 0,
        }
    }

    /// Creates a quantized shape.
    pub fn quantized(ty: OperandType, dims: Vec<u32>, scale: f32, zero_point: i32) -> Self {
        Self {
            ty,
            dims,
            scale,
            zero_point,
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<u32> {
        self.dims.get(index).copied()
    }

    /// Returns the total number of elements (1 for a scalar).
    pub fn num_elements(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Returns the byte length of a densely packed buffer with this shape.
    pub fn size_bytes(&self) -> usize {
        self.num_elements() * self.ty.size_bytes()
    }

    /// Returns `true` if any dimension is still unknown (zero).
    pub fn has_unknown_dims(&self) -> bool {
        self.dims.iter().any(|&d| d == 0)
    }

    /// Returns the dimensions left-padded with ones to rank 4.
    pub fn aligned(&self) -> Result<[u32; 4], ShapeError> {
        align_dims(&self.dims)
    }
}

/// Left-pads `dims` with ones to exactly rank 4.
///
/// `[7, 3]` becomes `[1, 1, 7, 3]`; a scalar becomes `[1, 1, 1, 1]`.
///
/// # Errors
/// Returns [`ShapeError::RankTooLarge`] if `dims` has more than four entries.
pub fn align_dims(dims: &[u32]) -> Result<[u32; 4], ShapeError> {
    if dims.len() > MAX_RANK {
        return Err(ShapeError::RankTooLarge {
            rank: dims.len(),
            max: MAX_RANK,
        });
    }
    let mut aligned = [1u32; MAX_RANK];
    aligned[MAX_RANK - dims.len()..].copy_from_slice(dims);
    Ok(aligned)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.ty)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::new(OperandType::Int32, vec![]);
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.size_bytes(), 4);
        assert_eq!(s.aligned().unwrap(), [1, 1, 1, 1]);
    }

    #[test]
    fn test_quant8_size() {
        let s = Shape::quantized(OperandType::TensorQuant8Asymm, vec![1, 7, 7, 3], 0.5, 128);
        assert_eq!(s.size_bytes(), 147);
        assert_eq!(s.zero_point, 128);
    }

    #[test]
    fn test_align_dims() {
        assert_eq!(align_dims(&[7, 3]).unwrap(), [1, 1, 7, 3]);
        assert_eq!(align_dims(&[2, 3, 4, 5]).unwrap(), [2, 3, 4, 5]);
        assert!(matches!(
            align_dims(&[1, 2, 3, 4, 5]),
            Err(ShapeError::RankTooLarge { rank: 5, max: 4 })
        ));
    }

    #[test]
    fn test_unknown_dims() {
        let s = Shape::new(OperandType::TensorFloat32, vec![1, 0, 4]);
        assert!(s.has_unknown_dims());
        assert_eq!(s.num_elements(), 0);
    }

    #[test]
    fn test_display() {
        let s = Shape::new(OperandType::TensorFloat32, vec![1, 4, 4, 3]);
        assert_eq!(format!("{s}"), "tensor_float32[1x4x4x3]");
    }
}
