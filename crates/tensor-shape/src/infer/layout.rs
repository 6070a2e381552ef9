// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layout-changing shape rules: concatenation, reshape, resize, dequantize.

use super::expect_rank;
use crate::{OperandType, Shape, ShapeError};

/// Output shape of CONCATENATION along `axis`.
///
/// A negative axis counts from the innermost dimension. All inputs must have
/// the same rank and agree on every dimension except `axis`.
pub fn concatenation(inputs: &[Shape], axis: i32) -> Result<Shape, ShapeError> {
    let first = inputs.first().ok_or(ShapeError::InvalidParameter {
        op: "concatenation",
        name: "input count",
        value: 0,
    })?;
    let rank = first.rank() as i32;
    let axis_index = if axis < 0 { axis + rank } else { axis };
    if axis_index < 0 || axis_index >= rank {
        return Err(ShapeError::InvalidParameter {
            op: "concatenation",
            name: "axis",
            value: i64::from(axis),
        });
    }
    let axis_index = axis_index as usize;

    let mut dims = first.dims.clone();
    for other in &inputs[1..] {
        let compatible = other.rank() == first.rank()
            && other
                .dims
                .iter()
                .zip(&first.dims)
                .enumerate()
                .all(|(i, (a, b))| i == axis_index || a == b);
        if !compatible {
            return Err(ShapeError::ShapeMismatch {
                op: "concatenation",
                lhs: first.clone(),
                rhs: other.clone(),
            });
        }
        dims[axis_index] += other.dims[axis_index];
    }

    Ok(Shape {
        dims,
        ..first.clone()
    })
}

/// Output shape of RESHAPE to `target`.
///
/// At most one entry may be `-1`; it is replaced by whatever keeps the element
/// count unchanged.
pub fn reshape(input: &Shape, target: &[i32]) -> Result<Shape, ShapeError> {
    let elements = input.num_elements();
    let mut inferred: Option<usize> = None;
    let mut known: usize = 1;

    for (i, &d) in target.iter().enumerate() {
        match d {
            -1 if inferred.is_none() => inferred = Some(i),
            d if d > 0 => known *= d as usize,
            _ => {
                return Err(ShapeError::InvalidParameter {
                    op: "reshape",
                    name: "target dimension",
                    value: i64::from(d),
                })
            }
        }
    }

    let mut dims: Vec<u32> = target.iter().map(|&d| d.max(0) as u32).collect();
    match inferred {
        Some(i) => {
            if known == 0 || elements % known != 0 {
                return Err(ShapeError::ShapeMismatch {
                    op: "reshape",
                    lhs: input.clone(),
                    rhs: Shape::new(input.ty, dims),
                });
            }
            dims[i] = (elements / known) as u32;
        }
        None if known != elements => {
            return Err(ShapeError::ShapeMismatch {
                op: "reshape",
                lhs: input.clone(),
                rhs: Shape::new(input.ty, dims),
            });
        }
        None => {}
    }

    Ok(Shape {
        dims,
        ..input.clone()
    })
}

/// Output shape of RESIZE_BILINEAR to `height` x `width`.
pub fn resize_bilinear(input: &Shape, height: u32, width: u32) -> Result<Shape, ShapeError> {
    expect_rank("resize_bilinear", input, 4)?;
    if height == 0 || width == 0 {
        return Err(ShapeError::InvalidParameter {
            op: "resize_bilinear",
            name: "output size",
            value: 0,
        });
    }
    Ok(Shape {
        dims: vec![input.dims[0], height, width, input.dims[3]],
        ..input.clone()
    })
}

/// Output shape of DEQUANTIZE: same dimensions, float32 elements.
pub fn dequantize(input: &Shape) -> Shape {
    Shape::new(OperandType::TensorFloat32, input.dims.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(dims: &[u32]) -> Shape {
        Shape::quantized(OperandType::TensorQuant8Asymm, dims.to_vec(), 0.1, 5)
    }

    #[test]
    fn test_concat_depth() {
        let out = concatenation(&[q(&[1, 4, 4, 3]), q(&[1, 4, 4, 5])], 3).unwrap();
        assert_eq!(out.dims, vec![1, 4, 4, 8]);
        let out = concatenation(&[q(&[1, 4, 4, 3]), q(&[1, 4, 4, 5])], -1).unwrap();
        assert_eq!(out.dims, vec![1, 4, 4, 8]);
    }

    #[test]
    fn test_concat_mismatch() {
        assert!(concatenation(&[q(&[1, 4, 4, 3]), q(&[1, 2, 4, 3])], 3).is_err());
        assert!(concatenation(&[q(&[1, 4, 4, 3])], 4).is_err());
        assert!(concatenation(&[], 0).is_err());
    }

    #[test]
    fn test_reshape_infers_minus_one() {
        let out = reshape(&q(&[1, 4, 4, 3]), &[1, -1]).unwrap();
        assert_eq!(out.dims, vec![1, 48]);
        assert_eq!(out.zero_point, 5);
    }

    #[test]
    fn test_reshape_rejects_bad_targets() {
        assert!(reshape(&q(&[1, 4, 4, 3]), &[5, -1]).is_err());
        assert!(reshape(&q(&[1, 4, 4, 3]), &[-1, -1]).is_err());
        assert!(reshape(&q(&[1, 4, 4, 3]), &[2, 2]).is_err());
        assert!(reshape(&q(&[1, 4, 4, 3]), &[0, 48]).is_err());
    }

    #[test]
    fn test_resize_and_dequantize() {
        let out = resize_bilinear(&q(&[1, 4, 4, 3]), 8, 6).unwrap();
        assert_eq!(out.dims, vec![1, 8, 6, 3]);
        let d = dequantize(&q(&[2, 3]));
        assert_eq!(d.ty, OperandType::TensorFloat32);
        assert_eq!(d.dims, vec![2, 3]);
    }
}
