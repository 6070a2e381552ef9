// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-operation validation and shape inference.
//!
//! Each check verifies operand counts, infers the output shape with
//! `tensor_shape::infer` and records it in the catalog. Checks never emit
//! accelerator nodes.

use nn_model::Operation;
use tensor_shape::{infer, Shape};

use crate::catalog::OperandCatalog;
use crate::params::{
    conv_params, depthwise_params, expect_counts, lrn_window, padding_mode, pool_params,
};
use crate::LoweringError;

fn set_output(catalog: &mut OperandCatalog, op: &Operation, shape: &Shape) -> Result<(), LoweringError> {
    catalog.set_shape(op.outputs[0], shape)
}

fn first_input(catalog: &OperandCatalog, op: &Operation) -> Result<Shape, LoweringError> {
    catalog.shape(op.inputs[0])
}

/// ADD and MUL: two tensors and a fused activation.
pub fn elementwise(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[3], 1)?;
    catalog.activation(op.inputs[2])?;
    let lhs = catalog.shape(op.inputs[0])?;
    let rhs = catalog.shape(op.inputs[1])?;
    let out = infer::broadcast(op.kind.as_str(), &lhs, &rhs)?;
    set_output(catalog, op, &out)
}

/// Activations and other one-tensor operations that keep their shape.
pub fn unary(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[1], 1)?;
    let out = infer::unary(&first_input(catalog, op)?);
    set_output(catalog, op, &out)
}

/// The pooling family, in both argument forms.
pub fn pool(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = pool_params(catalog, op)?;
    let input = catalog.shape(params.input)?;
    let out = infer::pool2d(&input, &params.window)?;
    padding_mode("pool2d", &params.window, &input)?;
    set_output(catalog, op, &out)
}

pub fn conv2d(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = conv_params(catalog, op)?;
    let input = catalog.shape(params.input)?;
    let out = infer::conv2d(
        &input,
        &catalog.shape(params.filter)?,
        &catalog.shape(params.bias)?,
        &params.window,
    )?;
    padding_mode("conv2d", &params.window, &input)?;
    set_output(catalog, op, &out)
}

pub fn depthwise_conv2d(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = depthwise_params(catalog, op)?;
    let input = catalog.shape(params.input)?;
    let out = infer::depthwise_conv2d(
        &input,
        &catalog.shape(params.filter)?,
        &catalog.shape(params.bias)?,
        &params.window,
        params.multiplier,
    )?;
    padding_mode("depthwise_conv2d", &params.window, &input)?;
    set_output(catalog, op, &out)
}

pub fn fully_connected(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[4], 1)?;
    catalog.activation(op.inputs[3])?;
    let out = infer::fully_connected(
        &catalog.shape(op.inputs[0])?,
        &catalog.shape(op.inputs[1])?,
        &catalog.shape(op.inputs[2])?,
    )?;
    set_output(catalog, op, &out)
}

/// CONCATENATION: one or more tensors followed by the axis.
pub fn concatenation(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    if op.inputs.len() < 2 || op.outputs.len() != 1 {
        return Err(LoweringError::Validation(format!(
            "CONCATENATION takes at least 2 inputs and 1 output, got {} and {}",
            op.inputs.len(),
            op.outputs.len()
        )));
    }
    let (tensors, axis) = op.inputs.split_at(op.inputs.len() - 1);
    let axis = catalog.scalar::<i32>(axis[0])?;
    let shapes = tensors
        .iter()
        .map(|&i| catalog.shape(i))
        .collect::<Result<Vec<_>, _>>()?;
    let out = infer::concatenation(&shapes, axis)?;
    set_output(catalog, op, &out)
}

/// LOCAL_RESPONSE_NORMALIZATION: input, radius, bias, alpha, beta.
pub fn local_response_normalization(
    catalog: &mut OperandCatalog,
    op: &Operation,
) -> Result<(), LoweringError> {
    expect_counts(op, &[5], 1)?;
    let input = first_input(catalog, op)?;
    if input.rank() != 4 {
        return Err(LoweringError::Validation(format!(
            "LOCAL_RESPONSE_NORMALIZATION input must have rank 4, has {}",
            input.rank()
        )));
    }
    lrn_window(catalog, op.inputs[1])?;
    for &i in &op.inputs[2..] {
        catalog.scalar::<f32>(i)?;
    }
    set_output(catalog, op, &infer::unary(&input))
}

/// RESHAPE: input and a constant int32 target shape.
pub fn reshape(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[2], 1)?;
    let target = catalog.values::<i32>(op.inputs[1])?;
    let out = infer::reshape(&first_input(catalog, op)?, &target)?;
    set_output(catalog, op, &out)
}

/// RESIZE_BILINEAR: input, output width, output height.
pub fn resize_bilinear(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[3], 1)?;
    let width = catalog.scalar::<i32>(op.inputs[1])?;
    let height = catalog.scalar::<i32>(op.inputs[2])?;
    let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(LoweringError::Validation(format!(
            "RESIZE_BILINEAR size {width}x{height} must not be negative"
        )));
    };
    let out = infer::resize_bilinear(&first_input(catalog, op)?, height, width)?;
    set_output(catalog, op, &out)
}

/// SOFTMAX: input and a float beta.
pub fn softmax(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[2], 1)?;
    let beta = catalog.scalar::<f32>(op.inputs[1])?;
    if beta.is_nan() || beta <= 0.0 {
        return Err(LoweringError::Validation(format!("SOFTMAX beta must be positive, got {beta}")));
    }
    let out = infer::unary(&first_input(catalog, op)?);
    set_output(catalog, op, &out)
}

pub fn dequantize(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    expect_counts(op, &[1], 1)?;
    let out = infer::dequantize(&first_input(catalog, op)?);
    set_output(catalog, op, &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexagon_link::RecordingLink;
    use nn_model::{ModelDescription, Operand, OperationKind};
    use std::sync::Arc;
    use tensor_shape::{OperandType, PaddingScheme};

    fn build(
        f: impl FnOnce(&mut ModelDescription) -> Operation,
    ) -> (OperandCatalog, Operation, RecordingLink) {
        let mut model = ModelDescription::new("check");
        let op = f(&mut model);
        model.add_operation(op.clone());
        let inputs: Vec<u32> = op
            .inputs
            .iter()
            .copied()
            .filter(|&i| !model.operands[i as usize].is_constant())
            .collect();
        model.identify_inputs_and_outputs(inputs, op.outputs.clone());
        let model = model.validate().unwrap();
        let link = RecordingLink::new();
        let catalog = OperandCatalog::new(&model, Arc::new(link.clone())).unwrap();
        (catalog, op, link)
    }

    fn tensor(model: &mut ModelDescription, dims: &[u32]) -> u32 {
        model.add_operand(Operand::new(OperandType::TensorFloat32, dims.to_vec()))
    }

    #[test]
    fn test_elementwise_broadcast() {
        let (mut catalog, op, link) = build(|m| {
            let a = tensor(m, &[1, 4, 4, 3]);
            let b = tensor(m, &[3]);
            let act = m.add_i32(0);
            let out = tensor(m, &[0, 0, 0, 0]);
            Operation::new(OperationKind::Add, vec![a, b, act], vec![out])
        });
        elementwise(&mut catalog, &op).unwrap();
        assert_eq!(catalog.shape(op.outputs[0]).unwrap().dims, vec![1, 4, 4, 3]);
        assert!(link.live_graphs().is_empty());
    }

    #[test]
    fn test_elementwise_bad_activation() {
        let (mut catalog, op, _) = build(|m| {
            let a = tensor(m, &[2]);
            let b = tensor(m, &[2]);
            let act = m.add_i32(9);
            let out = tensor(m, &[2]);
            Operation::new(OperationKind::Mul, vec![a, b, act], vec![out])
        });
        assert!(matches!(
            elementwise(&mut catalog, &op),
            Err(LoweringError::Validation(_))
        ));
    }

    #[test]
    fn test_pool_explicit_padding_infers_shape() {
        let (mut catalog, op, _) = build(|m| {
            let input = m.add_operand(
                Operand::new(OperandType::TensorQuant8Asymm, vec![1, 7, 7, 3])
                    .with_quantization(1.0, 0),
            );
            let out = m.add_operand(
                Operand::new(OperandType::TensorQuant8Asymm, vec![0, 0, 0, 0])
                    .with_quantization(1.0, 0),
            );
            let mut inputs = vec![input];
            for v in [0, 1, 0, 1, 2, 2, 3, 3, 0] {
                inputs.push(m.add_i32(v));
            }
            Operation::new(OperationKind::AveragePool2d, inputs, vec![out])
        });
        pool(&mut catalog, &op).unwrap();
        assert_eq!(catalog.shape(op.outputs[0]).unwrap().dims, vec![1, 4, 4, 3]);
    }

    #[test]
    fn test_conv_shape() {
        let (mut catalog, op, _) = build(|m| {
            let input = tensor(m, &[1, 8, 8, 3]);
            let filter = m.add_constant(
                Operand::new(OperandType::TensorFloat32, vec![4, 3, 3, 3]),
                &[0u8; 4 * 3 * 3 * 3 * 4],
            );
            let bias = m.add_constant(Operand::new(OperandType::TensorFloat32, vec![4]), &[0u8; 16]);
            let mut inputs = vec![input, filter, bias];
            for v in [PaddingScheme::SAME_CODE, 2, 2, 1] {
                inputs.push(m.add_i32(v));
            }
            let out = tensor(m, &[0, 0, 0, 0]);
            Operation::new(OperationKind::Conv2d, inputs, vec![out])
        });
        conv2d(&mut catalog, &op).unwrap();
        assert_eq!(catalog.shape(op.outputs[0]).unwrap().dims, vec![1, 4, 4, 4]);
    }

    #[test]
    fn test_concatenation_and_reshape() {
        let (mut catalog, op, _) = build(|m| {
            let a = tensor(m, &[1, 2, 2, 1]);
            let b = tensor(m, &[1, 2, 2, 2]);
            let axis = m.add_i32(3);
            let out = tensor(m, &[0, 0, 0, 0]);
            Operation::new(OperationKind::Concatenation, vec![a, b, axis], vec![out])
        });
        concatenation(&mut catalog, &op).unwrap();
        assert_eq!(catalog.shape(op.outputs[0]).unwrap().dims, vec![1, 2, 2, 3]);

        let (mut catalog, op, _) = build(|m| {
            let a = tensor(m, &[1, 2, 2, 3]);
            let target: Vec<u8> = [1i32, -1].iter().flat_map(|v| v.to_le_bytes()).collect();
            let shape = m.add_constant(Operand::new(OperandType::TensorInt32, vec![2]), &target);
            let out = tensor(m, &[0, 0]);
            Operation::new(OperationKind::Reshape, vec![a, shape], vec![out])
        });
        reshape(&mut catalog, &op).unwrap();
        assert_eq!(catalog.shape(op.outputs[0]).unwrap().dims, vec![1, 12]);
    }

    #[test]
    fn test_softmax_requires_positive_beta() {
        let (mut catalog, op, _) = build(|m| {
            let a = tensor(m, &[1, 4]);
            let beta = m.add_f32(0.0);
            let out = tensor(m, &[1, 4]);
            Operation::new(OperationKind::Softmax, vec![a, beta], vec![out])
        });
        assert!(softmax(&mut catalog, &op).is_err());
    }

    #[test]
    fn test_pool_padding_overflow_is_rejected() {
        let (mut catalog, op, link) = build(|m| {
            let input = tensor(m, &[1, 7, 7, 3]);
            let out = tensor(m, &[0, 0, 0, 0]);
            let huge = m.add_i32(i32::MAX);
            let zero = m.add_i32(0);
            let two = m.add_i32(2);
            let three = m.add_i32(3);
            Operation::new(
                OperationKind::MaxPool2d,
                vec![input, huge, huge, zero, zero, two, two, three, three, zero],
                vec![out],
            )
        });
        let err = pool(&mut catalog, &op).unwrap_err();
        assert!(err.is_validation(), "unexpected error: {err}");
        assert!(link.live_graphs().is_empty());
    }

    #[test]
    fn test_lrn_radius_overflow_is_rejected() {
        let (mut catalog, op, _) = build(|m| {
            let input = tensor(m, &[1, 2, 2, 4]);
            let radius = m.add_i32(i32::MAX);
            let bias = m.add_f32(1.0);
            let alpha = m.add_f32(1.0);
            let beta = m.add_f32(0.5);
            let out = tensor(m, &[0, 0, 0, 0]);
            Operation::new(
                OperationKind::LocalResponseNormalization,
                vec![input, radius, bias, alpha, beta],
                vec![out],
            )
        });
        assert!(matches!(
            local_response_normalization(&mut catalog, &op),
            Err(LoweringError::Validation(_))
        ));
    }

    #[test]
    fn test_wrong_operand_count() {
        let (mut catalog, op, _) = build(|m| {
            let a = tensor(m, &[1, 4]);
            let b = tensor(m, &[1, 4]);
            let out = tensor(m, &[1, 4]);
            Operation::new(OperationKind::Tanh, vec![a, b], vec![out])
        });
        assert!(matches!(unary(&mut catalog, &op), Err(LoweringError::Validation(_))));
    }
}
