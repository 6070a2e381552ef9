// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowerings for asymmetric 8-bit quantized operations.
//!
//! Every quantized tensor travels with its range: a node consuming operand
//! `x` takes `x`'s data followed by its `min` and `max` constants.

use hexagon_link::{NodeInput, OpCode, PaddingMode};
use nn_model::{FusedActivation, Operation};

use super::{aligned_axis, concat_inputs, stride_arg, window_args};
use crate::catalog::OperandCatalog;
use crate::fusion::{
    activation_args, add_basic_operation, add_fused_quant8_operation,
    add_quant8_operation_with_activation, QuantBias,
};
use crate::params::{conv_params, depthwise_params, padding_mode, pool_params};
use crate::LoweringError;

const NA: PaddingMode = PaddingMode::NotApplicable;

/// Data, min and max of a quantized operand.
fn ranged(catalog: &mut OperandCatalog, index: u32) -> Result<[NodeInput; 3], LoweringError> {
    Ok([
        catalog.tensor(index)?,
        catalog.quantization_min(index)?,
        catalog.quantization_max(index)?,
    ])
}

fn binary(catalog: &mut OperandCatalog, op: &Operation, code: OpCode) -> Result<(), LoweringError> {
    let [a, a_min, a_max] = ranged(catalog, op.inputs[0])?;
    let [b, b_min, b_max] = ranged(catalog, op.inputs[1])?;
    let activation = catalog.activation(op.inputs[2])?;
    add_fused_quant8_operation(
        catalog,
        code,
        NA,
        &[a, b, a_min, a_max, b_min, b_max],
        None,
        activation,
        op.outputs[0],
    )
}

pub fn add(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    binary(catalog, op, OpCode::QuantizedAdd8p8to32)
}

pub fn mul(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    binary(catalog, op, OpCode::QuantizedMul8x8to32)
}

fn pool(catalog: &mut OperandCatalog, op: &Operation, code: OpCode) -> Result<(), LoweringError> {
    let params = pool_params(catalog, op)?;
    let padding = padding_mode("pool2d", &params.window, &catalog.shape(params.input)?)?;
    let [input, min, max] = ranged(catalog, params.input)?;
    let (window, stride) = window_args(catalog, &params.window)?;
    add_quant8_operation_with_activation(
        catalog,
        code,
        padding,
        &[input, min, max, window, stride],
        op.outputs[0],
        params.activation,
    )
}

pub fn average_pool(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    pool(catalog, op, OpCode::QuantizedAvgPool8)
}

pub fn max_pool(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    pool(catalog, op, OpCode::QuantizedMaxPool8)
}

pub fn conv2d(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = conv_params(catalog, op)?;
    let padding = padding_mode("conv2d", &params.window, &catalog.shape(params.input)?)?;
    let [input, in_min, in_max] = ranged(catalog, params.input)?;
    let filter = catalog.conv_filter_tensor(params.filter)?;
    let f_min = catalog.quantization_min(params.filter)?;
    let f_max = catalog.quantization_max(params.filter)?;
    let stride = stride_arg(catalog, &params.window)?;
    let bias = QuantBias::of(catalog, params.bias)?;
    add_fused_quant8_operation(
        catalog,
        OpCode::QuantizedConv2d8x8to32,
        padding,
        &[input, filter, in_min, in_max, f_min, f_max, stride],
        Some(bias),
        params.activation,
        op.outputs[0],
    )
}

pub fn depthwise_conv2d(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = depthwise_params(catalog, op)?;
    let padding = padding_mode("depthwise_conv2d", &params.window, &catalog.shape(params.input)?)?;
    let [input, in_min, in_max] = ranged(catalog, params.input)?;
    let filter = catalog.depthwise_filter_tensor(params.filter, params.multiplier)?;
    let f_min = catalog.quantization_min(params.filter)?;
    let f_max = catalog.quantization_max(params.filter)?;
    let stride = stride_arg(catalog, &params.window)?;
    let bias = QuantBias::of(catalog, params.bias)?;
    add_fused_quant8_operation(
        catalog,
        OpCode::QuantizedDepthwiseConv2d8x8to32,
        padding,
        &[input, filter, in_min, in_max, f_min, f_max, stride],
        Some(bias),
        params.activation,
        op.outputs[0],
    )
}

pub fn fully_connected(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let [input, in_min, in_max] = ranged(catalog, op.inputs[0])?;
    let weights = catalog.fully_connected_weight_tensor(op.inputs[1])?;
    let w_min = catalog.quantization_min(op.inputs[1])?;
    let w_max = catalog.quantization_max(op.inputs[1])?;
    let bias = QuantBias::of(catalog, op.inputs[2])?;
    let activation = catalog.activation(op.inputs[3])?;
    add_fused_quant8_operation(
        catalog,
        OpCode::QuantizedMatMul8x8to32,
        NA,
        &[input, weights, in_min, in_max, w_min, w_max],
        Some(bias),
        activation,
        op.outputs[0],
    )
}

pub fn concatenation(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let (tensors, axis) = concat_inputs(op);
    let axis = aligned_axis(&catalog.shape(tensors[0])?, catalog.scalar::<i32>(axis)?)?;
    let dim = catalog.create_values(&[axis])?;

    let mut data = Vec::with_capacity(tensors.len());
    let mut mins = Vec::with_capacity(tensors.len());
    let mut maxs = Vec::with_capacity(tensors.len());
    for &t in tensors {
        let [d, lo, hi] = ranged(catalog, t)?;
        data.push(d);
        mins.push(lo);
        maxs.push(hi);
    }

    let mut inputs = vec![dim];
    inputs.extend(data);
    inputs.extend(mins);
    inputs.extend(maxs);
    add_basic_operation(catalog, OpCode::QuantizedConcat8, NA, &inputs, &op.outputs)
}

pub fn logistic(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let inputs = ranged(catalog, op.inputs[0])?;
    add_basic_operation(catalog, OpCode::QuantizedSigmoid8, NA, &inputs, &op.outputs)
}

fn clamp(
    catalog: &mut OperandCatalog,
    op: &Operation,
    code: OpCode,
    activation: FusedActivation,
) -> Result<(), LoweringError> {
    let mut inputs = ranged(catalog, op.inputs[0])?.to_vec();
    inputs.extend(activation_args(catalog, activation)?);
    add_basic_operation(catalog, code, NA, &inputs, &op.outputs)
}

pub fn relu(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    clamp(catalog, op, OpCode::QuantizedRelu8, FusedActivation::Relu)
}

pub fn relu1(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    clamp(catalog, op, OpCode::QuantizedClamp8, FusedActivation::Relu1)
}

pub fn relu6(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    clamp(catalog, op, OpCode::QuantizedReluX8, FusedActivation::Relu6)
}

pub fn reshape(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let [input, min, max] = ranged(catalog, op.inputs[0])?;
    let shape = catalog.tensor(op.inputs[1])?;
    add_basic_operation(
        catalog,
        OpCode::QuantizedReshape,
        NA,
        &[input, shape, min, max],
        &op.outputs,
    )
}

pub fn softmax(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let [input, min, max] = ranged(catalog, op.inputs[0])?;
    let beta = catalog.scalar::<f32>(op.inputs[1])?;
    let beta = catalog.create_values(&[beta])?;
    add_basic_operation(
        catalog,
        OpCode::QuantizedSoftmax8,
        NA,
        &[input, min, max, beta],
        &op.outputs,
    )
}

pub fn dequantize(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let inputs = ranged(catalog, op.inputs[0])?;
    add_basic_operation(catalog, OpCode::Dequantize, NA, &inputs, &op.outputs)
}
