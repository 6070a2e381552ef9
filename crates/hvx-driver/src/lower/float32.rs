// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowerings for 32-bit float operations.

use hexagon_link::{OpCode, PaddingMode};
use nn_model::{FusedActivation, Operation};

use super::{aligned_axis, concat_inputs, stride_arg, window_args};
use crate::catalog::OperandCatalog;
use crate::fusion::{
    activation_args, add_basic_operation, add_float_operation_with_activation,
    add_fused_float_operation,
};
use crate::params::{conv_params, depthwise_params, lrn_window, padding_mode, pool_params};
use crate::LoweringError;

const NA: PaddingMode = PaddingMode::NotApplicable;

fn binary(catalog: &mut OperandCatalog, op: &Operation, code: OpCode) -> Result<(), LoweringError> {
    let a = catalog.tensor(op.inputs[0])?;
    let b = catalog.tensor(op.inputs[1])?;
    let activation = catalog.activation(op.inputs[2])?;
    add_float_operation_with_activation(catalog, code, NA, &[a, b], op.outputs[0], activation)
}

pub fn add(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    binary(catalog, op, OpCode::AddF)
}

pub fn mul(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    binary(catalog, op, OpCode::MulF)
}

fn pool(catalog: &mut OperandCatalog, op: &Operation, code: OpCode) -> Result<(), LoweringError> {
    let params = pool_params(catalog, op)?;
    let padding = padding_mode("pool2d", &params.window, &catalog.shape(params.input)?)?;
    let input = catalog.tensor(params.input)?;
    let (window, stride) = window_args(catalog, &params.window)?;
    add_float_operation_with_activation(
        catalog,
        code,
        padding,
        &[input, window, stride],
        op.outputs[0],
        params.activation,
    )
}

pub fn average_pool(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    pool(catalog, op, OpCode::AvgPoolF)
}

pub fn max_pool(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    pool(catalog, op, OpCode::MaxPoolF)
}

pub fn l2_pool(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    pool(catalog, op, OpCode::L2PoolF)
}

pub fn conv2d(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = conv_params(catalog, op)?;
    let padding = padding_mode("conv2d", &params.window, &catalog.shape(params.input)?)?;
    let input = catalog.tensor(params.input)?;
    let filter = catalog.conv_filter_tensor(params.filter)?;
    let bias = catalog.tensor(params.bias)?;
    let stride = stride_arg(catalog, &params.window)?;
    add_fused_float_operation(
        catalog,
        OpCode::Conv2dF,
        padding,
        &[input, filter, stride],
        Some(bias),
        params.activation,
        op.outputs[0],
    )
}

pub fn depthwise_conv2d(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let params = depthwise_params(catalog, op)?;
    let padding = padding_mode("depthwise_conv2d", &params.window, &catalog.shape(params.input)?)?;
    let input = catalog.tensor(params.input)?;
    let filter = catalog.depthwise_filter_tensor(params.filter, params.multiplier)?;
    let bias = catalog.tensor(params.bias)?;
    let stride = stride_arg(catalog, &params.window)?;
    add_fused_float_operation(
        catalog,
        OpCode::DepthwiseConv2dF,
        padding,
        &[input, filter, stride],
        Some(bias),
        params.activation,
        op.outputs[0],
    )
}

pub fn fully_connected(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let input = catalog.tensor(op.inputs[0])?;
    let weights = catalog.fully_connected_weight_tensor(op.inputs[1])?;
    let bias = catalog.tensor(op.inputs[2])?;
    let activation = catalog.activation(op.inputs[3])?;
    add_fused_float_operation(
        catalog,
        OpCode::MatMulF,
        NA,
        &[input, weights],
        Some(bias),
        activation,
        op.outputs[0],
    )
}

pub fn concatenation(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let (tensors, axis) = concat_inputs(op);
    let axis = aligned_axis(&catalog.shape(tensors[0])?, catalog.scalar::<i32>(axis)?)?;
    let mut inputs = vec![catalog.create_values(&[axis])?];
    for &t in tensors {
        inputs.push(catalog.tensor(t)?);
    }
    add_basic_operation(catalog, OpCode::ConcatF, NA, &inputs, &op.outputs)
}

pub fn local_response_normalization(
    catalog: &mut OperandCatalog,
    op: &Operation,
) -> Result<(), LoweringError> {
    let input = catalog.tensor(op.inputs[0])?;
    let depth = lrn_window(catalog, op.inputs[1])?;
    let bias = catalog.scalar::<f32>(op.inputs[2])?;
    let alpha = catalog.scalar::<f32>(op.inputs[3])?;
    let beta = catalog.scalar::<f32>(op.inputs[4])?;
    let window = catalog.create_shape(1, 1, 1, depth)?;
    let inputs = [
        input,
        window,
        catalog.create_values(&[bias])?,
        catalog.create_values(&[alpha])?,
        catalog.create_values(&[beta])?,
    ];
    add_basic_operation(catalog, OpCode::LrnF, NA, &inputs, &op.outputs)
}

fn unary(catalog: &mut OperandCatalog, op: &Operation, code: OpCode) -> Result<(), LoweringError> {
    let input = catalog.tensor(op.inputs[0])?;
    add_basic_operation(catalog, code, NA, &[input], &op.outputs)
}

pub fn logistic(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    unary(catalog, op, OpCode::SigmoidF)
}

pub fn tanh(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    unary(catalog, op, OpCode::TanhF)
}

fn clamp(
    catalog: &mut OperandCatalog,
    op: &Operation,
    code: OpCode,
    activation: FusedActivation,
) -> Result<(), LoweringError> {
    let mut inputs = vec![catalog.tensor(op.inputs[0])?];
    inputs.extend(activation_args(catalog, activation)?);
    add_basic_operation(catalog, code, NA, &inputs, &op.outputs)
}

pub fn relu(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    clamp(catalog, op, OpCode::ReluF, FusedActivation::Relu)
}

pub fn relu1(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    clamp(catalog, op, OpCode::ClampF, FusedActivation::Relu1)
}

pub fn relu6(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    clamp(catalog, op, OpCode::ReluXF, FusedActivation::Relu6)
}

pub fn reshape(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let input = catalog.tensor(op.inputs[0])?;
    let shape = catalog.tensor(op.inputs[1])?;
    add_basic_operation(catalog, OpCode::Reshape, NA, &[input, shape], &op.outputs)
}

pub fn resize_bilinear(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let input = catalog.tensor(op.inputs[0])?;
    let width = catalog.scalar::<i32>(op.inputs[1])?;
    let height = catalog.scalar::<i32>(op.inputs[2])?;
    let newdim = catalog.create_values(&[height, width])?;
    add_basic_operation(catalog, OpCode::ResizeBilinearF, NA, &[input, newdim], &op.outputs)
}

pub fn softmax(catalog: &mut OperandCatalog, op: &Operation) -> Result<(), LoweringError> {
    let input = catalog.tensor(op.inputs[0])?;
    let beta = catalog.scalar::<f32>(op.inputs[1])?;
    let beta = catalog.create_values(&[beta])?;
    add_basic_operation(catalog, OpCode::SoftmaxF, NA, &[input, beta], &op.outputs)
}
