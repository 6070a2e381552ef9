// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node sequences shared by the per-operation lowerings.
//!
//! A portable operation usually becomes a short chain of accelerator
//! nodes: the base computation, an optional bias addition and an optional
//! activation. Quantized chains also carry `min` / `max` side outputs and
//! requantize their 32-bit accumulators back to 8 bits:
//!
//! ```text
//! float:  base ──► BiasAdd_f? ──► activation?
//! quant8: base(32) ──► QuantizedBiasAdd_32p32to32? ──► Requantize_32to8 ──► activation?
//! ```
//!
//! Every helper ends by binding the operation's output operands to the
//! last node of its chain.

use hexagon_link::{NodeId, NodeInput, NodeOutput, OpCode, PaddingMode};
use nn_model::FusedActivation;
use tensor_shape::{OperandType, Shape};

use crate::catalog::{float_activation_op, quantized_activation_op, OperandCatalog};
use crate::LoweringError;

/// Quantized bias: the 32-bit tensor plus its range constants.
#[derive(Debug, Clone, Copy)]
pub struct QuantBias {
    pub tensor: NodeInput,
    pub min: NodeInput,
    pub max: NodeInput,
}

impl QuantBias {
    pub fn of(catalog: &mut OperandCatalog, index: u32) -> Result<Self, LoweringError> {
        Ok(Self {
            tensor: catalog.tensor(index)?,
            min: catalog.quantization_min(index)?,
            max: catalog.quantization_max(index)?,
        })
    }
}

// ── Output descriptors ─────────────────────────────────────────────

/// Output descriptor for a tensor of `shape`.
pub fn make_output(shape: &Shape) -> Result<NodeOutput, LoweringError> {
    Ok(NodeOutput::new(
        shape.aligned()?,
        shape.ty.size_bytes() as u32,
    ))
}

/// Output descriptor of a one-element `float32` side output.
pub fn scalar_output() -> NodeOutput {
    NodeOutput::new([1, 1, 1, 1], 4)
}

/// `[data, min, max]` outputs of a quantized node with `elem`-byte data.
pub fn quantized_outputs(shape: &Shape, elem: u32) -> Result<[NodeOutput; 3], LoweringError> {
    Ok([
        NodeOutput::new(shape.aligned()?, elem),
        scalar_output(),
        scalar_output(),
    ])
}

/// Outputs a node producing operand `index` declares: `[data, min, max]`
/// for quantized operands, a single data output otherwise.
fn outputs_for(catalog: &OperandCatalog, index: u32) -> Result<Vec<NodeOutput>, LoweringError> {
    let shape = catalog.shape(index)?;
    if shape.ty == OperandType::TensorQuant8Asymm {
        Ok(quantized_outputs(&shape, 1)?.to_vec())
    } else {
        Ok(vec![make_output(&shape)?])
    }
}

// ── Activations ────────────────────────────────────────────────────

/// Bound constants an activation node takes after its data inputs:
/// none for plain ReLU, `6.0` for ReLU6, `-1.0, 1.0` for ReLU1.
pub fn activation_args(
    catalog: &mut OperandCatalog,
    activation: FusedActivation,
) -> Result<Vec<NodeInput>, LoweringError> {
    Ok(match activation {
        FusedActivation::None | FusedActivation::Relu => Vec::new(),
        FusedActivation::Relu6 => vec![catalog.create_values(&[6.0f32])?],
        FusedActivation::Relu1 => vec![
            catalog.create_values(&[-1.0f32])?,
            catalog.create_values(&[1.0f32])?,
        ],
    })
}

// ── Output registration ────────────────────────────────────────────

/// Binds output operand `i` to output `i` of `node`.
pub fn register_outputs(
    catalog: &mut OperandCatalog,
    node: NodeId,
    outputs: &[u32],
) -> Result<(), LoweringError> {
    for (position, &index) in outputs.iter().enumerate() {
        catalog.bind(index, NodeInput::new(node, position as u32))?;
    }
    Ok(())
}

// ── Chains ─────────────────────────────────────────────────────────

/// One node computing `outputs` directly from `inputs`.
pub fn add_basic_operation(
    catalog: &mut OperandCatalog,
    op: OpCode,
    padding: PaddingMode,
    inputs: &[NodeInput],
    outputs: &[u32],
) -> Result<(), LoweringError> {
    let mut declared = Vec::new();
    for &index in outputs {
        declared.extend(outputs_for(catalog, index)?);
    }
    let node = catalog.emitter_mut().node(op, padding, inputs, &declared)?;
    register_outputs(catalog, node, outputs)
}

/// A float node followed by its fused activation, if any.
pub fn add_float_operation_with_activation(
    catalog: &mut OperandCatalog,
    op: OpCode,
    padding: PaddingMode,
    inputs: &[NodeInput],
    output: u32,
    activation: FusedActivation,
) -> Result<(), LoweringError> {
    let Some(act_op) = float_activation_op(activation) else {
        return add_basic_operation(catalog, op, padding, inputs, &[output]);
    };
    let out = make_output(&catalog.shape(output)?)?;
    let base = catalog.emitter_mut().node(op, padding, inputs, &[out])?;
    finish_float_activation(catalog, act_op, activation, NodeInput::new(base, 0), out, output)
}

fn finish_float_activation(
    catalog: &mut OperandCatalog,
    act_op: OpCode,
    activation: FusedActivation,
    data: NodeInput,
    out: NodeOutput,
    output: u32,
) -> Result<(), LoweringError> {
    let mut args = vec![data];
    args.extend(activation_args(catalog, activation)?);
    let node = catalog
        .emitter_mut()
        .node(act_op, PaddingMode::NotApplicable, &args, &[out])?;
    register_outputs(catalog, node, &[output])
}

/// An 8-bit node producing `[data, min, max]` followed by its fused
/// activation, if any.
pub fn add_quant8_operation_with_activation(
    catalog: &mut OperandCatalog,
    op: OpCode,
    padding: PaddingMode,
    inputs: &[NodeInput],
    output: u32,
    activation: FusedActivation,
) -> Result<(), LoweringError> {
    let Some(act_op) = quantized_activation_op(activation) else {
        return add_basic_operation(catalog, op, padding, inputs, &[output]);
    };
    let outs = quantized_outputs(&catalog.shape(output)?, 1)?;
    let base = catalog.emitter_mut().node(op, padding, inputs, &outs)?;
    finish_quant8_activation(catalog, act_op, activation, base, outs, output)
}

fn finish_quant8_activation(
    catalog: &mut OperandCatalog,
    act_op: OpCode,
    activation: FusedActivation,
    prev: NodeId,
    outs: [NodeOutput; 3],
    output: u32,
) -> Result<(), LoweringError> {
    let mut args = vec![
        NodeInput::new(prev, 0),
        NodeInput::new(prev, 1),
        NodeInput::new(prev, 2),
    ];
    args.extend(activation_args(catalog, activation)?);
    let node = catalog
        .emitter_mut()
        .node(act_op, PaddingMode::NotApplicable, &args, &outs)?;
    register_outputs(catalog, node, &[output])
}

/// Float base node, then an optional `BiasAdd_f`, then the activation.
pub fn add_fused_float_operation(
    catalog: &mut OperandCatalog,
    op: OpCode,
    padding: PaddingMode,
    inputs: &[NodeInput],
    bias: Option<NodeInput>,
    activation: FusedActivation,
    output: u32,
) -> Result<(), LoweringError> {
    let out = make_output(&catalog.shape(output)?)?;
    let act_op = float_activation_op(activation);

    if bias.is_none() && act_op.is_none() {
        return add_basic_operation(catalog, op, padding, inputs, &[output]);
    }

    let mut prev = NodeInput::new(catalog.emitter_mut().node(op, padding, inputs, &[out])?, 0);
    if let Some(bias) = bias {
        let node = catalog.emitter_mut().node(
            OpCode::BiasAddF,
            PaddingMode::NotApplicable,
            &[prev, bias],
            &[out],
        )?;
        if act_op.is_none() {
            return register_outputs(catalog, node, &[output]);
        }
        prev = NodeInput::new(node, 0);
    }
    match act_op {
        Some(act_op) => finish_float_activation(catalog, act_op, activation, prev, out, output),
        None => Ok(()),
    }
}

/// Quantized base node accumulating into 32 bits, an optional 32-bit bias
/// addition, requantization into the output operand's range and the
/// activation.
pub fn add_fused_quant8_operation(
    catalog: &mut OperandCatalog,
    op: OpCode,
    padding: PaddingMode,
    inputs: &[NodeInput],
    bias: Option<QuantBias>,
    activation: FusedActivation,
    output: u32,
) -> Result<(), LoweringError> {
    let shape = catalog.shape(output)?;
    let wide = quantized_outputs(&shape, 4)?;
    let narrow = quantized_outputs(&shape, 1)?;

    let mut prev = catalog.emitter_mut().node(op, padding, inputs, &wide)?;
    if let Some(bias) = bias {
        prev = catalog.emitter_mut().node(
            OpCode::QuantizedBiasAdd32p32to32,
            PaddingMode::NotApplicable,
            &[
                NodeInput::new(prev, 0),
                bias.tensor,
                NodeInput::new(prev, 1),
                NodeInput::new(prev, 2),
                bias.min,
                bias.max,
            ],
            &wide,
        )?;
    }

    let out_min = catalog.quantization_min(output)?;
    let out_max = catalog.quantization_max(output)?;
    let requantized = catalog.emitter_mut().node(
        OpCode::Requantize32to8,
        PaddingMode::NotApplicable,
        &[
            NodeInput::new(prev, 0),
            NodeInput::new(prev, 1),
            NodeInput::new(prev, 2),
            out_min,
            out_max,
        ],
        &narrow,
    )?;

    match quantized_activation_op(activation) {
        Some(act_op) => {
            finish_quant8_activation(catalog, act_op, activation, requantized, narrow, output)
        }
        None => register_outputs(catalog, requantized, &[output]),
    }
}
