// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model description: operands, operations, constants and pools.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelDescription<Loaded>     — assembled, indices not yet checked.
//!       │  .validate()
//!       ▼
//! ModelDescription<Validated>  — every index and constant range resolves.
//! ```
//!
//! Only a validated description can be handed to a driver, so lowering code
//! never has to re-check operand indices or inline value ranges.

use crate::{ModelError, Operand, OperandLifetime, Operation};
use memory_pools::PoolDescriptor;
use std::fmt;
use tensor_shape::OperandType;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: description has been assembled but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: description has been validated.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for description states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelDescription ───────────────────────────────────────────────

/// A portable model: operand table, operation list, graph inputs/outputs,
/// the inline constant block and the pools holding referenced constants.
#[derive(Debug, Clone)]
pub struct ModelDescription<S: GraphState = Loaded> {
    pub name: String,
    pub operands: Vec<Operand>,
    pub operations: Vec<Operation>,
    /// Operand indices of the graph inputs, in request order.
    pub input_indexes: Vec<u32>,
    /// Operand indices of the graph outputs, in request order.
    pub output_indexes: Vec<u32>,
    /// Backing bytes of every [`OperandLifetime::ConstantCopy`] operand.
    pub operand_values: Vec<u8>,
    /// Pools backing [`OperandLifetime::ConstantReference`] operands.
    pub pools: Vec<PoolDescriptor>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelDescription<Loaded> {
    /// Creates an empty description in the `Loaded` state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operands: Vec::new(),
            operations: Vec::new(),
            input_indexes: Vec::new(),
            output_indexes: Vec::new(),
            operand_values: Vec::new(),
            pools: Vec::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Appends an operand and returns its index.
    pub fn add_operand(&mut self, operand: Operand) -> u32 {
        self.operands.push(operand);
        (self.operands.len() - 1) as u32
    }

    /// Appends an inline constant operand holding `bytes` and returns its index.
    ///
    /// Values are packed at 4-byte aligned offsets.
    pub fn add_constant(&mut self, mut operand: Operand, bytes: &[u8]) -> u32 {
        let padding = (4 - self.operand_values.len() % 4) % 4;
        self.operand_values.extend(std::iter::repeat(0).take(padding));
        operand.lifetime = OperandLifetime::ConstantCopy;
        operand.location = crate::DataLocation {
            pool_index: 0,
            offset: self.operand_values.len() as u32,
            length: bytes.len() as u32,
        };
        self.operand_values.extend_from_slice(bytes);
        self.add_operand(operand)
    }

    /// Appends an `int32` scalar constant.
    pub fn add_i32(&mut self, value: i32) -> u32 {
        self.add_constant(
            Operand::new(OperandType::Int32, vec![]),
            &value.to_le_bytes(),
        )
    }

    /// Appends a `float32` scalar constant.
    pub fn add_f32(&mut self, value: f32) -> u32 {
        self.add_constant(
            Operand::new(OperandType::Float32, vec![]),
            &value.to_le_bytes(),
        )
    }

    /// Appends an operation.
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Declares the graph inputs and outputs and stamps their lifetimes.
    pub fn identify_inputs_and_outputs(&mut self, inputs: Vec<u32>, outputs: Vec<u32>) {
        for &i in &inputs {
            if let Some(op) = self.operands.get_mut(i as usize) {
                op.lifetime = OperandLifetime::ModelInput;
            }
        }
        for &i in &outputs {
            if let Some(op) = self.operands.get_mut(i as usize) {
                op.lifetime = OperandLifetime::ModelOutput;
            }
        }
        self.input_indexes = inputs;
        self.output_indexes = outputs;
    }

    /// Validates the description and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - At least one operation, one input and one output.
    /// - Every operand index used anywhere is in range.
    /// - Graph inputs/outputs carry the matching lifetime, and no other
    ///   operand does.
    /// - Inline constants lie inside `operand_values`; referenced constants
    ///   name an existing pool.
    /// - Quantized 8-bit operands have a positive scale and a zero point in
    ///   `0..=255`.
    ///
    /// Rank and dimension limits are a property of the lowering target and
    /// are checked by the driver, not here.
    pub fn validate(self) -> Result<ModelDescription<Validated>, ModelError> {
        if self.operations.is_empty() {
            return Err(ModelError::InvalidGraph("model contains no operations".into()));
        }
        if self.input_indexes.is_empty() || self.output_indexes.is_empty() {
            return Err(ModelError::InvalidGraph(
                "model must declare at least one input and one output".into(),
            ));
        }

        let count = self.operands.len();
        for (i, operand) in self.operands.iter().enumerate() {
            self.validate_operand(i, operand)?;
        }

        for (which, list, lifetime) in [
            ("input", &self.input_indexes, OperandLifetime::ModelInput),
            ("output", &self.output_indexes, OperandLifetime::ModelOutput),
        ] {
            for &index in list {
                let operand = self.operands.get(index as usize).ok_or_else(|| {
                    ModelError::InvalidGraph(format!(
                        "graph {which} {index} out of range ({count} operands)"
                    ))
                })?;
                if operand.lifetime != lifetime {
                    return Err(ModelError::InvalidOperand {
                        index: index as usize,
                        detail: format!("graph {which} has lifetime {}", operand.lifetime),
                    });
                }
            }
        }
        for (i, operand) in self.operands.iter().enumerate() {
            let listed = match operand.lifetime {
                OperandLifetime::ModelInput => self.input_indexes.contains(&(i as u32)),
                OperandLifetime::ModelOutput => self.output_indexes.contains(&(i as u32)),
                _ => true,
            };
            if !listed {
                return Err(ModelError::InvalidOperand {
                    index: i,
                    detail: format!("lifetime {} but not listed as such", operand.lifetime),
                });
            }
        }

        for (i, operation) in self.operations.iter().enumerate() {
            if operation.outputs.is_empty() {
                return Err(ModelError::InvalidOperation {
                    index: i,
                    kind: operation.kind.to_string(),
                    detail: "no outputs".into(),
                });
            }
            if let Some(bad) = operation
                .inputs
                .iter()
                .chain(&operation.outputs)
                .find(|&&idx| idx as usize >= count)
            {
                return Err(ModelError::InvalidOperation {
                    index: i,
                    kind: operation.kind.to_string(),
                    detail: format!("operand {bad} out of range ({count} operands)"),
                });
            }
        }

        tracing::debug!(
            "model '{}' validated: {} operands, {} operations",
            self.name,
            count,
            self.operations.len(),
        );

        Ok(ModelDescription {
            name: self.name,
            operands: self.operands,
            operations: self.operations,
            input_indexes: self.input_indexes,
            output_indexes: self.output_indexes,
            operand_values: self.operand_values,
            pools: self.pools,
            _state: std::marker::PhantomData,
        })
    }

    fn validate_operand(&self, index: usize, operand: &Operand) -> Result<(), ModelError> {
        let invalid = |detail: String| ModelError::InvalidOperand { index, detail };

        if operand.ty == OperandType::TensorQuant8Asymm {
            if operand.scale.is_nan() || operand.scale <= 0.0 {
                return Err(invalid(format!("quantized scale {} must be positive", operand.scale)));
            }
            if !(0..=255).contains(&operand.zero_point) {
                return Err(invalid(format!(
                    "zero point {} outside 0..=255",
                    operand.zero_point
                )));
            }
        }

        let loc = operand.location;
        match operand.lifetime {
            OperandLifetime::ConstantCopy => {
                let end = loc.offset as usize + loc.length as usize;
                if end > self.operand_values.len() {
                    return Err(invalid(format!(
                        "inline value {}+{} exceeds {} bytes",
                        loc.offset,
                        loc.length,
                        self.operand_values.len()
                    )));
                }
            }
            OperandLifetime::ConstantReference => {
                if loc.pool_index as usize >= self.pools.len() {
                    return Err(invalid(format!(
                        "pool {} out of range ({} pools)",
                        loc.pool_index,
                        self.pools.len()
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelDescription<Validated> {
    /// Returns the operand at `index`.
    pub fn operand(&self, index: u32) -> Option<&Operand> {
        self.operands.get(index as usize)
    }

    /// Returns an iterator over the operations in execution order.
    pub fn iter_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Total bytes of constant data (inline plus referenced).
    pub fn constant_bytes(&self) -> usize {
        self.operands
            .iter()
            .filter(|o| o.is_constant())
            .map(|o| o.location.length as usize)
            .sum()
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}': {} operands, {} operations, {} inputs, {} outputs, {:.1} KB constants",
            self.name,
            self.operands.len(),
            self.operations.len(),
            self.input_indexes.len(),
            self.output_indexes.len(),
            self.constant_bytes() as f64 / 1024.0,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelDescription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ModelDescription '{}' ({} operations):",
            self.name,
            self.operations.len()
        )?;
        for operation in &self.operations {
            writeln!(f, "  {}", operation.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataLocation, OperationKind};

    /// Helper: `out = in0 + in1` with a fused activation constant.
    fn make_add() -> ModelDescription<Loaded> {
        let mut model = ModelDescription::new("add");
        let t = || Operand::new(OperandType::TensorFloat32, vec![1, 2, 2, 1]);
        let a = model.add_operand(t());
        let b = model.add_operand(t());
        let act = model.add_i32(0);
        let out = model.add_operand(t());
        model.add_operation(Operation::new(OperationKind::Add, vec![a, b, act], vec![out]));
        model.identify_inputs_and_outputs(vec![a, b], vec![out]);
        model
    }

    #[test]
    fn test_validate_ok() {
        let validated = make_add().validate().unwrap();
        assert_eq!(validated.operations.len(), 1);
        assert_eq!(validated.operand(0).unwrap().lifetime, OperandLifetime::ModelInput);
        assert_eq!(validated.operand(3).unwrap().lifetime, OperandLifetime::ModelOutput);
        assert_eq!(validated.constant_bytes(), 4);
    }

    #[test]
    fn test_validate_empty() {
        assert!(ModelDescription::new("empty").validate().is_err());
    }

    #[test]
    fn test_validate_operand_out_of_range() {
        let mut model = make_add();
        model.operations[0].inputs[1] = 42;
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidOperation { index: 0, .. })
        ));
    }

    #[test]
    fn test_validate_inline_range() {
        let mut model = make_add();
        model.operands[2].location = DataLocation {
            pool_index: 0,
            offset: 0,
            length: 64,
        };
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidOperand { index: 2, .. })
        ));
    }

    #[test]
    fn test_validate_missing_pool() {
        let mut model = make_add();
        model.operands[2].lifetime = OperandLifetime::ConstantReference;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_quant_params() {
        let mut model = make_add();
        for op in &mut model.operands {
            if op.ty == OperandType::TensorFloat32 {
                op.ty = OperandType::TensorQuant8Asymm;
                op.scale = 0.0;
            }
        }
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_unlisted_input_rejected() {
        let mut model = make_add();
        model.input_indexes.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_constants_are_aligned() {
        let mut model = ModelDescription::new("align");
        model.add_constant(Operand::new(OperandType::TensorQuant8Asymm, vec![3]), &[1, 2, 3]);
        let second = model.add_i32(7);
        assert_eq!(model.operands[second as usize].location.offset, 4);
        assert_eq!(model.operand_values.len(), 8);
    }
}
