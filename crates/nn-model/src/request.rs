// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution requests: where a run's inputs come from and outputs go.

use crate::{DataLocation, ModelDescription, ModelError, Validated};
use memory_pools::PoolDescriptor;

/// One graph input or output of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgument {
    /// The argument is omitted (optional inputs only).
    pub has_no_value: bool,
    /// Byte range inside one of the request's pools.
    pub location: DataLocation,
    /// Overrides the operand's dimensions when non-empty.
    pub dimensions: Vec<u32>,
}

impl RequestArgument {
    /// An argument at `offset` in pool `pool_index` spanning `length` bytes.
    pub fn new(pool_index: u32, offset: u32, length: u32) -> Self {
        Self {
            has_no_value: false,
            location: DataLocation {
                pool_index,
                offset,
                length,
            },
            dimensions: Vec::new(),
        }
    }

    /// Sets a dimension override.
    pub fn with_dimensions(mut self, dimensions: Vec<u32>) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// A single execution request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub inputs: Vec<RequestArgument>,
    pub outputs: Vec<RequestArgument>,
    pub pools: Vec<PoolDescriptor>,
}

impl Request {
    /// Checks the request against the model it will run on.
    ///
    /// # Checks
    /// - Argument counts match the model's graph inputs/outputs.
    /// - Every argument names an existing pool.
    /// - A dimension override has the operand's rank and only changes
    ///   dimensions the model left unspecified.
    pub fn validate_for(&self, model: &ModelDescription<Validated>) -> Result<(), ModelError> {
        for (which, args, indexes) in [
            ("input", &self.inputs, &model.input_indexes),
            ("output", &self.outputs, &model.output_indexes),
        ] {
            if args.len() != indexes.len() {
                return Err(ModelError::InvalidRequest(format!(
                    "expected {} {which}s, got {}",
                    indexes.len(),
                    args.len()
                )));
            }
            for (position, (arg, &operand_index)) in args.iter().zip(indexes.iter()).enumerate() {
                if arg.has_no_value {
                    continue;
                }
                if arg.location.pool_index as usize >= self.pools.len() {
                    return Err(ModelError::InvalidRequest(format!(
                        "{which} {position}: pool {} out of range ({} pools)",
                        arg.location.pool_index,
                        self.pools.len()
                    )));
                }
                if arg.dimensions.is_empty() {
                    continue;
                }
                let declared = model
                    .operand(operand_index)
                    .map(|o| o.dimensions.as_slice())
                    .unwrap_or_default();
                let compatible = declared.len() == arg.dimensions.len()
                    && declared
                        .iter()
                        .zip(&arg.dimensions)
                        .all(|(&d, &r)| d == 0 || d == r);
                if !compatible {
                    return Err(ModelError::InvalidRequest(format!(
                        "{which} {position}: dimensions {:?} incompatible with {:?}",
                        arg.dimensions, declared
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModelDescription, Operand, Operation, OperationKind};
    use memory_pools::SharedMemory;
    use tensor_shape::OperandType;

    fn relu_model(dims: Vec<u32>) -> ModelDescription<Validated> {
        let mut model = ModelDescription::new("relu");
        let a = model.add_operand(Operand::new(OperandType::TensorFloat32, dims.clone()));
        let b = model.add_operand(Operand::new(OperandType::TensorFloat32, dims));
        model.add_operation(Operation::new(OperationKind::Relu, vec![a], vec![b]));
        model.identify_inputs_and_outputs(vec![a], vec![b]);
        model.validate().unwrap()
    }

    fn pool() -> PoolDescriptor {
        PoolDescriptor::Shared(SharedMemory::new(64).unwrap())
    }

    #[test]
    fn test_valid_request() {
        let model = relu_model(vec![1, 4]);
        let request = Request {
            inputs: vec![RequestArgument::new(0, 0, 16)],
            outputs: vec![RequestArgument::new(0, 16, 16)],
            pools: vec![pool()],
        };
        request.validate_for(&model).unwrap();
    }

    #[test]
    fn test_count_mismatch() {
        let model = relu_model(vec![1, 4]);
        let request = Request {
            inputs: vec![],
            outputs: vec![RequestArgument::new(0, 0, 16)],
            pools: vec![pool()],
        };
        assert!(matches!(
            request.validate_for(&model),
            Err(ModelError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_bad_pool_index() {
        let model = relu_model(vec![1, 4]);
        let request = Request {
            inputs: vec![RequestArgument::new(1, 0, 16)],
            outputs: vec![RequestArgument::new(0, 0, 16)],
            pools: vec![pool()],
        };
        assert!(request.validate_for(&model).is_err());
    }

    #[test]
    fn test_dimension_override() {
        let model = relu_model(vec![0, 4]);
        let ok = Request {
            inputs: vec![RequestArgument::new(0, 0, 32).with_dimensions(vec![2, 4])],
            outputs: vec![RequestArgument::new(0, 32, 32)],
            pools: vec![pool()],
        };
        ok.validate_for(&model).unwrap();

        let bad = Request {
            inputs: vec![RequestArgument::new(0, 0, 32).with_dimensions(vec![2, 5])],
            outputs: vec![RequestArgument::new(0, 32, 32)],
            pools: vec![pool()],
        };
        assert!(bad.validate_for(&model).is_err());
    }
}
