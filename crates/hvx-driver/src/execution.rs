// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Running a compiled graph against a request.
//!
//! Each execution maps the request's pools, describes every graph input and
//! output as a [`TensorDef`] pointing into those pools, runs the graph and
//! flushes the pools. A failed execution does not touch the graph, so the
//! model stays usable.

use std::time::Instant;

use hexagon_link::TensorDef;
use memory_pools::{map_pools, pool_at, update_pools, MappedPool};
use nn_model::{Request, RequestArgument};
use tensor_shape::align_dims;

use crate::builder::HvxModel;
use crate::{ExecutionStats, LoweringError};

#[derive(Clone, Copy)]
enum Direction {
    Input,
    Output,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl HvxModel {
    /// Runs the compiled graph once.
    ///
    /// Dimension overrides in the request replace the operand's inferred
    /// dimensions; the byte length handed to the accelerator is always
    /// element size times element count.
    pub fn execute(&mut self, request: &Request) -> Result<ExecutionStats, LoweringError> {
        let graph = self.compiled_graph()?;
        request.validate_for(&self.description)?;
        let pools = map_pools(&request.pools)?;

        let inputs = self.tensor_defs(
            Direction::Input,
            &request.inputs,
            &self.description.input_indexes,
            &pools,
        )?;
        let mut outputs = self.tensor_defs(
            Direction::Output,
            &request.outputs,
            &self.description.output_indexes,
            &pools,
        )?;

        let link = self.link().clone();
        if self.options.perf_info {
            link.reset_perf_info(graph, 0)?;
        }

        let start = Instant::now();
        link.execute(graph, &inputs, &mut outputs).map_err(|e| {
            tracing::warn!("execution of graph {graph} failed: {e}");
            LoweringError::Execution(e.to_string())
        })?;
        let duration = start.elapsed();
        update_pools(&pools)?;

        let mut stats = ExecutionStats {
            duration,
            input_bytes: inputs.iter().map(|t| t.data_len.max(0) as usize).sum(),
            output_bytes: outputs.iter().map(|t| t.data_valid_len as usize).sum(),
            ..Default::default()
        };
        if self.options.perf_info {
            match (link.last_execution_cycles(graph), link.perf_info(graph)) {
                (Ok(cycles), Ok(perf)) => {
                    stats.cycles = Some(cycles);
                    stats.perf = perf;
                }
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("performance counters of graph {graph} unavailable: {e}")
                }
            }
        }
        tracing::info!("graph {graph}: {}", stats.summary());
        Ok(stats)
    }

    fn tensor_defs(
        &self,
        direction: Direction,
        args: &[RequestArgument],
        indexes: &[u32],
        pools: &[MappedPool],
    ) -> Result<Vec<TensorDef>, LoweringError> {
        args.iter()
            .zip(indexes)
            .enumerate()
            .map(|(position, (arg, &index))| {
                self.tensor_def(direction, position, arg, index, pools)
            })
            .collect()
    }

    fn tensor_def(
        &self,
        direction: Direction,
        position: usize,
        arg: &RequestArgument,
        index: u32,
        pools: &[MappedPool],
    ) -> Result<TensorDef, LoweringError> {
        let shape = self.catalog.shape(index)?;
        let dims = if arg.dimensions.is_empty() {
            shape.aligned()?
        } else {
            align_dims(&arg.dimensions)?
        };
        if arg.has_no_value {
            return Ok(TensorDef::new(dims, std::ptr::null_mut(), 0));
        }

        let count: usize = dims.iter().map(|&d| d as usize).product();
        let length = count * shape.ty.size_bytes();
        let location = arg.location;
        if location.length != 0 && (location.length as usize) < length {
            return Err(LoweringError::Execution(format!(
                "{} {position}: {} bytes supplied, {length} needed for {dims:?}",
                direction.as_str(),
                location.length
            )));
        }

        let pool = pool_at(pools, location.pool_index as usize)?;
        let data = match direction {
            Direction::Input => pool.ptr_at(location.offset as usize, length)?,
            Direction::Output => pool.ptr_at_mut(location.offset as usize, length)?,
        };
        Ok(TensorDef::new(dims, data, length))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hexagon_link::{FailurePlan, RecordingLink};
    use memory_pools::{PoolDescriptor, SharedMemory};
    use nn_model::{ModelDescription, Operand, Operation, OperationKind, Validated};
    use tensor_shape::OperandType;

    use super::*;
    use crate::{BuildState, DriverConfig, LoweringTables};

    fn relu_model(dims: Vec<u32>) -> ModelDescription<Validated> {
        let mut model = ModelDescription::new("relu");
        let a = model.add_operand(Operand::new(OperandType::TensorFloat32, dims.clone()));
        let b = model.add_operand(Operand::new(OperandType::TensorFloat32, dims));
        model.add_operation(Operation::new(OperationKind::Relu, vec![a], vec![b]));
        model.identify_inputs_and_outputs(vec![a], vec![b]);
        model.validate().unwrap()
    }

    fn prepared(link: &RecordingLink, config: &DriverConfig) -> HvxModel {
        let mut model = HvxModel::new(
            &relu_model(vec![4]),
            Arc::new(link.clone()),
            Arc::new(LoweringTables::standard()),
            config,
        )
        .unwrap();
        model.prepare().unwrap();
        model
    }

    fn request(input: &SharedMemory, output: &SharedMemory) -> Request {
        Request {
            inputs: vec![RequestArgument::new(0, 0, 16)],
            outputs: vec![RequestArgument::new(1, 0, 16)],
            pools: vec![
                PoolDescriptor::Shared(input.clone()),
                PoolDescriptor::Shared(output.clone()),
            ],
        }
    }

    #[test]
    fn test_execute_relu() {
        let link = RecordingLink::new();
        let mut model = prepared(&link, &DriverConfig::recording());
        let input = SharedMemory::from_f32(&[-1.0, 2.0, -3.0, 4.0]).unwrap();
        let output = SharedMemory::new(16).unwrap();

        let stats = model.execute(&request(&input, &output)).unwrap();
        assert_eq!(output.read_f32(0, 4).unwrap(), vec![0.0, 2.0, 0.0, 4.0]);
        assert_eq!(stats.input_bytes, 16);
        assert_eq!(stats.output_bytes, 16);
        assert!(stats.cycles.is_none());
    }

    #[test]
    fn test_execute_collects_perf() {
        let link = RecordingLink::new();
        let config = DriverConfig {
            perf_info: true,
            ..DriverConfig::recording()
        };
        let mut model = prepared(&link, &config);
        let input = SharedMemory::from_f32(&[1.0; 4]).unwrap();
        let output = SharedMemory::new(16).unwrap();

        let stats = model.execute(&request(&input, &output)).unwrap();
        assert!(stats.cycles.unwrap() > 0);
        assert_eq!(stats.perf.len(), 3);
    }

    #[test]
    fn test_failed_execution_keeps_graph() {
        let link = RecordingLink::new();
        let mut model = prepared(&link, &DriverConfig::recording());
        let input = SharedMemory::from_f32(&[-1.0, 1.0, -1.0, 1.0]).unwrap();
        let output = SharedMemory::new(16).unwrap();

        link.set_failures(FailurePlan {
            fail_execute: true,
            ..Default::default()
        });
        assert!(matches!(
            model.execute(&request(&input, &output)),
            Err(LoweringError::Execution(_))
        ));
        assert_eq!(model.state(), BuildState::Compiled);

        link.set_failures(FailurePlan::default());
        model.execute(&request(&input, &output)).unwrap();
        assert_eq!(output.read_f32(0, 4).unwrap(), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_short_output_buffer() {
        let link = RecordingLink::new();
        let mut model = prepared(&link, &DriverConfig::recording());
        let input = SharedMemory::from_f32(&[1.0; 4]).unwrap();
        let output = SharedMemory::new(16).unwrap();
        let mut req = request(&input, &output);
        req.outputs[0].location.length = 8;
        assert!(matches!(model.execute(&req), Err(LoweringError::Execution(_))));
    }

    #[test]
    fn test_execute_before_prepare() {
        let link = RecordingLink::new();
        let mut model = HvxModel::new(
            &relu_model(vec![4]),
            Arc::new(link),
            Arc::new(LoweringTables::standard()),
            &DriverConfig::recording(),
        )
        .unwrap();
        let input = SharedMemory::new(16).unwrap();
        let output = SharedMemory::new(16).unwrap();
        assert!(matches!(
            model.execute(&request(&input, &output)),
            Err(LoweringError::InvalidState { .. })
        ));
    }
}
