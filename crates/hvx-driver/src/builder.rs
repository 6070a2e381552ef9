// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The graph builder: one portable model lowered into one accelerator graph.
//!
//! ```text
//! Unallocated
//!     │  validate, allocate
//!     ▼
//! Allocated ──► InputsEmitted ──► OperationsEmitted ──► OutputsEmitted
//!                                                            │  compile
//!                                                            ▼
//!                                                        Compiled
//! ```
//!
//! Any failure on the way moves the model to `Failed`: every memoized
//! accelerator handle is forgotten and the graph is released. A compiled
//! model can be executed any number of times; its graph is released when
//! the model is dropped.

use std::sync::Arc;
use std::time::Instant;

use hexagon_link::{AcceleratorLink, GraphId, NodeInput, OpCode, PaddingMode};
use nn_model::{ModelDescription, OperandLifetime, Operation, Validated};
use tensor_shape::{OperandType, Shape, MAX_RANK};

use crate::catalog::OperandCatalog;
use crate::dispatch::LoweringTables;
use crate::fusion::{make_output, quantized_outputs};
use crate::{DriverConfig, LoweringError, PrepareStats};

/// Progress of a model through `prepare()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unallocated,
    Allocated,
    InputsEmitted,
    OperationsEmitted,
    OutputsEmitted,
    Compiled,
    Failed,
}

impl BuildState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unallocated => "unallocated",
            Self::Allocated => "allocated",
            Self::InputsEmitted => "inputs emitted",
            Self::OperationsEmitted => "operations emitted",
            Self::OutputsEmitted => "outputs emitted",
            Self::Compiled => "compiled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph options taken from the driver configuration.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GraphOptions {
    pub debug_level: Option<i32>,
    pub dump_graph: bool,
    pub perf_info: bool,
}

/// A portable model and the accelerator graph it lowers into.
pub struct HvxModel {
    pub(crate) description: ModelDescription<Validated>,
    pub(crate) catalog: OperandCatalog,
    tables: Arc<LoweringTables>,
    pub(crate) options: GraphOptions,
    state: BuildState,
}

impl HvxModel {
    /// Builds the operand table and maps the model's pools. No accelerator
    /// call is made until [`prepare`](Self::prepare).
    pub fn new(
        description: &ModelDescription<Validated>,
        link: Arc<dyn AcceleratorLink>,
        tables: Arc<LoweringTables>,
        config: &DriverConfig,
    ) -> Result<Self, LoweringError> {
        let catalog = OperandCatalog::new(description, link)?;
        tracing::debug!("{}", description.summary());
        Ok(Self {
            description: description.clone(),
            catalog,
            tables,
            options: GraphOptions {
                debug_level: config.debug_level,
                dump_graph: config.dump_graph,
                perf_info: config.perf_info,
            },
            state: BuildState::Unallocated,
        })
    }

    pub fn name(&self) -> &str {
        &self.description.name
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// The accelerator graph, while one is allocated.
    pub fn graph(&self) -> Option<GraphId> {
        self.catalog.emitter().graph()
    }

    /// Nodes appended to the accelerator graph so far.
    pub fn node_count(&self) -> u32 {
        self.catalog.emitter().node_count()
    }

    pub fn catalog(&self) -> &OperandCatalog {
        &self.catalog
    }

    /// Shapes of the graph inputs, in request order.
    pub fn input_shapes(&self) -> Result<Vec<Shape>, LoweringError> {
        self.description
            .input_indexes
            .iter()
            .map(|&i| self.catalog.shape(i))
            .collect()
    }

    /// Shapes of the graph outputs. Unknown dimensions are filled in once
    /// the model has been validated.
    pub fn output_shapes(&self) -> Result<Vec<Shape>, LoweringError> {
        self.description
            .output_indexes
            .iter()
            .map(|&i| self.catalog.shape(i))
            .collect()
    }

    pub(crate) fn link(&self) -> &Arc<dyn AcceleratorLink> {
        self.catalog.emitter().link()
    }

    pub(crate) fn compiled_graph(&self) -> Result<GraphId, LoweringError> {
        match (self.state, self.graph()) {
            (BuildState::Compiled, Some(graph)) => Ok(graph),
            (state, _) => Err(LoweringError::InvalidState {
                expected: BuildState::Compiled.as_str(),
                found: state.as_str(),
            }),
        }
    }

    // ── Validation ─────────────────────────────────────────────────

    /// Checks that every operation can be lowered and infers every
    /// operand's shape. Appends no nodes.
    pub fn validate(&mut self) -> Result<(), LoweringError> {
        for (index, info) in self.catalog.iter().enumerate() {
            if info.lifetime != OperandLifetime::NoValue && info.shape.rank() > MAX_RANK {
                return Err(LoweringError::Validation(format!(
                    "operand {index} has rank {}, at most {MAX_RANK} is supported",
                    info.shape.rank()
                )));
            }
        }

        for op in &self.description.operations {
            let ty = self.representation(op)?;
            let check = self
                .tables
                .check_fn(op.kind, ty)
                .ok_or(LoweringError::Unsupported { kind: op.kind, ty })?;
            check(&mut self.catalog, op).map_err(|e| {
                tracing::warn!("{} rejected: {e}", op.summary());
                e
            })?;
        }

        for (index, info) in self.catalog.iter().enumerate() {
            if info.lifetime != OperandLifetime::NoValue && info.shape.dims.contains(&0) {
                return Err(LoweringError::Validation(format!(
                    "operand {index} has a zero dimension: {:?}",
                    info.shape.dims
                )));
            }
        }
        Ok(())
    }

    /// Whether each operation can be lowered, in operation order: its
    /// (kind, representation) pair has a check entry, its operands are at
    /// most rank 4 and its shape inference succeeds. Appends no nodes.
    pub fn supported_operations(&mut self) -> Vec<bool> {
        let Self {
            description,
            catalog,
            tables,
            ..
        } = self;
        description
            .operations
            .iter()
            .map(|op| {
                let within_rank = op.inputs.iter().chain(&op.outputs).all(|&i| {
                    catalog.operand(i).is_ok_and(|info| {
                        info.lifetime == OperandLifetime::NoValue || info.shape.rank() <= MAX_RANK
                    })
                });
                let check = op
                    .inputs
                    .first()
                    .and_then(|&i| catalog.shape(i).ok())
                    .and_then(|shape| tables.check_fn(op.kind, shape.ty));
                match check {
                    Some(check) if within_rank => match check(catalog, op) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::debug!("{} unsupported: {e}", op.summary());
                            false
                        }
                    },
                    _ => false,
                }
            })
            .collect()
    }

    /// Representation an operation dispatches on: its first input's type.
    fn representation(&self, op: &Operation) -> Result<OperandType, LoweringError> {
        let first = op.inputs.first().ok_or_else(|| {
            LoweringError::Validation(format!("{} has no inputs", op.kind))
        })?;
        Ok(self.catalog.shape(*first)?.ty)
    }

    // ── Preparation ────────────────────────────────────────────────

    /// Validates, lowers and compiles the model.
    ///
    /// On failure the model is left `Failed` with its graph released.
    pub fn prepare(&mut self) -> Result<PrepareStats, LoweringError> {
        if self.state != BuildState::Unallocated {
            return Err(LoweringError::InvalidState {
                expected: BuildState::Unallocated.as_str(),
                found: self.state.as_str(),
            });
        }
        match self.build() {
            Ok(stats) => {
                tracing::info!("model '{}' prepared: {}", self.name(), stats.summary());
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(
                    "preparing model '{}' failed while {}: {e}",
                    self.name(),
                    self.state
                );
                self.teardown();
                self.state = BuildState::Failed;
                Err(e)
            }
        }
    }

    fn build(&mut self) -> Result<PrepareStats, LoweringError> {
        let mut stats = PrepareStats {
            operations: self.description.operations.len(),
            ..Default::default()
        };

        let start = Instant::now();
        self.validate()?;
        stats.validate_duration = start.elapsed();

        let start = Instant::now();
        self.allocate()?;
        self.emit_inputs()?;
        self.emit_operations()?;
        self.emit_outputs()?;
        stats.lower_duration = start.elapsed();

        let start = Instant::now();
        self.compile()?;
        stats.compile_duration = start.elapsed();
        stats.nodes = self.node_count();
        Ok(stats)
    }

    fn allocate(&mut self) -> Result<(), LoweringError> {
        let graph = self.catalog.emitter_mut().allocate()?;
        if let Some(level) = self.options.debug_level {
            self.link().set_debug_level(graph, level)?;
        }
        self.state = BuildState::Allocated;
        Ok(())
    }

    fn emit_inputs(&mut self) -> Result<(), LoweringError> {
        let inputs = self.description.input_indexes.clone();
        let mut outputs = Vec::with_capacity(inputs.len());
        for &index in &inputs {
            outputs.push(make_output(&self.catalog.shape(index)?)?);
        }
        let node = self
            .catalog
            .emitter_mut()
            .node(OpCode::Input, PaddingMode::NotApplicable, &[], &outputs)?;
        for (position, &index) in inputs.iter().enumerate() {
            self.catalog.bind(index, NodeInput::new(node, position as u32))?;
        }
        self.state = BuildState::InputsEmitted;
        Ok(())
    }

    fn emit_operations(&mut self) -> Result<(), LoweringError> {
        for op in &self.description.operations {
            let ty = self.catalog.shape(op.inputs[0])?.ty;
            let prepare = self
                .tables
                .prepare_fn(op.kind, ty)
                .ok_or(LoweringError::Unsupported { kind: op.kind, ty })?;

            for &out in &op.outputs {
                if self.catalog.is_bound(out)? {
                    return Err(LoweringError::AlreadyBound(out));
                }
            }
            let before = self.catalog.emitter().node_count();
            prepare(&mut self.catalog, op)?;
            for &out in &op.outputs {
                if !self.catalog.is_bound(out)? {
                    return Err(LoweringError::NotBound(out));
                }
            }
            tracing::debug!(
                "{} lowered into {} nodes",
                op.summary(),
                self.catalog.emitter().node_count() - before
            );
        }
        self.state = BuildState::OperationsEmitted;
        Ok(())
    }

    fn emit_outputs(&mut self) -> Result<(), LoweringError> {
        let outputs = self.description.output_indexes.clone();
        let mut handles = Vec::with_capacity(outputs.len());
        for &index in &outputs {
            let data = self.catalog.tensor(index)?;
            let shape = self.catalog.shape(index)?;
            if shape.ty != OperandType::TensorQuant8Asymm {
                handles.push(data);
                continue;
            }

            // Re-range into the operand's nominal 0..=255 range.
            let min = self.catalog.quantization_min(index)?;
            let max = self.catalog.quantization_max(index)?;
            let mut real = shape.clone();
            real.ty = OperandType::TensorFloat32;
            let dequantized = self.catalog.emitter_mut().node(
                OpCode::Dequantize,
                PaddingMode::NotApplicable,
                &[data, min, max],
                &[make_output(&real)?],
            )?;
            let low = self.catalog.quantization_value(index, 0)?;
            let high = self.catalog.quantization_value(index, 255)?;
            let quantized = self.catalog.emitter_mut().node(
                OpCode::Quantize,
                PaddingMode::NotApplicable,
                &[NodeInput::new(dequantized, 0), low, high],
                &quantized_outputs(&shape, 1)?,
            )?;
            handles.push(NodeInput::new(quantized, 0));
        }
        self.catalog
            .emitter_mut()
            .node(OpCode::Output, PaddingMode::NotApplicable, &handles, &[])?;
        self.state = BuildState::OutputsEmitted;
        Ok(())
    }

    fn compile(&mut self) -> Result<(), LoweringError> {
        self.catalog.emitter().compile()?;
        self.state = BuildState::Compiled;
        if self.options.dump_graph {
            match self.graph_dump() {
                Ok(dump) => tracing::info!("graph dump for '{}':\n{dump}", self.name()),
                Err(e) => tracing::warn!("graph dump unavailable: {e}"),
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.catalog.clear_bindings();
        self.catalog.emitter_mut().release();
    }

    // ── Diagnostics ────────────────────────────────────────────────

    /// The accelerator's log for this model's graph.
    pub fn graph_log(&self) -> Result<String, LoweringError> {
        let graph = self.require_graph()?;
        Ok(self.link().graph_log(graph)?)
    }

    /// The accelerator's node dump for this model's graph.
    pub fn graph_dump(&self) -> Result<String, LoweringError> {
        let graph = self.require_graph()?;
        Ok(self.link().graph_dump(graph)?)
    }

    fn require_graph(&self) -> Result<GraphId, LoweringError> {
        self.graph().ok_or(LoweringError::InvalidState {
            expected: "allocated",
            found: self.state.as_str(),
        })
    }
}

impl Drop for HvxModel {
    fn drop(&mut self) {
        self.catalog.emitter_mut().release();
    }
}

impl std::fmt::Debug for HvxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HvxModel")
            .field("name", &self.description.name)
            .field("state", &self.state)
            .field("graph", &self.graph())
            .field("nodes", &self.node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexagon_link::{FailurePlan, RecordingLink};
    use nn_model::{Operand, OperationKind};

    fn relu_model(ty: OperandType, dims: Vec<u32>) -> ModelDescription<Validated> {
        let mut model = ModelDescription::new("relu");
        let operand = match ty {
            OperandType::TensorQuant8Asymm => Operand::new(ty, dims).with_quantization(0.5, 10),
            _ => Operand::new(ty, dims),
        };
        let a = model.add_operand(operand.clone());
        let b = model.add_operand(operand);
        model.add_operation(Operation::new(OperationKind::Relu, vec![a], vec![b]));
        model.identify_inputs_and_outputs(vec![a], vec![b]);
        model.validate().unwrap()
    }

    fn build(model: &ModelDescription<Validated>, link: &RecordingLink) -> HvxModel {
        HvxModel::new(
            model,
            Arc::new(link.clone()),
            Arc::new(LoweringTables::standard()),
            &DriverConfig::recording(),
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_float_relu() {
        let link = RecordingLink::new();
        let mut model = build(&relu_model(OperandType::TensorFloat32, vec![1, 2, 2, 3]), &link);
        let stats = model.prepare().unwrap();
        assert_eq!(model.state(), BuildState::Compiled);
        // INPUT, Relu_f, OUTPUT
        assert_eq!(stats.nodes, 3);
        let graph = model.graph().unwrap();
        assert!(link.is_compiled(graph));
        assert_eq!(
            link.op_codes(graph),
            vec![OpCode::Input, OpCode::ReluF, OpCode::Output]
        );
    }

    #[test]
    fn test_quantized_output_requantized() {
        let link = RecordingLink::new();
        let mut model =
            build(&relu_model(OperandType::TensorQuant8Asymm, vec![1, 2, 2, 3]), &link);
        model.prepare().unwrap();
        let ops = link.op_codes(model.graph().unwrap());
        assert_eq!(
            ops,
            vec![
                OpCode::Input,
                OpCode::QuantizedRelu8,
                OpCode::Dequantize,
                OpCode::Quantize,
                OpCode::Output
            ]
        );
    }

    #[test]
    fn test_prepare_twice_rejected() {
        let link = RecordingLink::new();
        let mut model = build(&relu_model(OperandType::TensorFloat32, vec![4]), &link);
        model.prepare().unwrap();
        assert!(matches!(
            model.prepare(),
            Err(LoweringError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let link = RecordingLink::new();
        let mut model = build(&relu_model(OperandType::TensorFloat32, vec![1, 0]), &link);
        let err = model.prepare().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(model.state(), BuildState::Failed);
        assert_eq!(link.total_appends(), 0);
    }

    #[test]
    fn test_compile_failure_releases_graph() {
        let link = RecordingLink::with_failures(FailurePlan {
            fail_compile: true,
            ..Default::default()
        });
        let mut model = build(&relu_model(OperandType::TensorFloat32, vec![4]), &link);
        assert!(matches!(model.prepare(), Err(LoweringError::Compile(_))));
        assert_eq!(model.state(), BuildState::Failed);
        assert!(model.graph().is_none());
        assert!(link.live_graphs().is_empty());
        assert_eq!(link.released_graphs().len(), 1);
        assert!(model.catalog().iter().all(|info| info.tensor().is_none()));
    }

    #[test]
    fn test_append_failure_tears_down() {
        let link = RecordingLink::with_failures(FailurePlan {
            fail_append_at: Some(1),
            ..Default::default()
        });
        let mut model = build(&relu_model(OperandType::TensorFloat32, vec![4]), &link);
        assert!(matches!(model.prepare(), Err(LoweringError::Lowering(_))));
        assert!(link.live_graphs().is_empty());
    }

    #[test]
    fn test_drop_releases_graph() {
        let link = RecordingLink::new();
        {
            let mut model = build(&relu_model(OperandType::TensorFloat32, vec![4]), &link);
            model.prepare().unwrap();
            assert_eq!(link.live_graphs().len(), 1);
        }
        assert!(link.live_graphs().is_empty());
    }

    #[test]
    fn test_supported_operations() {
        let link = RecordingLink::new();
        let description = relu_model(OperandType::TensorFloat32, vec![4]);
        assert_eq!(build(&description, &link).supported_operations(), vec![true]);

        let mut model = HvxModel::new(
            &description,
            Arc::new(link.clone()),
            Arc::new(LoweringTables::empty()),
            &DriverConfig::recording(),
        )
        .unwrap();
        assert_eq!(model.supported_operations(), vec![false]);

        let too_deep = relu_model(OperandType::TensorFloat32, vec![1, 1, 1, 2, 2]);
        assert_eq!(build(&too_deep, &link).supported_operations(), vec![false]);
        assert_eq!(link.total_appends(), 0);
    }
}
