// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The accelerator call surface.

use crate::{GraphId, LinkError, NodeId, NodeInput, NodeOutput, OpCode, PaddingMode, PerfInfo, TensorDef};

/// Operations every accelerator backend provides.
///
/// Implementations must be usable from several threads; graph-level calls
/// for one graph are only ever issued by one thread at a time.
pub trait AcceleratorLink: Send + Sync {
    /// Runtime version number.
    fn version(&self) -> Result<i32, LinkError>;

    /// One-time runtime configuration.
    fn config(&self) -> Result<(), LinkError>;

    /// Allocates a new, empty graph.
    fn allocate_graph(&self) -> Result<GraphId, LinkError>;

    /// Appends a constant node holding `data` with shape `dims`.
    fn append_const_node(
        &self,
        graph: GraphId,
        node: NodeId,
        dims: [u32; 4],
        data: &[u8],
    ) -> Result<(), LinkError>;

    /// Appends an operation node.
    fn append_node(
        &self,
        graph: GraphId,
        node: NodeId,
        op: OpCode,
        padding: PaddingMode,
        inputs: &[NodeInput],
        outputs: &[NodeOutput],
    ) -> Result<(), LinkError>;

    /// Compiles the graph; no nodes can be appended afterwards.
    fn compile_graph(&self, graph: GraphId) -> Result<(), LinkError>;

    /// Runs a compiled graph.
    fn execute(
        &self,
        graph: GraphId,
        inputs: &[TensorDef],
        outputs: &mut [TensorDef],
    ) -> Result<(), LinkError>;

    /// Releases a graph and all its nodes.
    fn release_graph(&self, graph: GraphId) -> Result<(), LinkError>;

    /// Sets the runtime's debug verbosity for a graph.
    fn set_debug_level(&self, graph: GraphId, level: i32) -> Result<(), LinkError>;

    /// Sets the global power-save level (0 = maximum performance).
    fn set_powersave_level(&self, level: u32) -> Result<(), LinkError>;

    /// Runtime log for a graph.
    fn graph_log(&self, graph: GraphId) -> Result<String, LinkError>;

    /// Human-readable dump of a graph's nodes.
    fn graph_dump(&self, graph: GraphId) -> Result<String, LinkError>;

    /// Per-node counters from the most recent executions.
    fn perf_info(&self, graph: GraphId) -> Result<Vec<PerfInfo>, LinkError>;

    /// Clears per-node counters and selects the counted event.
    fn reset_perf_info(&self, graph: GraphId, event: u32) -> Result<(), LinkError>;

    /// Cycle count of the most recent execution.
    fn last_execution_cycles(&self, graph: GraphId) -> Result<u64, LinkError>;
}
