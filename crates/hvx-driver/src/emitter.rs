// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node-id bookkeeping on top of an accelerator link.
//!
//! The emitter owns the graph id and the node-id counter of one model.
//! Node ids start at 1 and grow by one per appended node, constants
//! included; the counter never goes backwards while the graph lives.

use std::sync::Arc;

use hexagon_link::{AcceleratorLink, GraphId, NodeId, NodeInput, NodeOutput, OpCode, PaddingMode};

use crate::LoweringError;

pub struct NodeEmitter {
    link: Arc<dyn AcceleratorLink>,
    graph: Option<GraphId>,
    next_node: NodeId,
}

impl NodeEmitter {
    pub fn new(link: Arc<dyn AcceleratorLink>) -> Self {
        Self {
            link,
            graph: None,
            next_node: 1,
        }
    }

    pub fn link(&self) -> &Arc<dyn AcceleratorLink> {
        &self.link
    }

    /// The allocated graph, if any.
    pub fn graph(&self) -> Option<GraphId> {
        self.graph
    }

    /// Number of nodes appended so far.
    pub fn node_count(&self) -> u32 {
        self.next_node - 1
    }

    /// Allocates the accelerator graph.
    pub fn allocate(&mut self) -> Result<GraphId, LoweringError> {
        if let Some(graph) = self.graph {
            return Err(LoweringError::Allocation(format!(
                "graph {graph} is already allocated"
            )));
        }
        let graph = self
            .link
            .allocate_graph()
            .map_err(|e| LoweringError::Allocation(e.to_string()))?;
        if graph == 0 {
            return Err(LoweringError::Allocation(
                "accelerator returned graph id 0".into(),
            ));
        }
        tracing::info!("allocated accelerator graph {graph}");
        self.graph = Some(graph);
        self.next_node = 1;
        Ok(graph)
    }

    fn require_graph(&self) -> Result<GraphId, LoweringError> {
        self.graph.ok_or(LoweringError::InvalidState {
            expected: "allocated",
            found: "unallocated",
        })
    }

    fn take_id(&mut self) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        id
    }

    /// Appends a constant node and returns its single output.
    pub fn constant(&mut self, dims: [u32; 4], data: &[u8]) -> Result<NodeInput, LoweringError> {
        let graph = self.require_graph()?;
        let id = self.take_id();
        self.link
            .append_const_node(graph, id, dims, data)
            .map_err(|e| {
                tracing::warn!("constant node {id} {dims:?} rejected: {e}");
                LoweringError::Lowering(format!("constant node {id}: {e}"))
            })?;
        tracing::debug!("node {id}: const {dims:?} ({} bytes)", data.len());
        Ok(NodeInput::new(id, 0))
    }

    /// Appends an operation node and returns its id.
    pub fn node(
        &mut self,
        op: OpCode,
        padding: PaddingMode,
        inputs: &[NodeInput],
        outputs: &[NodeOutput],
    ) -> Result<NodeId, LoweringError> {
        let graph = self.require_graph()?;
        let id = self.take_id();
        self.link
            .append_node(graph, id, op, padding, inputs, outputs)
            .map_err(|e| {
                tracing::warn!("node {id} ({op}) rejected: {e}");
                LoweringError::Lowering(format!("{op} node {id}: {e}"))
            })?;
        tracing::debug!(
            "node {id}: {op} ({} inputs, {} outputs, {})",
            inputs.len(),
            outputs.len(),
            padding.as_str()
        );
        Ok(id)
    }

    /// Compiles the graph.
    pub fn compile(&self) -> Result<(), LoweringError> {
        let graph = self.require_graph()?;
        self.link
            .compile_graph(graph)
            .map_err(LoweringError::Compile)?;
        tracing::info!("compiled accelerator graph {graph} ({} nodes)", self.node_count());
        Ok(())
    }

    /// Releases the graph if one is allocated. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(graph) = self.graph.take() {
            match self.link.release_graph(graph) {
                Ok(()) => tracing::info!("released accelerator graph {graph}"),
                Err(e) => tracing::warn!("releasing graph {graph} failed: {e}"),
            }
        }
        self.next_node = 1;
    }
}

impl std::fmt::Debug for NodeEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeEmitter")
            .field("graph", &self.graph)
            .field("next_node", &self.next_node)
            .finish()
    }
}
