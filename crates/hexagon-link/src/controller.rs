// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-wide accelerator controller.
//!
//! Every model in a process talks to the accelerator through one shared
//! [`Controller`]. It owns the active backend behind a read/write lock:
//! ordinary calls take a read guard, [`Controller::reset`] takes the write
//! guard and swaps in a freshly created backend, so a reset never overlaps a
//! graph being built or executed.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::{
    AcceleratorLink, DynamicLink, GraphId, LinkError, NodeId, NodeInput, NodeOutput, OpCode,
    PaddingMode, PerfInfo, TensorDef,
};

/// Runtime version this driver was written against.
pub const EXPECTED_VERSION: i32 = 92;

type BackendFactory = dyn Fn() -> Result<Box<dyn AcceleratorLink>, LinkError> + Send + Sync;

/// Shared owner of the active accelerator backend.
pub struct Controller {
    backend: RwLock<Box<dyn AcceleratorLink>>,
    factory: Box<BackendFactory>,
}

static SHARED: OnceLock<Result<Arc<Controller>, LinkError>> = OnceLock::new();

impl Controller {
    /// Creates a controller whose backend is produced by `factory`, now and
    /// on every reset.
    pub fn new<F>(factory: F) -> Result<Self, LinkError>
    where
        F: Fn() -> Result<Box<dyn AcceleratorLink>, LinkError> + Send + Sync + 'static,
    {
        let backend = factory()?;
        Ok(Self {
            backend: RwLock::new(backend),
            factory: Box::new(factory),
        })
    }

    /// The process-wide controller backed by the vendor library at
    /// `library`. Initialised on first call; later calls return the same
    /// controller (or the same load failure) whatever path they pass.
    pub fn shared(library: &str) -> Result<Arc<Controller>, LinkError> {
        SHARED
            .get_or_init(|| {
                let path = library.to_string();
                Controller::new(move || {
                    let link = DynamicLink::load(&path)?;
                    link.config()?;
                    Ok(Box::new(link) as Box<dyn AcceleratorLink>)
                })
                .map(Arc::new)
            })
            .clone()
    }

    /// Replaces the backend with a freshly created one.
    ///
    /// Waits for every in-flight call to finish first.
    pub fn reset(&self) -> Result<(), LinkError> {
        let mut backend = self.backend.write();
        tracing::warn!("resetting accelerator controller");
        *backend = (self.factory)()?;
        Ok(())
    }

    /// Probes the runtime version, resetting once if it is not `expected`.
    pub fn is_available(&self, expected: i32) -> bool {
        match self.version() {
            Ok(v) if v == expected => return true,
            Ok(v) => tracing::info!("accelerator reports version {v}, expected {expected}"),
            Err(e) => tracing::info!("accelerator version probe failed: {e}"),
        }
        if let Err(e) = self.reset() {
            tracing::warn!("accelerator reset failed: {e}");
            return false;
        }
        matches!(self.version(), Ok(v) if v == expected)
    }
}

impl AcceleratorLink for Controller {
    fn version(&self) -> Result<i32, LinkError> {
        self.backend.read().version()
    }

    fn config(&self) -> Result<(), LinkError> {
        self.backend.read().config()
    }

    fn allocate_graph(&self) -> Result<GraphId, LinkError> {
        self.backend.read().allocate_graph()
    }

    fn append_const_node(
        &self,
        graph: GraphId,
        node: NodeId,
        dims: [u32; 4],
        data: &[u8],
    ) -> Result<(), LinkError> {
        self.backend.read().append_const_node(graph, node, dims, data)
    }

    fn append_node(
        &self,
        graph: GraphId,
        node: NodeId,
        op: OpCode,
        padding: PaddingMode,
        inputs: &[NodeInput],
        outputs: &[NodeOutput],
    ) -> Result<(), LinkError> {
        self.backend
            .read()
            .append_node(graph, node, op, padding, inputs, outputs)
    }

    fn compile_graph(&self, graph: GraphId) -> Result<(), LinkError> {
        self.backend.read().compile_graph(graph)
    }

    fn execute(
        &self,
        graph: GraphId,
        inputs: &[TensorDef],
        outputs: &mut [TensorDef],
    ) -> Result<(), LinkError> {
        self.backend.read().execute(graph, inputs, outputs)
    }

    fn release_graph(&self, graph: GraphId) -> Result<(), LinkError> {
        self.backend.read().release_graph(graph)
    }

    fn set_debug_level(&self, graph: GraphId, level: i32) -> Result<(), LinkError> {
        self.backend.read().set_debug_level(graph, level)
    }

    fn set_powersave_level(&self, level: u32) -> Result<(), LinkError> {
        self.backend.read().set_powersave_level(level)
    }

    fn graph_log(&self, graph: GraphId) -> Result<String, LinkError> {
        self.backend.read().graph_log(graph)
    }

    fn graph_dump(&self, graph: GraphId) -> Result<String, LinkError> {
        self.backend.read().graph_dump(graph)
    }

    fn perf_info(&self, graph: GraphId) -> Result<Vec<PerfInfo>, LinkError> {
        self.backend.read().perf_info(graph)
    }

    fn reset_perf_info(&self, graph: GraphId, event: u32) -> Result<(), LinkError> {
        self.backend.read().reset_perf_info(graph, event)
    }

    fn last_execution_cycles(&self, graph: GraphId) -> Result<u64, LinkError> {
        self.backend.read().last_execution_cycles(graph)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller").finish_non_exhaustive()
    }
}
