// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-process accelerator link that records graphs.
//!
//! [`RecordingLink`] accepts the same call sequence as the vendor runtime and
//! enforces the same structural rules (unique non-zero node ids, inputs that
//! reference existing outputs, no appends after compilation). It keeps every
//! node so callers can inspect what was emitted, can be told to fail
//! specific calls, and evaluates float graphs built from a small op subset
//! so execution paths can be exercised without the DSP.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    AcceleratorLink, GraphId, LinkError, NodeId, NodeInput, NodeOutput, OpCode, PaddingMode,
    PerfInfo, TensorDef, EXPECTED_VERSION,
};

/// Cycles charged per evaluated node.
const CYCLES_PER_NODE: u64 = 100;

/// A node as it was appended.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedNode {
    Const {
        id: NodeId,
        dims: [u32; 4],
        data: Vec<u8>,
    },
    Op {
        id: NodeId,
        op: OpCode,
        padding: PaddingMode,
        inputs: Vec<NodeInput>,
        outputs: Vec<NodeOutput>,
    },
}

impl RecordedNode {
    pub fn id(&self) -> NodeId {
        match self {
            RecordedNode::Const { id, .. } | RecordedNode::Op { id, .. } => *id,
        }
    }

    /// The op of an operation node, `None` for constants.
    pub fn op(&self) -> Option<OpCode> {
        match self {
            RecordedNode::Op { op, .. } => Some(*op),
            RecordedNode::Const { .. } => None,
        }
    }

    fn output_count(&self) -> usize {
        match self {
            RecordedNode::Const { .. } => 1,
            RecordedNode::Op { outputs, .. } => outputs.len(),
        }
    }
}

/// Calls the link should reject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailurePlan {
    /// Reject every graph allocation.
    pub fail_allocate: bool,
    /// Reject the append with this zero-based index (counted across all
    /// graphs, constants and operations alike).
    pub fail_append_at: Option<usize>,
    /// Reject every compilation.
    pub fail_compile: bool,
    /// Reject every execution.
    pub fail_execute: bool,
}

#[derive(Debug, Default)]
struct RecordedGraph {
    nodes: Vec<RecordedNode>,
    compiled: bool,
    executions: u64,
    last_cycles: u64,
    perf: HashMap<NodeId, PerfInfo>,
    log: Vec<String>,
    debug_level: i32,
}

impl RecordedGraph {
    fn node(&self, id: NodeId) -> Option<&RecordedNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }
}

#[derive(Debug)]
struct State {
    next_graph: GraphId,
    graphs: HashMap<GraphId, RecordedGraph>,
    released: Vec<GraphId>,
    appends: usize,
    version: i32,
    powersave: u32,
    plan: FailurePlan,
}

/// Recording, evaluating [`AcceleratorLink`].
///
/// Clones share the recorded state, so a test can keep one handle while a
/// [`crate::Controller`] owns another.
#[derive(Debug, Clone)]
pub struct RecordingLink {
    state: Arc<Mutex<State>>,
}

impl Default for RecordingLink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingLink {
    /// A link that accepts everything and reports the expected version.
    pub fn new() -> Self {
        Self::with_failures(FailurePlan::default())
    }

    /// A link that rejects the calls named by `plan`.
    pub fn with_failures(plan: FailurePlan) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_graph: 1,
                graphs: HashMap::new(),
                released: Vec::new(),
                appends: 0,
                version: EXPECTED_VERSION,
                powersave: 0,
                plan,
            })),
        }
    }

    /// Changes the reported runtime version.
    pub fn set_version(&self, version: i32) {
        self.state.lock().version = version;
    }

    /// Replaces the failure plan.
    pub fn set_failures(&self, plan: FailurePlan) {
        self.state.lock().plan = plan;
    }

    // ── Inspection ─────────────────────────────────────────────────

    /// Every node of `graph`, in append order.
    pub fn nodes(&self, graph: GraphId) -> Vec<RecordedNode> {
        self.state
            .lock()
            .graphs
            .get(&graph)
            .map(|g| g.nodes.clone())
            .unwrap_or_default()
    }

    /// Number of nodes (constants included) appended to `graph`.
    pub fn node_count(&self, graph: GraphId) -> usize {
        self.state.lock().graphs.get(&graph).map_or(0, |g| g.nodes.len())
    }

    /// Number of constant nodes appended to `graph`.
    pub fn const_count(&self, graph: GraphId) -> usize {
        self.nodes(graph).iter().filter(|n| n.op().is_none()).count()
    }

    /// Ops of the operation nodes of `graph`, in append order.
    pub fn op_codes(&self, graph: GraphId) -> Vec<OpCode> {
        self.nodes(graph).iter().filter_map(RecordedNode::op).collect()
    }

    /// Graphs allocated and not yet released.
    pub fn live_graphs(&self) -> Vec<GraphId> {
        let mut live: Vec<_> = self.state.lock().graphs.keys().copied().collect();
        live.sort_unstable();
        live
    }

    /// Graphs released so far, in release order.
    pub fn released_graphs(&self) -> Vec<GraphId> {
        self.state.lock().released.clone()
    }

    /// Total appends accepted or rejected across all graphs.
    pub fn total_appends(&self) -> usize {
        self.state.lock().appends
    }

    pub fn is_compiled(&self, graph: GraphId) -> bool {
        self.state.lock().graphs.get(&graph).is_some_and(|g| g.compiled)
    }

    pub fn execution_count(&self, graph: GraphId) -> u64 {
        self.state.lock().graphs.get(&graph).map_or(0, |g| g.executions)
    }

    pub fn powersave_level(&self) -> u32 {
        self.state.lock().powersave
    }

    pub fn debug_level(&self, graph: GraphId) -> Option<i32> {
        self.state.lock().graphs.get(&graph).map(|g| g.debug_level)
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn check_append(
        state: &mut State,
        graph: GraphId,
        node: NodeId,
        inputs: &[NodeInput],
        call: &'static str,
    ) -> Result<(), LinkError> {
        let index = state.appends;
        state.appends += 1;
        if state.plan.fail_append_at == Some(index) {
            return Err(LinkError::Call { call, code: -1 });
        }
        let g = state
            .graphs
            .get_mut(&graph)
            .ok_or(LinkError::UnknownGraph(graph))?;
        if g.compiled {
            return Err(LinkError::Call { call, code: -2 });
        }
        if node == 0 || g.node(node).is_some() {
            return Err(LinkError::Call { call, code: -3 });
        }
        for input in inputs {
            let valid = g
                .node(input.src_id)
                .is_some_and(|src| (input.output_idx as usize) < src.output_count());
            if !valid {
                return Err(LinkError::Call { call, code: -4 });
            }
        }
        Ok(())
    }
}

impl AcceleratorLink for RecordingLink {
    fn version(&self) -> Result<i32, LinkError> {
        Ok(self.state.lock().version)
    }

    fn config(&self) -> Result<(), LinkError> {
        Ok(())
    }

    fn allocate_graph(&self) -> Result<GraphId, LinkError> {
        let mut state = self.state.lock();
        if state.plan.fail_allocate {
            return Err(LinkError::Call {
                call: "hexagon_nn_init",
                code: -1,
            });
        }
        let id = state.next_graph;
        state.next_graph += 1;
        state.graphs.insert(id, RecordedGraph::default());
        Ok(id)
    }

    fn append_const_node(
        &self,
        graph: GraphId,
        node: NodeId,
        dims: [u32; 4],
        data: &[u8],
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        Self::check_append(&mut state, graph, node, &[], "hexagon_nn_append_const_node")?;
        if let Some(g) = state.graphs.get_mut(&graph) {
            g.nodes.push(RecordedNode::Const {
                id: node,
                dims,
                data: data.to_vec(),
            });
        }
        Ok(())
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
        let mut state = self.state.lock();
        Self::check_append(&mut state, graph, node, inputs, "hexagon_nn_append_node")?;
        if let Some(g) = state.graphs.get_mut(&graph) {
            g.nodes.push(RecordedNode::Op {
                id: node,
                op,
                padding,
                inputs: inputs.to_vec(),
                outputs: outputs.to_vec(),
            });
        }
        Ok(())
    }

    fn compile_graph(&self, graph: GraphId) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        let fail = state.plan.fail_compile;
        let g = state
            .graphs
            .get_mut(&graph)
            .ok_or(LinkError::UnknownGraph(graph))?;
        if fail || g.compiled {
            return Err(LinkError::Call {
                call: "hexagon_nn_prepare",
                code: -1,
            });
        }
        g.compiled = true;
        g.log.push(format!("prepared {} nodes", g.nodes.len()));
        Ok(())
    }

    fn execute(
        &self,
        graph: GraphId,
        inputs: &[TensorDef],
        outputs: &mut [TensorDef],
    ) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        let fail = state.plan.fail_execute;
        let g = state
            .graphs
            .get_mut(&graph)
            .ok_or(LinkError::UnknownGraph(graph))?;
        if fail || !g.compiled {
            return Err(LinkError::Call {
                call: "hexagon_nn_execute_new",
                code: -1,
            });
        }
        let evaluated = eval::run(&g.nodes, inputs, outputs)?;
        g.executions += 1;
        g.last_cycles = evaluated.len() as u64 * CYCLES_PER_NODE;
        for id in evaluated {
            let entry = g.perf.entry(id).or_insert(PerfInfo {
                node_id: id,
                ..PerfInfo::default()
            });
            entry.executions += 1;
            let total = entry.counter() + CYCLES_PER_NODE;
            entry.counter_lo = total as u32;
            entry.counter_hi = (total >> 32) as u32;
        }
        g.log.push(format!("execution {} ok", g.executions));
        Ok(())
    }

    fn release_graph(&self, graph: GraphId) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state
            .graphs
            .remove(&graph)
            .ok_or(LinkError::UnknownGraph(graph))?;
        state.released.push(graph);
        Ok(())
    }

    fn set_debug_level(&self, graph: GraphId, level: i32) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        let g = state
            .graphs
            .get_mut(&graph)
            .ok_or(LinkError::UnknownGraph(graph))?;
        g.debug_level = level;
        Ok(())
    }

    fn set_powersave_level(&self, level: u32) -> Result<(), LinkError> {
        self.state.lock().powersave = level;
        Ok(())
    }

    fn graph_log(&self, graph: GraphId) -> Result<String, LinkError> {
        let state = self.state.lock();
        let g = state.graphs.get(&graph).ok_or(LinkError::UnknownGraph(graph))?;
        Ok(g.log.join("\n"))
    }

    fn graph_dump(&self, graph: GraphId) -> Result<String, LinkError> {
        let state = self.state.lock();
        let g = state.graphs.get(&graph).ok_or(LinkError::UnknownGraph(graph))?;
        let mut out = String::new();
        for node in &g.nodes {
            let line = match node {
                RecordedNode::Const { id, dims, data } => {
                    format!("node {id}: Const {dims:?} ({} bytes)", data.len())
                }
                RecordedNode::Op {
                    id,
                    op,
                    padding,
                    inputs,
                    outputs,
                } => {
                    let ins: Vec<String> = inputs
                        .iter()
                        .map(|i| format!("{}:{}", i.src_id, i.output_idx))
                        .collect();
                    let outs: Vec<String> = outputs
                        .iter()
                        .map(|o| format!("{:?}x{}", o.sizes(), o.elementsize))
                        .collect();
                    format!(
                        "node {id}: {op} pad={} in=[{}] out=[{}]",
                        padding.as_str(),
                        ins.join(", "),
                        outs.join(", ")
                    )
                }
            };
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    fn perf_info(&self, graph: GraphId) -> Result<Vec<PerfInfo>, LinkError> {
        let state = self.state.lock();
        let g = state.graphs.get(&graph).ok_or(LinkError::UnknownGraph(graph))?;
        let mut info: Vec<PerfInfo> = g.perf.values().copied().collect();
        info.sort_by_key(|p| p.node_id);
        Ok(info)
    }

    fn reset_perf_info(&self, graph: GraphId, _event: u32) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        let g = state
            .graphs
            .get_mut(&graph)
            .ok_or(LinkError::UnknownGraph(graph))?;
        g.perf.clear();
        Ok(())
    }

    fn last_execution_cycles(&self, graph: GraphId) -> Result<u64, LinkError> {
        let state = self.state.lock();
        let g = state.graphs.get(&graph).ok_or(LinkError::UnknownGraph(graph))?;
        Ok(g.last_cycles)
    }
}

// ── Evaluation ─────────────────────────────────────────────────────

mod eval {
    use super::RecordedNode;
    use crate::{LinkError, NodeId, NodeInput, OpCode, TensorDef};
    use std::collections::HashMap;

    #[derive(Debug, Clone)]
    struct Value {
        dims: [u32; 4],
        bytes: Vec<u8>,
    }

    impl Value {
        fn from_f32(dims: [u32; 4], values: &[f32]) -> Self {
            Self {
                dims,
                bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            }
        }

        fn scalar(v: f32) -> Self {
            Self::from_f32([1, 1, 1, 1], &[v])
        }

        fn floats(&self) -> Vec<f32> {
            self.bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }

        fn first_f32(&self) -> Result<f32, LinkError> {
            self.floats()
                .first()
                .copied()
                .ok_or_else(|| LinkError::Evaluation("empty scalar operand".into()))
        }
    }

    type Values = HashMap<(NodeId, u32), Value>;

    fn fetch<'a>(values: &'a Values, input: &NodeInput) -> Result<&'a Value, LinkError> {
        values.get(&(input.src_id, input.output_idx)).ok_or_else(|| {
            LinkError::Evaluation(format!(
                "node {} output {} has no value",
                input.src_id, input.output_idx
            ))
        })
    }

    fn arg<'a>(values: &'a Values, inputs: &[NodeInput], i: usize, op: OpCode) -> Result<&'a Value, LinkError> {
        let input = inputs
            .get(i)
            .ok_or_else(|| LinkError::Evaluation(format!("{op} is missing input {i}")))?;
        fetch(values, input)
    }

    fn broadcast(a: &Value, b: &Value, f: impl Fn(f32, f32) -> f32) -> Result<Value, LinkError> {
        let mut dims = [0u32; 4];
        for i in 0..4 {
            dims[i] = match (a.dims[i], b.dims[i]) {
                (x, y) if x == y => x,
                (1, y) => y,
                (x, 1) => x,
                (x, y) => {
                    return Err(LinkError::Evaluation(format!(
                        "cannot broadcast {x} against {y} on axis {i}"
                    )))
                }
            };
        }
        let (av, bv) = (a.floats(), b.floats());
        let index = |d: &[u32; 4], n: u32, h: u32, w: u32, c: u32| {
            let pick = |i: usize, v: u32| if d[i] == 1 { 0 } else { v as usize };
            ((pick(0, n) * d[1] as usize + pick(1, h)) * d[2] as usize + pick(2, w)) * d[3] as usize
                + pick(3, c)
        };
        let mut out = Vec::with_capacity(dims.iter().map(|&d| d as usize).product());
        for n in 0..dims[0] {
            for h in 0..dims[1] {
                for w in 0..dims[2] {
                    for c in 0..dims[3] {
                        let x = av.get(index(&a.dims, n, h, w, c)).copied().unwrap_or(0.0);
                        let y = bv.get(index(&b.dims, n, h, w, c)).copied().unwrap_or(0.0);
                        out.push(f(x, y));
                    }
                }
            }
        }
        Ok(Value::from_f32(dims, &out))
    }

    fn map(a: &Value, f: impl Fn(f32) -> f32) -> Value {
        let out: Vec<f32> = a.floats().into_iter().map(f).collect();
        Value::from_f32(a.dims, &out)
    }

    fn softmax(a: &Value, beta: f32) -> Value {
        let depth = a.dims[3].max(1) as usize;
        let mut out = a.floats();
        for row in out.chunks_mut(depth) {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut sum = 0.0;
            for v in row.iter_mut() {
                *v = ((*v - max) * beta).exp();
                sum += *v;
            }
            for v in row.iter_mut() {
                *v /= sum;
            }
        }
        Value::from_f32(a.dims, &out)
    }

    /// Evaluates `nodes` in order; returns the ids of the evaluated op nodes.
    pub(super) fn run(
        nodes: &[RecordedNode],
        inputs: &[TensorDef],
        outputs: &mut [TensorDef],
    ) -> Result<Vec<NodeId>, LinkError> {
        let mut values: Values = HashMap::new();
        let mut evaluated = Vec::new();

        for node in nodes {
            let (id, op, ins, outs) = match node {
                RecordedNode::Const { id, dims, data } => {
                    values.insert(
                        (*id, 0),
                        Value {
                            dims: *dims,
                            bytes: data.clone(),
                        },
                    );
                    continue;
                }
                RecordedNode::Op {
                    id,
                    op,
                    inputs,
                    outputs,
                    ..
                } => (*id, *op, inputs, outputs),
            };

            let results: Vec<Value> = match op {
                OpCode::Input => {
                    if inputs.len() < outs.len() {
                        return Err(LinkError::Evaluation(format!(
                            "graph has {} inputs, execution supplied {}",
                            outs.len(),
                            inputs.len()
                        )));
                    }
                    inputs[..outs.len()]
                        .iter()
                        .map(|t| {
                            let len = t.data_valid_len as usize;
                            let bytes = if len == 0 || t.data.is_null() {
                                Vec::new()
                            } else {
                                // SAFETY: the caller guarantees `data` is valid
                                // for `data_valid_len` bytes during execute.
                                unsafe { std::slice::from_raw_parts(t.data, len) }.to_vec()
                            };
                            Value {
                                dims: t.dims(),
                                bytes,
                            }
                        })
                        .collect()
                }
                OpCode::Output => {
                    if outputs.len() < ins.len() {
                        return Err(LinkError::Evaluation(format!(
                            "graph has {} outputs, execution supplied {}",
                            ins.len(),
                            outputs.len()
                        )));
                    }
                    for (i, input) in ins.iter().enumerate() {
                        let value = fetch(&values, input)?;
                        let target = &mut outputs[i];
                        if target.data.is_null() || (target.data_len as usize) < value.bytes.len() {
                            return Err(LinkError::Evaluation(format!(
                                "output {i} buffer holds {} bytes, result needs {}",
                                target.data_len,
                                value.bytes.len()
                            )));
                        }
                        // SAFETY: the caller guarantees `data` is valid for
                        // `data_len` bytes; length checked above.
                        unsafe {
                            std::ptr::copy_nonoverlapping(
                                value.bytes.as_ptr(),
                                target.data,
                                value.bytes.len(),
                            )
                        };
                        target.data_valid_len = value.bytes.len() as u32;
                        [target.batches, target.height, target.width, target.depth] = value.dims;
                    }
                    Vec::new()
                }
                OpCode::Nop => vec![arg(&values, ins, 0, op)?.clone()],
                OpCode::AddF | OpCode::BiasAddF => {
                    vec![broadcast(arg(&values, ins, 0, op)?, arg(&values, ins, 1, op)?, |x, y| x + y)?]
                }
                OpCode::MulF => {
                    vec![broadcast(arg(&values, ins, 0, op)?, arg(&values, ins, 1, op)?, |x, y| x * y)?]
                }
                OpCode::ReluF => vec![map(arg(&values, ins, 0, op)?, |x| x.max(0.0))],
                OpCode::ReluXF => {
                    let hi = arg(&values, ins, 1, op)?.first_f32()?;
                    vec![map(arg(&values, ins, 0, op)?, |x| x.clamp(0.0, hi))]
                }
                OpCode::ClampF => {
                    let lo = arg(&values, ins, 1, op)?.first_f32()?;
                    let hi = arg(&values, ins, 2, op)?.first_f32()?;
                    vec![map(arg(&values, ins, 0, op)?, |x| x.clamp(lo, hi))]
                }
                OpCode::SigmoidF => vec![map(arg(&values, ins, 0, op)?, |x| 1.0 / (1.0 + (-x).exp()))],
                OpCode::TanhF => vec![map(arg(&values, ins, 0, op)?, f32::tanh)],
                OpCode::SoftmaxF => {
                    let beta = arg(&values, ins, 1, op)?.first_f32()?;
                    vec![softmax(arg(&values, ins, 0, op)?, beta)]
                }
                OpCode::Reshape => {
                    let src = arg(&values, ins, 0, op)?;
                    let dims = outs.first().map_or(src.dims, |o| o.sizes());
                    vec![Value {
                        dims,
                        bytes: src.bytes.clone(),
                    }]
                }
                OpCode::Quantize => {
                    let src = arg(&values, ins, 0, op)?;
                    let lo = arg(&values, ins, 1, op)?.first_f32()?;
                    let hi = arg(&values, ins, 2, op)?.first_f32()?;
                    let step = (hi - lo) / 255.0;
                    let bytes = src
                        .floats()
                        .into_iter()
                        .map(|x| ((x - lo) / step).round().clamp(0.0, 255.0) as u8)
                        .collect();
                    vec![
                        Value {
                            dims: src.dims,
                            bytes,
                        },
                        Value::scalar(lo),
                        Value::scalar(hi),
                    ]
                }
                OpCode::Dequantize => {
                    let src = arg(&values, ins, 0, op)?;
                    let lo = arg(&values, ins, 1, op)?.first_f32()?;
                    let hi = arg(&values, ins, 2, op)?.first_f32()?;
                    let step = (hi - lo) / 255.0;
                    let out: Vec<f32> = src.bytes.iter().map(|&q| lo + f32::from(q) * step).collect();
                    vec![Value::from_f32(src.dims, &out)]
                }
                other => {
                    return Err(LinkError::Evaluation(format!(
                        "recording link cannot evaluate {other}"
                    )))
                }
            };

            for (i, value) in results.into_iter().enumerate() {
                values.insert((id, i as u32), value);
            }
            evaluated.push(id);
        }

        Ok(evaluated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_structural_rules() {
        let link = RecordingLink::new();
        let g = link.allocate_graph().unwrap();
        assert!(link.append_const_node(g, 0, [1, 1, 1, 1], &[0; 4]).is_err());
        link.append_const_node(g, 1, [1, 1, 1, 1], &[0; 4]).unwrap();
        assert!(link.append_const_node(g, 1, [1, 1, 1, 1], &[0; 4]).is_err());

        let out = [NodeOutput::new([1, 1, 1, 1], 4)];
        assert!(link
            .append_node(g, 2, OpCode::ReluF, PaddingMode::NotApplicable, &[NodeInput::new(9, 0)], &out)
            .is_err());
        assert!(link
            .append_node(g, 2, OpCode::ReluF, PaddingMode::NotApplicable, &[NodeInput::new(1, 1)], &out)
            .is_err());
        link.append_node(g, 2, OpCode::ReluF, PaddingMode::NotApplicable, &[NodeInput::new(1, 0)], &out)
            .unwrap();

        link.compile_graph(g).unwrap();
        assert!(link.append_const_node(g, 3, [1, 1, 1, 1], &[0; 4]).is_err());
        assert_eq!(link.op_codes(g), vec![OpCode::ReluF]);
        assert_eq!(link.const_count(g), 1);
    }

    #[test]
    fn test_failure_plan() {
        let link = RecordingLink::with_failures(FailurePlan {
            fail_append_at: Some(1),
            ..FailurePlan::default()
        });
        let g = link.allocate_graph().unwrap();
        link.append_const_node(g, 1, [1, 1, 1, 1], &[0; 4]).unwrap();
        assert!(matches!(
            link.append_const_node(g, 2, [1, 1, 1, 1], &[0; 4]),
            Err(LinkError::Call { code: -1, .. })
        ));
        link.set_failures(FailurePlan {
            fail_allocate: true,
            ..FailurePlan::default()
        });
        assert!(link.allocate_graph().is_err());
    }

    #[test]
    fn test_release_tracks_graphs() {
        let link = RecordingLink::new();
        let a = link.allocate_graph().unwrap();
        let b = link.allocate_graph().unwrap();
        link.release_graph(a).unwrap();
        assert_eq!(link.live_graphs(), vec![b]);
        assert_eq!(link.released_graphs(), vec![a]);
        assert!(link.release_graph(a).is_err());
    }

    #[test]
    fn test_evaluate_add_relu() {
        let link = RecordingLink::new();
        let g = link.allocate_graph().unwrap();
        let out4 = NodeOutput::new([1, 1, 1, 4], 4);
        link.append_node(g, 1, OpCode::Input, PaddingMode::NotApplicable, &[], &[out4, out4])
            .unwrap();
        link.append_node(
            g,
            2,
            OpCode::AddF,
            PaddingMode::NotApplicable,
            &[NodeInput::new(1, 0), NodeInput::new(1, 1)],
            &[out4],
        )
        .unwrap();
        link.append_node(g, 3, OpCode::ReluF, PaddingMode::NotApplicable, &[NodeInput::new(2, 0)], &[out4])
            .unwrap();
        link.append_node(g, 4, OpCode::Output, PaddingMode::NotApplicable, &[NodeInput::new(3, 0)], &[])
            .unwrap();
        link.compile_graph(g).unwrap();

        let mut a = f32_bytes(&[1.0, -2.0, 3.0, -4.0]);
        let mut b = f32_bytes(&[0.5, 0.5, 0.5, 0.5]);
        let mut out = vec![0u8; 16];
        let inputs = [
            TensorDef::new([1, 1, 1, 4], a.as_mut_ptr(), a.len()),
            TensorDef::new([1, 1, 1, 4], b.as_mut_ptr(), b.len()),
        ];
        let mut outputs = [TensorDef::new([1, 1, 1, 4], out.as_mut_ptr(), out.len())];
        link.execute(g, &inputs, &mut outputs).unwrap();

        assert_eq!(out, f32_bytes(&[1.5, 0.0, 3.5, 0.0]));
        assert_eq!(link.execution_count(g), 1);
        assert_eq!(link.last_execution_cycles(g).unwrap(), 4 * CYCLES_PER_NODE);
        assert_eq!(link.perf_info(g).unwrap().len(), 4);
        assert!(link.graph_dump(g).unwrap().contains("node 2: Add_f"));
    }

    #[test]
    fn test_clones_share_state() {
        let link = RecordingLink::new();
        let other = link.clone();
        let g = other.allocate_graph().unwrap();
        assert_eq!(link.live_graphs(), vec![g]);
    }

    #[test]
    fn test_execute_requires_compile() {
        let link = RecordingLink::new();
        let g = link.allocate_graph().unwrap();
        assert!(link.execute(g, &[], &mut []).is_err());
    }
}
