// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime-loaded vendor controller via dlopen.
//!
//! The DSP graph runtime ships as a shared library exposing a fixed C call
//! surface. Loading it at run time keeps the driver buildable and testable
//! on hosts without the vendor stack.

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_uint, CString};

use libloading::Library;
use parking_lot::Mutex;

use crate::error::check_status;
use crate::{
    AcceleratorLink, GraphId, LinkError, NodeId, NodeInput, NodeOutput, OpCode, PaddingMode,
    PerfInfo, TensorDef,
};

/// Default name of the vendor controller library.
pub const DEFAULT_LIBRARY: &str = "libhexagon_nn_controller.so";

/// Upper bound on per-node perf entries fetched in one call.
const MAX_PERF_ENTRIES: usize = 4096;

/// Size of the buffers handed to the log and dump calls.
const TEXT_BUFFER_LEN: usize = 1 << 20;

// ---------------------------------------------------------------------------
// Function signatures
// ---------------------------------------------------------------------------

type FnConfig = unsafe extern "C" fn() -> c_int;
type FnInit = unsafe extern "C" fn(*mut GraphId) -> c_int;
type FnSetDebugLevel = unsafe extern "C" fn(GraphId, c_int) -> c_int;
type FnTextDump = unsafe extern "C" fn(GraphId, *mut u8, c_int) -> c_int;
type FnAppendNode = unsafe extern "C" fn(
    GraphId,
    NodeId,
    c_uint,       // operation id
    c_int,        // padding
    *const NodeInput,
    c_int,
    *const NodeOutput,
    c_int,
) -> c_int;
type FnAppendConstNode = unsafe extern "C" fn(
    GraphId,
    NodeId,
    c_uint, c_uint, c_uint, c_uint, // batches, height, width, depth
    *const u8,
    c_int,
) -> c_int;
type FnGraphCall = unsafe extern "C" fn(GraphId) -> c_int;
type FnExecuteNew = unsafe extern "C" fn(
    GraphId,
    *const TensorDef,
    c_uint,
    *mut TensorDef,
    c_uint,
) -> c_int;
type FnSetPowersaveLevel = unsafe extern "C" fn(c_uint) -> c_int;
type FnGetPerfInfo = unsafe extern "C" fn(GraphId, *mut PerfInfo, c_uint, *mut c_uint) -> c_int;
type FnResetPerfInfo = unsafe extern "C" fn(GraphId, c_uint) -> c_int;
type FnLastExecutionCycles = unsafe extern "C" fn(GraphId, *mut c_uint, *mut c_uint) -> c_int;
type FnVersion = unsafe extern "C" fn(*mut c_int) -> c_int;
type FnOpNameToId = unsafe extern "C" fn(*const c_char, *mut c_uint) -> c_int;

// ---------------------------------------------------------------------------
// Loaded API
// ---------------------------------------------------------------------------

struct ControllerApi {
    _lib: Library,
    config: FnConfig,
    init: FnInit,
    set_debug_level: FnSetDebugLevel,
    snpprint: FnTextDump,
    getlog: FnTextDump,
    append_node: FnAppendNode,
    append_const_node: FnAppendConstNode,
    prepare: FnGraphCall,
    execute_new: FnExecuteNew,
    teardown: FnGraphCall,
    set_powersave_level: FnSetPowersaveLevel,
    get_perfinfo: FnGetPerfInfo,
    reset_perfinfo: FnResetPerfInfo,
    last_execution_cycles: FnLastExecutionCycles,
    version: FnVersion,
    op_name_to_id: FnOpNameToId,
}

macro_rules! symbol {
    ($lib:expr, $ty:ty, $name:literal) => {
        *$lib
            .get::<$ty>(concat!($name, "\0").as_bytes())
            .map_err(|e| LinkError::MissingSymbol {
                symbol: $name,
                detail: e.to_string(),
            })?
    };
}

impl ControllerApi {
    fn load(path: &str) -> Result<Self, LinkError> {
        // SAFETY: loading a library runs its initialisers; the controller
        // library has none with preconditions.
        let lib = unsafe { Library::new(path) }
            .map_err(|e| LinkError::Unavailable(format!("{path}: {e}")))?;
        // SAFETY: the signatures above match the controller's exported C
        // prototypes; the pointers stay valid while `_lib` is held.
        unsafe {
            Ok(ControllerApi {
                config: symbol!(lib, FnConfig, "hexagon_nn_config"),
                init: symbol!(lib, FnInit, "hexagon_nn_init"),
                set_debug_level: symbol!(lib, FnSetDebugLevel, "hexagon_nn_set_debug_level"),
                snpprint: symbol!(lib, FnTextDump, "hexagon_nn_snpprint"),
                getlog: symbol!(lib, FnTextDump, "hexagon_nn_getlog"),
                append_node: symbol!(lib, FnAppendNode, "hexagon_nn_append_node"),
                append_const_node: symbol!(lib, FnAppendConstNode, "hexagon_nn_append_const_node"),
                prepare: symbol!(lib, FnGraphCall, "hexagon_nn_prepare"),
                execute_new: symbol!(lib, FnExecuteNew, "hexagon_nn_execute_new"),
                teardown: symbol!(lib, FnGraphCall, "hexagon_nn_teardown"),
                set_powersave_level: symbol!(lib, FnSetPowersaveLevel, "hexagon_nn_set_powersave_level"),
                get_perfinfo: symbol!(lib, FnGetPerfInfo, "hexagon_nn_get_perfinfo"),
                reset_perfinfo: symbol!(lib, FnResetPerfInfo, "hexagon_nn_reset_perfinfo"),
                last_execution_cycles: symbol!(lib, FnLastExecutionCycles, "hexagon_nn_last_execution_cycles"),
                version: symbol!(lib, FnVersion, "hexagon_nn_version"),
                op_name_to_id: symbol!(lib, FnOpNameToId, "hexagon_nn_op_name_to_id"),
                _lib: lib,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// DynamicLink
// ---------------------------------------------------------------------------

/// [`AcceleratorLink`] backed by the vendor controller library.
pub struct DynamicLink {
    api: ControllerApi,
    path: String,
    op_ids: Mutex<HashMap<OpCode, c_uint>>,
}

// SAFETY: the controller serialises calls internally; the function pointers
// are process-global.
unsafe impl Send for DynamicLink {}
unsafe impl Sync for DynamicLink {}

impl DynamicLink {
    /// Loads the controller from `path` (a file name or absolute path).
    pub fn load(path: &str) -> Result<Self, LinkError> {
        let api = ControllerApi::load(path)?;
        tracing::info!("loaded accelerator controller from {path}");
        Ok(Self {
            api,
            path: path.to_string(),
            op_ids: Mutex::new(HashMap::new()),
        })
    }

    /// Path the controller was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolves (and caches) the runtime id of an op.
    fn op_id(&self, op: OpCode) -> Result<c_uint, LinkError> {
        let mut ids = self.op_ids.lock();
        if let Some(&id) = ids.get(&op) {
            return Ok(id);
        }
        let name = CString::new(op.name()).map_err(|_| LinkError::UnknownOp(op.name()))?;
        let mut id: c_uint = 0;
        // SAFETY: `name` is NUL-terminated and `id` is a valid out-pointer.
        let code = unsafe { (self.api.op_name_to_id)(name.as_ptr(), &mut id) };
        if code != 0 {
            return Err(LinkError::UnknownOp(op.name()));
        }
        ids.insert(op, id);
        Ok(id)
    }

    fn text_call(&self, f: FnTextDump, graph: GraphId, call: &'static str) -> Result<String, LinkError> {
        let mut buf = vec![0u8; TEXT_BUFFER_LEN];
        // SAFETY: the buffer length passed matches the allocation.
        let code = unsafe { f(graph, buf.as_mut_ptr(), buf.len() as c_int) };
        check_status(code, call)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }
}

impl AcceleratorLink for DynamicLink {
    fn version(&self) -> Result<i32, LinkError> {
        let mut version: c_int = -1;
        // SAFETY: valid out-pointer.
        check_status(unsafe { (self.api.version)(&mut version) }, "hexagon_nn_version")?;
        Ok(version)
    }

    fn config(&self) -> Result<(), LinkError> {
        // SAFETY: no arguments.
        check_status(unsafe { (self.api.config)() }, "hexagon_nn_config")
    }

    fn allocate_graph(&self) -> Result<GraphId, LinkError> {
        let mut graph: GraphId = 0;
        // SAFETY: valid out-pointer.
        check_status(unsafe { (self.api.init)(&mut graph) }, "hexagon_nn_init")?;
        Ok(graph)
    }

    fn append_const_node(
        &self,
        graph: GraphId,
        node: NodeId,
        dims: [u32; 4],
        data: &[u8],
    ) -> Result<(), LinkError> {
        // SAFETY: `data` is valid for `data.len()` bytes; the runtime copies it.
        let code = unsafe {
            (self.api.append_const_node)(
                graph,
                node,
                dims[0],
                dims[1],
                dims[2],
                dims[3],
                data.as_ptr(),
                data.len() as c_int,
            )
        };
        check_status(code, "hexagon_nn_append_const_node")
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
        let op_id = self.op_id(op)?;
        // SAFETY: both slices are `#[repr(C)]` and valid for their lengths.
        let code = unsafe {
            (self.api.append_node)(
                graph,
                node,
                op_id,
                padding as c_int,
                inputs.as_ptr(),
                inputs.len() as c_int,
                outputs.as_ptr(),
                outputs.len() as c_int,
            )
        };
        check_status(code, "hexagon_nn_append_node")
    }

    fn compile_graph(&self, graph: GraphId) -> Result<(), LinkError> {
        // SAFETY: plain value argument.
        check_status(unsafe { (self.api.prepare)(graph) }, "hexagon_nn_prepare")
    }

    fn execute(
        &self,
        graph: GraphId,
        inputs: &[TensorDef],
        outputs: &mut [TensorDef],
    ) -> Result<(), LinkError> {
        // SAFETY: tensor data pointers are owned by mapped pools that outlive
        // this call.
        let code = unsafe {
            (self.api.execute_new)(
                graph,
                inputs.as_ptr(),
                inputs.len() as c_uint,
                outputs.as_mut_ptr(),
                outputs.len() as c_uint,
            )
        };
        check_status(code, "hexagon_nn_execute_new")
    }

    fn release_graph(&self, graph: GraphId) -> Result<(), LinkError> {
        // SAFETY: plain value argument.
        check_status(unsafe { (self.api.teardown)(graph) }, "hexagon_nn_teardown")
    }

    fn set_debug_level(&self, graph: GraphId, level: i32) -> Result<(), LinkError> {
        // SAFETY: plain value arguments.
        check_status(
            unsafe { (self.api.set_debug_level)(graph, level) },
            "hexagon_nn_set_debug_level",
        )
    }

    fn set_powersave_level(&self, level: u32) -> Result<(), LinkError> {
        // SAFETY: plain value argument.
        check_status(
            unsafe { (self.api.set_powersave_level)(level) },
            "hexagon_nn_set_powersave_level",
        )
    }

    fn graph_log(&self, graph: GraphId) -> Result<String, LinkError> {
        self.text_call(self.api.getlog, graph, "hexagon_nn_getlog")
    }

    fn graph_dump(&self, graph: GraphId) -> Result<String, LinkError> {
        self.text_call(self.api.snpprint, graph, "hexagon_nn_snpprint")
    }

    fn perf_info(&self, graph: GraphId) -> Result<Vec<PerfInfo>, LinkError> {
        let mut entries = vec![PerfInfo::default(); MAX_PERF_ENTRIES];
        let mut count: c_uint = 0;
        // SAFETY: the buffer length passed matches the allocation.
        let code = unsafe {
            (self.api.get_perfinfo)(graph, entries.as_mut_ptr(), entries.len() as c_uint, &mut count)
        };
        check_status(code, "hexagon_nn_get_perfinfo")?;
        entries.truncate((count as usize).min(MAX_PERF_ENTRIES));
        Ok(entries)
    }

    fn reset_perf_info(&self, graph: GraphId, event: u32) -> Result<(), LinkError> {
        // SAFETY: plain value arguments.
        check_status(
            unsafe { (self.api.reset_perfinfo)(graph, event) },
            "hexagon_nn_reset_perfinfo",
        )
    }

    fn last_execution_cycles(&self, graph: GraphId) -> Result<u64, LinkError> {
        let (mut lo, mut hi): (c_uint, c_uint) = (0, 0);
        // SAFETY: valid out-pointers.
        let code = unsafe { (self.api.last_execution_cycles)(graph, &mut lo, &mut hi) };
        check_status(code, "hexagon_nn_last_execution_cycles")?;
        Ok((u64::from(hi) << 32) | u64::from(lo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_unavailable() {
        let err = DynamicLink::load("libdefinitely_not_a_controller.so")
            .err()
            .unwrap();
        assert!(matches!(err, LinkError::Unavailable(_)));
    }
}
