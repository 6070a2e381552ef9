// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Plain data exchanged with the accelerator runtime.
//!
//! The `#[repr(C)]` structs match the runtime's C layout byte for byte and
//! are passed to it by pointer.

/// Identifier of an accelerator graph; zero is never valid.
pub type GraphId = u32;

/// Identifier of a node inside a graph; zero is never valid.
pub type NodeId = u32;

/// Reference to one output of an already appended node.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeInput {
    pub src_id: NodeId,
    pub output_idx: u32,
}

impl NodeInput {
    pub fn new(src_id: NodeId, output_idx: u32) -> Self {
        Self { src_id, output_idx }
    }
}

/// Maximum rank of a node output descriptor.
pub const MAX_OUTPUT_RANK: usize = 8;

/// Declared shape and element size of one node output.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeOutput {
    pub rank: u32,
    pub max_sizes: [u32; MAX_OUTPUT_RANK],
    pub elementsize: u32,
    pub zero_offset: i32,
    pub stepsize: f32,
}

impl NodeOutput {
    /// A rank-4 output with the given maximum sizes.
    pub fn new(sizes: [u32; 4], elementsize: u32) -> Self {
        let mut max_sizes = [0u32; MAX_OUTPUT_RANK];
        max_sizes[..4].copy_from_slice(&sizes);
        Self {
            rank: 4,
            max_sizes,
            elementsize,
            zero_offset: 0,
            stepsize: 0.0,
        }
    }

    /// The four leading sizes, `[batches, height, width, depth]`.
    pub fn sizes(&self) -> [u32; 4] {
        [
            self.max_sizes[0],
            self.max_sizes[1],
            self.max_sizes[2],
            self.max_sizes[3],
        ]
    }

    /// Maximum byte length of the output.
    pub fn max_bytes(&self) -> usize {
        self.sizes().iter().map(|&d| d as usize).product::<usize>() * self.elementsize as usize
    }
}

/// A tensor handed to or returned from an execution.
///
/// `data` points into caller-owned memory that must stay valid for the
/// duration of the execute call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TensorDef {
    pub batches: u32,
    pub height: u32,
    pub width: u32,
    pub depth: u32,
    pub data: *mut u8,
    pub data_len: i32,
    pub data_valid_len: u32,
    pub unused: u32,
}

impl TensorDef {
    /// Describes `data_len` bytes at `data` with the given rank-4 shape.
    pub fn new(dims: [u32; 4], data: *mut u8, data_len: usize) -> Self {
        Self {
            batches: dims[0],
            height: dims[1],
            width: dims[2],
            depth: dims[3],
            data,
            data_len: data_len as i32,
            data_valid_len: data_len as u32,
            unused: 0,
        }
    }

    pub fn dims(&self) -> [u32; 4] {
        [self.batches, self.height, self.width, self.depth]
    }
}

/// Padding mode attached to every appended node.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    NotApplicable = 0,
    Same = 1,
    Valid = 2,
    MirrorReflect = 3,
    MirrorSymmetric = 4,
    SameCaffe = 5,
}

impl PaddingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotApplicable => "NA",
            Self::Same => "SAME",
            Self::Valid => "VALID",
            Self::MirrorReflect => "MIRROR_REFLECT",
            Self::MirrorSymmetric => "MIRROR_SYMMETRIC",
            Self::SameCaffe => "SAME_CAFFE",
        }
    }
}

/// Per-node performance counters reported after an execution.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PerfInfo {
    pub node_id: NodeId,
    pub executions: u32,
    pub counter_lo: u32,
    pub counter_hi: u32,
}

impl PerfInfo {
    /// Combined 64-bit counter.
    pub fn counter(&self) -> u64 {
        (u64::from(self.counter_hi) << 32) | u64::from(self.counter_lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_layout_sizes() {
        assert_eq!(std::mem::size_of::<NodeInput>(), 8);
        assert_eq!(std::mem::size_of::<NodeOutput>(), 4 * (1 + 8 + 1 + 1 + 1));
    }

    #[test]
    fn test_node_output() {
        let out = NodeOutput::new([1, 4, 4, 3], 4);
        assert_eq!(out.rank, 4);
        assert_eq!(out.sizes(), [1, 4, 4, 3]);
        assert_eq!(out.max_bytes(), 192);
        assert_eq!(out.max_sizes[4..], [0; 4]);
    }

    #[test]
    fn test_perf_counter() {
        let info = PerfInfo {
            node_id: 3,
            executions: 1,
            counter_lo: 5,
            counter_hi: 1,
        };
        assert_eq!(info.counter(), (1u64 << 32) + 5);
    }
}
