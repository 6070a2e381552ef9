// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # hexagon-link
//!
//! Call surface of the DSP neural-network graph runtime.
//!
//! A graph is built by allocating it, appending constant and operation
//! nodes under caller-chosen ids, compiling it once and executing it any
//! number of times. [`AcceleratorLink`] is that surface; it has two
//! implementations:
//!
//! - [`DynamicLink`]: the vendor controller library, loaded at run time.
//! - [`RecordingLink`]: an in-process link that records every node,
//!   injects failures on request and evaluates simple float graphs.
//!
//! [`Controller`] is the process-wide owner of the active link and handles
//! version probing and resets.

mod controller;
mod error;
mod ffi;
mod link;
mod ops;
pub mod recording;
mod types;

pub use controller::{Controller, EXPECTED_VERSION};
pub use error::{check_status, LinkError};
pub use ffi::{DynamicLink, DEFAULT_LIBRARY};
pub use link::AcceleratorLink;
pub use ops::OpCode;
pub use recording::{FailurePlan, RecordedNode, RecordingLink};
pub use types::{
    GraphId, NodeId, NodeInput, NodeOutput, PaddingMode, PerfInfo, TensorDef, MAX_OUTPUT_RANK,
};
