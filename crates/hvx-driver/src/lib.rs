// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # hvx-driver
//!
//! Lowers portable inference graphs onto the DSP neural-network graph
//! runtime.
//!
//! The driver takes:
//! - A validated `ModelDescription` from `nn-model`.
//! - An `AcceleratorLink` from `hexagon-link`.
//! - The `LoweringTables` mapping each supported (operation, representation)
//!   pair to its check and prepare functions.
//!
//! And produces a compiled accelerator graph that executes requests whose
//! buffers live in `memory-pools`.
//!
//! # Pipeline
//! ```text
//! ModelDescription<Validated>
//!     │  HvxModel::new        operand catalog, pools mapped
//!     ▼
//! HvxModel (Unallocated)
//!     │  prepare()            check tables, allocate, lower, compile
//!     ▼
//! HvxModel (Compiled)
//!     │  execute(request)     any number of times
//!     ▼
//!   ExecutionStats
//! ```
//!
//! Two numeric representations are lowered: 32-bit float and 8-bit
//! asymmetric quantized. Quantized tensors carry their real-valued range as
//! two extra one-element constants through every node.

mod binding;
pub mod builder;
pub mod catalog;
pub mod check;
mod config;
mod device;
pub mod dispatch;
mod emitter;
mod error;
mod execution;
pub mod fusion;
pub mod lower;
mod metrics;
pub mod params;

pub use binding::Binding;
pub use builder::{BuildState, HvxModel};
pub use catalog::{OperandCatalog, OperandInfo, ScalarValue};
pub use config::DriverConfig;
pub use device::{Capabilities, Device, DeviceStatus, PerformanceInfo, PreparedModel};
pub use dispatch::{CheckFn, LoweringTables, PrepareFn};
pub use emitter::NodeEmitter;
pub use error::LoweringError;
pub use metrics::{ExecutionStats, PrepareStats};
