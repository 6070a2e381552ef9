// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # nn-model
//!
//! A portable, vendor-neutral description of a neural-network inference
//! graph, plus the execution requests that run it.
//!
//! - [`Operand`] — a typed tensor or scalar with a [`OperandLifetime`].
//! - [`Operation`] — an [`OperationKind`] with ordered operand indices.
//! - [`ModelDescription`] — the full model, with a **type-state pattern**
//!   (`Loaded` → `Validated`).
//! - [`Request`] — per-execution input/output locations and pools.
//! - [`ModelLoader`] / [`ModelManifest`] — JSON manifests on disk.
//!
//! # Example
//! ```no_run
//! use nn_model::ModelLoader;
//! use std::path::Path;
//!
//! let model = ModelLoader::load(Path::new("./models/add_relu")).unwrap();
//! println!("{}", model.summary());
//! for operation in model.iter_operations() {
//!     println!("  {}", operation.summary());
//! }
//! ```

mod error;
pub mod graph;
mod loader;
pub mod manifest;
mod operand;
mod operation;
mod request;

pub use error::ModelError;
pub use graph::{Loaded, ModelDescription, Validated};
pub use loader::ModelLoader;
pub use manifest::ModelManifest;
pub use operand::{DataLocation, Operand, OperandLifetime};
pub use operation::{FusedActivation, Operation, OperationKind};
pub use request::{Request, RequestArgument};
