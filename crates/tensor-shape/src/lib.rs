// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-shape
//!
//! Operand element types, shape descriptors and the sliding-window
//! arithmetic used when lowering portable model graphs to an accelerator.
//!
//! This crate provides:
//! - [`OperandType`] — numeric representation of a model operand.
//! - [`Shape`] — type, dimensions and quantization parameters.
//! - [`PaddingScheme`] / [`ExplicitPadding`] — padding forms and their
//!   reconciliation.
//! - [`infer`] — per-operation output-shape rules.
//!
//! Everything here is pure arithmetic: no allocation beyond the returned
//! shapes and no knowledge of the accelerator.

mod dtype;
mod error;
pub mod infer;
mod padding;
mod shape;

pub use dtype::OperandType;
pub use error::ShapeError;
pub use padding::{
    explicit_output_size, reconcile_padding, ExplicitPadding, Padding2d, PaddingScheme, Window2d,
};
pub use shape::{align_dims, Shape, MAX_RANK};
