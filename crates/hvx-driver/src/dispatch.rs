// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowering dispatch tables.
//!
//! [`LoweringTables`] maps an `(operation kind, operand type)` pair to a
//! check function and a prepare function. The operand type is always the
//! type of the operation's first input. A pair with no entry is unsupported.
//!
//! The tables are built once and shared between every model a device
//! prepares:
//!
//! ```text
//! let tables = Arc::new(LoweringTables::standard());
//! let model = HvxModel::new(&description, link, tables.clone(), &config)?;
//! ```

use std::collections::HashMap;

use nn_model::{Operation, OperationKind};
use tensor_shape::OperandType;

use crate::catalog::OperandCatalog;
use crate::lower::{float32, quant8};
use crate::{check, LoweringError};

/// Validates an operation and records its inferred output shape.
pub type CheckFn = fn(&mut OperandCatalog, &Operation) -> Result<(), LoweringError>;

/// Appends the accelerator nodes of an operation and binds its outputs.
pub type PrepareFn = fn(&mut OperandCatalog, &Operation) -> Result<(), LoweringError>;

type Key = (OperationKind, OperandType);

/// Check and prepare registries keyed by operation kind and representation.
#[derive(Clone, Default)]
pub struct LoweringTables {
    check: HashMap<Key, CheckFn>,
    prepare: HashMap<Key, PrepareFn>,
}

impl std::fmt::Debug for LoweringTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.prepare.keys().collect();
        keys.sort_by_key(|(kind, ty)| (kind.as_str(), ty.as_str()));
        f.debug_struct("LoweringTables").field("entries", &keys).finish()
    }
}

impl LoweringTables {
    /// Tables with no entries. Every operation is unsupported.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full set of lowerings the accelerator supports.
    pub fn standard() -> Self {
        use OperandType::{TensorFloat32 as F32, TensorQuant8Asymm as Q8};
        use OperationKind as K;

        let mut t = Self::empty();

        t.register(K::Add, F32, check::elementwise, float32::add);
        t.register(K::Mul, F32, check::elementwise, float32::mul);
        t.register(K::AveragePool2d, F32, check::pool, float32::average_pool);
        t.register(K::MaxPool2d, F32, check::pool, float32::max_pool);
        t.register(K::L2Pool2d, F32, check::pool, float32::l2_pool);
        t.register(K::Conv2d, F32, check::conv2d, float32::conv2d);
        t.register(K::DepthwiseConv2d, F32, check::depthwise_conv2d, float32::depthwise_conv2d);
        t.register(K::FullyConnected, F32, check::fully_connected, float32::fully_connected);
        t.register(K::Concatenation, F32, check::concatenation, float32::concatenation);
        t.register(
            K::LocalResponseNormalization,
            F32,
            check::local_response_normalization,
            float32::local_response_normalization,
        );
        t.register(K::Logistic, F32, check::unary, float32::logistic);
        t.register(K::Tanh, F32, check::unary, float32::tanh);
        t.register(K::Relu, F32, check::unary, float32::relu);
        t.register(K::Relu1, F32, check::unary, float32::relu1);
        t.register(K::Relu6, F32, check::unary, float32::relu6);
        t.register(K::Reshape, F32, check::reshape, float32::reshape);
        t.register(K::ResizeBilinear, F32, check::resize_bilinear, float32::resize_bilinear);
        t.register(K::Softmax, F32, check::softmax, float32::softmax);

        t.register(K::Add, Q8, check::elementwise, quant8::add);
        t.register(K::Mul, Q8, check::elementwise, quant8::mul);
        t.register(K::AveragePool2d, Q8, check::pool, quant8::average_pool);
        t.register(K::MaxPool2d, Q8, check::pool, quant8::max_pool);
        t.register(K::Conv2d, Q8, check::conv2d, quant8::conv2d);
        t.register(K::DepthwiseConv2d, Q8, check::depthwise_conv2d, quant8::depthwise_conv2d);
        t.register(K::FullyConnected, Q8, check::fully_connected, quant8::fully_connected);
        t.register(K::Concatenation, Q8, check::concatenation, quant8::concatenation);
        t.register(K::Logistic, Q8, check::unary, quant8::logistic);
        t.register(K::Relu, Q8, check::unary, quant8::relu);
        t.register(K::Relu1, Q8, check::unary, quant8::relu1);
        t.register(K::Relu6, Q8, check::unary, quant8::relu6);
        t.register(K::Reshape, Q8, check::reshape, quant8::reshape);
        t.register(K::Softmax, Q8, check::softmax, quant8::softmax);
        t.register(K::Dequantize, Q8, check::dequantize, quant8::dequantize);

        t
    }

    /// Adds or replaces the entry for `(kind, ty)`.
    pub fn register(
        &mut self,
        kind: OperationKind,
        ty: OperandType,
        check: CheckFn,
        prepare: PrepareFn,
    ) {
        self.check.insert((kind, ty), check);
        self.prepare.insert((kind, ty), prepare);
    }

    pub fn check_fn(&self, kind: OperationKind, ty: OperandType) -> Option<CheckFn> {
        self.check.get(&(kind, ty)).copied()
    }

    pub fn prepare_fn(&self, kind: OperationKind, ty: OperandType) -> Option<PrepareFn> {
        self.prepare.get(&(kind, ty)).copied()
    }

    /// Whether both a check and a prepare entry exist for the pair.
    pub fn supports(&self, kind: OperationKind, ty: OperandType) -> bool {
        self.check.contains_key(&(kind, ty)) && self.prepare.contains_key(&(kind, ty))
    }

    /// Number of supported pairs.
    pub fn len(&self) -> usize {
        self.prepare.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prepare.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_size() {
        let tables = LoweringTables::standard();
        assert_eq!(tables.len(), 33);
        assert!(LoweringTables::empty().is_empty());
    }

    #[test]
    fn test_float_only_entries() {
        let tables = LoweringTables::standard();
        for kind in [
            OperationKind::L2Pool2d,
            OperationKind::LocalResponseNormalization,
            OperationKind::Tanh,
            OperationKind::ResizeBilinear,
        ] {
            assert!(tables.supports(kind, OperandType::TensorFloat32), "{kind}");
            assert!(!tables.supports(kind, OperandType::TensorQuant8Asymm), "{kind}");
        }
        assert!(!tables.supports(OperationKind::Dequantize, OperandType::TensorFloat32));
        assert!(tables.supports(OperationKind::Dequantize, OperandType::TensorQuant8Asymm));
    }

    #[test]
    fn test_unlisted_kinds_unsupported() {
        let tables = LoweringTables::standard();
        for kind in [OperationKind::Lstm, OperationKind::Svdf, OperationKind::Floor] {
            assert!(!tables.supports(kind, OperandType::TensorFloat32));
            assert!(tables.check_fn(kind, OperandType::TensorFloat32).is_none());
        }
    }

    #[test]
    fn test_register_custom_entry() {
        let mut tables = LoweringTables::empty();
        tables.register(OperationKind::Floor, OperandType::TensorFloat32, check::unary, float32::relu);
        assert!(tables.supports(OperationKind::Floor, OperandType::TensorFloat32));
        assert_eq!(tables.len(), 1);
    }
}
