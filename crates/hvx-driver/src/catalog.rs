// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The operand table of a model being lowered.
//!
//! [`OperandCatalog`] knows every operand's shape, lifetime and constant
//! bytes, and turns operands into accelerator tensors on demand:
//!
//! - Constants become constant nodes the first time they are used; later
//!   uses get the same handle.
//! - Quantized operands get memoized one-element `min` / `max` constants
//!   describing their real-valued range.
//! - Filters and weights are rearranged into the accelerator's layouts.
//!
//! Non-constant operands are bound by whichever node produces them.

use std::sync::Arc;

use hexagon_link::{AcceleratorLink, NodeInput, OpCode, PaddingMode};
use memory_pools::{map_pools, MappedPool};
use nn_model::{DataLocation, FusedActivation, ModelDescription, OperandLifetime, Validated};
use tensor_shape::{align_dims, OperandType, PaddingScheme, Shape};

use crate::binding::Binding;
use crate::emitter::NodeEmitter;
use crate::LoweringError;

// ── Scalars ────────────────────────────────────────────────────────

/// A 4-byte little-endian value stored in constants.
pub trait ScalarValue: Copy + std::fmt::Debug {
    const TYPE_NAME: &'static str;
    fn from_le(bytes: [u8; 4]) -> Self;
    fn to_le(self) -> [u8; 4];
}

macro_rules! scalar_value {
    ($($t:ty => $name:literal),*) => {
        $(impl ScalarValue for $t {
            const TYPE_NAME: &'static str = $name;
            fn from_le(bytes: [u8; 4]) -> Self {
                <$t>::from_le_bytes(bytes)
            }
            fn to_le(self) -> [u8; 4] {
                self.to_le_bytes()
            }
        })*
    };
}

scalar_value!(i32 => "int32", u32 => "uint32", f32 => "float32");

// ── Operand info ───────────────────────────────────────────────────

/// One operand of the model plus its accelerator handles.
#[derive(Debug, Clone)]
pub struct OperandInfo {
    pub shape: Shape,
    pub lifetime: OperandLifetime,
    pub location: DataLocation,
    tensor: Binding,
    tensor_min: Binding,
    tensor_max: Binding,
}

impl OperandInfo {
    pub fn is_constant(&self) -> bool {
        self.lifetime.is_constant()
    }

    /// The bound accelerator tensor, if any.
    pub fn tensor(&self) -> Option<NodeInput> {
        self.tensor.get()
    }

    fn clear(&mut self) {
        self.tensor.clear();
        self.tensor_min.clear();
        self.tensor_max.clear();
    }
}

/// Resolves a constant operand's bytes.
fn constant_bytes<'a>(
    values: &'a [u8],
    pools: &'a [MappedPool],
    index: u32,
    info: &OperandInfo,
) -> Result<&'a [u8], LoweringError> {
    let DataLocation {
        pool_index,
        offset,
        length,
    } = info.location;
    let (offset, length) = (offset as usize, length as usize);
    match info.lifetime {
        OperandLifetime::ConstantCopy => offset
            .checked_add(length)
            .and_then(|end| values.get(offset..end))
            .ok_or_else(|| {
                LoweringError::Validation(format!(
                    "operand {index}: inline range {offset}+{length} exceeds {} bytes",
                    values.len()
                ))
            }),
        OperandLifetime::ConstantReference => {
            let pool = memory_pools::pool_at(pools, pool_index as usize)?;
            Ok(pool.slice(offset, length)?)
        }
        other => Err(LoweringError::Validation(format!(
            "operand {index} is {other}, not a constant"
        ))),
    }
}

/// Rearranges a row-major `[rows, cols]` matrix of `elem`-byte elements
/// into `[cols, rows]`.
fn transpose(data: &[u8], elem: usize, rows: usize, cols: usize) -> Result<Vec<u8>, LoweringError> {
    if data.len() != rows * cols * elem {
        return Err(LoweringError::Validation(format!(
            "cannot transpose {} bytes as {rows}x{cols} elements of {elem} bytes",
            data.len()
        )));
    }
    let mut out = vec![0u8; data.len()];
    for r in 0..rows {
        for c in 0..cols {
            let src = (r * cols + c) * elem;
            let dst = (c * rows + r) * elem;
            out[dst..dst + elem].copy_from_slice(&data[src..src + elem]);
        }
    }
    Ok(out)
}

/// Accelerator padding mode of an implicit scheme.
pub fn scheme_mode(scheme: PaddingScheme) -> PaddingMode {
    match scheme {
        PaddingScheme::Same => PaddingMode::Same,
        PaddingScheme::Valid => PaddingMode::Valid,
    }
}

/// Float node applying `activation`, `None` for no activation.
pub fn float_activation_op(activation: FusedActivation) -> Option<OpCode> {
    match activation {
        FusedActivation::None => None,
        FusedActivation::Relu => Some(OpCode::ReluF),
        FusedActivation::Relu1 => Some(OpCode::ClampF),
        FusedActivation::Relu6 => Some(OpCode::ReluXF),
    }
}

/// Quantized counterpart of [`float_activation_op`].
pub fn quantized_activation_op(activation: FusedActivation) -> Option<OpCode> {
    match activation {
        FusedActivation::None => None,
        FusedActivation::Relu => Some(OpCode::QuantizedRelu8),
        FusedActivation::Relu1 => Some(OpCode::QuantizedClamp8),
        FusedActivation::Relu6 => Some(OpCode::QuantizedReluX8),
    }
}

/// `(q - zero_point) * scale`, widened so int32 extremes cannot overflow.
fn real_value(shape: &Shape, q: i64) -> f32 {
    (q - shape.zero_point as i64) as f32 * shape.scale
}

// ── Catalog ────────────────────────────────────────────────────────

/// Operand table and node emitter of one model.
#[derive(Debug)]
pub struct OperandCatalog {
    operands: Vec<OperandInfo>,
    values: Vec<u8>,
    pools: Vec<MappedPool>,
    emitter: NodeEmitter,
}

impl OperandCatalog {
    /// Builds the table from a validated model and maps its pools.
    pub fn new(
        model: &ModelDescription<Validated>,
        link: Arc<dyn AcceleratorLink>,
    ) -> Result<Self, LoweringError> {
        let pools = map_pools(&model.pools)?;
        let operands = model
            .operands
            .iter()
            .map(|o| OperandInfo {
                shape: o.shape(),
                lifetime: o.lifetime,
                location: o.location,
                tensor: Binding::Unbound,
                tensor_min: Binding::Unbound,
                tensor_max: Binding::Unbound,
            })
            .collect();
        Ok(Self {
            operands,
            values: model.operand_values.clone(),
            pools,
            emitter: NodeEmitter::new(link),
        })
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    pub fn emitter(&self) -> &NodeEmitter {
        &self.emitter
    }

    pub fn emitter_mut(&mut self) -> &mut NodeEmitter {
        &mut self.emitter
    }

    pub fn operand(&self, index: u32) -> Result<&OperandInfo, LoweringError> {
        self.operands
            .get(index as usize)
            .ok_or(LoweringError::OperandOutOfRange {
                index,
                count: self.operands.len(),
            })
    }

    fn operand_mut(&mut self, index: u32) -> Result<&mut OperandInfo, LoweringError> {
        let count = self.operands.len();
        self.operands
            .get_mut(index as usize)
            .ok_or(LoweringError::OperandOutOfRange { index, count })
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperandInfo> {
        self.operands.iter()
    }

    // ── Shapes ─────────────────────────────────────────────────────

    pub fn shape(&self, index: u32) -> Result<Shape, LoweringError> {
        Ok(self.operand(index)?.shape.clone())
    }

    /// Replaces an operand's dimensions; type and quantization are kept.
    pub fn set_shape(&mut self, index: u32, shape: &Shape) -> Result<(), LoweringError> {
        let info = self.operand_mut(index)?;
        if info.tensor.is_bound() {
            return Err(LoweringError::AlreadyBound(index));
        }
        if info.shape.dims != shape.dims {
            tracing::debug!("operand {index}: {:?} -> {:?}", info.shape.dims, shape.dims);
            info.shape.dims = shape.dims.clone();
        }
        Ok(())
    }

    pub fn is_constant(&self, index: u32) -> Result<bool, LoweringError> {
        Ok(self.operand(index)?.is_constant())
    }

    // ── Constant values ────────────────────────────────────────────

    /// Raw bytes of a constant operand.
    pub fn bytes(&self, index: u32) -> Result<&[u8], LoweringError> {
        constant_bytes(&self.values, &self.pools, index, self.operand(index)?)
    }

    /// Decodes a constant scalar.
    pub fn scalar<T: ScalarValue>(&self, index: u32) -> Result<T, LoweringError> {
        let bytes = self.bytes(index)?;
        let word: [u8; 4] = bytes
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                LoweringError::Validation(format!(
                    "operand {index}: {} bytes is too short for a {} scalar",
                    bytes.len(),
                    T::TYPE_NAME
                ))
            })?;
        Ok(T::from_le(word))
    }

    /// Decodes every element of a constant 4-byte tensor.
    pub fn values<T: ScalarValue>(&self, index: u32) -> Result<Vec<T>, LoweringError> {
        let bytes = self.bytes(index)?;
        if bytes.len() % 4 != 0 {
            return Err(LoweringError::Validation(format!(
                "operand {index}: {} bytes is not a whole number of {} values",
                bytes.len(),
                T::TYPE_NAME
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|c| T::from_le([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    // ── Accelerator tensors ────────────────────────────────────────

    /// The operand's accelerator tensor.
    ///
    /// Constants are emitted on first use, with dimensions aligned to rank
    /// four. Any other operand must already be bound by its producer.
    pub fn tensor(&mut self, index: u32) -> Result<NodeInput, LoweringError> {
        let info = self
            .operands
            .get(index as usize)
            .ok_or(LoweringError::OperandOutOfRange {
                index,
                count: self.operands.len(),
            })?;
        if let Some(handle) = info.tensor.get() {
            return Ok(handle);
        }
        if !info.is_constant() {
            return Err(LoweringError::NotBound(index));
        }
        let data = constant_bytes(&self.values, &self.pools, index, info)?;
        let dims = align_dims(&info.shape.dims)?;
        let handle = self.emitter.constant(dims, data)?;
        self.bind(index, handle)?;
        Ok(handle)
    }

    /// Binds an operand to the accelerator tensor that produces it.
    pub fn bind(&mut self, index: u32, handle: NodeInput) -> Result<(), LoweringError> {
        self.operand_mut(index)?
            .tensor
            .bind_once(handle)
            .map_err(|_| LoweringError::AlreadyBound(index))
    }

    pub fn is_bound(&self, index: u32) -> Result<bool, LoweringError> {
        Ok(self.operand(index)?.tensor.is_bound())
    }

    /// Forgets every accelerator handle.
    pub fn clear_bindings(&mut self) {
        self.operands.iter_mut().for_each(OperandInfo::clear);
    }

    // ── Quantization ───────────────────────────────────────────────

    /// Real-valued range representable by a quantized operand.
    pub fn quantization_range(&self, index: u32) -> Result<(f32, f32), LoweringError> {
        let shape = &self.operand(index)?.shape;
        let (lo, hi) = match shape.ty {
            OperandType::TensorQuant8Asymm => (0, 255),
            OperandType::TensorInt32 => (i32::MIN as i64, i32::MAX as i64),
            other => {
                return Err(LoweringError::Validation(format!(
                    "operand {index} ({other}) carries no quantization range"
                )))
            }
        };
        Ok((real_value(shape, lo), real_value(shape, hi)))
    }

    /// One-element constant holding the operand's range minimum. Memoized.
    pub fn quantization_min(&mut self, index: u32) -> Result<NodeInput, LoweringError> {
        if let Some(handle) = self.operand(index)?.tensor_min.get() {
            return Ok(handle);
        }
        let (min, _) = self.quantization_range(index)?;
        let handle = self.create_values(&[min])?;
        self.operand_mut(index)?
            .tensor_min
            .bind_once(handle)
            .map_err(|_| LoweringError::AlreadyBound(index))?;
        Ok(handle)
    }

    /// One-element constant holding the operand's range maximum. Memoized.
    pub fn quantization_max(&mut self, index: u32) -> Result<NodeInput, LoweringError> {
        if let Some(handle) = self.operand(index)?.tensor_max.get() {
            return Ok(handle);
        }
        let (_, max) = self.quantization_range(index)?;
        let handle = self.create_values(&[max])?;
        self.operand_mut(index)?
            .tensor_max
            .bind_once(handle)
            .map_err(|_| LoweringError::AlreadyBound(index))?;
        Ok(handle)
    }

    /// One-element constant holding the real value of quantized `q`.
    /// Not memoized.
    pub fn quantization_value(&mut self, index: u32, q: i32) -> Result<NodeInput, LoweringError> {
        let value = real_value(&self.operand(index)?.shape, q as i64);
        self.create_values(&[value])
    }

    // ── Layout transforms ──────────────────────────────────────────

    fn constant_rank4(&self, index: u32, what: &str) -> Result<(&[u8], [u32; 4], usize), LoweringError> {
        let info = self.operand(index)?;
        if info.shape.rank() != 4 {
            return Err(LoweringError::Validation(format!(
                "{what} operand {index} must have rank 4, has {}",
                info.shape.rank()
            )));
        }
        let d = &info.shape.dims;
        Ok((
            self.bytes(index)?,
            [d[0], d[1], d[2], d[3]],
            info.shape.ty.size_bytes(),
        ))
    }

    /// Convolution filter `[O, H, W, I]` as a `[H, W, I, O]` constant.
    pub fn conv_filter_tensor(&mut self, index: u32) -> Result<NodeInput, LoweringError> {
        let (data, [o, h, w, i], elem) = self.constant_rank4(index, "convolution filter")?;
        let cols = (h * w * i) as usize;
        let transposed = transpose(data, elem, o as usize, cols)?;
        self.emitter.constant([h, w, i, o], &transposed)
    }

    /// Depthwise filter `[1, H, W, I * M]` as a `[H, W, I, M]` constant.
    pub fn depthwise_filter_tensor(
        &mut self,
        index: u32,
        multiplier: u32,
    ) -> Result<NodeInput, LoweringError> {
        let (data, [one, h, w, channels], _) = self.constant_rank4(index, "depthwise filter")?;
        if one != 1 || multiplier == 0 || channels % multiplier != 0 {
            return Err(LoweringError::Validation(format!(
                "depthwise filter operand {index} [{one}, {h}, {w}, {channels}] \
                 does not fit depth multiplier {multiplier}"
            )));
        }
        let data = data.to_vec();
        self.emitter
            .constant([h, w, channels / multiplier, multiplier], &data)
    }

    /// Fully-connected weights `[N, K]` as a `[1, 1, K, N]` constant.
    pub fn fully_connected_weight_tensor(&mut self, index: u32) -> Result<NodeInput, LoweringError> {
        let info = self.operand(index)?;
        if info.shape.rank() != 2 {
            return Err(LoweringError::Validation(format!(
                "fully-connected weights operand {index} must have rank 2, has {}",
                info.shape.rank()
            )));
        }
        let (n, k) = (info.shape.dims[0], info.shape.dims[1]);
        let elem = info.shape.ty.size_bytes();
        let transposed = transpose(self.bytes(index)?, elem, n as usize, k as usize)?;
        self.emitter.constant([1, 1, k, n], &transposed)
    }

    // ── Synthesised constants ──────────────────────────────────────

    /// A data-less constant whose dimensions describe a window or stride.
    pub fn create_shape(&mut self, b: u32, h: u32, w: u32, d: u32) -> Result<NodeInput, LoweringError> {
        self.emitter.constant([b, h, w, d], &[])
    }

    /// A one-dimensional constant holding `values`.
    pub fn create_values<T: ScalarValue>(&mut self, values: &[T]) -> Result<NodeInput, LoweringError> {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le()).collect();
        self.emitter.constant([1, 1, 1, values.len() as u32], &bytes)
    }

    // ── Argument decoding ──────────────────────────────────────────

    /// Fused activation carried by a constant scalar.
    pub fn activation(&self, index: u32) -> Result<FusedActivation, LoweringError> {
        let code = self.scalar::<i32>(index)?;
        FusedActivation::from_code(code).ok_or_else(|| {
            LoweringError::Validation(format!("operand {index}: unknown fused activation {code}"))
        })
    }

    /// Implicit padding scheme carried by a padding-code scalar.
    pub fn padding_scheme(&self, index: u32) -> Result<PaddingScheme, LoweringError> {
        let code = self.scalar::<i32>(index)?;
        Ok(PaddingScheme::from_code(code)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexagon_link::RecordingLink;
    use nn_model::{Operand, Operation, OperationKind};

    struct Fixture {
        link: RecordingLink,
        catalog: OperandCatalog,
        input: u32,
        quant: u32,
        filter: u32,
        weights: u32,
        act: u32,
        pad: u32,
    }

    fn fixture() -> Fixture {
        let mut model = ModelDescription::new("catalog");
        let input = model.add_operand(
            Operand::new(OperandType::TensorQuant8Asymm, vec![1, 2, 2, 2]).with_quantization(0.5, 128),
        );
        let quant = model.add_operand(
            Operand::new(OperandType::TensorQuant8Asymm, vec![1, 2, 2, 3]).with_quantization(0.5, 128),
        );
        // [O=3, H=1, W=1, I=2]
        let filter_values: Vec<u8> = (0u8..6).collect();
        let filter = model.add_constant(
            Operand::new(OperandType::TensorQuant8Asymm, vec![3, 1, 1, 2]).with_quantization(1.0, 0),
            &filter_values,
        );
        // [N=2, K=3] float
        let weights_values: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let weights = model.add_constant(
            Operand::new(OperandType::TensorFloat32, vec![2, 3]),
            &weights_values,
        );
        let act = model.add_i32(3);
        let pad = model.add_i32(PaddingScheme::SAME_CODE);
        model.add_operation(Operation::new(OperationKind::Relu, vec![input], vec![quant]));
        model.identify_inputs_and_outputs(vec![input], vec![quant]);
        let model = model.validate().unwrap();

        let link = RecordingLink::new();
        let mut catalog = OperandCatalog::new(&model, Arc::new(link.clone())).unwrap();
        catalog.emitter_mut().allocate().unwrap();
        Fixture {
            link,
            catalog,
            input,
            quant,
            filter,
            weights,
            act,
            pad,
        }
    }

    fn f32s(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn const_data(link: &RecordingLink, graph: u32, id: u32) -> (Vec<u8>, [u32; 4]) {
        link.nodes(graph)
            .into_iter()
            .find_map(|n| match n {
                hexagon_link::RecordedNode::Const { id: i, dims, data } if i == id => Some((data, dims)),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_scalar_decoding() {
        let f = fixture();
        assert_eq!(f.catalog.scalar::<i32>(f.act).unwrap(), 3);
        assert_eq!(f.catalog.activation(f.act).unwrap(), FusedActivation::Relu6);
        assert_eq!(float_activation_op(FusedActivation::Relu6), Some(OpCode::ReluXF));
        assert_eq!(
            quantized_activation_op(FusedActivation::Relu1),
            Some(OpCode::QuantizedClamp8)
        );
        assert_eq!(f.catalog.padding_scheme(f.pad).unwrap(), PaddingScheme::Same);
        assert!(matches!(
            f.catalog.scalar::<i32>(f.input),
            Err(LoweringError::Validation(_))
        ));
    }

    #[test]
    fn test_tensor_is_memoized() {
        let mut f = fixture();
        let graph = f.catalog.emitter().graph().unwrap();
        let a = f.catalog.tensor(f.weights).unwrap();
        let b = f.catalog.tensor(f.weights).unwrap();
        assert_eq!(a, b);
        assert_eq!(f.link.node_count(graph), 1);
        assert_eq!(const_data(&f.link, graph, a.src_id).1, [1, 1, 2, 3]);
    }

    #[test]
    fn test_unbound_input_is_an_error() {
        let mut f = fixture();
        assert!(matches!(f.catalog.tensor(f.input), Err(LoweringError::NotBound(_))));
    }

    #[test]
    fn test_quantization_min_max_memoized() {
        let mut f = fixture();
        let graph = f.catalog.emitter().graph().unwrap();
        let min1 = f.catalog.quantization_min(f.quant).unwrap();
        let max1 = f.catalog.quantization_max(f.quant).unwrap();
        let min2 = f.catalog.quantization_min(f.quant).unwrap();
        let max2 = f.catalog.quantization_max(f.quant).unwrap();
        assert_eq!(min1, min2);
        assert_eq!(max1, max2);
        assert_eq!(f.link.const_count(graph), 2);

        assert_eq!(f32s(&const_data(&f.link, graph, min1.src_id).0), vec![-64.0]);
        assert_eq!(f32s(&const_data(&f.link, graph, max1.src_id).0), vec![63.5]);

        let v = f.catalog.quantization_value(f.quant, 130).unwrap();
        assert_eq!(f32s(&const_data(&f.link, graph, v.src_id).0), vec![1.0]);
        // quantization_value is not memoized
        f.catalog.quantization_value(f.quant, 130).unwrap();
        assert_eq!(f.link.const_count(graph), 4);
    }

    #[test]
    fn test_int32_range() {
        let f = fixture();
        assert!(f.catalog.quantization_range(f.weights).is_err());

        let mut model = ModelDescription::new("bias");
        let bias = model.add_operand(
            Operand::new(OperandType::TensorInt32, vec![4]).with_quantization(0.5, 2),
        );
        let out = model.add_operand(
            Operand::new(OperandType::TensorInt32, vec![4]).with_quantization(0.5, 2),
        );
        model.add_operation(Operation::new(OperationKind::Relu, vec![bias], vec![out]));
        model.identify_inputs_and_outputs(vec![bias], vec![out]);
        let model = model.validate().unwrap();
        let catalog = OperandCatalog::new(&model, Arc::new(RecordingLink::new())).unwrap();

        let (min, max) = catalog.quantization_range(bias).unwrap();
        assert_eq!(min, (i32::MIN as i64 - 2) as f32 * 0.5);
        assert_eq!(max, (i32::MAX as i64 - 2) as f32 * 0.5);
    }

    #[test]
    fn test_conv_filter_transpose() {
        let mut f = fixture();
        let graph = f.catalog.emitter().graph().unwrap();
        let h = f.catalog.conv_filter_tensor(f.filter).unwrap();
        let (data, dims) = const_data(&f.link, graph, h.src_id);
        assert_eq!(dims, [1, 1, 2, 3]);
        // in[o][i] = 2o + i ; out[i][o]
        assert_eq!(data, vec![0, 2, 4, 1, 3, 5]);
        // transforms bypass the tensor cache
        assert!(!f.catalog.is_bound(f.filter).unwrap());
    }

    #[test]
    fn test_fully_connected_transpose() {
        let mut f = fixture();
        let graph = f.catalog.emitter().graph().unwrap();
        let h = f.catalog.fully_connected_weight_tensor(f.weights).unwrap();
        let (data, dims) = const_data(&f.link, graph, h.src_id);
        assert_eq!(dims, [1, 1, 3, 2]);
        assert_eq!(f32s(&data), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_depthwise_reinterpretation() {
        let mut f = fixture();
        let graph = f.catalog.emitter().graph().unwrap();
        // The filter is [3,1,1,2]: leading dim must be 1.
        assert!(f.catalog.depthwise_filter_tensor(f.filter, 1).is_err());
        assert_eq!(f.link.node_count(graph), 0);
    }

    #[test]
    fn test_set_shape_rejects_bound_operand() {
        let mut f = fixture();
        let new_shape = Shape::new(OperandType::TensorQuant8Asymm, vec![1, 4, 4, 3]);
        f.catalog.set_shape(f.quant, &new_shape).unwrap();
        let updated = f.catalog.shape(f.quant).unwrap();
        assert_eq!(updated.dims, vec![1, 4, 4, 3]);
        assert_eq!(updated.scale, 0.5);

        f.catalog.bind(f.quant, NodeInput::new(7, 0)).unwrap();
        assert!(matches!(
            f.catalog.set_shape(f.quant, &new_shape),
            Err(LoweringError::AlreadyBound(_))
        ));
        assert!(matches!(
            f.catalog.bind(f.quant, NodeInput::new(8, 0)),
            Err(LoweringError::AlreadyBound(_))
        ));
        f.catalog.clear_bindings();
        assert!(!f.catalog.is_bound(f.quant).unwrap());
    }

    #[test]
    fn test_out_of_range() {
        let f = fixture();
        assert!(matches!(
            f.catalog.shape(99),
            Err(LoweringError::OperandOutOfRange { index: 99, .. })
        ));
    }
}
