// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operand element types.

/// Numeric representation of a model operand.
///
/// Scalar variants describe single-value hyper-parameters (strides, padding
/// codes, activation codes). Tensor variants describe data flowing through
/// the graph; the lowering tables are keyed by the tensor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandType {
    /// 32-bit IEEE 754 scalar.
    Float32,
    /// Signed 32-bit scalar.
    Int32,
    /// Unsigned 32-bit scalar.
    Uint32,
    /// Tensor of 32-bit IEEE 754 values.
    TensorFloat32,
    /// Tensor of signed 32-bit values (biases of quantized operations, shapes).
    TensorInt32,
    /// Tensor of 8-bit asymmetric quantized values (`real = (q - zero_point) * scale`).
    TensorQuant8Asymm,
}

impl OperandType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            OperandType::Float32
            | OperandType::Int32
            | OperandType::Uint32
            | OperandType::TensorFloat32
            | OperandType::TensorInt32 => 4,
            OperandType::TensorQuant8Asymm => 1,
        }
    }

    /// Returns `true` for the scalar variants.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            OperandType::Float32 | OperandType::Int32 | OperandType::Uint32
        )
    }

    /// Returns `true` if values carry a scale / zero-point pair.
    pub fn is_quantized(self) -> bool {
        matches!(
            self,
            OperandType::TensorQuant8Asymm | OperandType::TensorInt32
        )
    }

    /// Parses the numeric code used by portable model descriptions.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Float32),
            1 => Some(Self::Int32),
            2 => Some(Self::Uint32),
            3 => Some(Self::TensorFloat32),
            4 => Some(Self::TensorInt32),
            5 => Some(Self::TensorQuant8Asymm),
            _ => None,
        }
    }

    /// Returns a human-readable label for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            OperandType::Float32 => "float32",
            OperandType::Int32 => "int32",
            OperandType::Uint32 => "uint32",
            OperandType::TensorFloat32 => "tensor_float32",
            OperandType::TensorInt32 => "tensor_int32",
            OperandType::TensorQuant8Asymm => "tensor_quant8_asymm",
        }
    }
}

impl std::fmt::Display for OperandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
