// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operations: the computations connecting operands.

/// The kind of computation an operation performs.
///
/// Covers the full portable operation set, including kinds no lowering
/// backend supports yet; support is decided by the driver's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    AveragePool2d,
    Concatenation,
    Conv2d,
    DepthwiseConv2d,
    DepthToSpace,
    Dequantize,
    EmbeddingLookup,
    Floor,
    FullyConnected,
    HashtableLookup,
    L2Normalization,
    L2Pool2d,
    LocalResponseNormalization,
    Logistic,
    LshProjection,
    Lstm,
    MaxPool2d,
    Mul,
    Relu,
    Relu1,
    Relu6,
    Reshape,
    ResizeBilinear,
    Rnn,
    Softmax,
    SpaceToDepth,
    Svdf,
    Tanh,
}

impl OperationKind {
    /// Every kind, in numeric-code order.
    pub const ALL: [OperationKind; 29] = [
        Self::Add,
        Self::AveragePool2d,
        Self::Concatenation,
        Self::Conv2d,
        Self::DepthwiseConv2d,
        Self::DepthToSpace,
        Self::Dequantize,
        Self::EmbeddingLookup,
        Self::Floor,
        Self::FullyConnected,
        Self::HashtableLookup,
        Self::L2Normalization,
        Self::L2Pool2d,
        Self::LocalResponseNormalization,
        Self::Logistic,
        Self::LshProjection,
        Self::Lstm,
        Self::MaxPool2d,
        Self::Mul,
        Self::Relu,
        Self::Relu1,
        Self::Relu6,
        Self::Reshape,
        Self::ResizeBilinear,
        Self::Rnn,
        Self::Softmax,
        Self::SpaceToDepth,
        Self::Svdf,
        Self::Tanh,
    ];

    /// Parses the numeric code used by portable model descriptions.
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Returns the numeric code of this kind.
    pub fn code(self) -> i32 {
        Self::ALL.iter().position(|&k| k == self).map_or(-1, |i| i as i32)
    }

    /// Returns the canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::AveragePool2d => "AVERAGE_POOL_2D",
            Self::Concatenation => "CONCATENATION",
            Self::Conv2d => "CONV_2D",
            Self::DepthwiseConv2d => "DEPTHWISE_CONV_2D",
            Self::DepthToSpace => "DEPTH_TO_SPACE",
            Self::Dequantize => "DEQUANTIZE",
            Self::EmbeddingLookup => "EMBEDDING_LOOKUP",
            Self::Floor => "FLOOR",
            Self::FullyConnected => "FULLY_CONNECTED",
            Self::HashtableLookup => "HASHTABLE_LOOKUP",
            Self::L2Normalization => "L2_NORMALIZATION",
            Self::L2Pool2d => "L2_POOL_2D",
            Self::LocalResponseNormalization => "LOCAL_RESPONSE_NORMALIZATION",
            Self::Logistic => "LOGISTIC",
            Self::LshProjection => "LSH_PROJECTION",
            Self::Lstm => "LSTM",
            Self::MaxPool2d => "MAX_POOL_2D",
            Self::Mul => "MUL",
            Self::Relu => "RELU",
            Self::Relu1 => "RELU1",
            Self::Relu6 => "RELU6",
            Self::Reshape => "RESHAPE",
            Self::ResizeBilinear => "RESIZE_BILINEAR",
            Self::Rnn => "RNN",
            Self::Softmax => "SOFTMAX",
            Self::SpaceToDepth => "SPACE_TO_DEPTH",
            Self::Svdf => "SVDF",
            Self::Tanh => "TANH",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activation fused into the tail of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusedActivation {
    None,
    Relu,
    /// Clamp to `[-1, 1]`.
    Relu1,
    /// Clamp to `[0, 6]`.
    Relu6,
}

impl FusedActivation {
    /// Parses the scalar activation code carried by operation inputs.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Relu),
            2 => Some(Self::Relu1),
            3 => Some(Self::Relu6),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Relu => 1,
            Self::Relu1 => 2,
            Self::Relu6 => 3,
        }
    }
}

/// A single operation: kind plus ordered input and output operand indices.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub inputs: Vec<u32>,
    pub outputs: Vec<u32>,
}

impl Operation {
    pub fn new(kind: OperationKind, inputs: Vec<u32>, outputs: Vec<u32>) -> Self {
        Self {
            kind,
            inputs,
            outputs,
        }
    }

    /// Returns a one-line summary, e.g. `ADD [0, 1, 2] -> [3]`.
    pub fn summary(&self) -> String {
        format!("{} {:?} -> {:?}", self.kind, self.inputs, self.outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_every_kind() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(OperationKind::from_code(3), Some(OperationKind::Conv2d));
        assert_eq!(OperationKind::from_code(-1), None);
        assert_eq!(OperationKind::from_code(29), None);
    }

    #[test]
    fn test_activation_codes() {
        assert_eq!(FusedActivation::from_code(3), Some(FusedActivation::Relu6));
        assert_eq!(FusedActivation::from_code(4), None);
        assert_eq!(FusedActivation::Relu1.code(), 2);
    }

    #[test]
    fn test_serde_names() {
        let op: Operation =
            serde_json::from_str(r#"{ "kind": "depthwise_conv2d", "inputs": [0], "outputs": [1] }"#)
                .unwrap();
        assert_eq!(op.kind, OperationKind::DepthwiseConv2d);
        assert_eq!(op.summary(), "DEPTHWISE_CONV_2D [0] -> [1]");
    }
}
