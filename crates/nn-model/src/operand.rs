// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operands: the typed tensors and scalars a model is built from.

use tensor_shape::{OperandType, Shape};

/// Where an operand's value comes from and how long it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandLifetime {
    /// Produced and consumed inside the graph.
    Temporary,
    /// Supplied by every execution request.
    ModelInput,
    /// Written by every execution request.
    ModelOutput,
    /// Constant stored in the model's inline value block.
    ConstantCopy,
    /// Constant stored in one of the model's memory pools.
    ConstantReference,
    /// Optional argument left empty.
    NoValue,
}

impl OperandLifetime {
    /// Returns `true` for the two constant lifetimes.
    pub fn is_constant(self) -> bool {
        matches!(self, Self::ConstantCopy | Self::ConstantReference)
    }

    /// Returns a human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temporary => "temporary",
            Self::ModelInput => "model_input",
            Self::ModelOutput => "model_output",
            Self::ConstantCopy => "constant_copy",
            Self::ConstantReference => "constant_reference",
            Self::NoValue => "no_value",
        }
    }
}

impl std::fmt::Display for OperandLifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A byte range inside a memory pool (or the inline value block, for
/// [`OperandLifetime::ConstantCopy`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DataLocation {
    pub pool_index: u32,
    pub offset: u32,
    pub length: u32,
}

/// A single model operand.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Operand {
    /// Numeric representation.
    #[serde(rename = "type")]
    pub ty: OperandType,
    /// Dimensions; zero entries are filled in by shape inference.
    #[serde(default)]
    pub dimensions: Vec<u32>,
    /// Quantization scale.
    #[serde(default)]
    pub scale: f32,
    /// Quantization zero point.
    #[serde(default)]
    pub zero_point: i32,
    /// Lifetime class.
    pub lifetime: OperandLifetime,
    /// Data location for constants.
    #[serde(default)]
    pub location: DataLocation,
}

impl Operand {
    /// Creates a temporary operand with no data.
    pub fn new(ty: OperandType, dimensions: Vec<u32>) -> Self {
        Self {
            ty,
            dimensions,
            scale: 0.0,
            zero_point: 0,
            lifetime: OperandLifetime::Temporary,
            location: DataLocation::default(),
        }
    }

    /// Sets the quantization parameters.
    pub fn with_quantization(mut self, scale: f32, zero_point: i32) -> Self {
        self.scale = scale;
        self.zero_point = zero_point;
        self
    }

    /// Sets the lifetime.
    pub fn with_lifetime(mut self, lifetime: OperandLifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets the data location.
    pub fn with_location(mut self, location: DataLocation) -> Self {
        self.location = location;
        self
    }

    /// Returns the operand's shape descriptor.
    pub fn shape(&self) -> Shape {
        Shape::quantized(self.ty, self.dimensions.clone(), self.scale, self.zero_point)
    }

    /// Returns `true` if the operand's value is known at preparation time.
    pub fn is_constant(&self) -> bool {
        self.lifetime.is_constant()
    }

    /// Byte length of a densely packed value of this operand.
    pub fn size_bytes(&self) -> usize {
        self.shape().size_bytes()
    }
}
