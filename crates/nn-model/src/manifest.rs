// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! The manifest (`model.json`) lists operands, operations and pools. Small
//! constants are written inline as decimal lists; large ones live in a pool
//! file and are referenced by `(pool, offset, length)`.
//!
//! # Format
//! ```json
//! {
//!   "name": "add_relu",
//!   "operands": [
//!     { "type": "tensor_float32", "dimensions": [1, 2, 2, 1] },
//!     { "type": "tensor_float32", "dimensions": [1, 2, 2, 1] },
//!     { "type": "int32", "values": [1] },
//!     { "type": "tensor_float32", "dimensions": [1, 2, 2, 1] }
//!   ],
//!   "operations": [ { "kind": "add", "inputs": [0, 1, 2], "outputs": [3] } ],
//!   "inputs": [0, 1],
//!   "outputs": [3],
//!   "pools": [ { "file": "weights.bin", "size": 4096 } ]
//! }
//! ```

use crate::{DataLocation, ModelDescription, ModelError, Operand, OperandLifetime, Operation};
use memory_pools::PoolDescriptor;
use std::path::Path;
use tensor_shape::OperandType;

/// Top-level model manifest, deserialized from `model.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Human-readable model name.
    pub name: String,
    pub operands: Vec<ManifestOperand>,
    pub operations: Vec<Operation>,
    /// Operand indices of the graph inputs.
    pub inputs: Vec<u32>,
    /// Operand indices of the graph outputs.
    pub outputs: Vec<u32>,
    /// File-backed pools holding referenced constants.
    #[serde(default)]
    pub pools: Vec<ManifestPool>,
}

/// A single operand entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestOperand {
    #[serde(rename = "type")]
    pub ty: OperandType,
    #[serde(default)]
    pub dimensions: Vec<u32>,
    #[serde(default)]
    pub scale: f32,
    #[serde(default)]
    pub zero_point: i32,
    /// Inline constant values, one per element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    /// Location of a constant stored in a pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<DataLocation>,
    /// Marks an omitted optional argument.
    #[serde(default)]
    pub no_value: bool,
}

/// A file-backed pool entry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestPool {
    /// Path, relative to the manifest's directory.
    pub file: String,
    #[serde(default)]
    pub offset: u64,
    pub size: usize,
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Builds a model description, resolving pool files against `base_dir`.
    pub fn into_description(self, base_dir: &Path) -> Result<ModelDescription, ModelError> {
        let mut model = ModelDescription::new(self.name);

        for (index, entry) in self.operands.into_iter().enumerate() {
            let operand = Operand::new(entry.ty, entry.dimensions.clone())
                .with_quantization(entry.scale, entry.zero_point);

            match (entry.values, entry.location, entry.no_value) {
                (Some(values), None, false) => {
                    let bytes = encode_values(entry.ty, &values).map_err(|detail| {
                        ModelError::InvalidOperand { index, detail }
                    })?;
                    let expected = operand.size_bytes();
                    if bytes.len() != expected {
                        return Err(ModelError::InvalidOperand {
                            index,
                            detail: format!(
                                "{} values given, shape {:?} needs {}",
                                values.len(),
                                entry.dimensions,
                                expected / entry.ty.size_bytes()
                            ),
                        });
                    }
                    model.add_constant(operand, &bytes);
                }
                (None, Some(location), false) => {
                    model.add_operand(
                        operand
                            .with_lifetime(OperandLifetime::ConstantReference)
                            .with_location(location),
                    );
                }
                (None, None, true) => {
                    model.add_operand(operand.with_lifetime(OperandLifetime::NoValue));
                }
                (None, None, false) => {
                    model.add_operand(operand);
                }
                _ => {
                    return Err(ModelError::InvalidOperand {
                        index,
                        detail: "at most one of values, location and no_value may be set".into(),
                    })
                }
            }
        }

        for operation in self.operations {
            model.add_operation(operation);
        }
        model.identify_inputs_and_outputs(self.inputs, self.outputs);

        model.pools = self
            .pools
            .into_iter()
            .map(|p| PoolDescriptor::File {
                path: base_dir.join(p.file),
                offset: p.offset,
                size: p.size,
                writable: false,
            })
            .collect();

        Ok(model)
    }
}

/// Packs decimal values into little-endian bytes of the given type.
pub(crate) fn encode_values(ty: OperandType, values: &[f64]) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::with_capacity(values.len() * ty.size_bytes());
    for &v in values {
        match ty {
            OperandType::Float32 | OperandType::TensorFloat32 => {
                bytes.extend_from_slice(&(v as f32).to_le_bytes())
            }
            OperandType::Int32 | OperandType::TensorInt32 => {
                if v.fract() != 0.0 || v < f64::from(i32::MIN) || v > f64::from(i32::MAX) {
                    return Err(format!("{v} is not an int32"));
                }
                bytes.extend_from_slice(&(v as i32).to_le_bytes())
            }
            OperandType::Uint32 => {
                if v.fract() != 0.0 || v < 0.0 || v > f64::from(u32::MAX) {
                    return Err(format!("{v} is not a uint32"));
                }
                bytes.extend_from_slice(&(v as u32).to_le_bytes())
            }
            OperandType::TensorQuant8Asymm => {
                if v.fract() != 0.0 || !(0.0..=255.0).contains(&v) {
                    return Err(format!("{v} is not a quantized 8-bit value"));
                }
                bytes.push(v as u8)
            }
        }
    }
    Ok(bytes)
}
