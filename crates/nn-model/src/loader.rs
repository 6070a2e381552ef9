// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from a manifest on disk.
//!
//! The loader accepts either a manifest file or a model directory containing
//! `model.json`. Pool files named by the manifest are resolved relative to
//! the manifest's directory; they are not opened here. Mapping happens when
//! a driver prepares the model.

use crate::{graph, ModelDescription, ModelError, ModelManifest};
use std::path::Path;

/// Default manifest filename inside a model directory.
const MANIFEST_FILE: &str = "model.json";

/// Loads a model from disk into a validated [`ModelDescription`].
///
/// # Example
/// ```no_run
/// use nn_model::ModelLoader;
/// use std::path::Path;
///
/// let model = ModelLoader::load(Path::new("./models/mobilenet")).unwrap();
/// println!("{}", model.summary());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a model.
    ///
    /// Steps:
    /// 1. Locate and parse the manifest.
    /// 2. Encode inline constants and resolve pool paths.
    /// 3. Validate the resulting description.
    pub fn load(path: &Path) -> Result<ModelDescription<graph::Validated>, ModelError> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let manifest = ModelManifest::from_file(&manifest_path)?;
        tracing::info!(
            "loading model '{}' from {} ({} operands, {} operations)",
            manifest.name,
            manifest_path.display(),
            manifest.operands.len(),
            manifest.operations.len(),
        );
        manifest.into_description(base_dir)?.validate()
    }
}
