// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Driver configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! library = "libhexagon_nn_controller.so"
//! backend = "dynamic"
//! debug_level = 1
//! powersave_level = 0
//! perf_info = true
//! dump_graph = false
//! expected_version = 92
//! ```

use std::path::Path;
use std::sync::Arc;

use hexagon_link::{
    AcceleratorLink, Controller, RecordingLink, DEFAULT_LIBRARY, EXPECTED_VERSION,
};

use crate::LoweringError;

/// Configuration for the driver.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DriverConfig {
    /// Vendor controller library: a file name resolved by the loader, or a path.
    #[serde(default = "default_library")]
    pub library: String,
    /// Link backend: `"dynamic"` (vendor library) or `"recording"` (in-process).
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Runtime debug verbosity set on every new graph.
    pub debug_level: Option<i32>,
    /// Global power-save level; 0 is maximum performance.
    #[serde(default)]
    pub powersave_level: u32,
    /// Query cycle counts and per-node counters after each execution.
    #[serde(default)]
    pub perf_info: bool,
    /// Log the compiled graph's node dump.
    #[serde(default)]
    pub dump_graph: bool,
    /// Runtime version the driver accepts.
    #[serde(default = "default_version")]
    pub expected_version: i32,
}

fn default_library() -> String {
    DEFAULT_LIBRARY.to_string()
}

fn default_backend() -> String {
    "dynamic".to_string()
}

fn default_version() -> i32 {
    EXPECTED_VERSION
}

impl DriverConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LoweringError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoweringError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, LoweringError> {
        toml::from_str(toml_str)
            .map_err(|e| LoweringError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, LoweringError> {
        toml::to_string_pretty(self)
            .map_err(|e| LoweringError::Config(format!("TOML serialise error: {e}")))
    }

    /// A configuration using the in-process recording link.
    pub fn recording() -> Self {
        Self {
            backend: "recording".to_string(),
            ..Self::default()
        }
    }

    /// Creates the accelerator controller selected by this config.
    ///
    /// The dynamic backend is process-wide: every call returns the same
    /// controller. The recording backend creates a fresh one each time.
    pub fn create_controller(&self) -> Result<Arc<Controller>, LoweringError> {
        match self.backend.to_lowercase().as_str() {
            "dynamic" => Ok(Controller::shared(&self.library)?),
            "recording" => {
                let controller = Controller::new(|| {
                    Ok(Box::new(RecordingLink::new()) as Box<dyn AcceleratorLink>)
                })?;
                Ok(Arc::new(controller))
            }
            other => Err(LoweringError::Config(format!(
                "unknown backend '{other}'; expected 'dynamic' or 'recording'"
            ))),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            library: default_library(),
            backend: default_backend(),
            debug_level: None,
            powersave_level: 0,
            perf_info: false,
            dump_graph: false,
            expected_version: EXPECTED_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = DriverConfig::default();
        assert_eq!(c.library, DEFAULT_LIBRARY);
        assert_eq!(c.backend, "dynamic");
        assert_eq!(c.expected_version, 92);
        assert!(!c.perf_info);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
library = "/vendor/lib/libhexagon_nn_controller.so"
backend = "recording"
debug_level = 2
perf_info = true
"#;
        let c = DriverConfig::from_toml(toml).unwrap();
        assert_eq!(c.library, "/vendor/lib/libhexagon_nn_controller.so");
        assert_eq!(c.backend, "recording");
        assert_eq!(c.debug_level, Some(2));
        assert_eq!(c.powersave_level, 0);
        assert!(c.perf_info);
        assert!(!c.dump_graph);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = DriverConfig {
            debug_level: Some(1),
            dump_graph: true,
            ..DriverConfig::recording()
        };
        let back = DriverConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            DriverConfig::from_toml("powersave_level = \"high\""),
            Err(LoweringError::Config(_))
        ));
    }

    #[test]
    fn test_create_recording_controller() {
        let controller = DriverConfig::recording().create_controller().unwrap();
        assert!(controller.is_available(EXPECTED_VERSION));
    }

    #[test]
    fn test_create_unknown_backend() {
        let c = DriverConfig {
            backend: "bogus".into(),
            ..Default::default()
        };
        assert!(c.create_controller().is_err());
    }
}
