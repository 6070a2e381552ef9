// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The service boundary: capability and support queries, model
//! preparation and execution.
//!
//! Preparation and execution are synchronous. The `_async` variants run the
//! same call on a blocking worker thread and resolve when it finishes.
//!
//! # Example
//! ```no_run
//! use hvx_driver::{Device, DriverConfig};
//!
//! # fn example(model: nn_model::ModelDescription<nn_model::Validated>) -> Result<(), hvx_driver::LoweringError> {
//! let device = Device::new(DriverConfig::default())?;
//! let prepared = device.prepare_model(&model)?;
//! println!("{}", prepared.prepare_stats().summary());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use hexagon_link::{AcceleratorLink, Controller};
use nn_model::{ModelDescription, Request, Validated};
use parking_lot::Mutex;
use tensor_shape::Shape;

use crate::builder::HvxModel;
use crate::{DriverConfig, ExecutionStats, LoweringError, LoweringTables, PrepareStats};

/// Relative cost of running on this device; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PerformanceInfo {
    pub exec_time: f32,
    pub power_usage: f32,
}

/// Per-representation cost figures reported to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Capabilities {
    pub float32: PerformanceInfo,
    pub quantized8: PerformanceInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Available,
    Unavailable,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        })
    }
}

/// An accelerator device.
#[derive(Clone)]
pub struct Device {
    config: DriverConfig,
    controller: Arc<Controller>,
    tables: Arc<LoweringTables>,
}

impl Device {
    /// Opens the device selected by `config`.
    pub fn new(config: DriverConfig) -> Result<Self, LoweringError> {
        let controller = config.create_controller()?;
        Self::with_controller(config, controller)
    }

    /// Opens a device on an existing controller.
    pub fn with_controller(
        config: DriverConfig,
        controller: Arc<Controller>,
    ) -> Result<Self, LoweringError> {
        controller.set_powersave_level(config.powersave_level)?;
        tracing::info!(
            "device opened: backend '{}', powersave level {}",
            config.backend,
            config.powersave_level
        );
        Ok(Self {
            config,
            controller,
            tables: Arc::new(LoweringTables::standard()),
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn tables(&self) -> &LoweringTables {
        &self.tables
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            float32: PerformanceInfo {
                exec_time: 1.0,
                power_usage: 1.0,
            },
            quantized8: PerformanceInfo {
                exec_time: 1.0,
                power_usage: 1.0,
            },
        }
    }

    /// Probes the runtime, resetting the controller once on a version
    /// mismatch.
    pub fn status(&self) -> DeviceStatus {
        if self.controller.is_available(self.config.expected_version) {
            DeviceStatus::Available
        } else {
            DeviceStatus::Unavailable
        }
    }

    /// Whether each operation of `model` can be lowered, in order. Runs
    /// shape inference but makes no accelerator call.
    pub fn supported_operations(
        &self,
        model: &ModelDescription<Validated>,
    ) -> Result<Vec<bool>, LoweringError> {
        let link: Arc<dyn AcceleratorLink> = self.controller.clone();
        let mut hvx = HvxModel::new(model, link, Arc::clone(&self.tables), &self.config)?;
        Ok(hvx.supported_operations())
    }

    /// Validates, lowers and compiles `model`.
    pub fn prepare_model(
        &self,
        model: &ModelDescription<Validated>,
    ) -> Result<PreparedModel, LoweringError> {
        if self.status() == DeviceStatus::Unavailable {
            return Err(LoweringError::Unavailable(format!(
                "runtime version {} not available",
                self.config.expected_version
            )));
        }
        let link: Arc<dyn AcceleratorLink> = self.controller.clone();
        let mut hvx = HvxModel::new(model, link, Arc::clone(&self.tables), &self.config)?;
        let stats = hvx.prepare()?;
        Ok(PreparedModel {
            model: Arc::new(Mutex::new(hvx)),
            stats,
        })
    }

    /// [`prepare_model`](Self::prepare_model) on a blocking worker.
    pub async fn prepare_model_async(
        &self,
        model: ModelDescription<Validated>,
    ) -> Result<PreparedModel, LoweringError> {
        let device = self.clone();
        tokio::task::spawn_blocking(move || device.prepare_model(&model))
            .await
            .map_err(|e| LoweringError::Worker(e.to_string()))?
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("config", &self.config)
            .field("tables", &self.tables)
            .finish()
    }
}

/// A compiled model ready for execution. Clones share the model; executions
/// are serialized.
#[derive(Debug, Clone)]
pub struct PreparedModel {
    model: Arc<Mutex<HvxModel>>,
    stats: PrepareStats,
}

impl PreparedModel {
    pub fn prepare_stats(&self) -> &PrepareStats {
        &self.stats
    }

    pub fn node_count(&self) -> u32 {
        self.model.lock().node_count()
    }

    pub fn input_shapes(&self) -> Result<Vec<Shape>, LoweringError> {
        self.model.lock().input_shapes()
    }

    pub fn output_shapes(&self) -> Result<Vec<Shape>, LoweringError> {
        self.model.lock().output_shapes()
    }

    /// Runs the model once.
    pub fn execute(&self, request: &Request) -> Result<ExecutionStats, LoweringError> {
        self.model.lock().execute(request)
    }

    /// [`execute`](Self::execute) on a blocking worker.
    pub async fn execute_async(&self, request: Request) -> Result<ExecutionStats, LoweringError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.lock().execute(&request))
            .await
            .map_err(|e| LoweringError::Worker(e.to_string()))?
    }

    pub fn graph_log(&self) -> Result<String, LoweringError> {
        self.model.lock().graph_log()
    }

    pub fn graph_dump(&self) -> Result<String, LoweringError> {
        self.model.lock().graph_dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexagon_link::RecordingLink;
    use nn_model::{Operand, Operation, OperationKind};
    use tensor_shape::OperandType;

    fn device(link: &RecordingLink) -> Device {
        let link = link.clone();
        let controller =
            Controller::new(move || Ok(Box::new(link.clone()) as Box<dyn AcceleratorLink>)).unwrap();
        Device::with_controller(DriverConfig::recording(), Arc::new(controller)).unwrap()
    }

    fn model(kind: OperationKind) -> ModelDescription<Validated> {
        let mut model = ModelDescription::new("unary");
        let a = model.add_operand(Operand::new(OperandType::TensorFloat32, vec![1, 4]));
        let b = model.add_operand(Operand::new(OperandType::TensorFloat32, vec![1, 4]));
        model.add_operation(Operation::new(kind, vec![a], vec![b]));
        model.identify_inputs_and_outputs(vec![a], vec![b]);
        model.validate().unwrap()
    }

    #[test]
    fn test_status_follows_version() {
        let link = RecordingLink::new();
        let dev = device(&link);
        assert_eq!(dev.status(), DeviceStatus::Available);
        link.set_version(91);
        assert_eq!(dev.status(), DeviceStatus::Unavailable);
    }

    #[test]
    fn test_unavailable_device_refuses_prepare() {
        let link = RecordingLink::new();
        let dev = device(&link);
        link.set_version(0);
        assert!(matches!(
            dev.prepare_model(&model(OperationKind::Relu)),
            Err(LoweringError::Unavailable(_))
        ));
        assert_eq!(link.total_appends(), 0);
    }

    #[test]
    fn test_supported_operations() {
        let dev = device(&RecordingLink::new());
        assert_eq!(dev.supported_operations(&model(OperationKind::Tanh)).unwrap(), vec![true]);
        assert_eq!(dev.supported_operations(&model(OperationKind::Floor)).unwrap(), vec![false]);
    }

    #[test]
    fn test_prepare_and_dump() {
        let link = RecordingLink::new();
        let prepared = device(&link).prepare_model(&model(OperationKind::Tanh)).unwrap();
        assert_eq!(prepared.node_count(), 3);
        assert_eq!(prepared.output_shapes().unwrap()[0].dims, vec![1, 4]);
        assert!(prepared.graph_dump().unwrap().contains("Tanh_f"));
        assert!(prepared.graph_log().unwrap().contains("prepared"));
    }

    #[test]
    fn test_powersave_applied() {
        let link = RecordingLink::new();
        let controller = {
            let link = link.clone();
            Controller::new(move || Ok(Box::new(link.clone()) as Box<dyn AcceleratorLink>))
                .unwrap()
        };
        let config = DriverConfig {
            powersave_level: 2,
            ..DriverConfig::recording()
        };
        Device::with_controller(config, Arc::new(controller)).unwrap();
        assert_eq!(link.powersave_level(), 2);
    }

    #[tokio::test]
    async fn test_prepare_async() {
        let dev = device(&RecordingLink::new());
        let prepared = dev.prepare_model_async(model(OperationKind::Relu)).await.unwrap();
        assert_eq!(prepared.prepare_stats().operations, 1);
    }
}
