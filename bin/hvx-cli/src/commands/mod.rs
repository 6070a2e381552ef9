// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod check;
pub mod compile;
pub mod run;
pub mod status;

use std::path::Path;

use anyhow::Context;
use hvx_driver::DriverConfig;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads the driver configuration, falling back to the stock device.
pub fn load_config(path: Option<&Path>, recording: bool) -> anyhow::Result<DriverConfig> {
    let mut config = match path {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("loading config '{}'", path.display()))?,
        None => DriverConfig::default(),
    };
    if recording {
        config.backend = "recording".to_string();
    }
    Ok(config)
}

pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ {:^52} ║", format!("hvx · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

pub fn load_model(
    path: &Path,
) -> anyhow::Result<nn_model::ModelDescription<nn_model::Validated>> {
    nn_model::ModelLoader::load(path)
        .with_context(|| format!("failed to load model from '{}'", path.display()))
}
