// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hvx compile`: lower and compile a model, then report what was built.

use std::path::PathBuf;

use hvx_driver::{Device, DriverConfig};

pub async fn execute(config: DriverConfig, model: PathBuf, dump: bool) -> anyhow::Result<()> {
    super::banner("Graph Compiler");

    let description = super::load_model(&model)?;
    println!("  Model:    {}", description.name);
    println!("  Backend:  {}", config.backend);
    println!();

    let device = Device::new(config)?;
    let prepared = device.prepare_model_async(description).await?;

    // ── Summary ────────────────────────────────────────────────
    let stats = prepared.prepare_stats();
    println!("  {}", stats.summary());
    for (i, shape) in prepared.output_shapes()?.iter().enumerate() {
        println!("  Output {i}: {} {:?}", shape.ty.as_str(), shape.dims);
    }

    if dump {
        println!();
        println!("{}", prepared.graph_dump()?);
    }
    Ok(())
}
