// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hvx run`: compile a model and execute it once.
//!
//! Each input file fills its own shared pool; each output gets a pool sized
//! from the inferred output shape and is written to `<output_dir>/output_<i>.bin`.
//! ```text
//! load → Device::prepare_model → pools → execute → write outputs
//! ```

use std::path::PathBuf;

use anyhow::Context;
use hvx_driver::{Device, DriverConfig};
use memory_pools::{PoolDescriptor, SharedMemory};
use nn_model::{Request, RequestArgument};

pub async fn execute(
    config: DriverConfig,
    model: PathBuf,
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    json: bool,
) -> anyhow::Result<()> {
    let description = super::load_model(&model)?;
    if inputs.len() != description.input_indexes.len() {
        anyhow::bail!(
            "model '{}' has {} inputs, {} files given",
            description.name,
            description.input_indexes.len(),
            inputs.len()
        );
    }

    let device = Device::new(config)?;
    let prepared = device.prepare_model_async(description).await?;

    // ── Pools ──────────────────────────────────────────────────
    let mut pools = Vec::new();
    let mut request_inputs = Vec::new();
    for (path, shape) in inputs.iter().zip(prepared.input_shapes()?) {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading input '{}'", path.display()))?;
        if bytes.len() != shape.size_bytes() {
            anyhow::bail!(
                "input '{}' has {} bytes, {:?} {} needs {}",
                path.display(),
                bytes.len(),
                shape.dims,
                shape.ty.as_str(),
                shape.size_bytes()
            );
        }
        request_inputs.push(RequestArgument::new(pools.len() as u32, 0, bytes.len() as u32));
        pools.push(SharedMemory::from_bytes(&bytes)?);
    }

    let output_shapes = prepared.output_shapes()?;
    let mut request_outputs = Vec::new();
    let mut output_pools = Vec::new();
    for shape in &output_shapes {
        let memory = SharedMemory::new(shape.size_bytes())?;
        request_outputs.push(RequestArgument::new(
            pools.len() as u32,
            0,
            shape.size_bytes() as u32,
        ));
        output_pools.push(memory.clone());
        pools.push(memory);
    }

    let request = Request {
        inputs: request_inputs,
        outputs: request_outputs,
        pools: pools.into_iter().map(PoolDescriptor::Shared).collect(),
    };

    // ── Execute ────────────────────────────────────────────────
    let stats = prepared.execute_async(request).await?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating '{}'", output_dir.display()))?;
    for (i, memory) in output_pools.iter().enumerate() {
        let path = output_dir.join(format!("output_{i}.bin"));
        std::fs::write(&path, memory.read(0, memory.len())?)
            .with_context(|| format!("writing '{}'", path.display()))?;
        tracing::info!("output {i} ({:?}) written to {}", output_shapes[i].dims, path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", prepared.prepare_stats().summary());
        println!("{}", stats.summary());
        for perf in stats.hottest_nodes(5) {
            println!(
                "  node {:>5}: {} cycles over {} runs",
                perf.node_id,
                perf.counter(),
                perf.executions
            );
        }
    }
    Ok(())
}
