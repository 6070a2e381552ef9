// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hvx check`: per-operation support report.
//!
//! An operation is supported when a lowering exists for its representation
//! and its shapes infer. No graph is allocated.

use std::path::PathBuf;

use hvx_driver::{Device, DriverConfig};

pub async fn execute(config: DriverConfig, model: PathBuf) -> anyhow::Result<()> {
    super::banner("Support Check");

    let description = super::load_model(&model)?;
    let device = Device::new(config)?;
    let supported = device.supported_operations(&description)?;

    println!("  Model: {}", description.name);
    println!();
    println!("  {:<4} {:<26} {:<22} {:>9}", "Idx", "Operation", "Type", "Supported");
    println!("  {}", "-".repeat(64));

    for (index, (op, ok)) in description.iter_operations().zip(&supported).enumerate() {
        let ty = op
            .inputs
            .first()
            .and_then(|&i| description.operand(i))
            .map_or("-", |operand| operand.ty.as_str());
        println!(
            "  {:<4} {:<26} {:<22} {:>9}",
            index,
            op.kind.as_str(),
            ty,
            if *ok { "yes" } else { "NO" },
        );
    }

    let count = supported.iter().filter(|&&ok| ok).count();
    println!();
    println!("  {count}/{} operations supported", supported.len());
    if count < supported.len() {
        anyhow::bail!("{} operations cannot be lowered", supported.len() - count);
    }
    Ok(())
}
