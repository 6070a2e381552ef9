// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `hvx status`: probe the accelerator runtime.
//!
//! A version mismatch triggers one controller reset before the device is
//! reported unavailable.

use hvx_driver::{Device, DeviceStatus, DriverConfig};

pub async fn execute(config: DriverConfig) -> anyhow::Result<()> {
    super::banner("Device Status");

    println!("  Backend:          {}", config.backend);
    println!("  Library:          {}", config.library);
    println!("  Expected version: {}", config.expected_version);
    println!("  Powersave level:  {}", config.powersave_level);
    println!();

    let device = Device::new(config)?;
    let status = device.status();
    println!("  Status:           {status}");
    if status == DeviceStatus::Unavailable {
        println!("   WARNING: runtime version does not match; models will be refused");
    }
    println!();

    // ── Capabilities ───────────────────────────────────────────
    let caps = device.capabilities();
    println!("  Capabilities      exec time   power");
    println!(
        "   float32          {:>9.2} {:>7.2}",
        caps.float32.exec_time, caps.float32.power_usage
    );
    println!(
        "   quant8 asymm     {:>9.2} {:>7.2}",
        caps.quantized8.exec_time, caps.quantized8.power_usage
    );
    println!();
    println!("  Lowerings:        {}", device.tables().len());
    Ok(())
}
