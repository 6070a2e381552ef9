// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # hvx
//!
//! Command-line front end for the HVX graph-lowering driver.
//!
//! ## Usage
//! ```bash
//! # Which operations of a model can be lowered
//! hvx check --model ./models/mobilenet
//!
//! # Lower and compile, printing the accelerator node dump
//! hvx --recording compile --model ./models/mobilenet --dump
//!
//! # Execute once with raw input files, writing raw outputs
//! hvx run --model ./models/add_relu --input a.bin --input b.bin --output-dir ./out
//!
//! # Probe the accelerator runtime
//! hvx status
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hvx",
    about = "Lower portable inference graphs onto the DSP graph runtime",
    version,
    author
)]
struct Cli {
    /// Path to a TOML driver configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-process recording link instead of the vendor library.
    #[arg(long, global = true)]
    recording: bool,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which operations of a model the accelerator supports.
    Check {
        /// Model directory or manifest file.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Lower and compile a model without executing it.
    Compile {
        /// Model directory or manifest file.
        #[arg(short, long)]
        model: PathBuf,

        /// Print the compiled graph's node dump.
        #[arg(long)]
        dump: bool,
    },

    /// Compile a model and execute it once.
    Run {
        /// Model directory or manifest file.
        #[arg(short, long)]
        model: PathBuf,

        /// Raw little-endian input tensor, one per graph input, in order.
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Directory receiving one raw file per graph output.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Print execution statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Display accelerator availability and capabilities.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref(), cli.recording)?;

    match cli.command {
        Commands::Check { model } => commands::check::execute(config, model).await,
        Commands::Compile { model, dump } => commands::compile::execute(config, model, dump).await,
        Commands::Run {
            model,
            input,
            output_dir,
            json,
        } => commands::run::execute(config, model, input, output_dir, json).await,
        Commands::Status => commands::status::execute(config).await,
    }
}
