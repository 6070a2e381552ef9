// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for model preparation and execution on the recording link.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hexagon_link::RecordingLink;
use hvx_driver::{DriverConfig, HvxModel, LoweringTables};
use memory_pools::{PoolDescriptor, SharedMemory};
use nn_model::{
    ModelDescription, Operand, Operation, OperationKind, Request, RequestArgument, Validated,
};
use tensor_shape::{OperandType, PaddingScheme};

/// A chain of `depth` 3x3 convolutions with fused ReLU on a 1x16x16x8 input.
fn conv_chain(depth: usize, ty: OperandType) -> ModelDescription<Validated> {
    let quantized = ty.is_quantized();
    let tensor = |dims: Vec<u32>| {
        let operand = Operand::new(ty, dims);
        if quantized {
            operand.with_quantization(0.05, 128)
        } else {
            operand
        }
    };

    let mut model = ModelDescription::new("conv-chain");
    let input = model.add_operand(tensor(vec![1, 16, 16, 8]));
    let mut current = input;
    for _ in 0..depth {
        let (filter, bias) = if quantized {
            let filter = model.add_constant(tensor(vec![8, 3, 3, 8]), &vec![130u8; 8 * 3 * 3 * 8]);
            let bias = model.add_constant(
                Operand::new(OperandType::TensorInt32, vec![8]).with_quantization(0.0025, 0),
                &[0u8; 32],
            );
            (filter, bias)
        } else {
            let weights: Vec<u8> = (0..8 * 3 * 3 * 8)
                .flat_map(|i| ((i % 7) as f32 * 0.01).to_le_bytes())
                .collect();
            let filter = model.add_constant(tensor(vec![8, 3, 3, 8]), &weights);
            let bias = model.add_constant(tensor(vec![8]), &[0u8; 32]);
            (filter, bias)
        };
        let pad = model.add_i32(PaddingScheme::SAME_CODE);
        let stride = model.add_i32(1);
        let act = model.add_i32(1);
        let out = model.add_operand(tensor(vec![0, 0, 0, 0]));
        model.add_operation(Operation::new(
            OperationKind::Conv2d,
            vec![current, filter, bias, pad, stride, stride, act],
            vec![out],
        ));
        current = out;
    }
    model.identify_inputs_and_outputs(vec![input], vec![current]);
    model.validate().expect("benchmark model is valid")
}

fn prepared(model: &ModelDescription<Validated>, tables: &Arc<LoweringTables>) -> HvxModel {
    let mut hvx = HvxModel::new(
        model,
        Arc::new(RecordingLink::new()),
        Arc::clone(tables),
        &DriverConfig::recording(),
    )
    .expect("catalog builds");
    hvx.prepare().expect("model prepares");
    hvx
}

fn bench_prepare(c: &mut Criterion) {
    let tables = Arc::new(LoweringTables::standard());
    let float = conv_chain(8, OperandType::TensorFloat32);
    let quant = conv_chain(8, OperandType::TensorQuant8Asymm);

    c.bench_function("prepare_float32_conv_chain", |b| {
        b.iter(|| black_box(prepared(&float, &tables).node_count()))
    });
    c.bench_function("prepare_quant8_conv_chain", |b| {
        b.iter(|| black_box(prepared(&quant, &tables).node_count()))
    });
}

fn bench_relu_execution(c: &mut Criterion) {
    let tables = Arc::new(LoweringTables::standard());
    let mut model = ModelDescription::new("relu");
    let a = model.add_operand(Operand::new(OperandType::TensorFloat32, vec![1, 32, 32, 8]));
    let b = model.add_operand(Operand::new(OperandType::TensorFloat32, vec![1, 32, 32, 8]));
    model.add_operation(Operation::new(OperationKind::Relu, vec![a], vec![b]));
    model.identify_inputs_and_outputs(vec![a], vec![b]);
    let mut hvx = prepared(&model.validate().expect("valid"), &tables);

    let bytes = 32 * 32 * 8 * 4;
    let values: Vec<f32> = (0..32 * 32 * 8).map(|i| i as f32 - 4096.0).collect();
    let input = SharedMemory::from_f32(&values).expect("input pool");
    let output = SharedMemory::new(bytes).expect("output pool");
    let request = Request {
        inputs: vec![RequestArgument::new(0, 0, bytes as u32)],
        outputs: vec![RequestArgument::new(1, 0, bytes as u32)],
        pools: vec![PoolDescriptor::Shared(input), PoolDescriptor::Shared(output)],
    };

    c.bench_function("execute_relu_1x32x32x8", |b| {
        b.iter(|| black_box(hvx.execute(&request).expect("executes").output_bytes))
    });
}

criterion_group!(benches, bench_prepare, bench_relu_execution);
criterion_main!(benches);
