// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Building and running graphs through a [`Controller`] in front of the
//! recording link.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use hexagon_link::{
    AcceleratorLink, Controller, GraphId, LinkError, NodeInput, NodeOutput, OpCode, PaddingMode,
    RecordingLink, TensorDef, EXPECTED_VERSION,
};

fn controller_over(link: &RecordingLink) -> Controller {
    let link = link.clone();
    Controller::new(move || Ok(Box::new(link.clone()) as Box<dyn AcceleratorLink>)).unwrap()
}

/// INPUT(1) → ReluX_f(3, max from const 2) → OUTPUT(4), four floats wide.
fn relu6_graph(link: &dyn AcceleratorLink) -> Result<GraphId, LinkError> {
    let out = [NodeOutput::new([1, 1, 1, 4], 4)];
    let graph = link.allocate_graph()?;
    link.append_node(graph, 1, OpCode::Input, PaddingMode::NotApplicable, &[], &out)?;
    link.append_const_node(graph, 2, [1, 1, 1, 1], &6.0f32.to_le_bytes())?;
    link.append_node(
        graph,
        3,
        OpCode::ReluXF,
        PaddingMode::NotApplicable,
        &[NodeInput::new(1, 0), NodeInput::new(2, 0)],
        &out,
    )?;
    link.append_node(
        graph,
        4,
        OpCode::Output,
        PaddingMode::NotApplicable,
        &[NodeInput::new(3, 0)],
        &[],
    )?;
    link.compile_graph(graph)?;
    Ok(graph)
}

fn run(link: &dyn AcceleratorLink, graph: GraphId, values: [f32; 4]) -> Vec<f32> {
    let mut input: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut output = vec![0u8; 16];
    let inputs = [TensorDef::new([1, 1, 1, 4], input.as_mut_ptr(), input.len())];
    let mut outputs = [TensorDef::new([1, 1, 1, 4], output.as_mut_ptr(), output.len())];
    link.execute(graph, &inputs, &mut outputs).unwrap();
    output
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn test_graph_through_controller() {
    let link = RecordingLink::new();
    let controller = controller_over(&link);
    let graph = relu6_graph(&controller).unwrap();

    assert_eq!(run(&controller, graph, [-2.0, 0.5, 6.5, 100.0]), vec![0.0, 0.5, 6.0, 6.0]);
    assert_eq!(run(&controller, graph, [1.0, 2.0, 3.0, 4.0]), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(link.execution_count(graph), 2);
    assert_eq!(controller.last_execution_cycles(graph).unwrap(), 300);

    controller.release_graph(graph).unwrap();
    assert!(link.live_graphs().is_empty());
}

#[test]
fn test_reset_swaps_backend() {
    let created = Arc::new(AtomicUsize::new(0));
    let controller = {
        let created = Arc::clone(&created);
        Controller::new(move || {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingLink::new()) as Box<dyn AcceleratorLink>)
        })
        .unwrap()
    };
    let graph = relu6_graph(&controller).unwrap();

    controller.reset().unwrap();
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert!(matches!(
        controller.compile_graph(graph),
        Err(LinkError::UnknownGraph(g)) if g == graph
    ));
    assert!(controller.is_available(EXPECTED_VERSION));
}

#[test]
fn test_concurrent_graphs() {
    let link = RecordingLink::new();
    let controller = Arc::new(controller_over(&link));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || {
                let graph = relu6_graph(controller.as_ref()).unwrap();
                let x = i as f32;
                (graph, run(controller.as_ref(), graph, [x, -x, x + 5.0, x + 10.0]))
            })
        })
        .collect();

    let mut graphs = Vec::new();
    for (i, handle) in handles.into_iter().enumerate() {
        let (graph, out) = handle.join().unwrap();
        let x = i as f32;
        assert_eq!(out, vec![x, 0.0, (x + 5.0).min(6.0), 6.0]);
        graphs.push(graph);
    }
    graphs.sort_unstable();
    assert_eq!(link.live_graphs(), graphs);
}
