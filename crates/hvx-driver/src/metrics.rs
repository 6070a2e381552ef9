// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Preparation and execution statistics.
//!
//! [`PrepareStats`] describes one lowering pass; [`ExecutionStats`] one run
//! of the compiled graph, including the accelerator's counters when the
//! driver is configured to collect them.

use std::time::Duration;

use hexagon_link::PerfInfo;

/// Statistics of a successful `prepare()`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PrepareStats {
    /// Operations in the portable model.
    pub operations: usize,
    /// Accelerator nodes appended, constants included.
    pub nodes: u32,
    /// Time spent validating operands and inferring shapes.
    pub validate_duration: Duration,
    /// Time spent appending nodes.
    pub lower_duration: Duration,
    /// Time spent in the accelerator's graph compiler.
    pub compile_duration: Duration,
}

impl PrepareStats {
    pub fn total_duration(&self) -> Duration {
        self.validate_duration + self.lower_duration + self.compile_duration
    }

    /// Average number of accelerator nodes per portable operation.
    pub fn expansion(&self) -> f64 {
        if self.operations == 0 {
            return 0.0;
        }
        f64::from(self.nodes) / self.operations as f64
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Prepare: {} operations -> {} nodes ({:.1}x), {:.2}ms validate, \
             {:.2}ms lower, {:.2}ms compile",
            self.operations,
            self.nodes,
            self.expansion(),
            self.validate_duration.as_secs_f64() * 1000.0,
            self.lower_duration.as_secs_f64() * 1000.0,
            self.compile_duration.as_secs_f64() * 1000.0,
        )
    }
}

/// Statistics of one `execute()`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutionStats {
    /// Wall-clock time of the accelerator call.
    pub duration: Duration,
    /// Bytes handed to the graph's input node.
    pub input_bytes: usize,
    /// Bytes the output node reported as valid.
    pub output_bytes: usize,
    /// Cycle count of the run, when collected.
    pub cycles: Option<u64>,
    /// Per-node counters, when collected.
    pub perf: Vec<PerfInfo>,
}

impl ExecutionStats {
    /// The `n` nodes with the highest counters, highest first.
    pub fn hottest_nodes(&self, n: usize) -> Vec<PerfInfo> {
        let mut perf = self.perf.clone();
        perf.sort_by_key(|p| std::cmp::Reverse(p.counter()));
        perf.truncate(n);
        perf
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let cycles = match self.cycles {
            Some(c) => format!(", {c} cycles"),
            None => String::new(),
        };
        format!(
            "Execute: {:.3}ms, {} bytes in, {} bytes out{cycles}",
            self.duration.as_secs_f64() * 1000.0,
            self.input_bytes,
            self.output_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_summary() {
        let stats = PrepareStats {
            operations: 2,
            nodes: 7,
            validate_duration: Duration::from_millis(1),
            lower_duration: Duration::from_millis(2),
            compile_duration: Duration::from_millis(3),
        };
        assert!((stats.expansion() - 3.5).abs() < f64::EPSILON);
        assert_eq!(stats.total_duration(), Duration::from_millis(6));
        let s = stats.summary();
        assert!(s.contains("2 operations -> 7 nodes"));
    }

    #[test]
    fn test_empty_prepare_expansion() {
        assert_eq!(PrepareStats::default().expansion(), 0.0);
    }

    #[test]
    fn test_hottest_nodes() {
        let perf = |node_id, counter_lo| PerfInfo {
            node_id,
            executions: 1,
            counter_lo,
            counter_hi: 0,
        };
        let stats = ExecutionStats {
            perf: vec![perf(1, 10), perf(2, 30), perf(3, 20)],
            ..Default::default()
        };
        let hot: Vec<_> = stats.hottest_nodes(2).iter().map(|p| p.node_id).collect();
        assert_eq!(hot, vec![2, 3]);
    }

    #[test]
    fn test_execution_summary_cycles() {
        let mut stats = ExecutionStats {
            input_bytes: 16,
            output_bytes: 16,
            ..Default::default()
        };
        assert!(!stats.summary().contains("cycles"));
        stats.cycles = Some(400);
        assert!(stats.summary().contains("400 cycles"));
    }
}
