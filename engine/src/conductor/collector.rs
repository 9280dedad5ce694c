//! Result Collector
//!
//! Accumulates caller-visible step outputs in step order. No filtering,
//! transformation or deduplication happens here.

use crate::conductor::types::ExecutionResult;
use sdk::Artifact;

#[derive(Debug, Default)]
pub struct ResultCollector {
    outputs: Vec<Artifact>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect a finished sequence of outputs in one go
    pub fn collect(outputs: impl IntoIterator<Item = Artifact>) -> ExecutionResult {
        let mut collector = Self::new();
        for output in outputs {
            collector.push(output);
        }
        collector.finish()
    }

    pub fn push(&mut self, output: Artifact) {
        self.outputs.push(output);
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn finish(self) -> ExecutionResult {
        ExecutionResult::new(self.outputs)
    }
}
