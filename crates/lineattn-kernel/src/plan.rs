//! Kernel plan: every tensor's addressing plus the scratch and traffic it
//! implies, computed once per shape.

use lineattn_core::{Dims, InputLayout, Operand, TensorAddr};

/// Addressing for Q, K, V, the score scratch P and the output O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelPlan {
    pub dims: Dims,
    pub layout: InputLayout,
    pub query: TensorAddr,
    pub key: TensorAddr,
    pub value: TensorAddr,
    pub scores: TensorAddr,
    pub output: TensorAddr,
}

/// Line transfers performed by one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineTraffic {
    pub input_reads: usize,
    pub score_reads: usize,
    pub score_writes: usize,
    pub output_writes: usize,
}

impl LineTraffic {
    pub fn total(&self) -> usize {
        self.input_reads + self.score_reads + self.score_writes + self.output_writes
    }
}

impl KernelPlan {
    pub fn new(dims: Dims, layout: InputLayout) -> Self {
        Self {
            dims,
            layout,
            query: layout.addr(&dims, Operand::Query),
            key: layout.addr(&dims, Operand::Key),
            value: layout.addr(&dims, Operand::Value),
            scores: TensorAddr::scores(&dims),
            output: TensorAddr::output(&dims),
        }
    }

    /// Plan for a worker whose score and output regions hold one batch.
    ///
    /// Inputs keep their global addressing.
    pub fn batch_local(&self) -> Self {
        Self {
            scores: self.scores.batch_local(),
            output: self.output.batch_local(),
            ..*self
        }
    }

    /// Score lines needed by this plan's score addressing.
    pub fn score_lines(&self) -> usize {
        self.scores.end(self.dims.batch(), self.dims.tokens())
            - self.scores.base()
    }

    /// Arena lines: score scratch, Q row cache, P row cache, O accumulator.
    pub fn scratch_lines(&self) -> usize {
        self.score_lines() + 2 * self.dims.row_lines() + self.dims.score_row_lines()
    }

    /// Closed-form line traffic of one invocation.
    pub fn line_traffic(&self) -> LineTraffic {
        let d = &self.dims;
        let row = d.row_lines();
        let causal: usize = (0..d.tokens()).map(|t| d.causal_lines(t)).sum();
        // each token reads its Q row once and one K and V row per causal key
        let pairs = d.tokens() * (d.tokens() + 1) / 2;
        LineTraffic {
            input_reads: d.batch() * (d.tokens() * row + 2 * pairs * row),
            // softmax and aggregation each read every causal score line
            score_reads: 2 * d.batch() * causal,
            // score and softmax each write every causal score line
            score_writes: 2 * d.batch() * causal,
            output_writes: d.output_lines(),
        }
    }
}
