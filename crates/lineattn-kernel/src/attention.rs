//! Orchestrator: score, softmax and aggregation passes over a shared score
//! scratch.

use lineattn_core::{Dims, Element, InputLayout, KernelError, Line, LineRead, LineStore};

use crate::aggregate::aggregate_batch;
use crate::plan::KernelPlan;
use crate::score::score_batch;
use crate::softmax::softmax_batch;
use crate::workspace::{Scratch, Workspace};

/// Causal self-attention for one fixed shape, element type and line width.
///
/// Construction validates the shape and allocates all scratch. `run` moves
/// only lines and never allocates.
///
/// ```
/// use lineattn_core::{Dims, InputLayout, Line};
/// use lineattn_kernel::CausalAttention;
///
/// let dims = Dims::new(1, 16, 16, 16);
/// let mut attn = CausalAttention::<f32, 16>::new(dims, InputLayout::Concatenated).unwrap();
/// let input = vec![Line::<f32, 16>::splat(0.5); dims.input_lines()];
/// let mut output = vec![Line::<f32, 16>::zeroed(); dims.output_lines()];
/// attn.run(&input, &mut output).unwrap();
/// assert_eq!(output[0], Line::splat(0.5));
/// ```
pub struct CausalAttention<E: Element, const L: usize> {
    plan: KernelPlan,
    workspace: Workspace<E, L>,
}

impl<E: Element, const L: usize> CausalAttention<E, L> {
    pub fn new(dims: Dims, layout: InputLayout) -> Result<Self, KernelError> {
        if dims.lanes() != L {
            return Err(KernelError::Config(format!(
                "dims use {} lanes but the kernel is built for {}-element lines",
                dims.lanes(),
                L
            )));
        }
        let plan = KernelPlan::new(dims, layout);
        let workspace = Workspace::new(&plan)?;
        let dtype = E::DTYPE;
        tracing::debug!(
            %dtype,
            batch = dims.batch(),
            tokens = dims.tokens(),
            channels = dims.channels(),
            lanes = L,
            %layout,
            scratch_lines = workspace.lines(),
            "causal attention kernel ready"
        );
        Ok(Self { plan, workspace })
    }

    pub fn plan(&self) -> &KernelPlan {
        &self.plan
    }

    pub fn dims(&self) -> &Dims {
        &self.plan.dims
    }

    /// Score matrix left by the last [`run`](Self::run) (normalized
    /// probabilities).
    ///
    /// Only the causal lines of each row are meaningful. Parallel runs use
    /// per-worker scratch and do not update it, so after only
    /// [`run_parallel`](Self::run_parallel) every line is still zero.
    pub fn scores(&self) -> &[Line<E, L>] {
        self.workspace.scores()
    }

    /// Probability `P[b][t][t2]` from the last [`run`](Self::run). Not
    /// updated by [`run_parallel`](Self::run_parallel).
    pub fn probability(&self, b: usize, t: usize, t2: usize) -> E {
        debug_assert!(t2 <= t, "P[{}][{}][{}] is above the diagonal", b, t, t2);
        self.workspace.scores().read_element(self.plan.scores.element(b, t, t2))
    }

    /// Run all three stages over every batch.
    ///
    /// Each stage finishes all batches before the next one starts.
    pub fn run<S, O>(&mut self, input: &S, output: &mut O) -> Result<(), KernelError>
    where
        S: LineRead<E, L> + ?Sized,
        O: LineStore<E, L> + ?Sized,
    {
        check_regions(&self.plan, input.line_count(), output.line_count())?;
        let plan = &self.plan;
        let batches = plan.dims.batch();
        let Scratch { scores, q_row, p_row, o_row } = self.workspace.scratch();

        for b in 0..batches {
            score_batch(plan, b, input, &mut *scores, &mut *q_row);
        }
        tracing::trace!(batches, "score pass done");

        for b in 0..batches {
            softmax_batch(plan, b, &mut *scores, &mut *p_row);
        }
        tracing::trace!(batches, "softmax pass done");

        for b in 0..batches {
            aggregate_batch(
                plan,
                b,
                input,
                &*scores,
                &mut *output,
                &mut *p_row,
                &mut *o_row,
            );
        }
        tracing::trace!(batches, "aggregation pass done");
        Ok(())
    }
}

/// Reject regions too small for `plan`.
pub(crate) fn check_regions(plan: &KernelPlan, input: usize, output: usize) -> Result<(), KernelError> {
    let dims = &plan.dims;
    if input < dims.input_lines() {
        return Err(KernelError::RegionSize {
            region: "input",
            expected: dims.input_lines(),
            got: input,
        });
    }
    if output < dims.output_lines() {
        return Err(KernelError::RegionSize {
            region: "output",
            expected: dims.output_lines(),
            got: output,
        });
    }
    Ok(())
}
