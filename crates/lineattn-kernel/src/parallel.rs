//! Batch-parallel execution on the rayon pool.
//!
//! Batches never share a score row, so each worker owns a batch-local
//! workspace and writes a disjoint chunk of the output. Q, K and V are shared
//! read-only.

use rayon::prelude::*;

use lineattn_core::{Element, KernelError, Line, LineRead};

use crate::aggregate::aggregate_batch;
use crate::attention::{check_regions, CausalAttention};
use crate::plan::KernelPlan;
use crate::score::score_batch;
use crate::softmax::softmax_batch;
use crate::workspace::{Scratch, Workspace};

/// Minimum batch count before work is spread across the pool.
const PAR_BATCH_THRESHOLD: usize = 2;

/// Run attention with one worker per batch.
///
/// Produces the same bits as [`CausalAttention::run`]: every batch performs
/// the identical sequence of operations, only on its own scratch.
pub fn run_batches_parallel<E, const L: usize, S>(
    plan: &KernelPlan,
    input: &S,
    output: &mut [Line<E, L>],
) -> Result<(), KernelError>
where
    E: Element,
    S: LineRead<E, L> + Sync + ?Sized,
{
    check_regions(plan, input.line_count(), output.len())?;
    let dims = plan.dims;
    let local = plan.batch_local();
    let per_batch = dims.tokens() * dims.row_lines();
    let output = &mut output[..dims.output_lines()];

    if dims.batch() < PAR_BATCH_THRESHOLD {
        let mut ws = Workspace::new(&local)?;
        for (b, out) in output.chunks_mut(per_batch).enumerate() {
            run_batch(&local, b, input, out, &mut ws);
        }
        return Ok(());
    }

    tracing::debug!(
        batches = dims.batch(),
        threads = rayon::current_num_threads(),
        "batch-parallel attention"
    );
    output
        .par_chunks_mut(per_batch)
        .enumerate()
        .try_for_each_init(
            || Workspace::<E, L>::new(&local),
            |ws, (b, out)| {
                let ws = ws.as_mut().map_err(|e| e.clone())?;
                run_batch(&local, b, input, out, ws);
                Ok(())
            },
        )
}

fn run_batch<E, const L: usize, S>(
    plan: &KernelPlan,
    b: usize,
    input: &S,
    out: &mut [Line<E, L>],
    ws: &mut Workspace<E, L>,
) where
    E: Element,
    S: LineRead<E, L> + ?Sized,
{
    let Scratch { scores, q_row, p_row, o_row } = ws.scratch();
    score_batch(plan, b, input, &mut *scores, &mut *q_row);
    softmax_batch(plan, b, &mut *scores, &mut *p_row);
    aggregate_batch(plan, b, input, &*scores, out, &mut *p_row, &mut *o_row);
}

impl<E: Element, const L: usize> CausalAttention<E, L> {
    /// Like [`CausalAttention::run`], with batches spread over the rayon pool.
    ///
    /// Workers allocate their own batch-sized scratch. The kernel's shared
    /// workspace is left untouched, so [`CausalAttention::scores`] and
    /// [`CausalAttention::probability`] keep reflecting the last sequential
    /// run.
    pub fn run_parallel<S>(&self, input: &S, output: &mut [Line<E, L>]) -> Result<(), KernelError>
    where
        S: LineRead<E, L> + Sync + ?Sized,
    {
        run_batches_parallel(self.plan(), input, output)
    }
}
