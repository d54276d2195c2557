//! Stable softmax over each causal score row, in place.

use lineattn_core::{Element, Line, LineStore};

use crate::plan::KernelPlan;

/// Normalize every score row of batch `b`.
///
/// Only the `t/L + 1` lines holding causal entries are cached and rewritten.
/// Lanes above the diagonal come back as zero.
pub fn softmax_batch<E, const L: usize, P>(
    plan: &KernelPlan,
    b: usize,
    scores: &mut P,
    p_row: &mut [Line<E, L>],
) where
    E: Element,
    P: LineStore<E, L> + ?Sized,
{
    for t in 0..plan.dims.tokens() {
        softmax_row(plan, b, t, scores, p_row);
    }
}

fn softmax_row<E, const L: usize, P>(
    plan: &KernelPlan,
    b: usize,
    t: usize,
    scores: &mut P,
    p_row: &mut [Line<E, L>],
) where
    E: Element,
    P: LineStore<E, L> + ?Sized,
{
    let dims = &plan.dims;
    let row = &mut p_row[..dims.causal_lines(t)];
    for (k, slot) in row.iter_mut().enumerate() {
        *slot = scores.read_line(plan.scores.line(b, t, k));
    }

    let max = row
        .iter()
        .enumerate()
        .fold(E::LOWEST, |m, (k, line)| line.max_prefix(dims.causal_lanes(t, k), m));

    // The lane holding `max` contributes exp(0) = 1, so expsum >= 1.
    let mut expsum = E::ZERO;
    for (k, line) in row.iter_mut().enumerate() {
        expsum = line.exp_shifted(dims.causal_lanes(t, k), max, expsum);
    }

    let inv = expsum.recip();
    for (k, line) in row.iter_mut().enumerate() {
        line.scale(inv);
        scores.write_line(plan.scores.line(b, t, k), *line);
    }
}
