//! Weighted aggregation: `O[b][t] = sum over t2 <= t of P[b][t][t2] * V[b][t2]`.

use lineattn_core::{Element, Line, LineRead, LineStore};

use crate::plan::KernelPlan;

/// Produce every output row of batch `b` from normalized scores and V.
///
/// `p_row` caches the token's causal score lines, `o_row` is a full-width
/// accumulator written out as whole lines once per token.
pub fn aggregate_batch<E, const L: usize, S, P, O>(
    plan: &KernelPlan,
    b: usize,
    input: &S,
    scores: &P,
    output: &mut O,
    p_row: &mut [Line<E, L>],
    o_row: &mut [Line<E, L>],
) where
    E: Element,
    S: LineRead<E, L> + ?Sized,
    P: LineRead<E, L> + ?Sized,
    O: LineStore<E, L> + ?Sized,
{
    let dims = &plan.dims;
    let o_row = &mut o_row[..plan.value.row_lines()];
    for t in 0..dims.tokens() {
        let p_row = &mut p_row[..dims.causal_lines(t)];
        for (k, slot) in p_row.iter_mut().enumerate() {
            *slot = scores.read_line(plan.scores.line(b, t, k));
        }

        o_row.fill(Line::zeroed());
        for t2 in 0..=t {
            let p = p_row[t2 / L][t2 % L];
            for (k, acc) in o_row.iter_mut().enumerate() {
                *acc = acc.scaled_add(p, &input.read_line(plan.value.line(b, t2, k)));
            }
        }

        for (k, acc) in o_row.iter().enumerate() {
            output.write_line(plan.output.line(b, t, k), *acc);
        }
    }
}
