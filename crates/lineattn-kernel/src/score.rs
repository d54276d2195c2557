//! Causal score stage: `P[b][t][t2] = (Q[b][t] . K[b][t2]) / sqrt(C)` for
//! every `t2 <= t`.

use lineattn_core::{Element, Line, LineRead, LineStore};

use crate::plan::KernelPlan;

/// Score every query token of batch `b`.
///
/// `q_row` caches the current token's Q row (`C/L` lines) so it is read once
/// per token, not once per key.
pub fn score_batch<E, const L: usize, S, P>(
    plan: &KernelPlan,
    b: usize,
    input: &S,
    scores: &mut P,
    q_row: &mut [Line<E, L>],
) where
    E: Element,
    S: LineRead<E, L> + ?Sized,
    P: LineStore<E, L> + ?Sized,
{
    let scale = plan.dims.scale::<E>();
    for t in 0..plan.dims.tokens() {
        score_row(plan, scale, b, t, input, scores, q_row);
    }
}

fn score_row<E, const L: usize, S, P>(
    plan: &KernelPlan,
    scale: E::Acc,
    b: usize,
    t: usize,
    input: &S,
    scores: &mut P,
    q_row: &mut [Line<E, L>],
) where
    E: Element,
    S: LineRead<E, L> + ?Sized,
    P: LineStore<E, L> + ?Sized,
{
    let q_row = &mut q_row[..plan.query.row_lines()];
    for (k, slot) in q_row.iter_mut().enumerate() {
        *slot = input.read_line(plan.query.line(b, t, k));
    }

    // Scores are packed L to a line; the last line of the row is flushed
    // early with its non-causal lanes left at zero. Dots are scaled before
    // narrowing so every stored score is finite.
    let mut sums = Line::<E, L>::zeroed();
    for t2 in 0..=t {
        let mut acc = E::ACC_ZERO;
        for (k, q) in q_row.iter().enumerate() {
            acc = q.dot_acc(&input.read_line(plan.key.line(b, t2, k)), acc);
        }
        let lane = t2 % L;
        sums[lane] = E::narrow(acc * scale);
        if lane == L - 1 || t2 == t {
            scores.write_line(plan.scores.line(b, t, t2 / L), sums);
            sums = Line::zeroed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineattn_core::{pack_lines, CountingStore, Dims, InputLayout};

    fn tiny_plan() -> KernelPlan {
        KernelPlan::new(Dims::new(1, 4, 2, 2), InputLayout::Concatenated)
    }

    fn tiny_input() -> Vec<Line<f64, 2>> {
        // Q rows, K rows, V rows for T=4, C=2
        let q = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 0.0];
        let k = [1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, -1.0];
        let v = [0.0; 8];
        let flat: Vec<f64> = q.iter().chain(&k).chain(&v).copied().collect();
        pack_lines(&flat).unwrap()
    }

    #[test]
    fn test_scores_match_dot_products() {
        let plan = tiny_plan();
        let input = tiny_input();
        let mut scores = vec![Line::<f64, 2>::zeroed(); plan.dims.score_lines()];
        let mut q_row = vec![Line::<f64, 2>::zeroed(); 1];
        score_batch(&plan, 0, &input, &mut scores, &mut q_row);

        let s = 1.0 / 2f64.sqrt();
        // row 2: q=[1,1] against k0,k1,k2
        assert_eq!(scores[plan.scores.line(0, 2, 0)].into_array(), [s, s]);
        assert_eq!(scores[plan.scores.line(0, 2, 1)].into_array(), [2.0 * s, 0.0]);
        // row 3: q=[2,0] against k0..k3
        assert_eq!(scores[plan.scores.line(0, 3, 0)].into_array(), [2.0 * s, 0.0]);
        assert_eq!(scores[plan.scores.line(0, 3, 1)].into_array(), [2.0 * s, 2.0 * s]);
    }

    #[test]
    fn test_upper_triangle_untouched() {
        let plan = tiny_plan();
        let input = tiny_input();
        let sentinel = Line::<f64, 2>::splat(-7.0);
        let mut scores = vec![sentinel; plan.dims.score_lines()];
        let mut q_row = vec![Line::<f64, 2>::zeroed(); 1];
        score_batch(&plan, 0, &input, &mut scores, &mut q_row);

        assert_eq!(scores[plan.scores.line(0, 0, 1)], sentinel);
        assert_eq!(scores[plan.scores.line(0, 1, 1)], sentinel);
        // t=0 pads lane 1 with zero
        assert_eq!(scores[plan.scores.line(0, 0, 0)][1], 0.0);
    }

    #[test]
    fn test_half_scores_saturate() {
        use half::f16;
        let plan = KernelPlan::new(Dims::new(1, 2, 4, 4), InputLayout::Concatenated);
        let mut scores = vec![Line::<f16, 4>::zeroed(); plan.dims.score_lines()];
        let mut q_row = vec![Line::<f16, 4>::zeroed(); 1];

        // 4 * 250^2 / 2 = 125000, past f16::MAX
        let flat = vec![f16::from_f32(250.0); 3 * plan.dims.tensor_elements()];
        let input = pack_lines::<f16, 4>(&flat).unwrap();
        score_batch(&plan, 0, &input, &mut scores, &mut q_row);
        let row1 = scores[plan.scores.line(0, 1, 0)];
        assert_eq!(row1[0], f16::MAX);
        assert_eq!(row1[1], f16::MAX);

        let mut flipped = flat;
        for x in &mut flipped[0..8] {
            *x = f16::from_f32(-250.0);
        }
        let input = pack_lines::<f16, 4>(&flipped).unwrap();
        score_batch(&plan, 0, &input, &mut scores, &mut q_row);
        assert_eq!(scores[plan.scores.line(0, 0, 0)][0], f16::MIN);
        assert_eq!(scores[plan.scores.line(0, 0, 0)][1], f16::ZERO);
    }

    #[test]
    fn test_q_row_read_once_per_token() {
        let plan = KernelPlan::new(Dims::new(1, 8, 4, 2), InputLayout::Concatenated);
        let flat = vec![0.5f32; 3 * plan.dims.tensor_elements()];
        let input = CountingStore::new(pack_lines::<f32, 2>(&flat).unwrap());
        let mut scores = CountingStore::new(vec![Line::<f32, 2>::zeroed(); plan.dims.score_lines()]);
        let mut q_row = vec![Line::<f32, 2>::zeroed(); 2];
        score_batch(&plan, 0, &input, &mut scores, &mut q_row);

        let (t, row) = (8, 2);
        let pairs = t * (t + 1) / 2;
        // Q once per token, K once per causal pair
        assert_eq!(input.reads(), t * row + pairs * row);
        let causal: usize = (0..t).map(|t| plan.dims.causal_lines(t)).sum();
        assert_eq!(scores.writes(), causal);
        assert_eq!(scores.reads(), 0);
    }
}
