//! Plain element-at-a-time attention used as the acceptance reference.
//!
//! Works on a flat element buffer with no line structure, no caches and a
//! full-length score row. Normalization divides by the exp-sum directly.
//! Dot products widen and saturate the same way the score stage does.

use lineattn_core::{Dims, Element, InputLayout, KernelError, Operand};

/// Causal attention over a flat input region laid out per `layout`.
///
/// Returns the `[B][T][C]` output as flat elements.
pub fn reference_attention<E: Element>(
    dims: &Dims,
    layout: InputLayout,
    input: &[E],
) -> Result<Vec<E>, KernelError> {
    let n = dims.tensor_elements();
    if input.len() < 3 * n {
        return Err(KernelError::RegionSize { region: "input", expected: 3 * n, got: input.len() });
    }
    let (tokens, channels) = (dims.tokens(), dims.channels());
    let at = |op: Operand, b: usize, t: usize, c: usize| input[layout.element_offset(dims, op, b, t, c)];
    let scale = dims.scale::<E>();

    let mut output = vec![E::ZERO; n];
    let mut probs = vec![E::ZERO; tokens];
    for b in 0..dims.batch() {
        for t in 0..tokens {
            for t2 in 0..=t {
                let mut dot = E::ACC_ZERO;
                for c in 0..channels {
                    dot = dot + at(Operand::Query, b, t, c).widen() * at(Operand::Key, b, t2, c).widen();
                }
                probs[t2] = E::narrow(dot * scale);
            }

            let mut max = E::LOWEST;
            for &s in &probs[..=t] {
                if s > max {
                    max = s;
                }
            }
            let mut sum = E::ZERO;
            for p in probs[..=t].iter_mut() {
                *p = (*p - max).exp();
                sum = sum + *p;
            }
            for p in probs[..=t].iter_mut() {
                *p = *p / sum;
            }

            for c in 0..channels {
                let mut acc = E::ZERO;
                for (t2, &p) in probs[..=t].iter().enumerate() {
                    acc = acc + p * at(Operand::Value, b, t2, c);
                }
                output[(b * tokens + t) * channels + c] = acc;
            }
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token_copies_value() {
        let d = Dims::new(2, 2, 2, 1);
        let input: Vec<f64> = (0..24).map(|i| i as f64 * 0.1).collect();
        let out = reference_attention(&d, InputLayout::Concatenated, &input).unwrap();
        // V starts at element 16
        assert_eq!(&out[0..2], &input[16..18]);
        assert_eq!(&out[4..6], &input[20..22]);
    }

    #[test]
    fn test_zero_queries_average_values() {
        let d = Dims::new(1, 4, 1, 1);
        let mut input = vec![0.0f32; 12];
        input[8..12].copy_from_slice(&[1.0, 2.0, 3.0, 6.0]);
        let out = reference_attention(&d, InputLayout::Concatenated, &input).unwrap();
        for (got, want) in out.iter().zip([1.0, 1.5, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-6, "got {}, want {}", got, want);
        }
    }

    #[test]
    fn test_short_input() {
        let d = Dims::new(1, 2, 2, 2);
        let err = reference_attention(&d, InputLayout::Interleaved, &[0.0f32; 5]).unwrap_err();
        assert_eq!(err, KernelError::RegionSize { region: "input", expected: 12, got: 5 });
    }
}
