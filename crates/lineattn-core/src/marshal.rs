//! Moving flat element buffers onto and off the line port.

use crate::dims::Dims;
use crate::element::Element;
use crate::error::KernelError;
use crate::layout::{InputLayout, Operand};
use crate::line::Line;

/// Pack a flat buffer into lines. The length must be a whole number of lines.
pub fn pack_lines<E: Element, const L: usize>(elements: &[E]) -> Result<Vec<Line<E, L>>, KernelError> {
    if elements.len() % L != 0 {
        return Err(KernelError::PartialLine { got: elements.len(), lanes: L });
    }
    Ok(elements
        .chunks_exact(L)
        .map(|chunk| {
            let mut line = Line::zeroed();
            line.as_mut_slice().copy_from_slice(chunk);
            line
        })
        .collect())
}

/// Flatten lines back into elements.
pub fn unpack_lines<E: Element, const L: usize>(lines: &[Line<E, L>]) -> Vec<E> {
    let mut out = Vec::with_capacity(lines.len() * L);
    for line in lines {
        out.extend_from_slice(line.as_slice());
    }
    out
}

/// Lay out three row-major `[B][T][C]` tensors as one input region.
pub fn assemble_input<E: Element>(
    dims: &Dims,
    layout: InputLayout,
    q: &[E],
    k: &[E],
    v: &[E],
) -> Result<Vec<E>, KernelError> {
    let n = dims.tensor_elements();
    for (region, t) in [("query", q), ("key", k), ("value", v)] {
        if t.len() != n {
            return Err(KernelError::RegionSize { region, expected: n, got: t.len() });
        }
    }

    let mut input = vec![E::ZERO; 3 * n];
    let c = dims.channels();
    for (op, src) in Operand::ALL.into_iter().zip([q, k, v]) {
        for b in 0..dims.batch() {
            for t in 0..dims.tokens() {
                let row = (b * dims.tokens() + t) * c;
                let dst = layout.element_offset(dims, op, b, t, 0);
                input[dst..dst + c].copy_from_slice(&src[row..row + c]);
            }
        }
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let data: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let lines = pack_lines::<f32, 4>(&data).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1][0], 4.0);
        assert_eq!(unpack_lines(&lines), data);
    }

    #[test]
    fn test_pack_rejects_partial_line() {
        let data = vec![1.0f64; 7];
        assert_eq!(
            pack_lines::<f64, 4>(&data),
            Err(KernelError::PartialLine { got: 7, lanes: 4 })
        );
    }

    #[test]
    fn test_assemble_interleaved() {
        let d = Dims::new(1, 2, 2, 2);
        let q = [1.0f32, 2.0, 3.0, 4.0];
        let k = [5.0f32, 6.0, 7.0, 8.0];
        let v = [9.0f32, 10.0, 11.0, 12.0];
        let input = assemble_input(&d, InputLayout::Interleaved, &q, &k, &v).unwrap();
        assert_eq!(input, vec![1.0, 2.0, 5.0, 6.0, 9.0, 10.0, 3.0, 4.0, 7.0, 8.0, 11.0, 12.0]);

        let concat = assemble_input(&d, InputLayout::Concatenated, &q, &k, &v).unwrap();
        assert_eq!(&concat[4..8], &k);
    }

    #[test]
    fn test_assemble_checks_lengths() {
        let d = Dims::new(1, 2, 2, 2);
        let short = [0.0f32; 3];
        let ok = [0.0f32; 4];
        let err = assemble_input(&d, InputLayout::Concatenated, &ok, &short, &ok).unwrap_err();
        assert_eq!(err, KernelError::RegionSize { region: "key", expected: 4, got: 3 });
    }
}
