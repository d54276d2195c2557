//! Where each tensor lives inside its region.
//!
//! One [`TensorAddr`] per tensor turns `(b, t, k)` into a line index. No stage
//! computes offsets on its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dims::Dims;
use crate::error::KernelError;

/// Arrangement of Q, K and V inside the input region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    /// Q, then K, then V, each a full `[B][T][C]` block.
    #[default]
    Concatenated,
    /// `[Q_row | K_row | V_row]` repeated for every `(b, t)`.
    Interleaved,
}

/// One of the three input tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Query,
    Key,
    Value,
}

impl Operand {
    pub const ALL: [Operand; 3] = [Operand::Query, Operand::Key, Operand::Value];

    fn slot(self) -> usize {
        match self {
            Operand::Query => 0,
            Operand::Key => 1,
            Operand::Value => 2,
        }
    }
}

impl InputLayout {
    /// Line addressing for one operand under this layout.
    pub fn addr(&self, dims: &Dims, operand: Operand) -> TensorAddr {
        let row = dims.row_lines();
        let slot = operand.slot();
        match self {
            InputLayout::Concatenated => TensorAddr {
                base: slot * dims.tensor_lines(),
                batch_stride: dims.tokens() * row,
                row_stride: row,
                row_lines: row,
                lanes: dims.lanes(),
            },
            InputLayout::Interleaved => TensorAddr {
                base: slot * row,
                batch_stride: dims.tokens() * 3 * row,
                row_stride: 3 * row,
                row_lines: row,
                lanes: dims.lanes(),
            },
        }
    }

    /// Flat element index of `operand[b][t][c]` in the input region.
    pub fn element_offset(&self, dims: &Dims, operand: Operand, b: usize, t: usize, c: usize) -> usize {
        let (tt, cc) = (dims.tokens(), dims.channels());
        match self {
            InputLayout::Concatenated => {
                operand.slot() * dims.tensor_elements() + b * tt * cc + t * cc + c
            }
            InputLayout::Interleaved => b * tt * 3 * cc + t * 3 * cc + operand.slot() * cc + c,
        }
    }
}

impl fmt::Display for InputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputLayout::Concatenated => f.write_str("concatenated"),
            InputLayout::Interleaved => f.write_str("interleaved"),
        }
    }
}

impl FromStr for InputLayout {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concatenated" | "concat" => Ok(InputLayout::Concatenated),
            "interleaved" => Ok(InputLayout::Interleaved),
            other => Err(KernelError::UnknownLayout(other.to_string())),
        }
    }
}

/// Addressing for a row-major `[B][rows][row_lines]` tensor of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorAddr {
    base: usize,
    batch_stride: usize,
    row_stride: usize,
    row_lines: usize,
    lanes: usize,
}

impl TensorAddr {
    /// A densely packed tensor whose rows are `row_lines` lines wide.
    pub fn dense(rows: usize, row_lines: usize, lanes: usize) -> Self {
        Self {
            base: 0,
            batch_stride: rows * row_lines,
            row_stride: row_lines,
            row_lines,
            lanes,
        }
    }

    /// Output tensor `O`, always concatenated `[B][T][C]`.
    pub fn output(dims: &Dims) -> Self {
        Self::dense(dims.tokens(), dims.row_lines(), dims.lanes())
    }

    /// Score scratch `P`, `[B][T][T]`.
    pub fn scores(dims: &Dims) -> Self {
        Self::dense(dims.tokens(), dims.score_row_lines(), dims.lanes())
    }

    /// Same rows, but every batch maps onto the start of the region.
    ///
    /// Used by a worker that owns a region holding a single batch.
    pub fn batch_local(self) -> Self {
        Self {
            base: 0,
            batch_stride: 0,
            ..self
        }
    }

    /// Line `k` of row `t` in batch `b`.
    #[inline]
    pub fn line(&self, b: usize, t: usize, k: usize) -> usize {
        debug_assert!(k < self.row_lines, "line {} outside a {}-line row", k, self.row_lines);
        self.base + b * self.batch_stride + t * self.row_stride + k
    }

    /// `(line, lane)` of element `i` of row `t` in batch `b`.
    #[inline]
    pub fn element(&self, b: usize, t: usize, i: usize) -> (usize, usize) {
        (self.line(b, t, i / self.lanes), i % self.lanes)
    }

    pub fn row_lines(&self) -> usize {
        self.row_lines
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// One past the last line touched by `batches` batches of `rows` rows.
    pub fn end(&self, batches: usize, rows: usize) -> usize {
        if batches == 0 || rows == 0 {
            return self.base;
        }
        self.line(batches - 1, rows - 1, self.row_lines - 1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenated_offsets() {
        let d = Dims::new(2, 4, 4, 2);
        let q = InputLayout::Concatenated.addr(&d, Operand::Query);
        let k = InputLayout::Concatenated.addr(&d, Operand::Key);
        let v = InputLayout::Concatenated.addr(&d, Operand::Value);
        // OFFSET_K = B*T*C/L, OFFSET_V = 2*B*T*C/L
        assert_eq!(k.base(), 16);
        assert_eq!(v.base(), 32);
        assert_eq!(q.line(1, 2, 1), (1 * 4 * 4 + 2 * 4) / 2 + 1);
        assert_eq!(v.end(2, 4), d.input_lines());
    }

    #[test]
    fn test_interleaved_offsets() {
        let d = Dims::new(1, 4, 4, 2);
        let q = InputLayout::Interleaved.addr(&d, Operand::Query);
        let k = InputLayout::Interleaved.addr(&d, Operand::Key);
        let v = InputLayout::Interleaved.addr(&d, Operand::Value);
        assert_eq!(q.line(0, 0, 0), 0);
        assert_eq!(k.line(0, 0, 0), 2);
        assert_eq!(v.line(0, 0, 1), 5);
        assert_eq!(q.line(0, 1, 0), 6);
        assert_eq!(v.end(1, 4), d.input_lines());
    }

    #[test]
    fn test_element_offsets_agree_with_lines() {
        let d = Dims::new(2, 4, 4, 2);
        for layout in [InputLayout::Concatenated, InputLayout::Interleaved] {
            for op in Operand::ALL {
                let addr = layout.addr(&d, op);
                let (line, lane) = addr.element(1, 3, 3);
                let flat = layout.element_offset(&d, op, 1, 3, 3);
                assert_eq!(line * 2 + lane, flat, "{} {:?}", layout, op);
            }
        }
    }

    #[test]
    fn test_batch_local() {
        let d = Dims::new(3, 4, 4, 2);
        let p = TensorAddr::scores(&d);
        assert_eq!(p.line(2, 0, 0), 2 * 8);
        let local = p.batch_local();
        assert_eq!(local.line(2, 3, 1), 7);
        assert_eq!(local.end(1, 4), d.batch_score_lines());
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("Interleaved".parse::<InputLayout>().unwrap(), InputLayout::Interleaved);
        assert_eq!(InputLayout::default(), InputLayout::Concatenated);
        assert!("strided".parse::<InputLayout>().is_err());
    }
}
