//! Kernel dimensions and the sizes derived from them.

use crate::element::Element;
use crate::error::KernelError;

/// Batch count `B`, token count `T`, channel width `C` and line width `L`.
///
/// `T` and `C` are whole multiples of `L`, so every row of Q, K, V, O and P
/// starts on a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    batch: usize,
    tokens: usize,
    channels: usize,
    lanes: usize,
}

impl Dims {
    /// Builds dimensions, panicking on a misaligned shape.
    ///
    /// Usable in `const` items, where a bad shape becomes a compile error:
    ///
    /// ```
    /// use lineattn_core::Dims;
    /// const SMALL: Dims = Dims::new(1, 32, 64, 16);
    /// assert_eq!(SMALL.row_lines(), 4);
    /// ```
    pub const fn new(batch: usize, tokens: usize, channels: usize, lanes: usize) -> Self {
        assert!(batch > 0 && tokens > 0 && channels > 0 && lanes > 0, "dimensions must be non-zero");
        assert!(tokens % lanes == 0, "tokens must be a multiple of the line width");
        assert!(channels % lanes == 0, "channels must be a multiple of the line width");
        Self { batch, tokens, channels, lanes }
    }

    /// Builds dimensions, reporting a misaligned shape as an error.
    pub fn try_new(
        batch: usize,
        tokens: usize,
        channels: usize,
        lanes: usize,
    ) -> Result<Self, KernelError> {
        for (name, value) in [("batch", batch), ("tokens", tokens), ("channels", channels), ("lanes", lanes)] {
            if value == 0 {
                return Err(KernelError::ZeroDimension { name });
            }
        }
        for (name, value) in [("tokens", tokens), ("channels", channels)] {
            if value % lanes != 0 {
                return Err(KernelError::Misaligned { name, value, lanes });
            }
        }
        Ok(Self { batch, tokens, channels, lanes })
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Lines per Q/K/V/O row (`C/L`).
    pub const fn row_lines(&self) -> usize {
        self.channels / self.lanes
    }

    /// Lines per score row (`T/L`).
    pub const fn score_row_lines(&self) -> usize {
        self.tokens / self.lanes
    }

    /// Lines in one `[B][T][C]` tensor.
    pub const fn tensor_lines(&self) -> usize {
        self.batch * self.tokens * self.row_lines()
    }

    /// Lines in the input region holding Q, K and V.
    pub const fn input_lines(&self) -> usize {
        3 * self.tensor_lines()
    }

    pub const fn output_lines(&self) -> usize {
        self.tensor_lines()
    }

    /// Lines in the full `[B][T][T]` score scratch.
    pub const fn score_lines(&self) -> usize {
        self.batch * self.batch_score_lines()
    }

    /// Lines in one batch's `[T][T]` score scratch.
    pub const fn batch_score_lines(&self) -> usize {
        self.tokens * self.score_row_lines()
    }

    /// Score lines of row `t` that hold at least one causal entry.
    pub const fn causal_lines(&self, t: usize) -> usize {
        t / self.lanes + 1
    }

    /// Causal lanes (`t2 <= t`) in line `k` of score row `t`.
    pub const fn causal_lanes(&self, t: usize, k: usize) -> usize {
        let first = k * self.lanes;
        if t < first {
            0
        } else if t - first + 1 >= self.lanes {
            self.lanes
        } else {
            t - first + 1
        }
    }

    /// Number of elements in one `[B][T][C]` tensor.
    pub const fn tensor_elements(&self) -> usize {
        self.batch * self.tokens * self.channels
    }

    /// Score scale `1/sqrt(C)` in the dot-product accumulator of `E`.
    pub fn scale<E: Element>(&self) -> E::Acc {
        E::acc_from_f64(1.0 / (self.channels as f64).sqrt())
    }
}
