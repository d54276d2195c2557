//! Line arena for allocation-free kernel invocations.
//!
//! The score scratch and the per-token caches are carved out of one
//! pre-allocated line buffer when the kernel is built. Running the kernel
//! never touches the heap.

use crate::element::Element;
use crate::line::Line;

/// A reserved run of lines inside a [`LineArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSlot {
    start: usize,
    len: usize,
}

impl LineSlot {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A bump-pointer arena of lines.
///
/// Slots are handed out in increasing order. `reset()` forgets every slot but
/// keeps the buffer.
pub struct LineArena<E, const L: usize> {
    buf: Vec<Line<E, L>>,
    offset: usize,
}

impl<E: Element, const L: usize> LineArena<E, L> {
    /// Create an arena holding `capacity` zeroed lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![Line::zeroed(); capacity],
            offset: 0,
        }
    }

    /// Reserve `n` lines. Returns `None` if the arena is exhausted.
    pub fn reserve(&mut self, n: usize) -> Option<LineSlot> {
        let end = self.offset.checked_add(n)?;
        if end > self.buf.len() {
            return None;
        }
        let slot = LineSlot { start: self.offset, len: n };
        self.offset = end;
        Some(slot)
    }

    pub fn slice(&self, slot: LineSlot) -> &[Line<E, L>] {
        &self.buf[slot.start..slot.start + slot.len]
    }

    pub fn slice_mut(&mut self, slot: LineSlot) -> &mut [Line<E, L>] {
        &mut self.buf[slot.start..slot.start + slot.len]
    }

    /// Borrow several slots at once as disjoint mutable slices.
    ///
    /// Panics unless the slots are given in increasing, non-overlapping order.
    pub fn parts_mut<const N: usize>(&mut self, slots: [LineSlot; N]) -> [&mut [Line<E, L>]; N] {
        let mut rest: &mut [Line<E, L>] = &mut self.buf;
        let mut consumed = 0;
        slots.map(|slot| {
            assert!(slot.start >= consumed, "arena slots out of order");
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(slot.start - consumed);
            let (part, tail) = tail.split_at_mut(slot.len);
            rest = tail;
            consumed = slot.start + slot.len;
            part
        })
    }

    /// Reset the arena for reuse. Does not deallocate.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Lines reserved so far.
    pub fn used(&self) -> usize {
        self.offset
    }

    /// Total capacity in lines.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }
}
