//! Arena-backed scratch owned by one kernel invocation.

use lineattn_core::{Element, KernelError, Line, LineArena, LineSlot};

use crate::plan::KernelPlan;

/// Score scratch plus the three per-token line caches.
pub struct Workspace<E, const L: usize> {
    arena: LineArena<E, L>,
    scores: LineSlot,
    q_row: LineSlot,
    p_row: LineSlot,
    o_row: LineSlot,
}

/// Disjoint mutable views into a [`Workspace`].
pub struct Scratch<'a, E, const L: usize> {
    /// Score matrix P, addressed by the plan's score `TensorAddr`.
    pub scores: &'a mut [Line<E, L>],
    /// Cached Q row, `C/L` lines.
    pub q_row: &'a mut [Line<E, L>],
    /// Cached P row, `T/L` lines.
    pub p_row: &'a mut [Line<E, L>],
    /// Output accumulator, `C/L` lines.
    pub o_row: &'a mut [Line<E, L>],
}

impl<E: Element, const L: usize> Workspace<E, L> {
    /// Allocate scratch for `plan`. The score region matches the plan's
    /// score addressing: all batches, or one for a batch-local plan.
    pub fn new(plan: &KernelPlan) -> Result<Self, KernelError> {
        let dims = &plan.dims;
        let mut arena = LineArena::new(plan.scratch_lines());
        let mut reserve = |n: usize| {
            let remaining = arena.remaining();
            arena
                .reserve(n)
                .ok_or(KernelError::ArenaExhausted { requested: n, remaining })
        };
        let scores = reserve(plan.score_lines())?;
        let q_row = reserve(dims.row_lines())?;
        let p_row = reserve(dims.score_row_lines())?;
        let o_row = reserve(dims.row_lines())?;
        Ok(Self { arena, scores, q_row, p_row, o_row })
    }

    pub fn scratch(&mut self) -> Scratch<'_, E, L> {
        let [scores, q_row, p_row, o_row] =
            self.arena
                .parts_mut([self.scores, self.q_row, self.p_row, self.o_row]);
        Scratch { scores, q_row, p_row, o_row }
    }

    /// The score matrix as left by the last run.
    pub fn scores(&self) -> &[Line<E, L>] {
        self.arena.slice(self.scores)
    }

    /// Total lines held by the workspace.
    pub fn lines(&self) -> usize {
        self.arena.capacity()
    }
}
