//! The line: the unit every tensor transfer moves.

use std::ops::{Index, IndexMut};

use crate::element::Element;

/// `L` consecutive elements moved by one port transfer.
///
/// A plain value type. Stages copy lines in and out of local caches and never
/// hold references into the backing store.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct Line<E, const L: usize>([E; L]);

impl<E: Element, const L: usize> Line<E, L> {
    pub const LANES: usize = L;

    pub fn zeroed() -> Self {
        Self([E::ZERO; L])
    }

    pub fn splat(v: E) -> Self {
        Self([v; L])
    }

    pub fn into_array(self) -> [E; L] {
        self.0
    }

    pub fn as_slice(&self) -> &[E] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [E] {
        &mut self.0
    }

    /// Accumulates the lane-wise products of `self` and `other` onto `acc`
    /// in the widened accumulator type, lane 0 first.
    #[inline]
    pub fn dot_acc(&self, other: &Self, acc: E::Acc) -> E::Acc {
        let mut acc = acc;
        for i in 0..L {
            acc = acc + self.0[i].widen() * other.0[i].widen();
        }
        acc
    }

    /// Returns `self + p * v` lane-wise.
    #[inline]
    pub fn scaled_add(&self, p: E, v: &Self) -> Self {
        let mut out = *self;
        for i in 0..L {
            out.0[i] = self.0[i] + p * v.0[i];
        }
        out
    }

    /// Largest of the first `live` lanes and `init`.
    #[inline]
    pub fn max_prefix(&self, live: usize, init: E) -> E {
        self.0[..live.min(L)]
            .iter()
            .fold(init, |m, &x| if x > m { x } else { m })
    }

    /// Replaces the first `live` lanes with `exp(x - shift)`, zeroes the rest,
    /// and returns `acc` plus the new live lanes summed in lane order.
    #[inline]
    pub fn exp_shifted(&mut self, live: usize, shift: E, acc: E) -> E {
        let mut acc = acc;
        for (i, x) in self.0.iter_mut().enumerate() {
            if i < live {
                *x = (*x - shift).exp();
                acc = acc + *x;
            } else {
                *x = E::ZERO;
            }
        }
        acc
    }

    #[inline]
    pub fn scale(&mut self, s: E) {
        for x in self.0.iter_mut() {
            *x = *x * s;
        }
    }
}

impl<E: Element, const L: usize> Default for Line<E, L> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<E, const L: usize> From<[E; L]> for Line<E, L> {
    fn from(lanes: [E; L]) -> Self {
        Self(lanes)
    }
}

impl<E, const L: usize> Index<usize> for Line<E, L> {
    type Output = E;

    #[inline]
    fn index(&self, lane: usize) -> &E {
        &self.0[lane]
    }
}

impl<E, const L: usize> IndexMut<usize> for Line<E, L> {
    #[inline]
    fn index_mut(&mut self, lane: usize) -> &mut E {
        &mut self.0[lane]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    #[test]
    fn test_zeroed_and_splat() {
        let z = Line::<f32, 16>::zeroed();
        assert!(z.as_slice().iter().all(|&v| v == 0.0));
        let s = Line::<f64, 8>::splat(2.5);
        assert!(s.as_slice().iter().all(|&v| v == 2.5));
        assert_eq!(Line::<f32, 16>::LANES, 16);
    }

    #[test]
    fn test_dot_acc() {
        let a = Line::from([1.0f32, 2.0, 3.0, 4.0]);
        let b = Line::from([0.5f32, 0.5, 0.5, 0.5]);
        assert_eq!(a.dot_acc(&b, 0.0), 5.0);
        assert_eq!(a.dot_acc(&b, 1.0), 6.0);
    }

    #[test]
    fn test_half_dot_does_not_overflow() {
        let a = Line::<f16, 4>::splat(f16::from_f32(200.0));
        // 4 * 200^2 = 160000, past f16::MAX
        let acc = a.dot_acc(&a, 0.0);
        assert_eq!(acc, 160_000.0f32);
    }

    #[test]
    fn test_scaled_add() {
        let acc = Line::from([1.0f64, 1.0]);
        let v = Line::from([2.0f64, -4.0]);
        let out = acc.scaled_add(0.5, &v);
        assert_eq!(out.into_array(), [2.0, -1.0]);
    }

    #[test]
    fn test_max_prefix_ignores_dead_lanes() {
        let l = Line::from([1.0f32, 3.0, 99.0, 100.0]);
        assert_eq!(l.max_prefix(2, f32::MIN), 3.0);
        assert_eq!(l.max_prefix(4, f32::MIN), 100.0);
        assert_eq!(l.max_prefix(1, 7.0), 7.0);
    }

    #[test]
    fn test_exp_shifted_zero_fills() {
        let mut l = Line::from([2.0f64, 2.0, 5.0, 5.0]);
        let sum = l.exp_shifted(2, 2.0, 0.0);
        assert_eq!(sum, 2.0);
        assert_eq!(l.into_array(), [1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_index_and_scale() {
        let mut l = Line::<f32, 4>::zeroed();
        l[1] = 4.0;
        l[3] = -2.0;
        l.scale(0.5);
        assert_eq!(l[1], 2.0);
        assert_eq!(l[3], -1.0);
        assert_eq!(l[0], 0.0);
    }
}
