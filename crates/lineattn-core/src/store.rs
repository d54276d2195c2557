//! The line-granular memory port.
//!
//! Tensors are only ever reached through [`LineRead`] / [`LineStore`]: whole
//! lines in, whole lines out. Element access is derived from line access, and
//! an element store is a read-modify-write of its containing line.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::element::Element;
use crate::line::Line;

/// Read side of a line-addressed memory region.
pub trait LineRead<E: Element, const L: usize> {
    /// Number of addressable lines.
    fn line_count(&self) -> usize;

    fn read_line(&self, index: usize) -> Line<E, L>;

    /// Reads one element given its `(line, lane)` address.
    fn read_element(&self, (line, lane): (usize, usize)) -> E {
        self.read_line(line)[lane]
    }
}

/// Write side of a line-addressed memory region.
pub trait LineStore<E: Element, const L: usize>: LineRead<E, L> {
    fn write_line(&mut self, index: usize, line: Line<E, L>);

    /// Stores one element by rewriting its whole containing line.
    fn write_element(&mut self, (line, lane): (usize, usize), value: E) {
        let mut buf = self.read_line(line);
        buf[lane] = value;
        self.write_line(line, buf);
    }
}

impl<E: Element, const L: usize> LineRead<E, L> for [Line<E, L>] {
    #[inline]
    fn line_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn read_line(&self, index: usize) -> Line<E, L> {
        self[index]
    }
}

impl<E: Element, const L: usize> LineStore<E, L> for [Line<E, L>] {
    #[inline]
    fn write_line(&mut self, index: usize, line: Line<E, L>) {
        self[index] = line;
    }
}

impl<E: Element, const L: usize> LineRead<E, L> for Vec<Line<E, L>> {
    #[inline]
    fn line_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn read_line(&self, index: usize) -> Line<E, L> {
        self[index]
    }
}

impl<E: Element, const L: usize> LineStore<E, L> for Vec<Line<E, L>> {
    #[inline]
    fn write_line(&mut self, index: usize, line: Line<E, L>) {
        self[index] = line;
    }
}

/// Wraps a store and counts every line transfer through it.
///
/// Counters are atomic so a counted input can still be shared across batch
/// workers.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn reset_counts(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<E: Element, const L: usize, S: LineRead<E, L>> LineRead<E, L> for CountingStore<S> {
    fn line_count(&self) -> usize {
        self.inner.line_count()
    }

    fn read_line(&self, index: usize) -> Line<E, L> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.read_line(index)
    }
}

impl<E: Element, const L: usize, S: LineStore<E, L>> LineStore<E, L> for CountingStore<S> {
    fn write_line(&mut self, index: usize, line: Line<E, L>) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.write_line(index, line);
    }
}
