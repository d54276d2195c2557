//! Acceptance check: element-wise comparison against the reference.
//!
//! Every element is compared; mismatches are collected rather than stopping
//! at the first one.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lineattn_core::{Element, KernelError};

/// Mismatches printed by the report's `Display`.
pub const MAX_REPORTED: usize = 10;

/// One element outside tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub index: usize,
    pub actual: f64,
    pub expected: f64,
    pub diff: f64,
}

/// Outcome of comparing a kernel output with the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub compared: usize,
    pub epsilon: f64,
    /// Largest absolute difference seen; infinite if any difference was NaN.
    pub max_diff: f64,
    pub mismatches: Vec<Mismatch>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.mismatches.len()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in self.mismatches.iter().take(MAX_REPORTED) {
            writeln!(
                f,
                "Error at index {}: kernel={:.6}, reference={:.6}, diff={:.3e}",
                m.index, m.actual, m.expected, m.diff
            )?;
        }
        if self.error_count() > MAX_REPORTED {
            writeln!(f, "... and {} more", self.error_count() - MAX_REPORTED)?;
        }
        writeln!(f, "Max difference: {:.3e}", self.max_diff)?;
        write!(
            f,
            "{}: {} errors in {} elements (epsilon {:e})",
            if self.passed() { "SUCCESS" } else { "FAILED" },
            self.error_count(),
            self.compared,
            self.epsilon
        )
    }
}

/// Compare `actual` against `expected` with absolute tolerance `epsilon`.
///
/// A non-finite difference always counts as a mismatch.
pub fn compare<E: Element>(actual: &[E], expected: &[E], epsilon: f64) -> Result<CheckReport, KernelError> {
    if actual.len() != expected.len() {
        return Err(KernelError::RegionSize {
            region: "reference",
            expected: expected.len(),
            got: actual.len(),
        });
    }

    let mut max_diff = 0.0f64;
    let mut mismatches = Vec::new();
    for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let (actual, expected) = (a.to_f64(), e.to_f64());
        let diff = (actual - expected).abs();
        let diff = if diff.is_nan() { f64::INFINITY } else { diff };
        max_diff = max_diff.max(diff);
        if !(diff <= epsilon) {
            mismatches.push(Mismatch { index, actual, expected, diff });
        }
    }
    Ok(CheckReport { compared: actual.len(), epsilon, max_diff, mismatches })
}

/// `n` seeded values drawn uniformly from `[-1, 1)`.
pub fn random_elements<E: Element>(n: usize, seed: u64) -> Vec<E> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| E::from_f64(rng.gen_range(-1.0..1.0))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_every_mismatch() {
        let expected = vec![0.0f32; 20];
        let mut actual = expected.clone();
        for i in (0..20).step_by(2) {
            actual[i] = 1.0;
        }
        actual[3] = 0.005;
        let report = compare(&actual, &expected, 1e-2).unwrap();
        assert_eq!(report.error_count(), 10);
        assert_eq!(report.compared, 20);
        assert_eq!(report.max_diff, 1.0);
        assert!(!report.passed());
        assert_eq!(report.mismatches[1], Mismatch { index: 2, actual: 1.0, expected: 0.0, diff: 1.0 });
    }

    #[test]
    fn test_nan_is_a_mismatch() {
        let report = compare(&[f64::NAN, 1.0], &[0.0, 1.0], 1e-2).unwrap();
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.max_diff, f64::INFINITY);
    }

    #[test]
    fn test_report_display() {
        let expected = vec![0.0f64; 12];
        let actual = vec![0.5f64; 12];
        let text = compare(&actual, &expected, 1e-2).unwrap().to_string();
        assert_eq!(text.matches("Error at index").count(), MAX_REPORTED);
        assert!(text.contains("... and 2 more"));
        assert!(text.contains("FAILED"));

        let ok = compare(&expected, &expected, 1e-2).unwrap();
        assert!(ok.passed());
        assert!(ok.to_string().starts_with("Max difference"));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(compare(&[1.0f32], &[1.0, 2.0], 1e-2).is_err());
    }

    #[test]
    fn test_random_elements_seeded() {
        let a: Vec<f32> = random_elements(64, 7);
        let b: Vec<f32> = random_elements(64, 7);
        let c: Vec<f32> = random_elements(64, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|&v| (-1.0..1.0).contains(&v)));
    }
}
