//! Runtime SIMD capability detection.
//!
//! The kernel's lane loops are written over whole `[E; L]` lines so the
//! compiler can vectorize them. This reports how a line maps onto the host's
//! vector registers.

use std::fmt;
use std::sync::OnceLock;

use lineattn_core::PORT_BITS;

/// Widest vector register file the host offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VectorTier {
    Scalar,
    Neon,
    Avx2,
    Avx512,
}

impl VectorTier {
    /// Register width in bits, 0 for scalar.
    pub fn register_bits(self) -> usize {
        match self {
            VectorTier::Scalar => 0,
            VectorTier::Neon => 128,
            VectorTier::Avx2 => 256,
            VectorTier::Avx512 => 512,
        }
    }
}

impl fmt::Display for VectorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VectorTier::Scalar => "scalar",
            VectorTier::Neon => "NEON",
            VectorTier::Avx2 => "AVX2",
            VectorTier::Avx512 => "AVX-512",
        };
        write!(f, "{}", name)
    }
}

/// What the host CPU can do with one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimdCapability {
    pub tier: VectorTier,
    /// Fused multiply-add, used by the dot and scaled-add loops when present.
    pub fma: bool,
}

static HOST: OnceLock<SimdCapability> = OnceLock::new();

fn host_capability() -> SimdCapability {
    #[cfg(target_arch = "x86_64")]
    {
        let tier = if is_x86_feature_detected!("avx512f") {
            VectorTier::Avx512
        } else if is_x86_feature_detected!("avx2") {
            VectorTier::Avx2
        } else {
            VectorTier::Scalar
        };
        SimdCapability { tier, fma: is_x86_feature_detected!("fma") }
    }
    #[cfg(target_arch = "aarch64")]
    {
        SimdCapability { tier: VectorTier::Neon, fma: true }
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        SimdCapability { tier: VectorTier::Scalar, fma: false }
    }
}

impl SimdCapability {
    /// Capabilities of the current CPU, probed once.
    pub fn detect() -> &'static SimdCapability {
        HOST.get_or_init(host_capability)
    }

    /// Vector operations needed to cover one port line, `None` when scalar.
    pub fn registers_per_line(&self) -> Option<usize> {
        match self.tier.register_bits() {
            0 => None,
            bits => Some(PORT_BITS.div_ceil(bits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_is_cached() {
        let a = SimdCapability::detect();
        let b = SimdCapability::detect();
        assert!(std::ptr::eq(a, b));
        assert!(!a.tier.to_string().is_empty());
    }

    #[test]
    fn test_registers_per_line() {
        let cap = |tier| SimdCapability { tier, fma: false };
        assert_eq!(cap(VectorTier::Avx512).registers_per_line(), Some(1));
        assert_eq!(cap(VectorTier::Avx2).registers_per_line(), Some(2));
        assert_eq!(cap(VectorTier::Neon).registers_per_line(), Some(4));
        assert_eq!(cap(VectorTier::Scalar).registers_per_line(), None);
        assert!(VectorTier::Avx512 > VectorTier::Avx2);
        assert_eq!(VectorTier::Avx512.to_string(), "AVX-512");
    }
}
