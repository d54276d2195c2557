//! Scalar element types that can populate a line.

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use half::{bf16, f16};

use crate::dtype::DType;

/// A floating-point scalar the kernel can compute in.
///
/// Arithmetic stays in the element type itself, so an `f16` build rounds at
/// every step exactly like a 16-bit datapath would. The half types widen to
/// `f32` for `exp` and for dot products, which add up in [`Element::Acc`] and
/// come back through [`Element::narrow`].
pub trait Element:
    Copy
    + Default
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    const DTYPE: DType;
    const ZERO: Self;
    const ONE: Self;
    /// Most negative finite value. Seeds the row-max search.
    const LOWEST: Self;
    /// Largest finite value.
    const MAX: Self;

    /// Dot-product accumulator. `f32` for the half types, `Self` otherwise.
    type Acc: Copy
        + PartialOrd
        + fmt::Debug
        + Send
        + Sync
        + Add<Output = Self::Acc>
        + Mul<Output = Self::Acc>;
    const ACC_ZERO: Self::Acc;

    fn widen(self) -> Self::Acc;
    /// Rounds back to `Self`, saturating to `[LOWEST, MAX]` so an overflowed
    /// sum never becomes infinite. NaN passes through.
    fn narrow(acc: Self::Acc) -> Self;
    fn acc_from_f64(v: f64) -> Self::Acc;

    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
    fn exp(self) -> Self;
    fn recip(self) -> Self;
    fn is_finite(self) -> bool;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const LOWEST: Self = f32::MIN;
    const MAX: Self = f32::MAX;

    type Acc = f32;
    const ACC_ZERO: f32 = 0.0;

    #[inline]
    fn widen(self) -> f32 {
        self
    }
    #[inline]
    fn narrow(acc: f32) -> Self {
        acc.clamp(f32::MIN, f32::MAX)
    }
    #[inline]
    fn acc_from_f64(v: f64) -> f32 {
        v as f32
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn exp(self) -> Self {
        f32::exp(self)
    }
    #[inline]
    fn recip(self) -> Self {
        f32::recip(self)
    }
    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const LOWEST: Self = f64::MIN;
    const MAX: Self = f64::MAX;

    type Acc = f64;
    const ACC_ZERO: f64 = 0.0;

    #[inline]
    fn widen(self) -> f64 {
        self
    }
    #[inline]
    fn narrow(acc: f64) -> Self {
        acc.clamp(f64::MIN, f64::MAX)
    }
    #[inline]
    fn acc_from_f64(v: f64) -> f64 {
        v as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }
    #[inline]
    fn recip(self) -> Self {
        f64::recip(self)
    }
    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

macro_rules! impl_half_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;
            const ZERO: Self = <$ty>::ZERO;
            const ONE: Self = <$ty>::ONE;
            const LOWEST: Self = <$ty>::MIN;
            const MAX: Self = <$ty>::MAX;

            type Acc = f32;
            const ACC_ZERO: f32 = 0.0;

            #[inline]
            fn widen(self) -> f32 {
                self.to_f32()
            }
            #[inline]
            fn narrow(acc: f32) -> Self {
                <$ty>::from_f32(acc.clamp(<$ty>::MIN.to_f32(), <$ty>::MAX.to_f32()))
            }
            #[inline]
            fn acc_from_f64(v: f64) -> f32 {
                v as f32
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                <$ty>::from_f64(v)
            }
            #[inline]
            fn to_f64(self) -> f64 {
                <$ty>::to_f64(self)
            }
            #[inline]
            fn exp(self) -> Self {
                <$ty>::from_f32(self.to_f32().exp())
            }
            #[inline]
            fn recip(self) -> Self {
                <$ty>::from_f32(self.to_f32().recip())
            }
            #[inline]
            fn is_finite(self) -> bool {
                <$ty>::is_finite(self)
            }
        }
    };
}

impl_half_element!(f16, DType::F16);
impl_half_element!(bf16, DType::BF16);
