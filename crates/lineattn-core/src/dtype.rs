use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Width of the memory port in bits. One line is one port transfer.
pub const PORT_BITS: usize = 512;

/// Working numeric types the kernel can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 16-bit IEEE 754 half-precision float
    F16,
    /// 16-bit Brain Float (same exponent range as F32, reduced mantissa)
    BF16,
    /// 32-bit IEEE 754 single-precision float
    #[default]
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
}

impl DType {
    pub const ALL: [DType; 4] = [DType::F16, DType::BF16, DType::F32, DType::F64];

    /// Size in bits of a single element.
    pub fn bits(&self) -> usize {
        match self {
            DType::F16 | DType::BF16 => 16,
            DType::F32 => 32,
            DType::F64 => 64,
        }
    }

    /// Elements per line on a [`PORT_BITS`]-wide port.
    pub fn lanes(&self) -> usize {
        PORT_BITS / self.bits()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        f.write_str(name)
    }
}

impl FromStr for DType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f16" | "half" => Ok(DType::F16),
            "bf16" => Ok(DType::BF16),
            "f32" | "float" => Ok(DType::F32),
            "f64" | "double" => Ok(DType::F64),
            other => Err(KernelError::UnknownDType(other.to_string())),
        }
    }
}
