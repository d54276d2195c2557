//! Run configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dims::Dims;
use crate::dtype::DType;
use crate::error::KernelError;
use crate::layout::InputLayout;

/// Acceptance tolerance used by the reference comparison.
pub const DEFAULT_EPSILON: f64 = 1e-2;

/// Shape, precision and check settings for one kernel run.
///
/// Missing JSON fields fall back to the `default` preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub batch: usize,
    pub tokens: usize,
    pub channels: usize,
    pub dtype: DType,
    pub layout: InputLayout,
    pub epsilon: f64,
    pub seed: u64,
    pub parallel: bool,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            batch: 1,
            tokens: 32,
            channels: 64,
            dtype: DType::F32,
            layout: InputLayout::Concatenated,
            epsilon: DEFAULT_EPSILON,
            seed: 0,
            parallel: false,
        }
    }
}

impl AttentionConfig {
    pub const PRESETS: [&'static str; 3] = ["default", "wide", "batched"];

    /// Named shape presets.
    pub fn preset(name: &str) -> Option<Self> {
        let base = Self::default();
        match name {
            "default" => Some(base),
            "wide" => Some(Self { channels: 128, ..base }),
            "batched" => Some(Self { batch: 4, tokens: 64, channels: 128, ..base }),
            _ => None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, KernelError> {
        serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Line width for this dtype on a 512-bit port.
    pub fn lanes(&self) -> usize {
        self.dtype.lanes()
    }

    /// Validated kernel dimensions.
    pub fn dims(&self) -> Result<Dims, KernelError> {
        if !(self.epsilon > 0.0) {
            return Err(KernelError::Config(format!("epsilon must be positive, got {}", self.epsilon)));
        }
        Dims::try_new(self.batch, self.tokens, self.channels, self.lanes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = AttentionConfig::from_json_str(r#"{"batch": 2, "dtype": "f16", "layout": "interleaved"}"#).unwrap();
        assert_eq!(cfg.batch, 2);
        assert_eq!(cfg.tokens, 32);
        assert_eq!(cfg.dtype, DType::F16);
        assert_eq!(cfg.layout, InputLayout::Interleaved);
        assert_eq!(cfg.epsilon, DEFAULT_EPSILON);
        assert_eq!(cfg.dims().unwrap().lanes(), 32);
    }

    #[test]
    fn test_bad_json() {
        let err = AttentionConfig::from_json_str(r#"{"dtype": "u8"}"#).unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));
    }

    #[test]
    fn test_presets_are_valid_for_every_dtype() {
        for name in AttentionConfig::PRESETS {
            let base = AttentionConfig::preset(name).unwrap();
            for dtype in DType::ALL {
                let cfg = AttentionConfig { dtype, ..base.clone() };
                assert!(cfg.dims().is_ok(), "{} / {}", name, dtype);
            }
        }
        assert!(AttentionConfig::preset("huge").is_none());
    }

    #[test]
    fn test_misaligned_config() {
        let cfg = AttentionConfig { channels: 48, dtype: DType::F16, ..Default::default() };
        assert_eq!(
            cfg.dims(),
            Err(KernelError::Misaligned { name: "channels", value: 48, lanes: 32 })
        );
        let cfg = AttentionConfig { epsilon: 0.0, ..Default::default() };
        assert!(cfg.dims().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AttentionConfig::from_json_file("/nonexistent/lineattn.json").unwrap_err();
        assert!(err.to_string().contains("lineattn.json"));
    }
}
