/// Errors raised while configuring or invoking the kernel.
///
/// Every variant describes a shape or configuration problem detected once,
/// before any line is moved. A correctly shaped invocation cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("dimension '{name}' must be non-zero")]
    ZeroDimension { name: &'static str },

    #[error("dimension '{name}' = {value} is not a multiple of the line width {lanes}")]
    Misaligned {
        name: &'static str,
        value: usize,
        lanes: usize,
    },

    #[error("{region} region holds {got} lines, kernel needs {expected}")]
    RegionSize {
        region: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{got} elements do not fill whole lines of {lanes}")]
    PartialLine { got: usize, lanes: usize },

    #[error("line arena exhausted: requested {requested} lines, {remaining} remaining")]
    ArenaExhausted { requested: usize, remaining: usize },

    #[error("unknown dtype '{0}' (expected f16, bf16, f32 or f64)")]
    UnknownDType(String),

    #[error("unknown layout '{0}' (expected concatenated or interleaved)")]
    UnknownLayout(String),

    #[error("invalid config: {0}")]
    Config(String),
}
