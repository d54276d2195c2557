//! # lineattn-kernel
//!
//! Causal scaled-dot-product self-attention as a streaming kernel over a
//! line-granular memory port.
//!
//! Provides:
//! - Causal score, stable softmax and weighted aggregation stages
//! - `CausalAttention`: the three-stage orchestrator with arena-backed scratch
//! - Batch-parallel execution on the rayon pool, one workspace per worker
//! - A plain reference implementation and the epsilon acceptance check
//!
//! Every tensor access is a whole-line read or write. A token's Q row and
//! score row are cached locally for the duration of that token, and output
//! lines are accumulated in full before a single write.

pub mod aggregate;
pub mod attention;
pub mod check;
pub mod parallel;
pub mod plan;
pub mod reference;
pub mod score;
pub mod simd;
pub mod softmax;
pub mod workspace;

pub use attention::CausalAttention;
pub use check::{compare, random_elements, CheckReport, Mismatch};
pub use parallel::run_batches_parallel;
pub use plan::{KernelPlan, LineTraffic};
pub use reference::reference_attention;
pub use simd::{SimdCapability, VectorTier};
pub use workspace::{Scratch, Workspace};
