//! # lineattn-core
//!
//! Memory model for a causal attention kernel that only ever moves whole
//! lines of `L` elements.
//!
//! Provides:
//! - `Line`: the fixed-width transfer unit
//! - `LineRead` / `LineStore`: the line-granular memory port, plus a counting wrapper
//! - `Dims`, `InputLayout`, `TensorAddr`: shapes and one addressing helper per tensor
//! - `LineArena`: pre-allocated scratch for the score matrix and row caches
//! - `Element` / `DType`: f16, bf16, f32 and f64 working types
//! - `AttentionConfig`: JSON-loadable run configuration

pub mod arena;
pub mod config;
pub mod dims;
pub mod dtype;
pub mod element;
pub mod error;
pub mod layout;
pub mod line;
pub mod marshal;
pub mod store;

pub use arena::{LineArena, LineSlot};
pub use config::{AttentionConfig, DEFAULT_EPSILON};
pub use dims::Dims;
pub use dtype::{DType, PORT_BITS};
pub use element::Element;
pub use error::KernelError;
pub use layout::{InputLayout, Operand, TensorAddr};
pub use line::Line;
pub use marshal::{assemble_input, pack_lines, unpack_lines};
pub use store::{CountingStore, LineRead, LineStore};

pub type Result<T> = std::result::Result<T, KernelError>;
