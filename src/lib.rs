//! # Derivar: Reverse-Mode Automatic Differentiation
//!
//! Derivar provides a dynamic-graph autograd engine over dense
//! n-dimensional arrays, plus optimizers built on its in-place parameter
//! update helpers.
//!
//! ## Architecture
//!
//! - **autograd**: the node container, graph builder, backward engine and
//!   reset protocol
//! - **optim**: optimizers (SGD) driving the update helpers
//!
//! Operations on a gradient-tracked [`Tensor`] record the producing
//! operation on their output, growing a DAG as the forward computation
//! runs. [`backward`] walks that DAG once, accumulating a gradient at every
//! reachable tracked node; [`reset`] re-arms the same DAG for the next pass.

pub mod autograd;
pub mod error;
pub mod optim;

// Re-export commonly used types
pub use autograd::{backward, reset, Tensor};
pub use error::{Error, Result};
