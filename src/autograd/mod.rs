//! Dynamic-graph autograd engine
//!
//! Provides reverse-mode automatic differentiation over dense
//! n-dimensional arrays. Operations on tracked tensors record their
//! producing operation, building a DAG; [`backward`] walks the DAG once to
//! accumulate gradients and [`reset`] re-arms it for reuse.

mod arith;
mod backward;
mod graph;
mod ops;
mod tensor;


pub use backward::{backward, reset};
pub use ops::*;
pub use tensor::Tensor;
