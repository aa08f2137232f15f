//! Error types for Derivar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("incompatible operand shapes: {lhs:?} and {rhs:?}")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("expected a rank-{expected} operand, got rank {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("cannot arrange {len} elements into shape {shape:?}")]
    IncompatibleReshape { len: usize, shape: Vec<usize> },
}

pub type Result<T> = std::result::Result<T, Error>;
