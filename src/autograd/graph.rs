//! Producer records: the recorded operation behind each derived node

use super::Tensor;

/// One operand slot of a producer record: a shared upstream node, or a
/// plain constant that never participates in gradient propagation.
#[derive(Clone)]
pub(crate) enum Operand {
    Node(Tensor),
    Scalar(f32),
}

impl Operand {
    pub(crate) fn as_node(&self) -> Option<&Tensor> {
        match self {
            Operand::Node(t) => Some(t),
            Operand::Scalar(_) => None,
        }
    }
}

/// The operation that produced a derived node, together with its operands.
///
/// A closed enum: the backward engine dispatches on it with an exhaustive
/// match, so there is no unrecognized-operation path at runtime. Operand
/// order is the forward order: `Subtract(a, b)` is `a - b`, and the
/// reflected scalar forms put the constant in the left slot
/// (`Subtract(Scalar(c), Node(x))` is `c - x`). `Reshape` keeps the
/// operand's original shape as the gradient's target shape.
#[derive(Clone)]
pub(crate) enum Producer {
    Add(Operand, Operand),
    Subtract(Operand, Operand),
    Multiply(Operand, Operand),
    Divide(Operand, Operand),
    Power(Operand, Operand),
    MatMul(Tensor, Tensor),
    Negate(Tensor),
    Exp(Tensor),
    Ln(Tensor),
    Sum(Tensor),
    Transpose(Tensor),
    Reshape(Tensor, Vec<usize>),
}

impl Producer {
    /// Upstream nodes referenced by this record, in operand order. Drives
    /// the reset walk.
    pub(crate) fn operand_nodes(&self) -> Vec<&Tensor> {
        match self {
            Producer::Add(a, b)
            | Producer::Subtract(a, b)
            | Producer::Multiply(a, b)
            | Producer::Divide(a, b)
            | Producer::Power(a, b) => a.as_node().into_iter().chain(b.as_node()).collect(),
            Producer::MatMul(a, b) => vec![a, b],
            Producer::Negate(a)
            | Producer::Exp(a)
            | Producer::Ln(a)
            | Producer::Sum(a)
            | Producer::Transpose(a)
            | Producer::Reshape(a, _) => vec![a],
        }
    }
}
