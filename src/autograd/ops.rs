//! Graph-building operations
//!
//! Every operation here computes its forward value immediately. When at
//! least one operand tracks gradients the output records a producer
//! referencing its operands, extending the computation DAG; otherwise the
//! output is a plain untracked value. The output's tracking flag is always
//! the logical OR of the operand flags, so gradients are never undercounted
//! in mixed expressions.
//!
//! Element-wise shape mismatches are surfaced by ndarray itself; only the
//! structural operations (`matmul`, `transpose`, `reshape`) check shapes up
//! front and return `Result`.

use super::graph::{Operand, Producer};
use super::Tensor;
use crate::error::{Error, Result};
use ndarray::{ArrayD, Ix2, IxDyn, Zip};

/// Add two tensors element-wise.
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    let data = {
        let (av, bv) = (a.data(), b.data());
        &*av + &*bv
    };
    let requires_grad = a.requires_grad() || b.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Add(Operand::Node(a.clone()), Operand::Node(b.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Add a constant to every element.
pub fn add_scalar(a: &Tensor, c: f32) -> Tensor {
    let data = {
        let av = a.data();
        &*av + c
    };
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Add(Operand::Node(a.clone()), Operand::Scalar(c)));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Subtract two tensors element-wise.
pub fn sub(a: &Tensor, b: &Tensor) -> Tensor {
    let data = {
        let (av, bv) = (a.data(), b.data());
        &*av - &*bv
    };
    let requires_grad = a.requires_grad() || b.requires_grad();
    let producer = requires_grad
        .then(|| Producer::Subtract(Operand::Node(a.clone()), Operand::Node(b.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Subtract a constant from every element.
pub fn sub_scalar(a: &Tensor, c: f32) -> Tensor {
    let data = {
        let av = a.data();
        &*av - c
    };
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Subtract(Operand::Node(a.clone()), Operand::Scalar(c)));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Reflected subtraction: `c - a`, not `a - c`. The operand keeps its
/// position in the producer record so the backward rule applies the
/// negated factor to it.
pub fn scalar_sub(c: f32, a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| c - x);
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Subtract(Operand::Scalar(c), Operand::Node(a.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Multiply two tensors element-wise.
pub fn mul(a: &Tensor, b: &Tensor) -> Tensor {
    let data = {
        let (av, bv) = (a.data(), b.data());
        &*av * &*bv
    };
    let requires_grad = a.requires_grad() || b.requires_grad();
    let producer = requires_grad
        .then(|| Producer::Multiply(Operand::Node(a.clone()), Operand::Node(b.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Scale tensor by a scalar.
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = {
        let av = a.data();
        &*av * factor
    };
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Multiply(Operand::Node(a.clone()), Operand::Scalar(factor)));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Divide two tensors element-wise.
pub fn div(a: &Tensor, b: &Tensor) -> Tensor {
    let data = {
        let (av, bv) = (a.data(), b.data());
        &*av / &*bv
    };
    let requires_grad = a.requires_grad() || b.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Divide(Operand::Node(a.clone()), Operand::Node(b.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Divide every element by a constant.
pub fn div_scalar(a: &Tensor, c: f32) -> Tensor {
    let data = {
        let av = a.data();
        &*av / c
    };
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Divide(Operand::Node(a.clone()), Operand::Scalar(c)));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Reflected division: `c / a`, not `a / c`.
pub fn scalar_div(c: f32, a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| c / x);
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Divide(Operand::Scalar(c), Operand::Node(a.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Raise `base` to the element-wise power `exponent`.
///
/// Both operands may track gradients: the base receives the power rule and
/// the exponent receives `result * ln(base)`, which restricts a tracked
/// exponent to positive bases.
pub fn pow(base: &Tensor, exponent: &Tensor) -> Tensor {
    let data = {
        let (bv, ev) = (base.data(), exponent.data());
        Zip::from(&*bv).and(&*ev).map_collect(|&x, &e| x.powf(e))
    };
    let requires_grad = base.requires_grad() || exponent.requires_grad();
    let producer = requires_grad.then(|| {
        Producer::Power(Operand::Node(base.clone()), Operand::Node(exponent.clone()))
    });
    Tensor::with_producer(data, requires_grad, producer)
}

/// Raise every element to a constant power.
pub fn pow_scalar(base: &Tensor, exponent: f32) -> Tensor {
    let data = base.data().mapv(|x| x.powf(exponent));
    let requires_grad = base.requires_grad();
    let producer = requires_grad
        .then(|| Producer::Power(Operand::Node(base.clone()), Operand::Scalar(exponent)));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Reflected power: raises the constant to the tensor's power, `c ^ a`.
/// The exponent rule applies, not the power rule.
pub fn scalar_pow(c: f32, a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| c.powf(x));
    let requires_grad = a.requires_grad();
    let producer =
        requires_grad.then(|| Producer::Power(Operand::Scalar(c), Operand::Node(a.clone())));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Matrix multiplication.
///
/// Both operands must be rank 2 with compatible inner dimensions.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let data = {
        let (av, bv) = (a.data(), b.data());
        let a2 = av
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| Error::RankMismatch {
                expected: 2,
                got: av.ndim(),
            })?;
        let b2 = bv
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| Error::RankMismatch {
                expected: 2,
                got: bv.ndim(),
            })?;
        if a2.ncols() != b2.nrows() {
            return Err(Error::ShapeMismatch {
                lhs: av.shape().to_vec(),
                rhs: bv.shape().to_vec(),
            });
        }
        a2.dot(&b2).into_dyn()
    };
    let requires_grad = a.requires_grad() || b.requires_grad();
    let producer = requires_grad.then(|| Producer::MatMul(a.clone(), b.clone()));
    Ok(Tensor::with_producer(data, requires_grad, producer))
}

/// Negate every element.
pub fn neg(a: &Tensor) -> Tensor {
    let data = {
        let av = a.data();
        -&*av
    };
    let requires_grad = a.requires_grad();
    let producer = requires_grad.then(|| Producer::Negate(a.clone()));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Element-wise exponential.
pub fn exp(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::exp);
    let requires_grad = a.requires_grad();
    let producer = requires_grad.then(|| Producer::Exp(a.clone()));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Element-wise natural logarithm.
pub fn ln(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::ln);
    let requires_grad = a.requires_grad();
    let producer = requires_grad.then(|| Producer::Ln(a.clone()));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Sum all elements into a rank-0 tensor.
///
/// The gradient of a sum is a broadcast of ones, so the producer needs no
/// extra metadata.
pub fn sum(a: &Tensor) -> Tensor {
    let data = ArrayD::from_elem(IxDyn(&[]), a.data().sum());
    let requires_grad = a.requires_grad();
    let producer = requires_grad.then(|| Producer::Sum(a.clone()));
    Tensor::with_producer(data, requires_grad, producer)
}

/// Transpose a rank-2 tensor.
pub fn transpose(a: &Tensor) -> Result<Tensor> {
    let data = {
        let av = a.data();
        if av.ndim() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: av.ndim(),
            });
        }
        av.t().to_owned()
    };
    let requires_grad = a.requires_grad();
    let producer = requires_grad.then(|| Producer::Transpose(a.clone()));
    Ok(Tensor::with_producer(data, requires_grad, producer))
}

/// Reshape into `shape`. The producer keeps the operand's original shape
/// as the target shape for the gradient.
pub fn reshape(a: &Tensor, shape: &[usize]) -> Result<Tensor> {
    let (data, original) = {
        let av = a.data();
        let original = av.shape().to_vec();
        let data = av
            .clone()
            .into_shape(IxDyn(shape))
            .map_err(|_| Error::IncompatibleReshape {
                len: av.len(),
                shape: shape.to_vec(),
            })?;
        (data, original)
    };
    let requires_grad = a.requires_grad();
    let producer = requires_grad.then(|| Producer::Reshape(a.clone(), original));
    Ok(Tensor::with_producer(data, requires_grad, producer))
}

fn compare(a: &Tensor, b: &Tensor, pred: impl Fn(f32, f32) -> bool) -> Tensor {
    let (av, bv) = (a.data(), b.data());
    let data = Zip::from(&*av)
        .and(&*bv)
        .map_collect(|&x, &y| if pred(x, y) { 1.0 } else { 0.0 });
    Tensor::new(data, false)
}

fn compare_scalar(a: &Tensor, c: f32, pred: impl Fn(f32, f32) -> bool) -> Tensor {
    let data = a.data().mapv(|x| if pred(x, c) { 1.0 } else { 0.0 });
    Tensor::new(data, false)
}

// Comparisons are pure value predicates: the result is a 0/1 mask that
// never tracks gradients and never records a producer, whatever the
// operands' flags.

/// Element-wise equality mask.
pub fn eq(a: &Tensor, b: &Tensor) -> Tensor {
    compare(a, b, |x, y| x == y)
}

/// Element-wise inequality mask.
pub fn ne(a: &Tensor, b: &Tensor) -> Tensor {
    compare(a, b, |x, y| x != y)
}

/// Element-wise less-than mask.
pub fn lt(a: &Tensor, b: &Tensor) -> Tensor {
    compare(a, b, |x, y| x < y)
}

/// Element-wise less-or-equal mask.
pub fn le(a: &Tensor, b: &Tensor) -> Tensor {
    compare(a, b, |x, y| x <= y)
}

/// Element-wise greater-than mask.
pub fn gt(a: &Tensor, b: &Tensor) -> Tensor {
    compare(a, b, |x, y| x > y)
}

/// Element-wise greater-or-equal mask.
pub fn ge(a: &Tensor, b: &Tensor) -> Tensor {
    compare(a, b, |x, y| x >= y)
}

/// Element-wise equality against a constant.
pub fn eq_scalar(a: &Tensor, c: f32) -> Tensor {
    compare_scalar(a, c, |x, y| x == y)
}

/// Element-wise inequality against a constant.
pub fn ne_scalar(a: &Tensor, c: f32) -> Tensor {
    compare_scalar(a, c, |x, y| x != y)
}

/// Element-wise less-than against a constant.
pub fn lt_scalar(a: &Tensor, c: f32) -> Tensor {
    compare_scalar(a, c, |x, y| x < y)
}

/// Element-wise less-or-equal against a constant.
pub fn le_scalar(a: &Tensor, c: f32) -> Tensor {
    compare_scalar(a, c, |x, y| x <= y)
}

/// Element-wise greater-than against a constant.
pub fn gt_scalar(a: &Tensor, c: f32) -> Tensor {
    compare_scalar(a, c, |x, y| x > y)
}

/// Element-wise greater-or-equal against a constant.
pub fn ge_scalar(a: &Tensor, c: f32) -> Tensor {
    compare_scalar(a, c, |x, y| x >= y)
}
