//! Infix sugar over the named operation functions
//!
//! Convenience only; the free functions in [`super::ops`] are the
//! contract. The scalar-on-the-left forms route to the reflected
//! operations, so `1.0 / &x` is reflected division and `2.0 - &x` is
//! reflected subtraction.

use super::ops;
use super::Tensor;
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $tensor_fn:expr, $scalar_fn:expr, $reflected_fn:expr) => {
        impl $trait<&Tensor> for &Tensor {
            type Output = Tensor;
            fn $method(self, rhs: &Tensor) -> Tensor {
                $tensor_fn(self, rhs)
            }
        }

        impl $trait<f32> for &Tensor {
            type Output = Tensor;
            fn $method(self, rhs: f32) -> Tensor {
                $scalar_fn(self, rhs)
            }
        }

        impl $trait<&Tensor> for f32 {
            type Output = Tensor;
            fn $method(self, rhs: &Tensor) -> Tensor {
                $reflected_fn(self, rhs)
            }
        }
    };
}

binary_operator!(Add, add, ops::add, ops::add_scalar, |c, t| ops::add_scalar(
    t, c
));
binary_operator!(Sub, sub, ops::sub, ops::sub_scalar, ops::scalar_sub);
binary_operator!(Mul, mul, ops::mul, ops::scale, |c, t| ops::scale(t, c));
binary_operator!(Div, div, ops::div, ops::div_scalar, ops::scalar_div);

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        ops::neg(self)
    }
}
