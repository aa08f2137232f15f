//! Backward engine and reset protocol
//!
//! A single recursive walk from the terminal node. Each visit carries the
//! chain-rule factor for one graph path; the visited node folds the factor
//! into its accumulator and hands each tracked operand a new factor built
//! from its gradient rule. A node reachable over several paths is visited
//! once per path and its accumulator adds the contributions: the
//! multivariate chain rule sums across independent paths while multiplying
//! within one.
//!
//! Traversal order needs no bookkeeping: a producer only ever references
//! earlier-constructed nodes, so the top-down walk is already topological.

use super::graph::{Operand, Producer};
use super::Tensor;
use log::debug;
use ndarray::{ArrayD, Ix2, IxDyn};

/// Propagate gradients from `tensor` back through the graph that produced
/// it.
///
/// With no seed the walk starts from the identity factor (an array of
/// ones), which leaves the terminal node's own accumulator at its
/// construction-time identity. A no-op on untracked tensors.
pub fn backward(tensor: &Tensor, seed: Option<ArrayD<f32>>) {
    if !tensor.requires_grad() {
        return;
    }
    let seed = seed.unwrap_or_else(|| ArrayD::ones(tensor.data().raw_dim()));
    debug!("backward pass from terminal node, shape {:?}", tensor.shape());
    propagate(tensor, &seed);
}

/// Restore every reachable tracked accumulator to the ones identity.
///
/// Must run before reusing the same graph for another backward pass,
/// otherwise gradients from successive passes compound. Idempotent.
pub fn reset(tensor: &Tensor) {
    if !tensor.requires_grad() {
        return;
    }
    debug!("re-arming accumulators, terminal shape {:?}", tensor.shape());
    rearm_walk(tensor);
}

fn rearm_walk(node: &Tensor) {
    if !node.requires_grad() {
        return;
    }
    node.rearm();
    if let Some(producer) = node.producer() {
        for operand in producer.operand_nodes() {
            rearm_walk(operand);
        }
    }
}

/// `factor`, shaped like the operand, times the operand's value.
fn scaled_by(factor: &ArrayD<f32>, operand: &Operand) -> ArrayD<f32> {
    match operand {
        Operand::Node(t) => {
            let v = t.data();
            factor * &*v
        }
        Operand::Scalar(c) => factor * *c,
    }
}

fn propagate(node: &Tensor, factor: &ArrayD<f32>) {
    if !node.requires_grad() {
        return;
    }
    node.absorb_factor(factor);
    let Some(producer) = node.producer() else {
        return;
    };
    match producer {
        Producer::Add(a, b) => {
            if let Operand::Node(a) = a {
                propagate(a, factor);
            }
            if let Operand::Node(b) = b {
                propagate(b, factor);
            }
        }
        Producer::Subtract(a, b) => {
            if let Operand::Node(a) = a {
                propagate(a, factor);
            }
            if let Operand::Node(b) = b {
                propagate(b, &(-factor));
            }
        }
        Producer::Multiply(a, b) => {
            // Product rule: each side is scaled by the other's value (or
            // the bare constant when the other side is not a node).
            if let Operand::Node(a) = a {
                if a.requires_grad() {
                    let f = scaled_by(factor, b);
                    propagate(a, &f);
                }
            }
            if let Operand::Node(b) = b {
                if b.requires_grad() {
                    let f = scaled_by(factor, a);
                    propagate(b, &f);
                }
            }
        }
        Producer::Divide(a, b) => {
            if let Operand::Node(a) = a {
                if a.requires_grad() {
                    let f = match b {
                        Operand::Node(b) => {
                            let bv = b.data();
                            factor / &*bv
                        }
                        Operand::Scalar(c) => factor / *c,
                    };
                    propagate(a, &f);
                }
            }
            if let Operand::Node(bn) = b {
                if bn.requires_grad() {
                    // d(a/b)/db = -a / b^2
                    let f = {
                        let bv = bn.data();
                        -(scaled_by(factor, a) / (&*bv * &*bv))
                    };
                    propagate(bn, &f);
                }
            }
        }
        Producer::Power(base, exponent) => {
            if let Operand::Node(bn) = base {
                if bn.requires_grad() {
                    let f = match exponent {
                        Operand::Scalar(e) => {
                            let bv = bn.data();
                            factor * *e * bv.mapv(|x| x.powf(e - 1.0))
                        }
                        Operand::Node(en) => {
                            let (bv, ev) = (bn.data(), en.data());
                            let local = ndarray::Zip::from(&*bv)
                                .and(&*ev)
                                .map_collect(|&x, &e| e * x.powf(e - 1.0));
                            local * factor
                        }
                    };
                    propagate(bn, &f);
                }
            }
            if let Operand::Node(en) = exponent {
                if en.requires_grad() {
                    // d(b^e)/de = b^e * ln(b); defined for positive bases
                    // only, an accepted domain restriction.
                    let f = {
                        let rv = node.data();
                        match base {
                            Operand::Node(bn) => {
                                let bv = bn.data();
                                factor * &*rv * bv.mapv(f32::ln)
                            }
                            Operand::Scalar(c) => factor * &*rv * c.ln(),
                        }
                    };
                    propagate(en, &f);
                }
            }
        }
        Producer::MatMul(a, b) => {
            let f2 = factor
                .view()
                .into_dimensionality::<Ix2>()
                .expect("matmul output is rank 2");
            if a.requires_grad() {
                let f = {
                    let bv = b.data();
                    let b2 = bv
                        .view()
                        .into_dimensionality::<Ix2>()
                        .expect("matmul operand is rank 2");
                    f2.dot(&b2.t()).into_dyn()
                };
                propagate(a, &f);
            }
            if b.requires_grad() {
                let f = {
                    let av = a.data();
                    let a2 = av
                        .view()
                        .into_dimensionality::<Ix2>()
                        .expect("matmul operand is rank 2");
                    a2.t().dot(&f2).into_dyn()
                };
                propagate(b, &f);
            }
        }
        Producer::Negate(a) => {
            propagate(a, &(-factor));
        }
        Producer::Exp(a) => {
            // d(exp(x))/dx = exp(x), which is the forward result itself.
            let f = {
                let rv = node.data();
                factor * &*rv
            };
            propagate(a, &f);
        }
        Producer::Ln(a) => {
            let f = {
                let av = a.data();
                factor / &*av
            };
            propagate(a, &f);
        }
        Producer::Sum(a) => {
            // The factor is rank 0; broadcast it onto the operand's shape
            // so the accumulator shapes line up.
            let f = {
                let av = a.data();
                factor
                    .broadcast(av.raw_dim())
                    .expect("rank-0 gradient broadcasts to any shape")
                    .to_owned()
            };
            propagate(a, &f);
        }
        Producer::Transpose(a) => {
            propagate(a, &factor.t().to_owned());
        }
        Producer::Reshape(a, original) => {
            let f = factor
                .clone()
                .into_shape(IxDyn(original))
                .expect("gradient length matches the recorded shape");
            propagate(a, &f);
        }
    }
}
