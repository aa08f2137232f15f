//! Tensor type with gradient tracking

use super::graph::Producer;
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayD, IxDyn};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// A node in the computation graph: a dense n-dimensional value with
/// optional gradient tracking.
///
/// `Tensor` is a shared handle to a heap-allocated node record. Cloning the
/// handle shares the node (the same node may be an operand of several
/// downstream operations); [`Tensor::copy`] duplicates the underlying
/// storage instead. A tracked tensor eagerly allocates its gradient
/// accumulator as an array of ones, the identity for the first chain-rule
/// factor absorbed by a backward pass.
#[derive(Clone)]
pub struct Tensor {
    inner: Rc<Inner>,
}

struct Inner {
    data: RefCell<ArrayD<f32>>,
    /// `Some` iff the node is tracked; shaped identically to `data`.
    grad: RefCell<Option<ArrayD<f32>>>,
    /// Recorded producing operation; `None` for leaves and untracked nodes.
    producer: Option<Producer>,
    requires_grad: bool,
    /// True until the first backward visit since construction or reset.
    armed: Cell<bool>,
}

impl Tensor {
    /// Create a new tensor from an existing array.
    pub fn new(data: ArrayD<f32>, requires_grad: bool) -> Self {
        Self::with_producer(data, requires_grad, None)
    }

    /// Create a derived node, recording its producing operation.
    pub(crate) fn with_producer(
        data: ArrayD<f32>,
        requires_grad: bool,
        producer: Option<Producer>,
    ) -> Self {
        let grad = requires_grad.then(|| ArrayD::ones(data.raw_dim()));
        Self {
            inner: Rc::new(Inner {
                data: RefCell::new(data),
                grad: RefCell::new(grad),
                producer,
                requires_grad,
                armed: Cell::new(true),
            }),
        }
    }

    /// Create a rank-1 tensor from a vector.
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data).into_dyn(), requires_grad)
    }

    /// Create a tensor of the given shape from a flat vector.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, requires_grad: bool) -> Result<Self> {
        let len = data.len();
        let arr = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            Error::IncompatibleReshape {
                len,
                shape: shape.to_vec(),
            }
        })?;
        Ok(Self::new(arr, requires_grad))
    }

    /// Create a rank-0 tensor holding a single value.
    pub fn scalar(value: f32, requires_grad: bool) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(&[]), value), requires_grad)
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)), requires_grad)
    }

    /// Duplicate this tensor's storage into a fresh leaf node.
    ///
    /// The result never aliases this node's array, so later in-place
    /// updates to one cannot corrupt the other's recorded value.
    pub fn copy(&self, requires_grad: bool) -> Self {
        Self::new(self.data().clone(), requires_grad)
    }

    /// Borrow the underlying array.
    pub fn data(&self) -> Ref<'_, ArrayD<f32>> {
        self.inner.data.borrow()
    }

    /// Get gradient accumulator snapshot (`None` for untracked tensors).
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.inner.grad.borrow().clone()
    }

    /// Check if this tensor tracks gradients.
    pub fn requires_grad(&self) -> bool {
        self.inner.requires_grad
    }

    /// True once a backward pass has deposited a gradient since the last
    /// reset. Before that the accumulator still holds the ones identity.
    pub fn grad_ready(&self) -> bool {
        self.inner.requires_grad && !self.inner.armed.get()
    }

    /// Shape of the underlying array.
    pub fn shape(&self) -> Vec<usize> {
        self.data().shape().to_vec()
    }

    /// Rank of the underlying array.
    pub fn ndim(&self) -> usize {
        self.data().ndim()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Read one element. Bypasses the graph: no gradient flows through
    /// indexing.
    pub fn at(&self, index: &[usize]) -> f32 {
        self.data()[IxDyn(index)]
    }

    /// Write one element. Bypasses the graph, like [`Tensor::at`].
    pub fn set_at(&self, index: &[usize], value: f32) {
        self.inner.data.borrow_mut()[IxDyn(index)] = value;
    }

    /// In-place `value += delta`.
    ///
    /// The update helpers mutate the forward value directly and do not
    /// touch the graph. Apply them only after `backward` has consumed the
    /// old value in every gradient rule that reads it.
    pub fn update_add(&self, delta: &ArrayD<f32>) {
        *self.inner.data.borrow_mut() += delta;
    }

    /// In-place `value -= delta`.
    pub fn update_sub(&self, delta: &ArrayD<f32>) {
        *self.inner.data.borrow_mut() -= delta;
    }

    /// In-place `value *= delta`.
    pub fn update_mul(&self, delta: &ArrayD<f32>) {
        *self.inner.data.borrow_mut() *= delta;
    }

    /// In-place `value /= delta`.
    pub fn update_div(&self, delta: &ArrayD<f32>) {
        *self.inner.data.borrow_mut() /= delta;
    }

    pub(crate) fn producer(&self) -> Option<&Producer> {
        self.inner.producer.as_ref()
    }

    /// Fold one chain-rule factor into the accumulator. The first factor
    /// since the last reset multiplies the ones identity; every further
    /// factor, arriving over a distinct graph path, adds.
    pub(crate) fn absorb_factor(&self, factor: &ArrayD<f32>) {
        let mut grad = self.inner.grad.borrow_mut();
        let Some(acc) = grad.as_mut() else { return };
        if self.inner.armed.get() {
            *acc = &*acc * factor;
            self.inner.armed.set(false);
        } else {
            *acc = &*acc + factor;
        }
    }

    /// Restore the accumulator to the ones identity and re-arm it.
    pub(crate) fn rearm(&self) {
        if !self.inner.requires_grad {
            return;
        }
        let shape = self.inner.data.borrow().raw_dim();
        *self.inner.grad.borrow_mut() = Some(ArrayD::ones(shape));
        self.inner.armed.set(true);
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        write!(f, "{}", *data)?;
        if self.inner.requires_grad {
            write!(f, ", requires_grad=true")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("data", &self.inner.data.borrow())
            .field("grad", &self.inner.grad.borrow())
            .field("requires_grad", &self.inner.requires_grad)
            .finish()
    }
}
