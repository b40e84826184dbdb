//! The elementwise transformation and its evaluation strategies
//!
//! For every input `x`:
//!
//! ```text
//! s  = x²
//! r0 = s − ln(1 + x)   if s > 0.5
//!      s + eˣ          otherwise
//! r  = r0 / 2          if r0 > 1
//!      r0              otherwise
//! ```
//!
//! Three strategies compute it:
//!
//! - [`transform_batch`]: whole-array operations on [`Array`], one temporary
//!   per step (squares, both branch arrays, two masks, the halved array)
//! - [`transform_loop`]: one pass in index order, branches per element, no
//!   temporaries beyond the output
//! - `transform_parallel` (feature `parallel`): the loop body mapped over a
//!   rayon parallel iterator
//!
//! The batch form takes the logarithm through `ln_1p` while the loop form
//! computes `ln(1 + x)` directly, so results agree to tolerance rather than
//! bit for bit. Use [`crate::verify::check_allclose`] to compare them.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{Array, Backend, LoopfuseError, Result};

/// Squares above this take the logarithm branch
pub const SQUARE_THRESHOLD: f64 = 0.5;

/// Intermediate results above this are halved
pub const HALVE_THRESHOLD: f64 = 1.0;

/// What to do with inputs where `ln(1 + x)` is undefined
///
/// The domain is every finite `x` with `1 + x > 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DomainPolicy {
    /// Fail with [`LoopfuseError::Domain`] naming the first offending element
    #[default]
    Reject,
    /// Skip validation and let IEEE-754 produce NaN or infinity
    Propagate,
}

/// Evaluation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variant {
    /// Whole-array operations on the given backend
    Batch(Backend),
    /// Fused sequential loop
    #[default]
    Loop,
    /// Fused loop body over a rayon parallel iterator
    #[cfg(feature = "parallel")]
    Parallel,
}

/// Apply the transformation to a single value
///
/// No domain check: outside `1 + x > 0` the result is NaN or infinite.
///
/// # Examples
///
/// ```
/// use loopfuse::transform_element;
///
/// assert_eq!(transform_element(0.0), 1.0);
/// assert!((transform_element(2.0) - (4.0 - 3f64.ln()) / 2.0).abs() < 1e-15);
/// ```
#[inline]
pub fn transform_element(x: f64) -> f64 {
    let s = x * x;
    let r0 = if s > SQUARE_THRESHOLD {
        s - (1.0 + x).ln()
    } else {
        s + x.exp()
    };
    if r0 > HALVE_THRESHOLD {
        r0 / 2.0
    } else {
        r0
    }
}

#[inline]
fn in_domain(x: f64) -> bool {
    x.is_finite() && 1.0 + x > 0.0
}

fn check_domain(input: &[f64]) -> Result<()> {
    match input.iter().position(|&x| !in_domain(x)) {
        Some(index) => {
            let value = input[index];
            debug!(index, value, "input outside domain");
            Err(LoopfuseError::Domain { index, value })
        }
        None => Ok(()),
    }
}

/// Batch (vectorized) variant
///
/// Builds the result from whole-array operations, each allocating a
/// full-length temporary. `backend` picks the SIMD implementation of those
/// operations; [`Backend::Auto`] selects the best available.
///
/// # Errors
///
/// - [`LoopfuseError::Domain`] if any element is non-finite or has `1 + x <= 0`
/// - [`LoopfuseError::UnsupportedBackend`] if `backend` cannot run on this CPU
///
/// # Examples
///
/// ```
/// use loopfuse::{transform_batch, Backend};
///
/// let out = transform_batch(&[0.0, 1.0], Backend::Scalar).unwrap();
/// assert_eq!(out[0], 1.0);
/// assert!((out[1] - (1.0 - std::f64::consts::LN_2)).abs() < 1e-12);
/// ```
#[instrument(level = "trace", skip(input), fields(len = input.len()))]
pub fn transform_batch(input: &[f64], backend: Backend) -> Result<Vec<f64>> {
    check_domain(input)?;
    batch_unchecked(input, backend)
}

fn batch_unchecked(input: &[f64], backend: Backend) -> Result<Vec<f64>> {
    let x = Array::from_slice_with_backend(input, backend)?;

    let s = x.square();
    let log_branch = s.sub(&x.ln_1p())?;
    let exp_branch = s.add(&x.exp())?;
    let r0 = Array::select(&s.gt(SQUARE_THRESHOLD), &log_branch, &exp_branch)?;

    let halved = r0.scale(0.5);
    let r = Array::select(&r0.gt(HALVE_THRESHOLD), &halved, &r0)?;

    Ok(r.into_vec())
}

/// Sequential (loop) variant
///
/// Visits elements in index order and validates each one as it goes, so the
/// whole computation is one pass with a single allocation for the output.
///
/// # Errors
///
/// [`LoopfuseError::Domain`] for the first element that is non-finite or has
/// `1 + x <= 0`.
///
/// # Examples
///
/// ```
/// use loopfuse::transform_loop;
///
/// assert_eq!(transform_loop(&[]).unwrap(), Vec::<f64>::new());
/// assert_eq!(transform_loop(&[0.0]).unwrap(), vec![1.0]);
/// assert!(transform_loop(&[-1.0]).is_err());
/// ```
#[instrument(level = "trace", skip(input), fields(len = input.len()))]
pub fn transform_loop(input: &[f64]) -> Result<Vec<f64>> {
    let mut out = vec![0.0; input.len()];
    transform_loop_into(input, &mut out)?;
    Ok(out)
}

/// Loop variant writing into a caller-provided buffer
///
/// On error the contents of `out` are unspecified.
///
/// # Errors
///
/// - [`LoopfuseError::SizeMismatch`] if `out.len() != input.len()`
/// - [`LoopfuseError::Domain`] for the first out-of-domain element
pub fn transform_loop_into(input: &[f64], out: &mut [f64]) -> Result<()> {
    if out.len() != input.len() {
        return Err(LoopfuseError::SizeMismatch {
            expected: input.len(),
            actual: out.len(),
        });
    }

    for (index, (slot, &x)) in out.iter_mut().zip(input).enumerate() {
        if !in_domain(x) {
            debug!(index, value = x, "input outside domain");
            return Err(LoopfuseError::Domain { index, value: x });
        }
        *slot = transform_element(x);
    }
    Ok(())
}

fn loop_unchecked(input: &[f64]) -> Vec<f64> {
    input.iter().map(|&x| transform_element(x)).collect()
}

/// Parallel variant: the loop body mapped over a rayon parallel iterator
///
/// # Errors
///
/// [`LoopfuseError::Domain`] for the lowest-index out-of-domain element.
#[cfg(feature = "parallel")]
#[instrument(level = "trace", skip(input), fields(len = input.len()))]
pub fn transform_parallel(input: &[f64]) -> Result<Vec<f64>> {
    if let Some((index, &value)) = input.par_iter().enumerate().find_first(|(_, &x)| !in_domain(x)) {
        debug!(index, value, "input outside domain");
        return Err(LoopfuseError::Domain { index, value });
    }
    Ok(parallel_unchecked(input))
}

#[cfg(feature = "parallel")]
fn parallel_unchecked(input: &[f64]) -> Vec<f64> {
    input.par_iter().map(|&x| transform_element(x)).collect()
}

/// A named computation over a whole input sequence
///
/// The timing harness measures anything implementing this.
pub trait Kernel {
    /// Label used in reports
    fn name(&self) -> String;

    /// Run the computation once
    fn apply(&self, input: &[f64]) -> Result<Vec<f64>>;
}

/// Strategy plus domain policy
///
/// # Examples
///
/// ```
/// use loopfuse::{Backend, DomainPolicy, Kernel, TransformConfig, Variant};
///
/// let config = TransformConfig::new()
///     .with_variant(Variant::Batch(Backend::Scalar))
///     .with_policy(DomainPolicy::Propagate)
///     .build();
///
/// let out = config.apply(&[-2.0]).unwrap();
/// assert!(out[0].is_nan());
/// assert_eq!(config.name(), "batch[scalar]");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformConfig {
    /// Evaluation strategy
    pub variant: Variant,
    /// Domain handling
    pub policy: DomainPolicy,
}

impl TransformConfig {
    /// Loop variant, rejecting out-of-domain input
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the batch variant on `backend`
    pub fn batch(backend: Backend) -> Self {
        Self::new().with_variant(Variant::Batch(backend))
    }

    /// Set the evaluation strategy
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the domain policy
    pub fn with_policy(mut self, policy: DomainPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Finalize configuration (no-op, for builder pattern consistency)
    pub fn build(self) -> Self {
        self
    }
}

impl Kernel for TransformConfig {
    fn name(&self) -> String {
        match self.variant {
            Variant::Batch(backend) => format!("batch[{backend}]"),
            Variant::Loop => "loop".to_string(),
            #[cfg(feature = "parallel")]
            Variant::Parallel => "parallel".to_string(),
        }
    }

    fn apply(&self, input: &[f64]) -> Result<Vec<f64>> {
        match (self.variant, self.policy) {
            (Variant::Batch(backend), DomainPolicy::Reject) => transform_batch(input, backend),
            (Variant::Batch(backend), DomainPolicy::Propagate) => batch_unchecked(input, backend),
            (Variant::Loop, DomainPolicy::Reject) => transform_loop(input),
            (Variant::Loop, DomainPolicy::Propagate) => Ok(loop_unchecked(input)),
            #[cfg(feature = "parallel")]
            (Variant::Parallel, DomainPolicy::Reject) => transform_parallel(input),
            #[cfg(feature = "parallel")]
            (Variant::Parallel, DomainPolicy::Propagate) => Ok(parallel_unchecked(input)),
        }
    }
}

/// Adapter turning a closure into a [`Kernel`]
///
/// # Examples
///
/// ```
/// use loopfuse::{FnKernel, Kernel};
///
/// let identity = FnKernel::new("identity", |x: &[f64]| Ok(x.to_vec()));
/// assert_eq!(identity.apply(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
/// ```
pub struct FnKernel<F> {
    name: String,
    f: F,
}

impl<F> FnKernel<F>
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    /// Wrap `f` under the label `name`
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Kernel for FnKernel<F>
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, input: &[f64]) -> Result<Vec<f64>> {
        (self.f)(input)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::verify::{check_allclose, Tolerance};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_loop_matches_batch(
            a in prop::collection::vec(-0.999f64..10.0, 0..200)
        ) {
            let fused = transform_loop(&a).unwrap();
            let batch = transform_batch(&a, Backend::Auto).unwrap();
            prop_assert!(check_allclose(&fused, &batch, Tolerance::default()).is_ok());
        }

        #[test]
        fn test_length_preserved(
            a in prop::collection::vec(0.0f64..1.0, 0..300)
        ) {
            prop_assert_eq!(transform_loop(&a).unwrap().len(), a.len());
            prop_assert_eq!(transform_batch(&a, Backend::Scalar).unwrap().len(), a.len());
        }

        #[test]
        fn test_elementwise_independence(
            a in prop::collection::vec(-0.9f64..3.0, 1..100),
            rotate in 0usize..100
        ) {
            let k = rotate % a.len();
            let mut rotated = a.clone();
            rotated.rotate_left(k);

            let mut expected = transform_loop(&a).unwrap();
            expected.rotate_left(k);

            prop_assert_eq!(transform_loop(&rotated).unwrap(), expected.clone());
            let batch = transform_batch(&rotated, Backend::Auto).unwrap();
            let mut batch_expected = transform_batch(&a, Backend::Auto).unwrap();
            batch_expected.rotate_left(k);
            prop_assert_eq!(batch, batch_expected);
        }
    }
}
