//! Array type with multi-backend whole-array operations
//!
//! Every operation here returns a freshly allocated array. That is the point:
//! the batch variant of the transformation is a chain of these calls, so it
//! pays for one full-length temporary per step, the way a vectorized array
//! library evaluates an expression.

use crate::backends::scalar::ScalarBackend;
#[cfg(target_arch = "x86_64")]
use crate::backends::{avx2::Avx2Backend, sse2::Sse2Backend};
use crate::backends::ArrayBackend;
use crate::{Backend, LoopfuseError, Result};

/// Dispatch a primitive to the backend stored on an array.
///
/// The stored backend is always resolved and available, see
/// [`Array::from_slice_with_backend`].
macro_rules! dispatch {
    ($backend:expr, $method:ident($($arg:expr),* $(,)?)) => {
        // SAFETY: lengths are checked by the caller, and the backend was
        // verified available when the array was constructed
        unsafe {
            match $backend {
                #[cfg(target_arch = "x86_64")]
                Backend::AVX2 => Avx2Backend::$method($($arg),*),
                #[cfg(target_arch = "x86_64")]
                Backend::SSE2 => Sse2Backend::$method($($arg),*),
                _ => ScalarBackend::$method($($arg),*),
            }
        }
    };
}

/// Dense `f64` array bound to an execution backend
///
/// # Examples
///
/// ```
/// use loopfuse::Array;
///
/// let a = Array::from_slice(&[1.0, 2.0, 3.0]);
/// let squared = a.square();
///
/// assert_eq!(squared.as_slice(), &[1.0, 4.0, 9.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    data: Vec<f64>,
    backend: Backend,
}

/// Boolean mask produced by a comparison, one flag per element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Vec<bool>,
}

impl Array {
    /// Create array from slice using the auto-selected optimal backend
    ///
    /// # Examples
    ///
    /// ```
    /// use loopfuse::Array;
    ///
    /// let a = Array::from_slice(&[1.0, 2.0, 3.0, 4.0]);
    /// assert_eq!(a.len(), 4);
    /// ```
    pub fn from_slice(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
            backend: crate::select_best_available_backend(),
        }
    }

    /// Create array with a specific backend (for benchmarking or testing)
    ///
    /// # Errors
    ///
    /// Returns [`LoopfuseError::UnsupportedBackend`] if this CPU cannot run
    /// `backend`.
    ///
    /// # Examples
    ///
    /// ```
    /// use loopfuse::{Array, Backend};
    ///
    /// let a = Array::from_slice_with_backend(&[1.0, 2.0], Backend::Scalar).unwrap();
    /// assert_eq!(a.backend(), Backend::Scalar);
    /// ```
    pub fn from_slice_with_backend(data: &[f64], backend: Backend) -> Result<Self> {
        Ok(Self {
            data: data.to_vec(),
            backend: backend.resolve()?,
        })
    }

    fn with_data(&self, data: Vec<f64>) -> Self {
        Self {
            data,
            backend: self.backend,
        }
    }

    fn check_len(&self, other: usize) -> Result<()> {
        if self.len() != other {
            return Err(LoopfuseError::SizeMismatch {
                expected: self.len(),
                actual: other,
            });
        }
        Ok(())
    }

    /// Get underlying data as slice
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume the array, returning its storage
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Get array length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if array is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the backend being used
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Element-wise square
    pub fn square(&self) -> Self {
        let mut result = vec![0.0; self.len()];
        dispatch!(self.backend, square(&self.data, &mut result));
        self.with_data(result)
    }

    /// Element-wise addition
    ///
    /// # Errors
    ///
    /// Returns [`LoopfuseError::SizeMismatch`] if arrays have different lengths.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_len(other.len())?;
        let mut result = vec![0.0; self.len()];
        dispatch!(self.backend, add(&self.data, &other.data, &mut result));
        Ok(self.with_data(result))
    }

    /// Element-wise subtraction
    ///
    /// # Errors
    ///
    /// Returns [`LoopfuseError::SizeMismatch`] if arrays have different lengths.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_len(other.len())?;
        let mut result = vec![0.0; self.len()];
        dispatch!(self.backend, sub(&self.data, &other.data, &mut result));
        Ok(self.with_data(result))
    }

    /// Multiply every element by `factor`
    pub fn scale(&self, factor: f64) -> Self {
        let mut result = vec![0.0; self.len()];
        dispatch!(self.backend, scale(&self.data, factor, &mut result));
        self.with_data(result)
    }

    /// Comparison mask `self[i] > threshold`
    ///
    /// # Examples
    ///
    /// ```
    /// use loopfuse::Array;
    ///
    /// let a = Array::from_slice(&[0.2, 0.7, 0.5]);
    /// assert_eq!(a.gt(0.5).as_slice(), &[false, true, false]);
    /// ```
    pub fn gt(&self, threshold: f64) -> Mask {
        let mut mask = vec![false; self.len()];
        dispatch!(self.backend, gt_scalar(&self.data, threshold, &mut mask));
        Mask { data: mask }
    }

    /// Element-wise `ln(1 + x)`
    pub fn ln_1p(&self) -> Self {
        let mut result = vec![0.0; self.len()];
        dispatch!(self.backend, ln_1p(&self.data, &mut result));
        self.with_data(result)
    }

    /// Element-wise `e^x`
    pub fn exp(&self) -> Self {
        let mut result = vec![0.0; self.len()];
        dispatch!(self.backend, exp(&self.data, &mut result));
        self.with_data(result)
    }

    /// Pick `on_true[i]` where `mask[i]`, else `on_false[i]`
    ///
    /// The result uses `on_true`'s backend.
    ///
    /// # Errors
    ///
    /// Returns [`LoopfuseError::SizeMismatch`] if the three operands differ in length.
    ///
    /// # Examples
    ///
    /// ```
    /// use loopfuse::Array;
    ///
    /// let x = Array::from_slice(&[1.0, 2.0, 3.0]);
    /// let doubled = x.scale(2.0);
    /// let picked = Array::select(&x.gt(1.5), &doubled, &x).unwrap();
    /// assert_eq!(picked.as_slice(), &[1.0, 4.0, 6.0]);
    /// ```
    pub fn select(mask: &Mask, on_true: &Self, on_false: &Self) -> Result<Self> {
        on_true.check_len(mask.len())?;
        on_true.check_len(on_false.len())?;
        let mut result = vec![0.0; mask.len()];
        dispatch!(
            on_true.backend,
            select(&mask.data, &on_true.data, &on_false.data, &mut result)
        );
        Ok(on_true.with_data(result))
    }
}

impl Mask {
    /// Get the flags as a slice
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Number of flags
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if mask is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of set flags
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&flag| flag).count()
    }
}
