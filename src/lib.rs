//! loopfuse: vectorized vs fused-loop elementwise kernels
//!
//! One small numeric transformation, evaluated two ways:
//!
//! 1. **Batch** - whole-array operations (`square`, compare, `ln_1p`, `exp`,
//!    select) that each materialize a full-length temporary, dispatched to a
//!    SIMD backend (Scalar, SSE2, AVX2)
//! 2. **Loop** - a single fused pass with per-element branches and no
//!    temporaries beyond the output
//!
//! Both produce the same values within floating-point tolerance. What differs
//! is how much memory traffic they generate, which is what the
//! [`timing`] harness and the benchmarks measure.
//!
//! # Quick Start
//!
//! ```rust
//! use loopfuse::{transform_batch, transform_loop, verify::{check_allclose, Tolerance}, Backend};
//!
//! let x = [0.0, 0.25, 1.0, 2.0];
//! let batch = transform_batch(&x, Backend::Auto).unwrap();
//! let fused = transform_loop(&x).unwrap();
//!
//! assert_eq!(fused[0], 1.0);
//! check_allclose(&fused, &batch, Tolerance::default()).unwrap();
//! ```

pub mod array;
pub mod backends;
pub mod error;
pub mod timing;
pub mod transform;
pub mod verify;

pub use array::{Array, Mask};
pub use error::{LoopfuseError, Result};
pub use timing::{time_kernel, TimingConfig, TimingReport};
pub use transform::{
    transform_batch, transform_element, transform_loop, transform_loop_into, DomainPolicy,
    FnKernel, Kernel, TransformConfig, Variant,
};
#[cfg(feature = "parallel")]
pub use transform::transform_parallel;
pub use verify::{assert_allclose, check_allclose, Tolerance};

/// Backend execution target for whole-array operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    /// Scalar fallback (no SIMD)
    Scalar,
    /// SSE2 (x86_64 baseline, 2 x f64)
    SSE2,
    /// AVX2 (256-bit, 4 x f64)
    AVX2,
    /// Auto-select best available
    Auto,
}

impl Backend {
    /// Select the best available backend for the current platform
    ///
    /// This is a convenience wrapper around `select_best_available_backend()`
    pub fn select_best() -> Self {
        select_best_available_backend()
    }

    /// Resolve `Auto` and check that an explicit backend can run here
    ///
    /// # Errors
    ///
    /// Returns [`LoopfuseError::UnsupportedBackend`] when the CPU lacks the
    /// instruction set the backend needs.
    pub fn resolve(self) -> Result<Self> {
        match self {
            Backend::Auto => Ok(select_best_available_backend()),
            Backend::Scalar => Ok(Backend::Scalar),
            other if is_backend_available(other) => Ok(other),
            other => Err(LoopfuseError::UnsupportedBackend(other)),
        }
    }

    /// Short lowercase name, used in kernel names and benchmark ids
    pub fn name(self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::SSE2 => "sse2",
            Backend::AVX2 => "avx2",
            Backend::Auto => "auto",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `backend` can execute on this CPU
pub fn is_backend_available(backend: Backend) -> bool {
    match backend {
        Backend::Scalar | Backend::Auto => true,
        #[cfg(target_arch = "x86_64")]
        Backend::SSE2 => is_x86_feature_detected!("sse2"),
        #[cfg(target_arch = "x86_64")]
        Backend::AVX2 => is_x86_feature_detected!("avx2"),
        #[cfg(not(target_arch = "x86_64"))]
        Backend::SSE2 | Backend::AVX2 => false,
    }
}

/// Detect best SIMD backend for x86_64 platforms
#[cfg(target_arch = "x86_64")]
fn detect_x86_backend() -> Backend {
    if is_x86_feature_detected!("avx2") {
        return Backend::AVX2;
    }
    if is_x86_feature_detected!("sse2") {
        return Backend::SSE2;
    }
    Backend::Scalar
}

/// Select the best available backend for the current platform
///
/// **x86_64**: AVX2, then SSE2, then Scalar.
///
/// **Other platforms**: Scalar
///
/// # Examples
///
/// ```
/// use loopfuse::select_best_available_backend;
///
/// let backend = select_best_available_backend();
/// println!("Using backend: {:?}", backend);
/// ```
pub fn select_best_available_backend() -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        detect_x86_backend()
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        Backend::Scalar
    }
}
