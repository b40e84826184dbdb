//! Backend implementations for different SIMD instruction sets
//!
//! Each backend provides the whole-array primitives the batch variant is
//! built from. All backends implement [`ArrayBackend`] so the dispatch in
//! [`crate::array`] stays uniform.
//!
//! # Safety
//!
//! All `unsafe` code is isolated within backend implementations. The public API
//! remains 100% safe.
//!
//! # Backends
//!
//! - `scalar`: Portable baseline implementation (no SIMD)
//! - `sse2`: x86_64 baseline SIMD (128-bit, 2 x f64)
//! - `avx2`: x86_64 advanced SIMD (256-bit, 4 x f64)

pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod sse2;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

/// Backend trait defining whole-array primitives over `f64`
///
/// # Safety
///
/// Implementations may use unsafe SIMD intrinsics. Callers must ensure:
/// - All input slices have the same length
/// - Output slices have length >= input length
/// - The CPU supports the backend's instruction set
pub trait ArrayBackend {
    /// Element-wise square: a[i] * a[i]
    ///
    /// # Safety
    ///
    /// - `result` must have length >= `a.len()`
    unsafe fn square(a: &[f64], result: &mut [f64]);

    /// Element-wise addition: a[i] + b[i]
    ///
    /// # Safety
    ///
    /// - `a` and `b` must have the same length
    /// - `result` must have length >= `a.len()`
    unsafe fn add(a: &[f64], b: &[f64], result: &mut [f64]);

    /// Element-wise subtraction: a[i] - b[i]
    ///
    /// # Safety
    ///
    /// - `a` and `b` must have the same length
    /// - `result` must have length >= `a.len()`
    unsafe fn sub(a: &[f64], b: &[f64], result: &mut [f64]);

    /// Scalar multiplication: a[i] * factor
    ///
    /// # Safety
    ///
    /// - `result` must have length >= `a.len()`
    unsafe fn scale(a: &[f64], factor: f64, result: &mut [f64]);

    /// Comparison mask: a[i] > threshold
    ///
    /// NaN compares false.
    ///
    /// # Safety
    ///
    /// - `mask` must have length >= `a.len()`
    unsafe fn gt_scalar(a: &[f64], threshold: f64, mask: &mut [bool]);

    /// Masked select: mask[i] ? a[i] : b[i]
    ///
    /// # Safety
    ///
    /// - `mask`, `a` and `b` must have the same length
    /// - `result` must have length >= `mask.len()`
    unsafe fn select(mask: &[bool], a: &[f64], b: &[f64], result: &mut [f64]);

    /// Natural log of one plus the value: ln(1 + a[i])
    ///
    /// # Safety
    ///
    /// - `result` must have length >= `a.len()`
    unsafe fn ln_1p(a: &[f64], result: &mut [f64]);

    /// Exponential: e^a[i]
    ///
    /// # Safety
    ///
    /// - `result` must have length >= `a.len()`
    unsafe fn exp(a: &[f64], result: &mut [f64]);
}
