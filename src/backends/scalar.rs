//! Scalar (non-SIMD) backend implementation
//!
//! This is the portable baseline implementation that works on all platforms.
//! It uses simple loops without any SIMD instructions.
//!
//! # Performance
//!
//! This backend is the correctness reference for the SIMD backends.

use super::ArrayBackend;

/// Scalar backend (portable, no SIMD)
pub struct ScalarBackend;

impl ArrayBackend for ScalarBackend {
    // SAFETY: This function is safe because:
    // 1. All slice accesses are bounds-checked by Rust iterator/indexing
    // 2. No raw pointer arithmetic is performed
    // 3. Marked unsafe only to match ArrayBackend trait interface
    unsafe fn square(a: &[f64], result: &mut [f64]) {
        for (out, &x) in result.iter_mut().zip(a) {
            *out = x * x;
        }
    }

    // SAFETY: This function is safe because:
    // 1. All slice accesses are bounds-checked by Rust iterator/indexing
    // 2. No raw pointer arithmetic is performed
    // 3. Marked unsafe only to match ArrayBackend trait interface
    unsafe fn add(a: &[f64], b: &[f64], result: &mut [f64]) {
        for i in 0..a.len() {
            result[i] = a[i] + b[i];
        }
    }

    // SAFETY: This function is safe because:
    // 1. All slice accesses are bounds-checked by Rust iterator/indexing
    // 2. No raw pointer arithmetic is performed
    // 3. Marked unsafe only to match ArrayBackend trait interface
    unsafe fn sub(a: &[f64], b: &[f64], result: &mut [f64]) {
        for i in 0..a.len() {
            result[i] = a[i] - b[i];
        }
    }

    // SAFETY: bounds-checked iteration, no raw pointers
    unsafe fn scale(a: &[f64], factor: f64, result: &mut [f64]) {
        for (out, &x) in result.iter_mut().zip(a) {
            *out = x * factor;
        }
    }

    // SAFETY: bounds-checked iteration, no raw pointers
    unsafe fn gt_scalar(a: &[f64], threshold: f64, mask: &mut [bool]) {
        for (m, &x) in mask.iter_mut().zip(a) {
            *m = x > threshold;
        }
    }

    // SAFETY: bounds-checked indexing, no raw pointers
    unsafe fn select(mask: &[bool], a: &[f64], b: &[f64], result: &mut [f64]) {
        for i in 0..mask.len() {
            result[i] = if mask[i] { a[i] } else { b[i] };
        }
    }

    // SAFETY: bounds-checked iteration, no raw pointers
    unsafe fn ln_1p(a: &[f64], result: &mut [f64]) {
        for (out, &x) in result.iter_mut().zip(a) {
            *out = x.ln_1p();
        }
    }

    // SAFETY: bounds-checked iteration, no raw pointers
    unsafe fn exp(a: &[f64], result: &mut [f64]) {
        for (out, &x) in result.iter_mut().zip(a) {
            *out = x.exp();
        }
    }
}
