//! SSE2 backend implementation (x86_64 baseline SIMD)
//!
//! This backend uses SSE2 intrinsics for 128-bit SIMD operations.
//! SSE2 is available on all x86_64 CPUs as a baseline requirement.
//!
//! # Performance
//!
//! Two f64 lanes per register, so arithmetic primitives run up to 2x faster
//! than scalar. Transcendentals have no SSE2 instruction and run scalar.
//!
//! # Safety
//!
//! All SSE2 intrinsics are marked `unsafe` by Rust. This module carefully isolates
//! all unsafe code and verifies correctness through comprehensive testing.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::ArrayBackend;

/// SSE2 backend (128-bit SIMD for x86_64)
pub struct Sse2Backend;

impl ArrayBackend for Sse2Backend {
    #[target_feature(enable = "sse2")]
    unsafe fn square(a: &[f64], result: &mut [f64]) {
        let len = a.len();
        let mut i = 0;

        // Process 2 elements at a time (128-bit = 2 x f64)
        while i + 2 <= len {
            let va = _mm_loadu_pd(a.as_ptr().add(i));
            let vresult = _mm_mul_pd(va, va);
            _mm_storeu_pd(result.as_mut_ptr().add(i), vresult);
            i += 2;
        }

        // Handle remaining elements with scalar code
        for j in i..len {
            result[j] = a[j] * a[j];
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn add(a: &[f64], b: &[f64], result: &mut [f64]) {
        let len = a.len();
        let mut i = 0;

        while i + 2 <= len {
            let va = _mm_loadu_pd(a.as_ptr().add(i));
            let vb = _mm_loadu_pd(b.as_ptr().add(i));
            _mm_storeu_pd(result.as_mut_ptr().add(i), _mm_add_pd(va, vb));
            i += 2;
        }

        for j in i..len {
            result[j] = a[j] + b[j];
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn sub(a: &[f64], b: &[f64], result: &mut [f64]) {
        let len = a.len();
        let mut i = 0;

        while i + 2 <= len {
            let va = _mm_loadu_pd(a.as_ptr().add(i));
            let vb = _mm_loadu_pd(b.as_ptr().add(i));
            _mm_storeu_pd(result.as_mut_ptr().add(i), _mm_sub_pd(va, vb));
            i += 2;
        }

        for j in i..len {
            result[j] = a[j] - b[j];
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn scale(a: &[f64], factor: f64, result: &mut [f64]) {
        let len = a.len();
        let mut i = 0;
        let vfactor = _mm_set1_pd(factor);

        while i + 2 <= len {
            let va = _mm_loadu_pd(a.as_ptr().add(i));
            _mm_storeu_pd(result.as_mut_ptr().add(i), _mm_mul_pd(va, vfactor));
            i += 2;
        }

        for j in i..len {
            result[j] = a[j] * factor;
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn gt_scalar(a: &[f64], threshold: f64, mask: &mut [bool]) {
        let len = a.len();
        let mut i = 0;
        let vthreshold = _mm_set1_pd(threshold);

        while i + 2 <= len {
            let va = _mm_loadu_pd(a.as_ptr().add(i));
            // cmpgt is an ordered compare: NaN lanes come out false
            let bits = _mm_movemask_pd(_mm_cmpgt_pd(va, vthreshold));
            mask[i] = bits & 0b01 != 0;
            mask[i + 1] = bits & 0b10 != 0;
            i += 2;
        }

        for j in i..len {
            mask[j] = a[j] > threshold;
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn select(mask: &[bool], a: &[f64], b: &[f64], result: &mut [f64]) {
        // SSE2 has no blendv; bool masks are byte-packed, so select runs scalar
        for i in 0..mask.len() {
            result[i] = if mask[i] { a[i] } else { b[i] };
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn ln_1p(a: &[f64], result: &mut [f64]) {
        // SSE2 doesn't have native log, use scalar
        for (out, &x) in result.iter_mut().zip(a) {
            *out = x.ln_1p();
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn exp(a: &[f64], result: &mut [f64]) {
        // SSE2 doesn't have native exp, use scalar
        for (out, &x) in result.iter_mut().zip(a) {
            *out = x.exp();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::scalar::ScalarBackend;

    #[test]
    fn test_sse2_square() {
        let a = [1.0, 2.0, 3.0, -4.0, 5.0];
        let mut result = [0.0; 5];

        unsafe {
            Sse2Backend::square(&a, &mut result);
        }

        assert_eq!(result, [1.0, 4.0, 9.0, 16.0, 25.0]);
    }

    #[test]
    fn test_sse2_add() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [5.0, 6.0, 7.0, 8.0, 9.0];
        let mut result = [0.0; 5];

        unsafe {
            Sse2Backend::add(&a, &b, &mut result);
        }

        assert_eq!(result, [6.0, 8.0, 10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_sse2_gt_scalar_odd_length() {
        let a = [0.1, 0.9, 0.5, 0.6, f64::NAN];
        let mut mask = [false; 5];

        unsafe {
            Sse2Backend::gt_scalar(&a, 0.5, &mut mask);
        }

        assert_eq!(mask, [false, true, false, true, false]);
    }

    #[test]
    fn test_sse2_matches_scalar() {
        let a: Vec<f64> = (0..11).map(|i| i as f64 * 0.137 - 0.4).collect();
        let b: Vec<f64> = (0..11).map(|i| 1.0 - i as f64 * 0.05).collect();

        let mut sse2_result = vec![0.0; 11];
        let mut scalar_result = vec![0.0; 11];

        unsafe {
            Sse2Backend::sub(&a, &b, &mut sse2_result);
            ScalarBackend::sub(&a, &b, &mut scalar_result);
        }
        assert_eq!(sse2_result, scalar_result);

        unsafe {
            Sse2Backend::scale(&a, 0.5, &mut sse2_result);
            ScalarBackend::scale(&a, 0.5, &mut scalar_result);
        }
        assert_eq!(sse2_result, scalar_result);

        unsafe {
            Sse2Backend::ln_1p(&b, &mut sse2_result);
            ScalarBackend::ln_1p(&b, &mut scalar_result);
        }
        assert_eq!(sse2_result, scalar_result);

        unsafe {
            Sse2Backend::exp(&a, &mut sse2_result);
            ScalarBackend::exp(&a, &mut scalar_result);
        }
        assert_eq!(sse2_result, scalar_result);

        let mut sse2_mask = vec![false; 11];
        let mut scalar_mask = vec![false; 11];
        unsafe {
            Sse2Backend::gt_scalar(&a, 0.5, &mut sse2_mask);
            ScalarBackend::gt_scalar(&a, 0.5, &mut scalar_mask);
            Sse2Backend::select(&sse2_mask, &a, &b, &mut sse2_result);
            ScalarBackend::select(&scalar_mask, &a, &b, &mut scalar_result);
        }
        assert_eq!(sse2_mask, scalar_mask);
        assert_eq!(sse2_result, scalar_result);
    }
}
