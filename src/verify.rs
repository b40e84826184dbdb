//! Tolerance-based equivalence checks between result sequences
//!
//! Transcendental functions may differ in the last bit between code paths,
//! so results are compared with `|actual − expected| <= atol + rtol·|expected|`
//! rather than exact equality.
//!
//! # Examples
//!
//! ```
//! use loopfuse::verify::{check_allclose, Tolerance};
//!
//! let a = [1.0, 2.0, 3.0];
//! let b = [1.0, 2.0 + 1e-12, 3.0];
//! assert!(check_allclose(&a, &b, Tolerance::default()).is_ok());
//! assert!(check_allclose(&a, &[1.0, 2.1, 3.0], Tolerance::default()).is_err());
//! ```

use std::fmt;

use tracing::warn;

use crate::{LoopfuseError, Result};

/// How many offending indices an error carries
pub const MAX_REPORTED: usize = 10;

/// Relative and absolute tolerance for [`check_allclose`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerance {
    /// Relative tolerance, scaled by `|expected|`
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Treat NaN in the same position of both sequences as equal
    pub equal_nan: bool,
}

impl Default for Tolerance {
    /// `rtol = 1e-7`, `atol = 1e-8`, NaNs compare equal
    fn default() -> Self {
        Self {
            rtol: 1e-7,
            atol: 1e-8,
            equal_nan: true,
        }
    }
}

impl Tolerance {
    /// Tolerance with explicit `rtol` and `atol`; NaNs compare equal
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            equal_nan: true,
        }
    }

    /// Exact equality (still treating equal infinities as close)
    pub fn exact() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Set whether NaNs in matching positions compare equal
    pub fn with_equal_nan(mut self, equal_nan: bool) -> Self {
        self.equal_nan = equal_nan;
        self
    }

    /// Whether a single pair is within tolerance
    ///
    /// Equal values (including equal infinities) are always close.
    pub fn is_close(&self, actual: f64, expected: f64) -> bool {
        if actual == expected {
            return true;
        }
        if actual.is_nan() || expected.is_nan() {
            return self.equal_nan && actual.is_nan() && expected.is_nan();
        }
        if actual.is_infinite() || expected.is_infinite() {
            return false;
        }
        (actual - expected).abs() <= self.atol + self.rtol * expected.abs()
    }
}

/// One pair of elements outside tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    /// Position in both sequences
    pub index: usize,
    /// Value from the sequence under test
    pub actual: f64,
    /// Reference value
    pub expected: f64,
    /// `|actual − expected|`
    pub abs_diff: f64,
    /// `|actual − expected| / |expected|` (infinite when expected is zero)
    pub rel_diff: f64,
}

impl Divergence {
    fn new(index: usize, actual: f64, expected: f64) -> Self {
        let abs_diff = (actual - expected).abs();
        let rel_diff = if expected == 0.0 {
            f64::INFINITY
        } else {
            abs_diff / expected.abs()
        };
        Self {
            index,
            actual,
            expected,
            abs_diff,
            rel_diff,
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] actual {:e} vs expected {:e} (abs {:e}, rel {:e})",
            self.index, self.actual, self.expected, self.abs_diff, self.rel_diff
        )
    }
}

/// Every element pair outside tolerance, in index order
///
/// # Errors
///
/// Returns [`LoopfuseError::SizeMismatch`] if the sequences differ in length.
pub fn divergences(actual: &[f64], expected: &[f64], tolerance: Tolerance) -> Result<Vec<Divergence>> {
    if actual.len() != expected.len() {
        return Err(LoopfuseError::SizeMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    Ok(actual
        .iter()
        .zip(expected)
        .enumerate()
        .filter(|&(_, (&a, &e))| !tolerance.is_close(a, e))
        .map(|(i, (&a, &e))| Divergence::new(i, a, e))
        .collect())
}

/// Check that two sequences agree elementwise within `tolerance`
///
/// # Errors
///
/// - [`LoopfuseError::SizeMismatch`] if the lengths differ
/// - [`LoopfuseError::NotClose`] with the offending indices (up to
///   [`MAX_REPORTED`]) and the largest absolute and relative divergence
pub fn check_allclose(actual: &[f64], expected: &[f64], tolerance: Tolerance) -> Result<()> {
    let diverged = divergences(actual, expected, tolerance)?;
    if diverged.is_empty() {
        return Ok(());
    }

    let max_abs_diff = diverged.iter().map(|d| d.abs_diff).fold(0.0, f64::max);
    let max_rel_diff = diverged.iter().map(|d| d.rel_diff).fold(0.0, f64::max);
    let indices: Vec<usize> = diverged.iter().take(MAX_REPORTED).map(|d| d.index).collect();

    warn!(
        mismatched = diverged.len(),
        total = actual.len(),
        max_abs_diff,
        max_rel_diff,
        "sequences not close"
    );

    Err(LoopfuseError::NotClose {
        mismatched: diverged.len(),
        total: actual.len(),
        indices,
        max_abs_diff,
        max_rel_diff,
    })
}

/// Panic unless two sequences agree elementwise within `tolerance`
///
/// The panic message lists the first offending pairs with their values.
///
/// # Panics
///
/// On length mismatch or any pair outside tolerance.
#[track_caller]
pub fn assert_allclose(actual: &[f64], expected: &[f64], tolerance: Tolerance) {
    let diverged = match divergences(actual, expected, tolerance) {
        Ok(diverged) => diverged,
        Err(err) => panic!("assert_allclose failed: {err}"),
    };
    if diverged.is_empty() {
        return;
    }

    let max_abs_diff = diverged.iter().map(|d| d.abs_diff).fold(0.0, f64::max);
    let max_rel_diff = diverged.iter().map(|d| d.rel_diff).fold(0.0, f64::max);
    let mut message = format!(
        "assert_allclose failed (rtol={:e}, atol={:e})\n\
         mismatched elements: {} / {}\n\
         max abs diff: {:e}\n\
         max rel diff: {:e}",
        tolerance.rtol,
        tolerance.atol,
        diverged.len(),
        actual.len(),
        max_abs_diff,
        max_rel_diff,
    );
    for d in diverged.iter().take(MAX_REPORTED) {
        message.push_str(&format!("\n  {d}"));
    }
    panic!("{message}");
}
