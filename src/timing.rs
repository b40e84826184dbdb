//! Timing harness
//!
//! Repeatedly runs a [`Kernel`] against a fixed input and reports the mean and
//! standard deviation of the wall-clock time per invocation.
//!
//! Each *repeat* runs the kernel `loops` times back to back and records the
//! average; statistics are taken across repeats. With `loops = 0` the harness
//! calibrates first, growing the loop count through 1, 2, 5, 10, 20, 50, …
//! until a single repeat lasts at least `target_time`.
//!
//! # Examples
//!
//! ```
//! use loopfuse::timing::{time_kernel, TimingConfig};
//! use loopfuse::TransformConfig;
//!
//! let input = vec![0.5; 1000];
//! let config = TimingConfig::new().with_repeats(3).with_loops(10);
//! let report = time_kernel(&TransformConfig::new(), &input, &config).unwrap();
//!
//! assert_eq!(report.repeats, 3);
//! assert_eq!(report.loops, 10);
//! println!("{report}");
//! ```

use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::{Kernel, LoopfuseError, Result};

/// Upper bound on calibrated loop counts
const MAX_LOOPS: usize = 1_000_000_000;

/// Timing harness configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Number of timed repeats statistics are taken over
    pub repeats: usize,
    /// Invocations per repeat (0 = calibrate)
    pub loops: usize,
    /// Minimum duration of one repeat when calibrating
    pub target_time: Duration,
    /// Untimed invocations before measuring
    pub warmup: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            repeats: 7,
            loops: 0,
            target_time: Duration::from_millis(200),
            warmup: 1,
        }
    }
}

impl TimingConfig {
    /// Create a configuration with default values (7 repeats, calibrated loops)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of timed repeats
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Fix the invocations per repeat (0 = calibrate)
    pub fn with_loops(mut self, loops: usize) -> Self {
        self.loops = loops;
        self
    }

    /// Set the calibration target for one repeat
    pub fn with_target_time(mut self, target_time: Duration) -> Self {
        self.target_time = target_time;
        self
    }

    /// Set the number of untimed warmup invocations
    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    /// Finalize configuration (no-op, for builder pattern consistency)
    pub fn build(self) -> Self {
        self
    }

    /// Quick preset: 3 repeats, 20 ms calibration target
    ///
    /// Suitable for tests and CI.
    pub fn quick() -> Self {
        Self::new()
            .with_repeats(3)
            .with_target_time(Duration::from_millis(20))
    }

    /// Thorough preset: 10 repeats, 1 s calibration target, 3 warmups
    pub fn thorough() -> Self {
        Self::new()
            .with_repeats(10)
            .with_target_time(Duration::from_secs(1))
            .with_warmup(3)
    }

    fn validate(&self) -> Result<()> {
        if self.repeats == 0 {
            return Err(LoopfuseError::InvalidInput(
                "repeats must be greater than zero".to_string(),
            ));
        }
        if self.loops == 0 && self.target_time.is_zero() {
            return Err(LoopfuseError::InvalidInput(
                "calibration needs a non-zero target time".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of timing one kernel
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimingReport {
    /// Kernel name
    pub name: String,
    /// Length of the input timed against
    pub input_len: usize,
    /// Per-invocation time for each repeat
    pub per_loop: Vec<Duration>,
    /// Invocations per repeat
    pub loops: usize,
    /// Number of repeats
    pub repeats: usize,
    /// Mean per-invocation time across repeats
    pub mean: Duration,
    /// Population standard deviation across repeats
    pub std_dev: Duration,
    /// Fastest repeat
    pub best: Duration,
    /// Slowest repeat
    pub worst: Duration,
}

impl TimingReport {
    fn from_samples(name: String, input_len: usize, loops: usize, per_loop: Vec<Duration>) -> Self {
        // Work in nanoseconds so whole-nanosecond samples stay exact
        let nanos: Vec<f64> = per_loop.iter().map(|d| d.as_nanos() as f64).collect();
        let n = nanos.len().max(1) as f64;
        let mean = nanos.iter().sum::<f64>() / n;
        let variance = nanos.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        let best = per_loop.iter().copied().min().unwrap_or_default();
        let worst = per_loop.iter().copied().max().unwrap_or_default();

        Self {
            name,
            input_len,
            repeats: per_loop.len(),
            per_loop,
            loops,
            mean: Duration::from_nanos(mean.round() as u64),
            std_dev: Duration::from_nanos(variance.sqrt().round() as u64),
            best,
            worst,
        }
    }

    /// How many times faster this kernel is than `baseline` (by mean)
    ///
    /// A kernel can time at 0 ns per loop (empty input, coarse clock). Two
    /// zero means count as equal speed (`1.0`); a zero mean against a non-zero
    /// baseline is `f64::INFINITY`.
    pub fn speedup_over(&self, baseline: &TimingReport) -> f64 {
        if self.mean.is_zero() {
            return if baseline.mean.is_zero() {
                1.0
            } else {
                f64::INFINITY
            };
        }
        baseline.mean.as_secs_f64() / self.mean.as_secs_f64()
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ± {} per loop (mean ± std. dev. of {} runs, {} loops each)",
            self.name,
            format_duration(self.mean),
            format_duration(self.std_dev),
            self.repeats,
            self.loops
        )
    }
}

/// Render a duration with three significant digits in the largest fitting unit
///
/// # Examples
///
/// ```
/// use loopfuse::timing::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_micros(10_200)), "10.2 ms");
/// assert_eq!(format_duration(Duration::from_nanos(132_000)), "132 µs");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = round_significant(duration.as_secs_f64(), 3);
    let (value, unit) = if secs >= 1.0 {
        (secs, "s")
    } else if secs >= 1e-3 {
        (secs * 1e3, "ms")
    } else if secs >= 1e-6 {
        (secs * 1e6, "µs")
    } else {
        (secs * 1e9, "ns")
    };

    let precision = if value > 0.0 {
        (2 - value.log10().floor() as i32).max(0) as usize
    } else {
        0
    };
    format!("{value:.precision$} {unit}")
}

/// Exact `elapsed / loops` for any `loops`, in whole nanoseconds
fn per_invocation(elapsed: Duration, loops: usize) -> Duration {
    let nanos = elapsed.as_nanos() / loops.max(1) as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Round to `digits` significant digits, so 999.6 µs becomes 1 ms before a
/// unit is picked
fn round_significant(value: f64, digits: i32) -> f64 {
    if value <= 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.log10().floor() as i32;
    let scale = 10f64.powi(digits - 1 - magnitude);
    (value * scale).round() / scale
}

fn run_loops<K: Kernel + ?Sized>(kernel: &K, input: &[f64], loops: usize) -> Result<Duration> {
    let start = Instant::now();
    for _ in 0..loops {
        black_box(kernel.apply(black_box(input))?);
    }
    Ok(start.elapsed())
}

fn calibrate<K: Kernel + ?Sized>(kernel: &K, input: &[f64], target: Duration) -> Result<usize> {
    let mut base = 1;
    loop {
        for step in [1, 2, 5] {
            let loops = base * step;
            let elapsed = run_loops(kernel, input, loops)?;
            if elapsed >= target || loops >= MAX_LOOPS {
                debug!(loops, ?elapsed, "calibrated loop count");
                return Ok(loops);
            }
        }
        base *= 10;
    }
}

/// Time `kernel` against `input`
///
/// `input` is borrowed immutably for the whole run, so every invocation sees
/// identical data.
///
/// # Errors
///
/// - [`LoopfuseError::InvalidInput`] for zero repeats, or calibration with a
///   zero target time
/// - any error the kernel itself returns
pub fn time_kernel<K: Kernel + ?Sized>(
    kernel: &K,
    input: &[f64],
    config: &TimingConfig,
) -> Result<TimingReport> {
    config.validate()?;
    let name = kernel.name();

    for _ in 0..config.warmup {
        black_box(kernel.apply(input)?);
    }

    let loops = if config.loops == 0 {
        calibrate(kernel, input, config.target_time)?
    } else {
        config.loops
    };

    let mut per_loop = Vec::with_capacity(config.repeats);
    for _ in 0..config.repeats {
        let elapsed = run_loops(kernel, input, loops)?;
        per_loop.push(per_invocation(elapsed, loops));
    }

    let report = TimingReport::from_samples(name, input.len(), loops, per_loop);
    info!(
        kernel = %report.name,
        len = report.input_len,
        mean = ?report.mean,
        std_dev = ?report.std_dev,
        loops,
        "timed kernel"
    );
    Ok(report)
}

/// Speedup of every report relative to the first one
///
/// The first entry is always `1.0`. Empty input yields an empty list. See
/// [`TimingReport::speedup_over`] for zero-duration reports.
pub fn speedups(reports: &[TimingReport]) -> Vec<(String, f64)> {
    let Some(baseline) = reports.first() else {
        return Vec::new();
    };
    reports
        .iter()
        .map(|r| (r.name.clone(), r.speedup_over(baseline)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnKernel, TransformConfig};
    use std::cell::Cell;

    #[test]
    fn test_default_config() {
        let config = TimingConfig::default();
        assert_eq!(config.repeats, 7);
        assert_eq!(config.loops, 0);
        assert_eq!(config.target_time, Duration::from_millis(200));
        assert_eq!(config.warmup, 1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = TimingConfig::new()
            .with_repeats(4)
            .with_loops(25)
            .with_target_time(Duration::from_millis(5))
            .with_warmup(0)
            .build();

        assert_eq!(config.repeats, 4);
        assert_eq!(config.loops, 25);
        assert_eq!(config.target_time, Duration::from_millis(5));
        assert_eq!(config.warmup, 0);
    }

    #[test]
    fn test_presets() {
        let quick = TimingConfig::quick();
        assert_eq!(quick.repeats, 3);
        assert_eq!(quick.target_time, Duration::from_millis(20));

        let thorough = TimingConfig::thorough();
        assert_eq!(thorough.repeats, 10);
        assert_eq!(thorough.warmup, 3);
    }

    #[test]
    fn test_zero_repeats_rejected() {
        let config = TimingConfig::new().with_repeats(0);
        let err = time_kernel(&TransformConfig::new(), &[0.5], &config).unwrap_err();
        assert!(matches!(err, LoopfuseError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_target_rejected_when_calibrating() {
        let config = TimingConfig::new().with_target_time(Duration::ZERO);
        assert!(time_kernel(&TransformConfig::new(), &[0.5], &config).is_err());
    }

    #[test]
    fn test_fixed_loops_invocation_count() {
        let calls = Cell::new(0usize);
        let kernel = FnKernel::new("counting", |x: &[f64]| {
            calls.set(calls.get() + 1);
            Ok(x.to_vec())
        });
        let config = TimingConfig::new().with_repeats(3).with_loops(4).with_warmup(2);

        let report = time_kernel(&kernel, &[1.0, 2.0], &config).unwrap();

        assert_eq!(calls.get(), 2 + 3 * 4);
        assert_eq!(report.name, "counting");
        assert_eq!(report.per_loop.len(), 3);
        assert_eq!(report.input_len, 2);
        assert!(report.best <= report.mean && report.mean <= report.worst);
    }

    #[test]
    fn test_calibration_reaches_target() {
        let kernel = FnKernel::new("sleepy", |x: &[f64]| {
            std::thread::sleep(Duration::from_millis(1));
            Ok(x.to_vec())
        });
        let config = TimingConfig::new()
            .with_repeats(1)
            .with_warmup(0)
            .with_target_time(Duration::from_millis(4));

        let report = time_kernel(&kernel, &[], &config).unwrap();
        assert!([1, 2, 5, 10, 20, 50].contains(&report.loops));
        assert!(report.mean >= Duration::from_millis(1));
    }

    #[test]
    fn test_kernel_error_propagates() {
        let config = TimingConfig::new().with_loops(1).with_repeats(1);
        let err = time_kernel(&TransformConfig::new(), &[-3.0], &config).unwrap_err();
        assert!(matches!(err, LoopfuseError::Domain { index: 0, .. }));
    }

    #[test]
    fn test_statistics() {
        let samples = vec![
            Duration::from_micros(10),
            Duration::from_micros(20),
            Duration::from_micros(30),
        ];
        let report = TimingReport::from_samples("k".to_string(), 8, 5, samples);

        assert_eq!(report.mean, Duration::from_micros(20));
        assert_eq!(report.best, Duration::from_micros(10));
        assert_eq!(report.worst, Duration::from_micros(30));
        // population std dev of 10, 20, 30 is sqrt(200/3) ≈ 8.165
        let std_us = report.std_dev.as_secs_f64() * 1e6;
        assert!((std_us - 8.165).abs() < 1e-3);
    }

    #[test]
    fn test_speedups() {
        let slow = TimingReport::from_samples("slow".into(), 1, 1, vec![Duration::from_millis(8)]);
        let fast = TimingReport::from_samples("fast".into(), 1, 1, vec![Duration::from_millis(2)]);

        let result = speedups(&[slow, fast]);
        assert_eq!(result[0], ("slow".to_string(), 1.0));
        assert_eq!(result[1].0, "fast");
        assert!((result[1].1 - 4.0).abs() < 1e-9);
        assert!(speedups(&[]).is_empty());
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00 s");
        assert_eq!(format_duration(Duration::from_micros(1_230)), "1.23 ms");
        assert_eq!(format_duration(Duration::from_nanos(45_600)), "45.6 µs");
        assert_eq!(format_duration(Duration::from_nanos(7)), "7.00 ns");
        assert_eq!(format_duration(Duration::ZERO), "0 ns");
    }

    #[test]
    fn test_format_duration_rounds_into_next_unit() {
        assert_eq!(format_duration(Duration::from_nanos(999_600)), "1.00 ms");
        assert_eq!(format_duration(Duration::from_nanos(999_600_000)), "1.00 s");
        assert_eq!(format_duration(Duration::from_nanos(9_996)), "10.0 µs");
        assert_eq!(format_duration(Duration::from_nanos(999_400)), "999 µs");
        assert_eq!(format_duration(Duration::from_nanos(999)), "999 ns");
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_per_invocation_beyond_u32_loops() {
        let loops = (1usize << 32) + 1;
        let elapsed = Duration::from_secs(8);
        // 8 s over ~4.29e9 calls is under 2 ns each
        assert!(per_invocation(elapsed, loops) < Duration::from_nanos(2));
        assert_eq!(per_invocation(elapsed, 1 << 32), Duration::from_nanos(1));
        assert_eq!(per_invocation(Duration::from_micros(10), 4), Duration::from_nanos(2_500));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    #[ignore] // Runs 2^32 + 1 invocations; covered fast by test_per_invocation_beyond_u32_loops
    fn test_huge_loop_count_reports_per_invocation_time() {
        let calls = Cell::new(0u64);
        let kernel = FnKernel::new("noop", |_: &[f64]| {
            calls.set(calls.get() + 1);
            Ok(Vec::new())
        });
        // Past u32::MAX the loop count must not wrap when averaging
        let loops = (1usize << 32) + 1;
        let config = TimingConfig::new().with_repeats(1).with_warmup(0).with_loops(loops);

        let report = time_kernel(&kernel, &[], &config).unwrap();

        assert_eq!(calls.get(), loops as u64);
        assert_eq!(report.loops, loops);
        assert!(report.mean < Duration::from_micros(1));
    }

    #[test]
    fn test_speedup_with_zero_mean() {
        let zero = TimingReport::from_samples("zero".into(), 0, 1, vec![Duration::ZERO]);
        let slow = TimingReport::from_samples("slow".into(), 0, 1, vec![Duration::from_millis(1)]);

        assert_eq!(zero.speedup_over(&zero), 1.0);
        assert_eq!(zero.speedup_over(&slow), f64::INFINITY);
        assert_eq!(slow.speedup_over(&zero), 0.0);

        let result = speedups(&[zero.clone(), zero]);
        assert!(result.iter().all(|(_, s)| *s == 1.0));
    }

    #[test]
    fn test_report_display() {
        let report = TimingReport::from_samples(
            "loop".into(),
            100,
            100,
            vec![Duration::from_micros(10_200); 7],
        );
        assert_eq!(
            report.to_string(),
            "loop: 10.2 ms ± 0 ns per loop (mean ± std. dev. of 7 runs, 100 loops each)"
        );
    }
}
