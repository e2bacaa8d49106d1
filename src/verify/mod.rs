//! Reference-file creation and verification.
//!
//! Creation computes every entry of an input file to a requested decimal
//! digit count and writes a full reference file. Verification recomputes
//! the entries in one of three float modes and compares against the stored
//! values:
//!
//! * `double` - plain f64 evaluation, compared under a relative tolerance;
//! * `interval` - ball evaluation to a requested bit count, compared by
//!   interval containment against the stored decimal (rigorous);
//! * `exact` - checks that the stored values are the correctly-rounded
//!   doubles of the exact results.

mod boys;
mod integral4;
mod single4;

pub use boys::{create_boys_test, run_boys_test};
pub use integral4::{create_integral_test, run_integral_test};
pub use single4::{create_single_test, run_single_test};

use crate::ball::Ball;
use crate::dispatch::digits_to_bits;
use clap::ValueEnum;
use tracing::{error, info};

/// Relative tolerance of the `double` mode.
pub const DOUBLE_TOLERANCE: f64 = 1e-13;

/// Significant digits to print when a comparison fails.
fn diag_digits(ndigits: usize) -> usize {
    2 * ndigits.max(8)
}

/// How a test run evaluates and compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FloatMode {
    /// Plain double precision under a relative tolerance.
    Double,
    /// Ball arithmetic with containment comparison.
    Interval,
    /// Stored values must be correctly-rounded doubles.
    Exact,
}

/// Relative comparison used by the `double` mode: the difference is scaled
/// by the larger magnitude, floored at one so tiny values compare
/// absolutely.
pub fn almost_equal(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}

/// Outcome of one verification run. `tested`/`failed` count values in
/// interval mode and entries in the other modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestReport {
    pub tested: usize,
    pub failed: usize,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.failed == 0
    }

    pub fn record(&mut self, ok: bool) {
        self.tested += 1;
        if !ok {
            self.failed += 1;
        }
    }

    pub fn log_summary(&self, what: &str) {
        if self.passed() {
            info!("{}: {} comparisons, all passed", what, self.tested);
        } else {
            error!(
                "{}: {} comparisons, {} FAILED",
                what, self.tested, self.failed
            );
        }
    }
}

/// Parse a stored decimal reference value into a ball suitable for
/// containment comparison at `target_bits`: parsed a little above the
/// stored accuracy, widened by one decimal ulp of slack, and rounded to
/// the comparison precision.
fn reference_ball(value: &str, ndigits: usize, target_bits: u32) -> color_eyre::Result<Ball> {
    let store_bits = digits_to_bits(ndigits as u32) + 16;
    let mut b = Ball::try_from_str(value, store_bits)?;
    // stored strings are faithful to +/- 1 ulp in the last printed digit
    b.inflate_ulp(digits_to_bits(ndigits.saturating_sub(1) as u32));
    Ok(b.round(target_bits))
}

/// Containment comparison of a computed ball against a stored reference.
/// Only the reference may enclose the candidate; a wide candidate that
/// merely swallows the reference is under-accurate and must not pass.
fn interval_matches(computed: &Ball, reference: &Ball) -> bool {
    computed == reference || reference.contains(computed)
}
