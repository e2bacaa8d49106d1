//! Arbitrary-precision ball arithmetic.
//!
//! A [`Ball`] is a midpoint at the working precision plus an error radius
//! kept at a small fixed precision and always rounded outward. Every
//! operation returns a ball guaranteed to contain the exact mathematical
//! result, which is what makes the verification layer's containment checks
//! rigorous rather than heuristic.
//!
//! The midpoint is an MPFR float (`rug::Float`); the radius accounts for
//! both the propagated input radii and the rounding of the midpoint itself
//! (one ulp whenever the rounded operation was inexact).

use crate::error::RefintError;
use color_eyre::eyre::{eyre, Result};
use rug::float::{Constant, Round};
use rug::ops::AssignRound;
use rug::Float;
use std::cmp::Ordering;

/// Precision in bits used for radius bookkeeping.
const RADIUS_PREC: u32 = 32;

/// Accuracy reported for values with a zero radius.
pub const ACCURACY_EXACT: i64 = i64::MAX / 2;

/// Accuracy reported for values with no usable midpoint/radius relation
/// (zero or non-finite midpoint with a nonzero radius).
pub const ACCURACY_NONE: i64 = i64::MIN / 2;

/// Round a computation up at radius precision.
fn rad_up<T>(val: T) -> Float
where
    Float: AssignRound<T, Round = Round, Ordering = Ordering>,
{
    Float::with_val_round(RADIUS_PREC, val, Round::Up).0
}

/// Round a computation down at radius precision.
fn rad_down<T>(val: T) -> Float
where
    Float: AssignRound<T, Round = Round, Ordering = Ordering>,
{
    Float::with_val_round(RADIUS_PREC, val, Round::Down).0
}

/// One unit in the last place of `mid`, or zero for a zero midpoint.
fn ulp(mid: &Float) -> Float {
    match mid.get_exp() {
        Some(e) => {
            let prec = mid.prec() as i32;
            Float::with_val(RADIUS_PREC, Float::i_exp(1, e.saturating_sub(prec)))
        }
        None => Float::new(RADIUS_PREC),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    mid: Float,
    rad: Float,
}

impl Ball {
    pub fn zero(prec: u32) -> Self {
        Ball {
            mid: Float::new(prec),
            rad: Float::new(RADIUS_PREC),
        }
    }

    /// Exact if `prec >= 53`, otherwise rounded with the rounding error
    /// folded into the radius.
    pub fn from_f64(v: f64, prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, v, Round::Nearest);
        let rad = if dir == Ordering::Equal {
            Float::new(RADIUS_PREC)
        } else {
            ulp(&mid)
        };
        Ball { mid, rad }
    }

    pub fn from_u32(v: u32, prec: u32) -> Self {
        Self::from_f64(v as f64, prec)
    }

    pub fn from_i32(v: i32, prec: u32) -> Self {
        Self::from_f64(v as f64, prec)
    }

    /// Parse a decimal string at the given precision. The radius covers the
    /// rounding of the decimal literal to binary, so re-parsing at a higher
    /// precision always tightens the ball (no double rounding).
    pub fn try_from_str(s: &str, prec: u32) -> Result<Self> {
        let incomplete =
            Float::parse(s).map_err(|e| eyre!("cannot parse \"{}\" as a number: {}", s, e))?;
        let (mid, dir) = Float::with_val_round(prec, incomplete, Round::Nearest);
        let rad = if dir == Ordering::Equal {
            Float::new(RADIUS_PREC)
        } else {
            ulp(&mid)
        };
        Ok(Ball { mid, rad })
    }

    /// A ball centered at zero with the given radius (an error term).
    pub fn with_error(rad: Float, prec: u32) -> Self {
        Ball {
            mid: Float::new(prec),
            rad: rad_up(&rad),
        }
    }

    pub fn pi(prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, Constant::Pi, Round::Nearest);
        let rad = if dir == Ordering::Equal {
            Float::new(RADIUS_PREC)
        } else {
            ulp(&mid)
        };
        Ball { mid, rad }
    }

    pub fn mid(&self) -> &Float {
        &self.mid
    }

    pub fn rad(&self) -> &Float {
        &self.rad
    }

    pub fn prec(&self) -> u32 {
        self.mid.prec()
    }

    pub fn is_exact(&self) -> bool {
        self.rad.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.mid.is_zero() && self.rad.is_zero()
    }

    /// Upper bound on the magnitude of any value in the ball.
    pub fn upper_abs(&self) -> Float {
        let m = rad_up(self.mid.abs_ref());
        rad_up(&m + &self.rad)
    }

    pub fn neg(&self) -> Self {
        Ball {
            mid: Float::with_val(self.prec(), -&self.mid),
            rad: self.rad.clone(),
        }
    }

    pub fn add(&self, other: &Self, prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, &self.mid + &other.mid, Round::Nearest);
        let mut rad = rad_up(&self.rad + &other.rad);
        if dir != Ordering::Equal {
            rad = rad_up(&rad + ulp(&mid));
        }
        Ball { mid, rad }
    }

    pub fn sub(&self, other: &Self, prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, &self.mid - &other.mid, Round::Nearest);
        let mut rad = rad_up(&self.rad + &other.rad);
        if dir != Ordering::Equal {
            rad = rad_up(&rad + ulp(&mid));
        }
        Ball { mid, rad }
    }

    pub fn mul(&self, other: &Self, prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, &self.mid * &other.mid, Round::Nearest);
        // |a|rb + |b|ra + ra*rb, each step rounded up
        let am = rad_up(self.mid.abs_ref());
        let bm = rad_up(other.mid.abs_ref());
        let t1 = rad_up(&am * &other.rad);
        let t2 = rad_up(&bm * &self.rad);
        let t3 = rad_up(&self.rad * &other.rad);
        let mut rad = rad_up(&t1 + &t2);
        rad = rad_up(&rad + &t3);
        if dir != Ordering::Equal {
            rad = rad_up(&rad + ulp(&mid));
        }
        Ball { mid, rad }
    }

    /// Division. If `other` contains zero the quotient is unbounded; the
    /// result then carries an infinite radius, which the accuracy checks
    /// downstream treat as having no accurate bits.
    pub fn div(&self, other: &Self, prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, &self.mid / &other.mid, Round::Nearest);
        let bm_lo = rad_down(other.mid.abs_ref());
        let denom_lo = rad_down(&bm_lo - &other.rad);
        if !(denom_lo > 0) {
            let mut rad = Float::new(RADIUS_PREC);
            rad.assign_round(f64::INFINITY, Round::Up);
            return Ball { mid, rad };
        }
        // |a/b - am/bm| <= (|am| rb + |bm| ra) / (|bm| (|bm| - rb))
        let am = rad_up(self.mid.abs_ref());
        let bm_hi = rad_up(other.mid.abs_ref());
        let num_a = rad_up(&am * &other.rad);
        let num_b = rad_up(&bm_hi * &self.rad);
        let num = rad_up(&num_a + &num_b);
        let den = rad_down(&bm_lo * &denom_lo);
        let mut rad = rad_up(&num / &den);
        if dir != Ordering::Equal {
            rad = rad_up(&rad + ulp(&mid));
        }
        Ball { mid, rad }
    }

    /// Square root over a non-negative ball, by monotone endpoint bounds.
    pub fn sqrt(&self, prec: u32) -> Self {
        if self.rad.is_zero() {
            let (mid, dir) = Float::with_val_round(prec, self.mid.sqrt_ref(), Round::Nearest);
            let rad = if dir == Ordering::Equal {
                Float::new(RADIUS_PREC)
            } else {
                ulp(&mid)
            };
            return Ball { mid, rad };
        }
        self.monotone(prec, |x, round| {
            Float::with_val_round(prec, x.sqrt_ref(), round).0
        })
    }

    /// Exponential, by monotone endpoint bounds.
    pub fn exp(&self, prec: u32) -> Self {
        if self.rad.is_zero() {
            let (mid, dir) = Float::with_val_round(prec, self.mid.exp_ref(), Round::Nearest);
            let rad = if dir == Ordering::Equal {
                Float::new(RADIUS_PREC)
            } else {
                ulp(&mid)
            };
            return Ball { mid, rad };
        }
        self.monotone(prec, |x, round| {
            Float::with_val_round(prec, x.exp_ref(), round).0
        })
    }

    /// Enclosure of a monotone increasing function applied to the ball:
    /// evaluate at both endpoints with directed rounding and re-center.
    fn monotone<F>(&self, prec: u32, f: F) -> Self
    where
        F: Fn(&Float, Round) -> Float,
    {
        let lo_arg = Float::with_val_round(prec, &self.mid - &self.rad, Round::Down).0;
        let hi_arg = Float::with_val_round(prec, &self.mid + &self.rad, Round::Up).0;
        let lo = f(&lo_arg, Round::Down);
        let hi = f(&hi_arg, Round::Up);
        let (mid, dir) = Float::with_val_round(prec, &lo + &hi, Round::Nearest);
        let mid = Float::with_val(prec, &mid / 2u32);
        let half_width = rad_up(&hi - &lo);
        let half_width = Float::with_val_round(RADIUS_PREC, &half_width / 2u32, Round::Up).0;
        let mut rad = rad_up(&half_width + ulp(&mid));
        if dir != Ordering::Equal {
            rad = rad_up(&rad + ulp(&mid));
        }
        Ball { mid, rad }
    }

    /// Integer power by binary exponentiation.
    pub fn pow_u32(&self, n: u32, prec: u32) -> Self {
        let mut result = Ball::from_u32(1, prec);
        let mut base = self.clone();
        let mut e = n;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&base, prec);
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base, prec);
            }
        }
        result
    }

    /// Round the midpoint to `prec` bits, widening the radius to keep the
    /// result an enclosure.
    pub fn round(&self, prec: u32) -> Self {
        let (mid, dir) = Float::with_val_round(prec, &self.mid, Round::Nearest);
        let rad = if dir == Ordering::Equal {
            self.rad.clone()
        } else {
            rad_up(&self.rad + ulp(&mid))
        };
        Ball { mid, rad }
    }

    /// Add `2^(exp(mid) - rel_bits)` to the radius: one unit in the last
    /// place of the midpoint as if it carried only `rel_bits` bits. Used to
    /// account for reference strings printed to ±1 decimal ulp.
    pub fn inflate_ulp(&mut self, rel_bits: u32) {
        if let Some(e) = self.mid.get_exp() {
            let step = Float::with_val(
                RADIUS_PREC,
                Float::i_exp(1, e.saturating_sub(rel_bits as i32)),
            );
            self.rad = rad_up(&self.rad + &step);
        }
    }

    /// Add an explicit error bound to the radius.
    pub fn add_error(&mut self, err: &Float) {
        self.rad = rad_up(&self.rad + err);
    }

    /// Whether every value of `other` lies inside `self` (conservative:
    /// may report false for balls touching at the boundary).
    pub fn contains(&self, other: &Self) -> bool {
        let prec = self.prec().max(other.prec()) + 32;
        let (d, dir) = Float::with_val_round(prec, &self.mid - &other.mid, Round::Nearest);
        let mut dabs = rad_up(d.abs_ref());
        if dir != Ordering::Equal {
            dabs = rad_up(&dabs + ulp(&d));
        }
        let lhs = rad_up(&dabs + &other.rad);
        lhs <= self.rad
    }

    /// Number of accurate bits: the gap between the midpoint's and the
    /// radius' binary exponents.
    pub fn accuracy_bits(&self) -> i64 {
        if self.rad.is_zero() {
            return ACCURACY_EXACT;
        }
        if !self.rad.is_finite() || !self.mid.is_finite() {
            return ACCURACY_NONE;
        }
        let rad_exp = match self.rad.get_exp() {
            Some(e) => e as i64,
            None => return ACCURACY_EXACT,
        };
        match self.mid.get_exp() {
            Some(mid_exp) => mid_exp as i64 - rad_exp,
            None => ACCURACY_NONE,
        }
    }

    /// Midpoint rounded to the nearest double.
    pub fn to_f64(&self) -> f64 {
        self.mid.to_f64()
    }

    /// Midpoint printed to `ndigits` significant decimal digits. Exact
    /// zeros print as "0".
    pub fn to_decimal_string(&self, ndigits: usize) -> String {
        if self.mid.is_zero() {
            "0".to_string()
        } else {
            self.mid.to_string_radix(10, Some(ndigits))
        }
    }

    /// Midpoint and radius, for failure diagnostics.
    pub fn to_diagnostic_string(&self, ndigits: usize) -> String {
        format!(
            "[{} +/- {}]",
            self.to_decimal_string(ndigits),
            self.rad.to_string_radix(10, Some(3))
        )
    }
}

/// Minimum accuracy over a vector of computed values.
pub fn min_accuracy_bits(values: &[Ball]) -> i64 {
    values
        .iter()
        .map(Ball::accuracy_bits)
        .min()
        .unwrap_or(ACCURACY_EXACT)
}

/// Error if any value in the vector certifies fewer than `floor` bits.
pub fn require_accuracy(values: &[Ball], floor: i64, target_bits: u32) -> Result<()> {
    let acc = min_accuracy_bits(values);
    if acc < floor {
        return Err(RefintError::InsufficientPrecision {
            target_bits,
            reached_bits: acc,
        }
        .into());
    }
    Ok(())
}
