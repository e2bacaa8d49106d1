//! The Boys function F_m(t).
//!
//! Double precision uses the power series with downward recursion for
//! small arguments and the erf closed form with upward recursion for large
//! ones. The ball flavor uses only the series, with the truncation tail
//! bounded explicitly and folded into the radius, followed by downward
//! recursion; every step is an enclosure.

use crate::ball::Ball;
use color_eyre::eyre::{eyre, Result};
use libm::erf;
use std::f64::consts::PI;

/// Above this the upward recursion is stable and erf(sqrt t) has converged
/// to working accuracy much faster than the series.
const SERIES_CUTOFF: f64 = 35.0;

/// F_0(t) .. F_m(t) in double precision. `t` must be non-negative.
pub fn boys_f64(m: u32, t: f64) -> Vec<f64> {
    let m = m as usize;
    let mut f = vec![0.0; m + 1];
    let et = (-t).exp();

    if t < SERIES_CUTOFF {
        // series at the highest order, then downward recursion
        let mm = m as f64;
        let mut term = 1.0 / (2.0 * mm + 1.0);
        let mut sum = term;
        let mut i = 1.0;
        while term > sum * 1e-17 {
            term *= 2.0 * t / (2.0 * mm + 2.0 * i + 1.0);
            sum += term;
            i += 1.0;
        }
        f[m] = sum * et;
        for k in (1..=m).rev() {
            f[k - 1] = (2.0 * t * f[k] + et) / (2.0 * k as f64 - 1.0);
        }
    } else {
        f[0] = 0.5 * (PI / t).sqrt() * erf(t.sqrt());
        let two_t = 2.0 * t;
        for k in 0..m {
            f[k + 1] = ((2.0 * k as f64 + 1.0) * f[k] - et) / two_t;
        }
    }
    f
}

/// F_0(t) .. F_m(t) as balls at the given working precision. `t` must be a
/// non-negative ball.
pub fn boys_ball(m: u32, t: &Ball, working_prec: u32) -> Result<Vec<Ball>> {
    let wp = working_prec;
    let et = t.neg().exp(wp);
    let two_t = t.mul(&Ball::from_u32(2, wp), wp);

    // F_m via the series: e^{-t} * sum_i (2t)^i / ((2m+1)(2m+3)..(2m+2i+1)).
    // Terms are positive and eventually decay geometrically; once the term
    // ratio falls below 1/2 the tail is bounded by the current term.
    let t_hi = t.upper_abs().to_f64() * (1.0 + 1e-9);
    let mut term = Ball::from_u32(1, wp).div(&Ball::from_u32(2 * m + 1, wp), wp);
    let mut sum = term.clone();
    let max_iter = 1000 + 8 * wp as usize;
    let mut converged = false;
    for i in 1..=max_iter {
        term = term
            .mul(&two_t, wp)
            .div(&Ball::from_u32(2 * m + 2 * i as u32 + 1, wp), wp);
        sum = sum.add(&term, wp);

        let ratio = 2.0 * t_hi / (2.0 * m as f64 + 2.0 * i as f64 + 3.0);
        if ratio < 0.5 {
            let term_hi = term.upper_abs();
            match (term_hi.get_exp(), sum.mid().get_exp()) {
                (None, _) => {
                    // term is exactly zero (t == 0): the series terminated
                    converged = true;
                    break;
                }
                (Some(te), Some(se)) => {
                    if (te as i64) < se as i64 - (wp as i64 + 8) {
                        sum.add_error(&term_hi);
                        converged = true;
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    if !converged {
        return Err(eyre!(
            "Boys series did not converge within {} terms (t ~ {})",
            max_iter,
            t_hi
        ));
    }

    let mut f = vec![Ball::zero(wp); m as usize + 1];
    f[m as usize] = sum.mul(&et, wp);
    for k in (1..=m as usize).rev() {
        f[k - 1] = two_t
            .mul(&f[k], wp)
            .add(&et, wp)
            .div(&Ball::from_u32(2 * k as u32 - 1, wp), wp);
    }
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_at_zero() {
        // F_m(0) = 1/(2m+1)
        let f = boys_f64(4, 0.0);
        for (m, v) in f.iter().enumerate() {
            assert!((v - 1.0 / (2.0 * m as f64 + 1.0)).abs() < 1e-15);
        }
    }

    #[test]
    fn f0_matches_erf_form() {
        // F_0(t) = sqrt(pi/t) erf(sqrt t) / 2, valid for all t > 0
        for &t in &[0.1, 1.0, 5.0, 20.0] {
            let f = boys_f64(0, t);
            let expected = 0.5 * (PI / t).sqrt() * erf(t.sqrt());
            assert!((f[0] - expected).abs() < 1e-14 * expected);
        }
    }

    #[test]
    fn branches_agree_at_the_cutoff() {
        let below = boys_f64(6, SERIES_CUTOFF - 1e-9);
        let above = boys_f64(6, SERIES_CUTOFF + 1e-9);
        for (a, b) in below.iter().zip(above.iter()) {
            assert!((a - b).abs() < 1e-12 * a.max(*b));
        }
    }

    #[test]
    fn ball_contains_double_values() {
        let prec = 192;
        for &t in &[0.0, 0.25, 1.0, 10.0, 30.0] {
            let fd = boys_f64(5, t);
            let fb = boys_ball(5, &Ball::from_f64(t, prec), prec).unwrap();
            for (d, b) in fd.iter().zip(fb.iter()) {
                assert!(
                    (b.to_f64() - d).abs() <= 1e-14 * d.abs().max(1e-300),
                    "t={} double={} ball={}",
                    t,
                    d,
                    b.to_f64()
                );
                assert!(b.accuracy_bits() >= prec as i64 - 16);
            }
        }
    }

    #[test]
    fn ball_accuracy_tracks_precision() {
        let t = Ball::try_from_str("3.5", 256).unwrap();
        let f = boys_ball(8, &t, 256).unwrap();
        for b in &f {
            assert!(b.accuracy_bits() >= 240);
        }
    }
}
