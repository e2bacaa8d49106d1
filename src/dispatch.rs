//! Precision-escalation dispatch.
//!
//! The "target" entry points compute integrals to a requested number of
//! accurate bits: the kernel runs at some working precision, the certified
//! accuracy of the results is inspected, and the working precision is
//! raised and the computation repeated until the request is met. The
//! "_str" variants take decimal-string inputs and re-parse them at every
//! working precision, so the inputs never cap the achievable accuracy. The
//! "exact" variants compute to just above double precision and round the
//! midpoints to doubles, giving the correctly-rounded double-precision
//! value of the exact integral.

use crate::ball::{min_accuracy_bits, Ball};
use crate::error::RefintError;
use crate::kernels::{boys_ball, Integral4Kernel};
use crate::shell::{PrimBall, PrimF64, PrimitiveRecord, ShellBall, ShellF64, ShellRecord};
use color_eyre::eyre::Result;
use tracing::debug;

/// log10(2), used to convert between decimal digits and binary bits.
pub const LOG_10_2: f64 = 0.301_029_995_663_981_195;

/// Bits needed to represent `digits` decimal digits (truncating).
pub fn digits_to_bits(digits: u32) -> u32 {
    (digits as f64 / LOG_10_2) as u32
}

/// Knobs of the escalation loop.
#[derive(Debug, Clone)]
pub struct PrecisionPolicy {
    /// Extra bits added to the target for the first working precision.
    pub safety_bits: u32,
    /// Working-precision ceiling; reaching it without the target accuracy
    /// is a hard failure.
    pub max_working_bits: u32,
    /// Target accuracy of the "exact" variants. Anything comfortably above
    /// the 53 bits of a double works.
    pub exact_target_bits: u32,
}

impl Default for PrecisionPolicy {
    fn default() -> Self {
        PrecisionPolicy {
            safety_bits: 16,
            max_working_bits: 16384,
            exact_target_bits: 64,
        }
    }
}

impl PrecisionPolicy {
    fn insufficient(&self, target_bits: u32, values: &[Ball]) -> RefintError {
        RefintError::InsufficientPrecision {
            target_bits,
            reached_bits: min_accuracy_bits(values),
        }
    }
}

/// Run `compute` at increasing working precisions until every output
/// certifies `target_bits` accurate bits, then round the outputs to
/// `target_bits`.
fn escalate<F>(
    output: &mut [Ball],
    target_bits: u32,
    policy: &PrecisionPolicy,
    mut compute: F,
) -> Result<()>
where
    F: FnMut(&mut [Ball], u32) -> Result<()>,
{
    let mut wp = target_bits + policy.safety_bits;
    loop {
        compute(output, wp)?;
        let acc = min_accuracy_bits(output);
        if acc >= target_bits as i64 {
            break;
        }
        debug!(
            working_prec = wp,
            accuracy = acc,
            target = target_bits,
            "insufficient accuracy, raising working precision"
        );
        if wp >= policy.max_working_bits {
            return Err(policy.insufficient(target_bits, output).into());
        }
        wp = (wp * 2).min(policy.max_working_bits);
    }
    for v in output.iter_mut() {
        *v = v.round(target_bits);
    }
    Ok(())
}

/// Contracted integrals of a quartet with exact double-precision
/// parameters, to `target_bits` accurate bits.
pub fn integral4_target(
    kernel: &dyn Integral4Kernel,
    output: &mut [Ball],
    shells: &[ShellF64; 4],
    target_bits: u32,
    policy: &PrecisionPolicy,
) -> Result<()> {
    escalate(output, target_bits, policy, |out, wp| {
        let promoted: [ShellBall; 4] = [
            ShellBall::from_f64(&shells[0], wp),
            ShellBall::from_f64(&shells[1], wp),
            ShellBall::from_f64(&shells[2], wp),
            ShellBall::from_f64(&shells[3], wp),
        ];
        for v in out.iter_mut() {
            *v = Ball::zero(wp);
        }
        kernel.contracted_ball(out, &promoted, wp)
    })
}

/// Contracted integrals of a quartet given as decimal strings, to
/// `target_bits` accurate bits. The strings are re-parsed at every working
/// precision.
pub fn integral4_target_str(
    kernel: &dyn Integral4Kernel,
    output: &mut [Ball],
    shells: &[ShellRecord; 4],
    target_bits: u32,
    policy: &PrecisionPolicy,
) -> Result<()> {
    escalate(output, target_bits, policy, |out, wp| {
        let parsed: [ShellBall; 4] = [
            shells[0].to_ball(wp)?,
            shells[1].to_ball(wp)?,
            shells[2].to_ball(wp)?,
            shells[3].to_ball(wp)?,
        ];
        for v in out.iter_mut() {
            *v = Ball::zero(wp);
        }
        kernel.contracted_ball(out, &parsed, wp)
    })
}

/// Correctly-rounded double-precision values of the exact contracted
/// integrals of a quartet with double-precision parameters.
pub fn integral4_exact(
    kernel: &dyn Integral4Kernel,
    output: &mut [f64],
    shells: &[ShellF64; 4],
    policy: &PrecisionPolicy,
) -> Result<()> {
    let mut balls = vec![Ball::zero(policy.exact_target_bits); output.len()];
    integral4_target(kernel, &mut balls, shells, policy.exact_target_bits, policy)?;
    for (o, b) in output.iter_mut().zip(balls.iter()) {
        *o = b.to_f64();
    }
    Ok(())
}

/// One primitive integral with exact double-precision parameters, to
/// `target_bits` accurate bits.
pub fn single4_target(
    kernel: &dyn Integral4Kernel,
    prims: &[PrimF64; 4],
    target_bits: u32,
    policy: &PrecisionPolicy,
) -> Result<Ball> {
    let mut out = [Ball::zero(target_bits)];
    escalate(&mut out, target_bits, policy, |out, wp| {
        let p: Vec<PrimBall> = prims.iter().map(|q| PrimBall::from_f64(q, wp)).collect();
        out[0] = kernel.single_ball(
            [p[0].lmn, p[1].lmn, p[2].lmn, p[3].lmn],
            [&p[0].center, &p[1].center, &p[2].center, &p[3].center],
            [&p[0].alpha, &p[1].alpha, &p[2].alpha, &p[3].alpha],
            wp,
        )?;
        Ok(())
    })?;
    let [v] = out;
    Ok(v)
}

/// One primitive integral given as decimal strings, to `target_bits`
/// accurate bits.
pub fn single4_target_str(
    kernel: &dyn Integral4Kernel,
    prims: &[PrimitiveRecord; 4],
    target_bits: u32,
    policy: &PrecisionPolicy,
) -> Result<Ball> {
    let mut out = [Ball::zero(target_bits)];
    escalate(&mut out, target_bits, policy, |out, wp| {
        let p = [
            prims[0].to_ball(wp)?,
            prims[1].to_ball(wp)?,
            prims[2].to_ball(wp)?,
            prims[3].to_ball(wp)?,
        ];
        out[0] = kernel.single_ball(
            [p[0].lmn, p[1].lmn, p[2].lmn, p[3].lmn],
            [&p[0].center, &p[1].center, &p[2].center, &p[3].center],
            [&p[0].alpha, &p[1].alpha, &p[2].alpha, &p[3].alpha],
            wp,
        )?;
        Ok(())
    })?;
    let [v] = out;
    Ok(v)
}

/// Correctly-rounded double value of one exact primitive integral.
pub fn single4_exact(
    kernel: &dyn Integral4Kernel,
    prims: &[PrimF64; 4],
    policy: &PrecisionPolicy,
) -> Result<f64> {
    let b = single4_target(kernel, prims, policy.exact_target_bits, policy)?;
    Ok(b.to_f64())
}

/// The Boys ladder F_0(t)..F_m(t) for an exact double argument, to
/// `target_bits` accurate bits.
pub fn boys_target(m: u32, t: f64, target_bits: u32, policy: &PrecisionPolicy) -> Result<Vec<Ball>> {
    let mut out = vec![Ball::zero(target_bits); m as usize + 1];
    escalate(&mut out, target_bits, policy, |out, wp| {
        let tb = Ball::from_f64(t, wp);
        let f = boys_ball(m, &tb, wp)?;
        out.clone_from_slice(&f);
        Ok(())
    })?;
    Ok(out)
}

/// The Boys ladder for a decimal-string argument, re-parsed at every
/// working precision.
pub fn boys_target_str(
    m: u32,
    t: &str,
    target_bits: u32,
    policy: &PrecisionPolicy,
) -> Result<Vec<Ball>> {
    let mut out = vec![Ball::zero(target_bits); m as usize + 1];
    escalate(&mut out, target_bits, policy, |out, wp| {
        let tb = Ball::try_from_str(t, wp)?;
        let f = boys_ball(m, &tb, wp)?;
        out.clone_from_slice(&f);
        Ok(())
    })?;
    Ok(out)
}

/// Correctly-rounded double values of the exact Boys ladder.
pub fn boys_exact(m: u32, t: f64, policy: &PrecisionPolicy) -> Result<Vec<f64>> {
    let f = boys_target(m, t, policy.exact_target_bits, policy)?;
    Ok(f.iter().map(Ball::to_f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Eri;
    use nalgebra::Vector3;

    fn s_shell(alpha: f64) -> ShellF64 {
        ShellF64 {
            am: 0,
            center: Vector3::new(0.0, 0.0, 0.0),
            ngeneral: 1,
            alpha: vec![alpha],
            coeff: vec![1.0],
        }
    }

    fn s_record(alpha: &str) -> ShellRecord {
        ShellRecord {
            z: 1,
            am: 0,
            xyz: ["0.0".into(), "0.0".into(), "0.0".into()],
            nprim: 1,
            ngeneral: 1,
            alpha: vec![alpha.into()],
            coeff: vec!["1.0".into()],
        }
    }

    #[test]
    fn digits_to_bits_truncates() {
        assert_eq!(digits_to_bits(1), 3);
        assert_eq!(digits_to_bits(16), 53);
        assert_eq!(digits_to_bits(20), 66);
    }

    #[test]
    fn target_meets_requested_accuracy() {
        let shells = [s_shell(1.0), s_shell(1.0), s_shell(1.0), s_shell(1.0)];
        let mut out = vec![Ball::zero(64)];
        integral4_target(&Eri, &mut out, &shells, 256, &PrecisionPolicy::default()).unwrap();
        assert!(out[0].accuracy_bits() >= 256);
        // (ss|ss), all exponents 1, same center: pi^{5/2}/4
        let expected = std::f64::consts::PI.powf(2.5) / 4.0;
        assert!((out[0].to_f64() - expected).abs() < 1e-13 * expected);
    }

    #[test]
    fn target_str_matches_target_for_exact_inputs() {
        let policy = PrecisionPolicy::default();
        let shells_d = [s_shell(1.5), s_shell(0.5), s_shell(1.0), s_shell(2.0)];
        let shells_s = [
            s_record("1.5"),
            s_record("0.5"),
            s_record("1.0"),
            s_record("2.0"),
        ];
        let mut out_d = vec![Ball::zero(64)];
        let mut out_s = vec![Ball::zero(64)];
        integral4_target(&Eri, &mut out_d, &shells_d, 128, &policy).unwrap();
        integral4_target_str(&Eri, &mut out_s, &shells_s, 128, &policy).unwrap();
        assert!(out_d[0].contains(&out_s[0]) || out_s[0].contains(&out_d[0]));
    }

    #[test]
    fn exact_rounds_to_double() {
        let shells = [s_shell(1.0), s_shell(1.0), s_shell(1.0), s_shell(1.0)];
        let mut out = vec![0.0];
        integral4_exact(&Eri, &mut out, &shells, &PrecisionPolicy::default()).unwrap();
        let expected = std::f64::consts::PI.powf(2.5) / 4.0;
        assert!((out[0] - expected).abs() <= 2.0 * f64::EPSILON * expected);
    }

    #[test]
    fn boys_target_escalates_cleanly() {
        let f = boys_target(4, 7.25, 300, &PrecisionPolicy::default()).unwrap();
        assert_eq!(f.len(), 5);
        for b in &f {
            assert!(b.accuracy_bits() >= 300);
        }
    }

    #[test]
    fn ceiling_failure_is_insufficient_precision() {
        struct Hopeless;
        impl Integral4Kernel for Hopeless {
            fn name(&self) -> &'static str {
                "hopeless"
            }
            fn single_f64(
                &self,
                _: [[i32; 3]; 4],
                _: [&Vector3<f64>; 4],
                _: [f64; 4],
            ) -> f64 {
                0.0
            }
            fn single_ball(
                &self,
                _: [[i32; 3]; 4],
                _: [&[Ball; 3]; 4],
                _: [&Ball; 4],
                wp: u32,
            ) -> Result<Ball> {
                // a ball that never certifies more than a handful of bits
                let mut b = Ball::from_f64(1.0, wp);
                b.inflate_ulp(4);
                Ok(b)
            }
        }

        let policy = PrecisionPolicy {
            max_working_bits: 512,
            ..PrecisionPolicy::default()
        };
        let prims: Vec<PrimF64> = (0..4)
            .map(|_| PrimF64 {
                lmn: [0, 0, 0],
                center: Vector3::new(0.0, 0.0, 0.0),
                alpha: 1.0,
            })
            .collect();
        let prims: [PrimF64; 4] = prims.try_into().unwrap();
        let err = single4_target(&Hopeless, &prims, 64, &policy).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RefintError>(),
            Some(RefintError::InsufficientPrecision { target_bits: 64, .. })
        ));
    }
}
