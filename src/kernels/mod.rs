//! Integral kernels.
//!
//! The looping and verification layers never depend on a concrete integral
//! family; they see only [`Integral4Kernel`]. A family supplies the two
//! single-primitive flavors and inherits contracted evaluation through the
//! loop layer (overridable if a family has a faster contracted path).

mod boys;
mod eri;

pub use boys::{boys_ball, boys_f64};
pub use eri::Eri;

use crate::ball::Ball;
use crate::loops::{cartloop4_ball, cartloop4_f64, loop4_ball, loop4_f64};
use crate::shell::{ShellBall, ShellF64};
use color_eyre::eyre::Result;
use nalgebra::Vector3;

/// A four-center integral family over unnormalized cartesian Gaussian
/// primitives, in double-precision and ball-arithmetic flavors.
pub trait Integral4Kernel: Sync {
    fn name(&self) -> &'static str;

    /// One cartesian component of one primitive quartet, double precision.
    fn single_f64(
        &self,
        lmn: [[i32; 3]; 4],
        centers: [&Vector3<f64>; 4],
        alpha: [f64; 4],
    ) -> f64;

    /// One cartesian component of one primitive quartet, ball arithmetic
    /// at the given working precision.
    fn single_ball(
        &self,
        lmn: [[i32; 3]; 4],
        centers: [&[Ball; 3]; 4],
        alpha: [&Ball; 4],
        working_prec: u32,
    ) -> Result<Ball>;

    /// All integrals of a contracted quartet, double precision.
    fn contracted_f64(&self, output: &mut [f64], shells: &[ShellF64; 4]) -> Result<()> {
        loop4_f64(output, shells, |buf, am, centers, alpha| {
            cartloop4_f64(buf, am, centers, alpha, |lmn, c, a| self.single_f64(lmn, c, a))
        })
    }

    /// All integrals of a contracted quartet, ball arithmetic.
    fn contracted_ball(
        &self,
        output: &mut [Ball],
        shells: &[ShellBall; 4],
        working_prec: u32,
    ) -> Result<()> {
        loop4_ball(output, shells, working_prec, |buf, am, centers, alpha, wp| {
            cartloop4_ball(buf, am, centers, alpha, wp, |lmn, c, a, w| {
                self.single_ball(lmn, c, a, w)
            })
        })
    }
}
