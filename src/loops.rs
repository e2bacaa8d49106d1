//! Cartesian/primitive looping layer.
//!
//! Expands a shell quartet into every general-contraction, primitive and
//! cartesian-component combination, invoking an injected kernel and
//! accumulating contracted results. The double-precision and ball flavors
//! share the enumeration logic exactly; the ball flavor additionally
//! threads the working precision through to the kernel.
//!
//! Output layout: general-contraction index tuples `(g1,g2,g3,g4)` vary
//! slowest (g4 fastest among them), the cartesian component tuple varies
//! fastest, in the canonical order of [`cart_components`]. Coefficients are
//! taken as-is from the unnormalized contraction arrays at position
//! `g*nprim + p`; no normalization happens here.

use crate::ball::Ball;
use crate::error::RefintError;
use crate::shell::{
    cart_components, ncart, quartet_size_ball, quartet_size_f64, ShellBall, ShellF64,
};
use color_eyre::eyre::Result;
use itertools::iproduct;
use nalgebra::Vector3;

fn check_output_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(RefintError::OutputSizeMismatch { expected, got }.into());
    }
    Ok(())
}

/// All cartesian components of a single primitive quartet, double
/// precision. `output` must hold `ncart(am1)*...*ncart(am4)` values. The
/// kernel computes one cartesian component from the four exponent triples.
pub fn cartloop4_f64<F>(
    output: &mut [f64],
    am: [u32; 4],
    centers: [&Vector3<f64>; 4],
    alpha: [f64; 4],
    kernel: F,
) -> Result<()>
where
    F: Fn([[i32; 3]; 4], [&Vector3<f64>; 4], [f64; 4]) -> f64,
{
    let carts: Vec<Vec<[i32; 3]>> = am.iter().map(|&a| cart_components(a)).collect();
    let expected = am.iter().map(|&a| ncart(a)).product();
    check_output_len(expected, output.len())?;

    for (idx, (c1, c2, c3, c4)) in
        iproduct!(&carts[0], &carts[1], &carts[2], &carts[3]).enumerate()
    {
        output[idx] = kernel([*c1, *c2, *c3, *c4], centers, alpha);
    }
    Ok(())
}

/// All cartesian components of a single primitive quartet, ball
/// arithmetic. Same contract as [`cartloop4_f64`] with a fallible kernel
/// and an explicit working precision.
pub fn cartloop4_ball<F>(
    output: &mut [Ball],
    am: [u32; 4],
    centers: [&[Ball; 3]; 4],
    alpha: [&Ball; 4],
    working_prec: u32,
    kernel: F,
) -> Result<()>
where
    F: Fn([[i32; 3]; 4], [&[Ball; 3]; 4], [&Ball; 4], u32) -> Result<Ball>,
{
    let carts: Vec<Vec<[i32; 3]>> = am.iter().map(|&a| cart_components(a)).collect();
    let expected = am.iter().map(|&a| ncart(a)).product();
    check_output_len(expected, output.len())?;

    for (idx, (c1, c2, c3, c4)) in
        iproduct!(&carts[0], &carts[1], &carts[2], &carts[3]).enumerate()
    {
        output[idx] = kernel([*c1, *c2, *c3, *c4], centers, alpha, working_prec)?;
    }
    Ok(())
}

/// All integrals of a contracted shell quartet, double precision.
///
/// The kernel fills a buffer with every cartesian component of one
/// primitive quartet (typically via [`cartloop4_f64`]); this routine loops
/// general contractions and primitives around it and accumulates
/// `coeff1*coeff2*coeff3*coeff4 * value` into the output.
pub fn loop4_f64<F>(output: &mut [f64], shells: &[ShellF64; 4], kernel: F) -> Result<()>
where
    F: Fn(&mut [f64], [u32; 4], [&Vector3<f64>; 4], [f64; 4]) -> Result<()>,
{
    for shell in shells {
        shell.validate()?;
    }
    check_output_len(quartet_size_f64(shells), output.len())?;

    let [s1, s2, s3, s4] = shells;
    let am = [s1.am, s2.am, s3.am, s4.am];
    let centers = [&s1.center, &s2.center, &s3.center, &s4.center];
    let ncart_total: usize = am.iter().map(|&a| ncart(a)).product();
    let mut prim = vec![0.0; ncart_total];

    output.fill(0.0);
    for (g1, g2, g3, g4) in iproduct!(0..s1.ngeneral, 0..s2.ngeneral, 0..s3.ngeneral, 0..s4.ngeneral)
    {
        let gblock = ((g1 * s2.ngeneral + g2) * s3.ngeneral + g3) * s4.ngeneral + g4;
        let offset = gblock * ncart_total;
        for (p1, p2, p3, p4) in
            iproduct!(0..s1.nprim(), 0..s2.nprim(), 0..s3.nprim(), 0..s4.nprim())
        {
            let alpha = [s1.alpha[p1], s2.alpha[p2], s3.alpha[p3], s4.alpha[p4]];
            kernel(&mut prim, am, centers, alpha)?;

            let coeff = s1.coeff[g1 * s1.nprim() + p1]
                * s2.coeff[g2 * s2.nprim() + p2]
                * s3.coeff[g3 * s3.nprim() + p3]
                * s4.coeff[g4 * s4.nprim() + p4];
            for (i, v) in prim.iter().enumerate() {
                output[offset + i] += coeff * v;
            }
        }
    }
    Ok(())
}

/// All integrals of a contracted shell quartet, ball arithmetic. Same
/// contract as [`loop4_f64`].
pub fn loop4_ball<F>(
    output: &mut [Ball],
    shells: &[ShellBall; 4],
    working_prec: u32,
    kernel: F,
) -> Result<()>
where
    F: Fn(&mut [Ball], [u32; 4], [&[Ball; 3]; 4], [&Ball; 4], u32) -> Result<()>,
{
    check_output_len(quartet_size_ball(shells), output.len())?;

    let [s1, s2, s3, s4] = shells;
    let am = [s1.am, s2.am, s3.am, s4.am];
    let centers = [&s1.center, &s2.center, &s3.center, &s4.center];
    let ncart_total: usize = am.iter().map(|&a| ncart(a)).product();
    let mut prim = vec![Ball::zero(working_prec); ncart_total];

    for v in output.iter_mut() {
        *v = Ball::zero(working_prec);
    }
    for (g1, g2, g3, g4) in iproduct!(0..s1.ngeneral, 0..s2.ngeneral, 0..s3.ngeneral, 0..s4.ngeneral)
    {
        let gblock = ((g1 * s2.ngeneral + g2) * s3.ngeneral + g3) * s4.ngeneral + g4;
        let offset = gblock * ncart_total;
        for (p1, p2, p3, p4) in
            iproduct!(0..s1.nprim(), 0..s2.nprim(), 0..s3.nprim(), 0..s4.nprim())
        {
            let alpha = [&s1.alpha[p1], &s2.alpha[p2], &s3.alpha[p3], &s4.alpha[p4]];
            kernel(&mut prim, am, centers, alpha, working_prec)?;

            let coeff = s1.coeff[g1 * s1.nprim() + p1]
                .mul(&s2.coeff[g2 * s2.nprim() + p2], working_prec)
                .mul(&s3.coeff[g3 * s3.nprim() + p3], working_prec)
                .mul(&s4.coeff[g4 * s4.nprim() + p4], working_prec);
            for (i, v) in prim.iter().enumerate() {
                output[offset + i] = output[offset + i].add(&coeff.mul(v, working_prec), working_prec);
            }
        }
    }
    Ok(())
}
