#![allow(non_snake_case)]
//! Four-center electron repulsion integrals over unnormalized cartesian
//! Gaussian primitives, by Hermite expansion: 1-D expansion coefficients
//! E_t^{ij}, Hermite Coulomb integrals R_{tuv} built on a Boys ladder, and
//! the 2 pi^{5/2} / (p q sqrt(p+q)) prefactor. The double and ball flavors
//! are structurally identical.

use super::boys::{boys_ball, boys_f64};
use super::Integral4Kernel;
use crate::ball::Ball;
use color_eyre::eyre::Result;
use itertools::iproduct;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// The electron-repulsion integral family.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eri;

impl Integral4Kernel for Eri {
    fn name(&self) -> &'static str {
        "eri"
    }

    fn single_f64(
        &self,
        lmn: [[i32; 3]; 4],
        centers: [&Vector3<f64>; 4],
        alpha: [f64; 4],
    ) -> f64 {
        eri_single_f64(lmn, centers, alpha)
    }

    fn single_ball(
        &self,
        lmn: [[i32; 3]; 4],
        centers: [&[Ball; 3]; 4],
        alpha: [&Ball; 4],
        working_prec: u32,
    ) -> Result<Ball> {
        eri_single_ball(lmn, centers, alpha, working_prec)
    }
}

/// Hermite expansion coefficient E_t^{ij} for a 1-D Gaussian product,
/// including the exp(-q Qx^2) prefactor in the base case.
fn hermite_expansion(i: i32, j: i32, t: i32, Qx: f64, a: f64, b: f64) -> f64 {
    let p = a + b;
    let q = a * b / p;

    if t < 0 || t > i + j || i < 0 || j < 0 {
        0.0
    } else if i == 0 && j == 0 && t == 0 {
        (-q * Qx * Qx).exp()
    } else if j == 0 {
        hermite_expansion(i - 1, j, t - 1, Qx, a, b) / (2.0 * p)
            - hermite_expansion(i - 1, j, t, Qx, a, b) * q * Qx / a
            + hermite_expansion(i - 1, j, t + 1, Qx, a, b) * (t + 1) as f64
    } else {
        hermite_expansion(i, j - 1, t - 1, Qx, a, b) / (2.0 * p)
            + hermite_expansion(i, j - 1, t, Qx, a, b) * q * Qx / b
            + hermite_expansion(i, j - 1, t + 1, Qx, a, b) * (t + 1) as f64
    }
}

/// Hermite Coulomb integral R^n_{tuv} over a precomputed Boys ladder.
/// `pows[n]` holds (-2 alpha)^n.
fn hermite_coulomb(
    t: i32,
    u: i32,
    v: i32,
    n: i32,
    pows: &[f64],
    pq: &Vector3<f64>,
    boys: &[f64],
) -> f64 {
    if t == 0 && u == 0 && v == 0 {
        return pows[n as usize] * boys[n as usize];
    }
    let mut val = 0.0;
    if t == 0 && u == 0 {
        if v > 1 {
            val += (v - 1) as f64 * hermite_coulomb(t, u, v - 2, n + 1, pows, pq, boys);
        }
        val += pq.z * hermite_coulomb(t, u, v - 1, n + 1, pows, pq, boys);
    } else if t == 0 {
        if u > 1 {
            val += (u - 1) as f64 * hermite_coulomb(t, u - 2, v, n + 1, pows, pq, boys);
        }
        val += pq.y * hermite_coulomb(t, u - 1, v, n + 1, pows, pq, boys);
    } else {
        if t > 1 {
            val += (t - 1) as f64 * hermite_coulomb(t - 2, u, v, n + 1, pows, pq, boys);
        }
        val += pq.x * hermite_coulomb(t - 1, u, v, n + 1, pows, pq, boys);
    }
    val
}

/// One cartesian component of (ab|cd) for a single primitive quartet,
/// double precision, unnormalized.
pub fn eri_single_f64(
    lmn: [[i32; 3]; 4],
    centers: [&Vector3<f64>; 4],
    alpha: [f64; 4],
) -> f64 {
    let [la, lb, lc, ld] = lmn;
    let [A, B, C, D] = centers;
    let [a, b, c, d] = alpha;

    let p = a + b;
    let q = c + d;
    let P = (A * a + B * b) / p;
    let Q = (C * c + D * d) / q;
    let AB = A - B;
    let CD = C - D;
    let PQ = P - Q;

    let alpha_red = p * q / (p + q);
    let T = alpha_red * PQ.norm_squared();
    let nmax: i32 = lmn.iter().flatten().sum();
    let boys = boys_f64(nmax as u32, T);
    let pows: Vec<f64> = (0..=nmax).map(|k| (-2.0 * alpha_red).powi(k)).collect();

    let val = iproduct!(
        0..=la[0] + lb[0],
        0..=la[1] + lb[1],
        0..=la[2] + lb[2],
        0..=lc[0] + ld[0],
        0..=lc[1] + ld[1],
        0..=lc[2] + ld[2]
    )
    .map(|(t, u, v, tau, nu, phi)| {
        let e = hermite_expansion(la[0], lb[0], t, AB.x, a, b)
            * hermite_expansion(la[1], lb[1], u, AB.y, a, b)
            * hermite_expansion(la[2], lb[2], v, AB.z, a, b)
            * hermite_expansion(lc[0], ld[0], tau, CD.x, c, d)
            * hermite_expansion(lc[1], ld[1], nu, CD.y, c, d)
            * hermite_expansion(lc[2], ld[2], phi, CD.z, c, d);
        let sgn = if (tau + nu + phi) % 2 == 0 { 1.0 } else { -1.0 };
        e * sgn * hermite_coulomb(t + tau, u + nu, v + phi, 0, &pows, &PQ, &boys)
    })
    .sum::<f64>();

    2.0 * PI.powf(2.5) / (p * q * (p + q).sqrt()) * val
}

fn hermite_expansion_ball(
    i: i32,
    j: i32,
    t: i32,
    Qx: &Ball,
    a: &Ball,
    b: &Ball,
    wp: u32,
) -> Ball {
    if t < 0 || t > i + j || i < 0 || j < 0 {
        return Ball::zero(wp);
    }
    let p = a.add(b, wp);
    let q = a.mul(b, wp).div(&p, wp);

    if i == 0 && j == 0 && t == 0 {
        q.neg().mul(&Qx.mul(Qx, wp), wp).exp(wp)
    } else if j == 0 {
        let two_p = p.mul(&Ball::from_u32(2, wp), wp);
        let t1 = hermite_expansion_ball(i - 1, j, t - 1, Qx, a, b, wp).div(&two_p, wp);
        let t2 = hermite_expansion_ball(i - 1, j, t, Qx, a, b, wp)
            .mul(&q, wp)
            .mul(Qx, wp)
            .div(a, wp);
        let t3 = hermite_expansion_ball(i - 1, j, t + 1, Qx, a, b, wp)
            .mul(&Ball::from_i32(t + 1, wp), wp);
        t1.sub(&t2, wp).add(&t3, wp)
    } else {
        let two_p = p.mul(&Ball::from_u32(2, wp), wp);
        let t1 = hermite_expansion_ball(i, j - 1, t - 1, Qx, a, b, wp).div(&two_p, wp);
        let t2 = hermite_expansion_ball(i, j - 1, t, Qx, a, b, wp)
            .mul(&q, wp)
            .mul(Qx, wp)
            .div(b, wp);
        let t3 = hermite_expansion_ball(i, j - 1, t + 1, Qx, a, b, wp)
            .mul(&Ball::from_i32(t + 1, wp), wp);
        t1.add(&t2, wp).add(&t3, wp)
    }
}

fn hermite_coulomb_ball(
    t: i32,
    u: i32,
    v: i32,
    n: i32,
    pows: &[Ball],
    pq: &[Ball; 3],
    boys: &[Ball],
    wp: u32,
) -> Ball {
    if t == 0 && u == 0 && v == 0 {
        return pows[n as usize].mul(&boys[n as usize], wp);
    }
    let mut val = Ball::zero(wp);
    if t == 0 && u == 0 {
        if v > 1 {
            let r = hermite_coulomb_ball(t, u, v - 2, n + 1, pows, pq, boys, wp);
            val = val.add(&r.mul(&Ball::from_i32(v - 1, wp), wp), wp);
        }
        let r = hermite_coulomb_ball(t, u, v - 1, n + 1, pows, pq, boys, wp);
        val = val.add(&pq[2].mul(&r, wp), wp);
    } else if t == 0 {
        if u > 1 {
            let r = hermite_coulomb_ball(t, u - 2, v, n + 1, pows, pq, boys, wp);
            val = val.add(&r.mul(&Ball::from_i32(u - 1, wp), wp), wp);
        }
        let r = hermite_coulomb_ball(t, u - 1, v, n + 1, pows, pq, boys, wp);
        val = val.add(&pq[1].mul(&r, wp), wp);
    } else {
        if t > 1 {
            let r = hermite_coulomb_ball(t - 2, u, v, n + 1, pows, pq, boys, wp);
            val = val.add(&r.mul(&Ball::from_i32(t - 1, wp), wp), wp);
        }
        let r = hermite_coulomb_ball(t - 1, u, v, n + 1, pows, pq, boys, wp);
        val = val.add(&pq[0].mul(&r, wp), wp);
    }
    val
}

/// One cartesian component of (ab|cd) for a single primitive quartet, ball
/// arithmetic, unnormalized.
pub fn eri_single_ball(
    lmn: [[i32; 3]; 4],
    centers: [&[Ball; 3]; 4],
    alpha: [&Ball; 4],
    wp: u32,
) -> Result<Ball> {
    let [la, lb, lc, ld] = lmn;
    let [A, B, C, D] = centers;
    let [a, b, c, d] = alpha;

    let p = a.add(b, wp);
    let q = c.add(d, wp);
    let p_plus_q = p.add(&q, wp);

    let mut PQ = [Ball::zero(wp), Ball::zero(wp), Ball::zero(wp)];
    let mut AB = [Ball::zero(wp), Ball::zero(wp), Ball::zero(wp)];
    let mut CD = [Ball::zero(wp), Ball::zero(wp), Ball::zero(wp)];
    for i in 0..3 {
        let Pi = a.mul(&A[i], wp).add(&b.mul(&B[i], wp), wp).div(&p, wp);
        let Qi = c.mul(&C[i], wp).add(&d.mul(&D[i], wp), wp).div(&q, wp);
        PQ[i] = Pi.sub(&Qi, wp);
        AB[i] = A[i].sub(&B[i], wp);
        CD[i] = C[i].sub(&D[i], wp);
    }
    let r2 = PQ[0]
        .mul(&PQ[0], wp)
        .add(&PQ[1].mul(&PQ[1], wp), wp)
        .add(&PQ[2].mul(&PQ[2], wp), wp);

    let alpha_red = p.mul(&q, wp).div(&p_plus_q, wp);
    let T = alpha_red.mul(&r2, wp);
    let nmax: i32 = lmn.iter().flatten().sum();
    let boys = boys_ball(nmax as u32, &T, wp)?;
    let m2a = alpha_red.mul(&Ball::from_i32(-2, wp), wp);
    let pows: Vec<Ball> = (0..=nmax as u32).map(|k| m2a.pow_u32(k, wp)).collect();

    let mut sum = Ball::zero(wp);
    for (t, u, v, tau, nu, phi) in iproduct!(
        0..=la[0] + lb[0],
        0..=la[1] + lb[1],
        0..=la[2] + lb[2],
        0..=lc[0] + ld[0],
        0..=lc[1] + ld[1],
        0..=lc[2] + ld[2]
    ) {
        let e = hermite_expansion_ball(la[0], lb[0], t, &AB[0], a, b, wp)
            .mul(&hermite_expansion_ball(la[1], lb[1], u, &AB[1], a, b, wp), wp)
            .mul(&hermite_expansion_ball(la[2], lb[2], v, &AB[2], a, b, wp), wp)
            .mul(&hermite_expansion_ball(lc[0], ld[0], tau, &CD[0], c, d, wp), wp)
            .mul(&hermite_expansion_ball(lc[1], ld[1], nu, &CD[1], c, d, wp), wp)
            .mul(&hermite_expansion_ball(lc[2], ld[2], phi, &CD[2], c, d, wp), wp);
        let r = hermite_coulomb_ball(t + tau, u + nu, v + phi, 0, &pows, &PQ, &boys, wp);
        let contrib = e.mul(&r, wp);
        sum = if (tau + nu + phi) % 2 == 0 {
            sum.add(&contrib, wp)
        } else {
            sum.sub(&contrib, wp)
        };
    }

    let pi = Ball::pi(wp);
    let pi_52 = pi.pow_u32(2, wp).mul(&pi.sqrt(wp), wp);
    let denom = p.mul(&q, wp).mul(&p_plus_q.sqrt(wp), wp);
    let pref = pi_52.mul(&Ball::from_u32(2, wp), wp).div(&denom, wp);
    Ok(pref.mul(&sum, wp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Vector3<f64> {
        Vector3::new(0.0, 0.0, 0.0)
    }

    #[test]
    fn ssss_same_center_closed_form() {
        // all exponents 1 at a common center: (ss|ss) = pi^{5/2}/4
        let o = origin();
        let v = eri_single_f64(
            [[0, 0, 0]; 4],
            [&o, &o, &o, &o],
            [1.0, 1.0, 1.0, 1.0],
        );
        let expected = PI.powf(2.5) / 4.0;
        assert!((v - expected).abs() < 1e-14 * expected);
    }

    #[test]
    fn ball_matches_double_for_displaced_quartet() {
        let prec = 192;
        let A = Vector3::new(0.0, 0.1, -0.2);
        let B = Vector3::new(0.5, 0.0, 0.3);
        let C = Vector3::new(-0.4, 0.25, 0.0);
        let D = Vector3::new(0.1, -0.3, 0.2);
        let alpha = [1.1, 0.7, 2.3, 0.9];
        let lmn = [[1, 0, 0], [0, 1, 0], [0, 0, 0], [0, 0, 2]];

        let vd = eri_single_f64(lmn, [&A, &B, &C, &D], alpha);

        let to_ball = |v: &Vector3<f64>| {
            [
                Ball::from_f64(v.x, prec),
                Ball::from_f64(v.y, prec),
                Ball::from_f64(v.z, prec),
            ]
        };
        let (ab, bb, cb, db) = (to_ball(&A), to_ball(&B), to_ball(&C), to_ball(&D));
        let alphab: Vec<Ball> = alpha.iter().map(|&a| Ball::from_f64(a, prec)).collect();
        let vb = eri_single_ball(
            lmn,
            [&ab, &bb, &cb, &db],
            [&alphab[0], &alphab[1], &alphab[2], &alphab[3]],
            prec,
        )
        .unwrap();

        assert!(
            (vb.to_f64() - vd).abs() <= 1e-11 * vd.abs().max(1e-30),
            "double={} ball={}",
            vd,
            vb.to_f64()
        );
        assert!(vb.accuracy_bits() >= 100);
    }

    #[test]
    fn bra_ket_symmetry() {
        let A = Vector3::new(0.0, 0.0, 0.0);
        let B = Vector3::new(0.0, 0.0, 1.0);
        let C = Vector3::new(0.5, 0.0, 0.0);
        let D = Vector3::new(0.0, 0.5, 0.0);
        let v1 = eri_single_f64(
            [[1, 0, 0], [0, 0, 0], [0, 1, 0], [0, 0, 0]],
            [&A, &B, &C, &D],
            [1.0, 2.0, 0.5, 1.5],
        );
        let v2 = eri_single_f64(
            [[0, 1, 0], [0, 0, 0], [1, 0, 0], [0, 0, 0]],
            [&C, &D, &A, &B],
            [0.5, 1.5, 1.0, 2.0],
        );
        assert!((v1 - v2).abs() < 1e-13 * v1.abs().max(v2.abs()));
    }

    #[test]
    fn contracted_kernel_scales_with_coefficients() {
        use crate::shell::ShellF64;

        let shell = |coeff: f64| ShellF64 {
            am: 0,
            center: origin(),
            ngeneral: 1,
            alpha: vec![1.0],
            coeff: vec![coeff],
        };
        let shells = [shell(2.0), shell(1.0), shell(1.0), shell(3.0)];
        let mut out = [0.0];
        Eri.contracted_f64(&mut out, &shells).unwrap();
        let single = eri_single_f64(
            [[0, 0, 0]; 4],
            [&origin(), &origin(), &origin(), &origin()],
            [1.0, 1.0, 1.0, 1.0],
        );
        assert!((out[0] - 6.0 * single).abs() < 1e-13 * out[0].abs());
    }
}
