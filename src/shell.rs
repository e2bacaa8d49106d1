//! Shell descriptors and cartesian component enumeration.
//!
//! A shell groups primitive Gaussians sharing a center and angular
//! momentum, combined through (unnormalized) contraction coefficients.
//! Shells exist in three forms: the decimal-string form stored in reference
//! files, a double-precision form, and a ball-arithmetic form at a chosen
//! precision. The string form is authoritative; the numeric forms are
//! derived from it at the point of use so no precision is lost up front.

use crate::ball::Ball;
use crate::error::RefintError;
use color_eyre::eyre::Result;
use nalgebra::Vector3;

/// Number of cartesian components for an angular momentum.
pub fn ncart(am: u32) -> usize {
    ((am + 1) * (am + 2) / 2) as usize
}

/// Cartesian exponent triples for `am`, in canonical order: lexicographic
/// by descending x exponent, then descending y.
pub fn cart_components(am: u32) -> Vec<[i32; 3]> {
    let am = am as i32;
    let mut comps = Vec::with_capacity(ncart(am as u32));
    for lx in (0..=am).rev() {
        for ly in (0..=am - lx).rev() {
            comps.push([lx, ly, am - lx - ly]);
        }
    }
    comps
}

/// One contracted shell as stored in a reference file. Coefficients are
/// unnormalized, primitive index fastest: position `g*nprim + p`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellRecord {
    /// Atomic number tag. Metadata only, never used in computation.
    pub z: i64,
    pub am: u32,
    pub xyz: [String; 3],
    pub nprim: usize,
    pub ngeneral: usize,
    pub alpha: Vec<String>,
    pub coeff: Vec<String>,
}

impl ShellRecord {
    pub fn nfunctions(&self) -> usize {
        ncart(self.am) * self.ngeneral
    }

    pub fn validate(&self) -> Result<()> {
        if self.nprim == 0 {
            return Err(RefintError::InvalidShell("nprim must be >= 1".into()).into());
        }
        if self.ngeneral == 0 {
            return Err(RefintError::InvalidShell("ngeneral must be >= 1".into()).into());
        }
        if self.alpha.len() != self.nprim {
            return Err(RefintError::InvalidShell(format!(
                "{} exponents for {} primitives",
                self.alpha.len(),
                self.nprim
            ))
            .into());
        }
        if self.coeff.len() != self.nprim * self.ngeneral {
            return Err(RefintError::InvalidShell(format!(
                "{} coefficients, expected nprim*ngeneral = {}",
                self.coeff.len(),
                self.nprim * self.ngeneral
            ))
            .into());
        }
        Ok(())
    }

    pub fn to_f64(&self) -> Result<ShellF64> {
        self.validate()?;
        let center = Vector3::new(
            parse_f64(&self.xyz[0])?,
            parse_f64(&self.xyz[1])?,
            parse_f64(&self.xyz[2])?,
        );
        let alpha = self
            .alpha
            .iter()
            .map(|s| parse_f64(s))
            .collect::<Result<Vec<_>>>()?;
        let coeff = self
            .coeff
            .iter()
            .map(|s| parse_f64(s))
            .collect::<Result<Vec<_>>>()?;
        let shell = ShellF64 {
            am: self.am,
            center,
            ngeneral: self.ngeneral,
            alpha,
            coeff,
        };
        shell.validate()?;
        Ok(shell)
    }

    /// Parse every decimal string at `prec` bits.
    pub fn to_ball(&self, prec: u32) -> Result<ShellBall> {
        self.validate()?;
        let center = [
            Ball::try_from_str(&self.xyz[0], prec)?,
            Ball::try_from_str(&self.xyz[1], prec)?,
            Ball::try_from_str(&self.xyz[2], prec)?,
        ];
        let alpha = self
            .alpha
            .iter()
            .map(|s| Ball::try_from_str(s, prec))
            .collect::<Result<Vec<_>>>()?;
        let coeff = self
            .coeff
            .iter()
            .map(|s| Ball::try_from_str(s, prec))
            .collect::<Result<Vec<_>>>()?;
        Ok(ShellBall {
            am: self.am,
            center,
            ngeneral: self.ngeneral,
            alpha,
            coeff,
        })
    }
}

fn parse_f64(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|_| RefintError::MalformedFile(format!("bad number \"{}\"", s)).into())
}

/// Contracted shell with double-precision parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellF64 {
    pub am: u32,
    pub center: Vector3<f64>,
    pub ngeneral: usize,
    pub alpha: Vec<f64>,
    pub coeff: Vec<f64>,
}

impl ShellF64 {
    pub fn nprim(&self) -> usize {
        self.alpha.len()
    }

    pub fn nfunctions(&self) -> usize {
        ncart(self.am) * self.ngeneral
    }

    pub fn validate(&self) -> Result<()> {
        if self.alpha.is_empty() {
            return Err(RefintError::InvalidShell("no primitives".into()).into());
        }
        if self.ngeneral == 0 {
            return Err(RefintError::InvalidShell("ngeneral must be >= 1".into()).into());
        }
        if self.coeff.len() != self.alpha.len() * self.ngeneral {
            return Err(RefintError::InvalidShell(format!(
                "{} coefficients, expected {}",
                self.coeff.len(),
                self.alpha.len() * self.ngeneral
            ))
            .into());
        }
        if self.alpha.iter().any(|&a| !(a > 0.0)) {
            return Err(RefintError::InvalidShell("exponents must be positive".into()).into());
        }
        Ok(())
    }
}

/// Contracted shell with ball-arithmetic parameters.
#[derive(Debug, Clone)]
pub struct ShellBall {
    pub am: u32,
    pub center: [Ball; 3],
    pub ngeneral: usize,
    pub alpha: Vec<Ball>,
    pub coeff: Vec<Ball>,
}

impl ShellBall {
    pub fn nprim(&self) -> usize {
        self.alpha.len()
    }

    pub fn nfunctions(&self) -> usize {
        ncart(self.am) * self.ngeneral
    }

    /// Exact promotion of a double-precision shell.
    pub fn from_f64(shell: &ShellF64, prec: u32) -> Self {
        ShellBall {
            am: shell.am,
            center: [
                Ball::from_f64(shell.center.x, prec),
                Ball::from_f64(shell.center.y, prec),
                Ball::from_f64(shell.center.z, prec),
            ],
            ngeneral: shell.ngeneral,
            alpha: shell.alpha.iter().map(|&a| Ball::from_f64(a, prec)).collect(),
            coeff: shell.coeff.iter().map(|&c| Ball::from_f64(c, prec)).collect(),
        }
    }
}

/// Total output size of a quartet: product of `ncart(am)*ngeneral`.
pub fn quartet_size_f64(shells: &[ShellF64; 4]) -> usize {
    shells.iter().map(ShellF64::nfunctions).product()
}

pub fn quartet_size_ball(shells: &[ShellBall; 4]) -> usize {
    shells.iter().map(ShellBall::nfunctions).product()
}

pub fn quartet_size_records(shells: &[ShellRecord; 4]) -> usize {
    shells.iter().map(ShellRecord::nfunctions).product()
}

/// One primitive Gaussian pinned to a specific cartesian component, as
/// stored in single-primitive reference files.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveRecord {
    pub lmn: [i32; 3],
    pub xyz: [String; 3],
    pub alpha: String,
}

impl PrimitiveRecord {
    pub fn to_f64(&self) -> Result<PrimF64> {
        Ok(PrimF64 {
            lmn: self.lmn,
            center: Vector3::new(
                parse_f64(&self.xyz[0])?,
                parse_f64(&self.xyz[1])?,
                parse_f64(&self.xyz[2])?,
            ),
            alpha: parse_f64(&self.alpha)?,
        })
    }

    pub fn to_ball(&self, prec: u32) -> Result<PrimBall> {
        Ok(PrimBall {
            lmn: self.lmn,
            center: [
                Ball::try_from_str(&self.xyz[0], prec)?,
                Ball::try_from_str(&self.xyz[1], prec)?,
                Ball::try_from_str(&self.xyz[2], prec)?,
            ],
            alpha: Ball::try_from_str(&self.alpha, prec)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimF64 {
    pub lmn: [i32; 3],
    pub center: Vector3<f64>,
    pub alpha: f64,
}

#[derive(Debug, Clone)]
pub struct PrimBall {
    pub lmn: [i32; 3],
    pub center: [Ball; 3],
    pub alpha: Ball,
}

impl PrimBall {
    pub fn from_f64(prim: &PrimF64, prec: u32) -> Self {
        PrimBall {
            lmn: prim.lmn,
            center: [
                Ball::from_f64(prim.center.x, prec),
                Ball::from_f64(prim.center.y, prec),
                Ball::from_f64(prim.center.z, prec),
            ],
            alpha: Ball::from_f64(prim.alpha, prec),
        }
    }
}
