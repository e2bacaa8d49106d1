//! Precision-verified reference values for molecular integrals.
//!
//! Integrals over contracted cartesian Gaussians are computed in ball
//! arithmetic to a requested accuracy, stored as decimal strings in
//! reference files, and later re-verified against independent
//! recomputations in double, interval or exact mode.

pub mod ball;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod kernels;
pub mod loops;
pub mod shell;
pub mod verify;
