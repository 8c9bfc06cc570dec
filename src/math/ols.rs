//! Least-squares solver.
//!
//! The exponential fit repeatedly solves tiny linear problems: the offset
//! `a` given a candidate growth rate, and the 2-column Gauss–Newton step.
//! SVD handles tall (n rows, 1–2 columns) systems robustly, which is where
//! nalgebra's QR solve would panic.

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖X β − y‖²` via SVD.
///
/// Returns `None` when the system is too ill-conditioned to solve with a
/// finite result. Progressively looser tolerances are tried before giving
/// up, since near-singular Jacobians show up around flat residual regions.
pub fn solve_least_squares(design: &DMatrix<f64>, target: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = design.clone().svd(true, true);

    for &tol in &[1e-12, 1e-9, 1e-6] {
        if let Ok(beta) = svd.solve(target, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
