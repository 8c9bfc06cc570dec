//! Two-parameter exponential fit: `y = a + exp(c·x)`.
//!
//! The model is nonlinear in the growth rate `c` but linear in the offset
//! `a`, so we:
//!
//! 1. scan a deterministic log-spaced grid over `c`, solving `a` by least
//!    squares at each candidate and keeping the lowest SSE;
//! 2. refine `(a, c)` with a damped Gauss–Newton loop.
//!
//! Non-convergence is a reportable fit error, not a crash: callers omit the
//! fitted curve and keep the run going.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::{log_space, solve_least_squares};

const RATE_MIN: f64 = 1e-4;
const RATE_MAX: f64 = 1.0;
const RATE_STEPS: usize = 160;

const REFINE_MAX_ITERS: usize = 25;
const REFINE_TOL: f64 = 1e-10;

/// Fitted parameters of `y = a + exp(c·x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpFit {
    pub a: f64,
    pub c: f64,
}

impl ExpFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.a + (self.c * x).exp()
    }

    /// Legend label in the style `y = 12.345 + exp(0.095·x)`.
    pub fn label(&self) -> String {
        format!("fit: y = {:.3} + exp({:.3}·x)", self.a, self.c)
    }
}

/// Fit `y = a + exp(c·x)` by least squares.
///
/// Requires at least 3 points. For monotonically increasing `y` the grid
/// only contains positive rates, so the fitted curve is monotonically
/// increasing over the input domain.
pub fn fit_exponential(x: &[f64], y: &[f64]) -> Result<ExpFit, AppError> {
    if x.len() != y.len() {
        return Err(AppError::schema(format!(
            "Fit input length mismatch: {} x-values vs {} y-values.",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 3 {
        return Err(AppError::no_data(
            "Not enough points for an exponential fit (need at least 3).",
        ));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::no_data("Non-finite value in fit input."));
    }

    // 1) Grid search over the growth rate.
    let mut best: Option<(ExpFit, f64)> = None;
    for c in log_space(RATE_MIN, RATE_MAX, RATE_STEPS)? {
        let Some(a) = offset_for_rate(x, y, c) else {
            continue;
        };
        let candidate = ExpFit { a, c };
        let sse = sse(x, y, &candidate);
        if !sse.is_finite() {
            continue;
        }
        match best {
            Some((_, best_sse)) if sse >= best_sse => {}
            _ => best = Some((candidate, sse)),
        }
    }

    let (mut fit, mut fit_sse) = best.ok_or_else(|| {
        AppError::no_data("Exponential fit did not converge (no usable grid candidate).")
    })?;

    // 2) Gauss–Newton refinement with step halving.
    for _ in 0..REFINE_MAX_ITERS {
        let Some((da, dc)) = newton_step(x, y, &fit) else {
            break;
        };

        let mut scale = 1.0;
        let mut improved = false;
        // Halve the step a few times before accepting defeat; the SSE
        // surface is steep in `c` for large x values.
        for _ in 0..8 {
            let trial = ExpFit {
                a: fit.a + scale * da,
                c: fit.c + scale * dc,
            };
            let trial_sse = sse(x, y, &trial);
            if trial_sse.is_finite() && trial_sse < fit_sse {
                fit = trial;
                fit_sse = trial_sse;
                improved = true;
                break;
            }
            scale *= 0.5;
        }

        if !improved || (da.abs() + dc.abs()) * scale < REFINE_TOL {
            break;
        }
    }

    if !(fit.a.is_finite() && fit.c.is_finite() && fit_sse.is_finite()) {
        return Err(AppError::no_data(
            "Exponential fit did not converge (non-finite parameters).",
        ));
    }

    Ok(fit)
}

/// Least-squares offset `a` for a fixed rate `c` (intercept-only solve).
fn offset_for_rate(x: &[f64], y: &[f64], c: f64) -> Option<f64> {
    let n = x.len();
    let design = DMatrix::from_element(n, 1, 1.0);
    let target = DVector::from_iterator(n, x.iter().zip(y).map(|(&xi, &yi)| yi - (c * xi).exp()));
    if target.iter().any(|v| !v.is_finite()) {
        return None;
    }
    solve_least_squares(&design, &target).map(|beta| beta[0])
}

/// One Gauss–Newton step: solve `J d = r` for the parameter update.
fn newton_step(x: &[f64], y: &[f64], fit: &ExpFit) -> Option<(f64, f64)> {
    let n = x.len();
    let mut jacobian = DMatrix::zeros(n, 2);
    let mut residuals = DVector::zeros(n);

    for (i, (&xi, &yi)) in x.iter().zip(y).enumerate() {
        let e = (fit.c * xi).exp();
        if !e.is_finite() {
            return None;
        }
        jacobian[(i, 0)] = 1.0;
        jacobian[(i, 1)] = xi * e;
        residuals[i] = yi - fit.a - e;
    }

    solve_least_squares(&jacobian, &residuals).map(|d| (d[0], d[1]))
}

fn sse(x: &[f64], y: &[f64], fit: &ExpFit) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - fit.predict(xi);
            r * r
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_known_parameters() {
        // y = 3 + exp(0.09 x) on the age-bracket bounds.
        let x = [0.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 80.0];
        let y: Vec<f64> = x.iter().map(|&xi| 3.0 + (0.09_f64 * xi).exp()).collect();

        let fit = fit_exponential(&x, &y).unwrap();
        assert!((fit.c - 0.09).abs() < 1e-3, "c = {}", fit.c);
        assert!((fit.a - 3.0).abs() < 0.1, "a = {}", fit.a);
    }

    #[test]
    fn monotone_data_yields_monotone_curve() {
        // Strictly increasing mortality-by-age sample.
        let x = [0.0, 15.0, 25.0, 35.0, 45.0, 55.0, 65.0, 75.0, 80.0];
        let y = [0.0, 1.0, 2.0, 7.0, 18.0, 62.0, 210.0, 700.0, 1400.0];

        let fit = fit_exponential(&x, &y).unwrap();
        assert!(fit.c > 0.0);

        let fitted: Vec<f64> = x.iter().map(|&xi| fit.predict(xi)).collect();
        assert!(
            fitted.windows(2).all(|w| w[0] < w[1]),
            "fitted curve must be monotonically increasing: {fitted:?}"
        );
    }

    #[test]
    fn too_few_points_is_a_fit_error() {
        let err = fit_exponential(&[0.0, 1.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(fit_exponential(&[0.0, 1.0, 2.0], &[1.0, 2.0]).is_err());
    }
}
