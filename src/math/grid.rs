//! Candidate grids for the growth-rate search.
//!
//! The exponential fit scans a deterministic log-spaced grid over the
//! nonlinear rate parameter before refining. Grid search keeps the fit
//! reproducible and avoids the local-minima traps of a cold nonlinear
//! optimizer start.

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::schema(format!(
            "Invalid grid range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::schema("Grid steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.001, 1.0, 7).unwrap();
        assert_eq!(v.len(), 7);
        assert!((v[0] - 0.001).abs() < 1e-12);
        assert!((v[6] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 1.0, 5).is_err());
        assert!(log_space(1.0, 0.5, 5).is_err());
        assert!(log_space(0.1, 1.0, 1).is_err());
    }
}
