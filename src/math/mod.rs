//! Small numeric kernels shared by the curve fitter.

pub mod grid;
pub mod ols;

pub use grid::log_space;
pub use ols::solve_least_squares;
