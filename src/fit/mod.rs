//! Exponential curve fitting for age-stratified mortality.

mod expfit;

pub use expfit::{ExpFit, fit_exponential};
