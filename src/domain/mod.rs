//! Shared domain types for the normalization pipeline.

mod types;

pub use types::*;
