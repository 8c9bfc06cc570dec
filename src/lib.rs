//! `covid-charts` library crate.
//!
//! The binary (`covid`) is a thin wrapper around this library so that:
//!
//! - the normalization/aggregation pipeline is testable without spawning
//!   processes or touching the network
//! - chart building (pure data) stays separate from chart rendering (I/O)
//! - modules are reusable if other front-ends are ever needed

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod series;
