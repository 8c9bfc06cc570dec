//! Chart specifications, builders and file rendering.
//!
//! The split matters: `charts` builds plain data descriptions from
//! aggregated series (no graphics context anywhere near the math), and
//! `render` is the only module that touches Plotters backends.

pub mod charts;
pub mod render;
pub mod spec;
