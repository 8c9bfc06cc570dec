//! Remote source access.

mod remote;

pub use remote::HttpSource;
