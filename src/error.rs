//! Process-level error type.
//!
//! Every fatal condition carries the exit code `main` should terminate with:
//!
//! - 2: input/schema errors (missing columns, unparseable layouts, bad paths)
//! - 3: no usable data after normalization, or not enough data to fit
//! - 4: network fetch failures
//! - 5: chart rendering/write failures
//!
//! Arithmetic-undefined conditions (zero denominators, a failed curve fit)
//! are *not* `AppError`s; they are `Option`/`Result` values the pipeline
//! turns into skipped points or `undefined` summary lines.

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Input/schema error (exit code 2).
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// No usable data (exit code 3).
    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Remote fetch error (exit code 4).
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    /// Chart rendering error (exit code 5).
    pub fn render(message: impl Into<String>) -> Self {
        Self::new(5, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
