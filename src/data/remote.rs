//! Blocking HTTP fetch for the remote CSV sources.
//!
//! Every run fetches fresh — no caching, no conditional requests, no
//! retries. A failed fetch aborts the run with exit code 4.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::AppError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::fetch(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch a source body as text.
    pub fn fetch_text(&self, url: &str) -> Result<String, AppError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::fetch(format!("Fetch failed for '{url}': {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::fetch(format!(
                "Fetch failed for '{url}' with status {}.",
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::fetch(format!("Failed to read body of '{url}': {e}")))
    }
}
