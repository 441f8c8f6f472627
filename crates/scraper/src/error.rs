use thiserror::Error;

/// Errors a scraper can report back to the reconciliation engine
#[derive(Debug, Error)]
pub enum ScraperError {
    /// The remote source asked us to back off. Callers stop trying other
    /// scrapers for the current item.
    #[error("[{scraper}] Rate limited by remote source")]
    RateLimited { scraper: &'static str },

    #[error("[{scraper}] Request failed: {message}")]
    Request {
        scraper: &'static str,
        message: String,
    },

    #[error("[{scraper}] Invalid response: {message}")]
    InvalidResponse {
        scraper: &'static str,
        message: String,
    },

    #[error("Failed to encode danmaku: {0}")]
    Encode(String),
}

impl ScraperError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ScraperError::RateLimited { .. })
    }
}
