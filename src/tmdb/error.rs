use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },
    #[error("TMDB API error: {0}")]
    Upstream(u16),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid TMDB response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TmdbError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TmdbError::RateLimited { .. })
    }
}

pub type TmdbResult<T> = Result<T, TmdbError>;
