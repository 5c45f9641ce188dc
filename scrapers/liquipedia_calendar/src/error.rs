use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Could not retrieve matches for '{url}' after trying {attempts} candidate URL(s)")]
    FetchFailed { url: String, attempts: usize },
    #[error("Malformed calendar: {0}")]
    Codec(String),
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
    #[error("Proxy list unavailable: {0}")]
    ProxyList(String),
}

impl CalendarError {
    /// True for failures caused by the caller's input rather than the source site.
    pub fn is_validation(&self) -> bool {
        matches!(self, CalendarError::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, CalendarError>;
