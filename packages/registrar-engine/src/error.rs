use thiserror::Error;

/// Fatal configuration problems, raised before any fetch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("registrant identity is incomplete: {0} is empty")]
    MissingIdentityField(&'static str),

    #[error("invalid site base url: {0}")]
    InvalidBaseUrl(String),
}

/// Terminal fetch failures surfaced by the page fetcher after its own
/// retry policy is exhausted. The engine degrades these to a per-record
/// `TransientError` status; they never abort a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("anti-bot challenge persisted after {attempts} attempts for {url}")]
    AntiBotBlocked { url: String, attempts: u32 },

    #[error("authentication required or login rejected for {url}")]
    AuthRequired { url: String },

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

/// Registration submission failures. Recovered as a `Failed` outcome; the
/// record is not retried within the same run.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("no registration form found on {url}")]
    FormNotFound { url: String },

    #[error("registration submit was not confirmed for {url}")]
    SubmitNotConfirmed { url: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
