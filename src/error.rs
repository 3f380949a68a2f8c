use thiserror::Error;

pub const INVALID_WINDOW: &str = "invalid window";
pub const INVALID_RESPONSE: &str = "invalid response";
pub const MISSING_RESULT: &str = "missing result";
pub const CONVERSION_RATE_UNAVAILABLE: &str = "conversion rate unavailable";
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Errors raised while fetching storefront metrics.
///
/// The taxonomy variants carry the short advisory message that ends up in
/// `ExtractionOutcome::error`, so their `Display` is the bare message.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Api(String),

    #[error("{0}")]
    MissingData(String),

    #[error("{0}")]
    QueryParse(String),

    #[error("{0}")]
    NoData(String),

    #[error("{0}")]
    Deadline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetricsError {
    /// Stable tag used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricsError::InvalidInput(_) => "invalid_input",
            MetricsError::Network(_) => "network",
            MetricsError::InvalidResponse(_) => "invalid_response",
            MetricsError::Api(_) => "api",
            MetricsError::MissingData(_) => "missing_data",
            MetricsError::QueryParse(_) => "query_parse",
            MetricsError::NoData(_) => "no_data",
            MetricsError::Deadline(_) => "deadline",
            MetricsError::Config(_) => "config",
            MetricsError::Io(_) => "io",
            MetricsError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;

/// Cut `message` down to at most `max_chars` characters.
pub fn truncate(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
