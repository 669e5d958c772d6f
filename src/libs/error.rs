use thiserror::Error;

/// Errors raised while turning one search result into filtered hits.
///
/// Each variant is fatal to a single `filter` call only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The query length is zero, so coverage is undefined for every hit
    #[error("Invalid query: query length must be positive, got {0}")]
    InvalidQuery(usize),

    /// The raw result misses a structure or field every hit needs
    #[error("Malformed result: {0}")]
    MalformedResult(String),

    /// A threshold outside 0-100 or not a number
    #[error("Invalid threshold: {name} = {value} is not within 0-100")]
    InvalidThreshold { name: &'static str, value: f64 },
}

impl FilterError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        FilterError::MalformedResult(msg.into())
    }
}

/// Failures of the upstream search, reported as "search unavailable".
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search unavailable: {0}")]
    Unavailable(String),

    #[error("Search service error: {0}")]
    Service(String),

    #[error("Search timed out after {0} seconds (RID {1})")]
    Timeout(u64, String),

    #[error("Unreadable search report: {0}")]
    Report(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::Unavailable(e.to_string())
    }
}
