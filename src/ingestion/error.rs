use thiserror::Error;

/// Failure of a single upstream page request. Never escapes the fetcher:
/// `PageSource::fetch_page` turns exhaustion into an empty page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned HTTP {status} for page {page}")]
    Status { page: u32, status: u16 },

    #[error("malformed JSON on page {page}: {message}")]
    Decode { page: u32, message: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("could not connect to store: {0}")]
    Connect(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// The only failure allowed to halt a run: storage unreachable at startup
    #[error("persistence gateway unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("progress file {path}: {source}")]
    Progress {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("progress snapshot could not be encoded: {0}")]
    ProgressEncode(#[from] serde_json::Error),
}
