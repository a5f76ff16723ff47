//! Error types for guide providers

/// Result type alias for guide operations
pub type Result<T> = std::result::Result<T, GuideError>;

/// The guide source could not be obtained or understood
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("cannot download guide from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The source answered with an error status
    #[error("guide source {url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Local guide file could not be read
    #[error("cannot read guide file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid XMLTV
    #[error("malformed XMLTV document: {0}")]
    Malformed(#[from] quick_xml::DeError),

    /// No source location configured
    #[error("no guide source configured")]
    MissingSource,
}

/// Errors that can occur when using a guide provider
#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The configured provider kind is unknown
    #[error("unsupported guide provider: {0}")]
    UnsupportedProvider(String),
}
