//! Erreurs du tuner et leur traduction en réponses HTTP

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Result type alias for tuner operations
pub type Result<T> = std::result::Result<T, TunerError>;

/// Errors surfaced by the lineup and stream handlers
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// No channel with this number in the lineup
    #[error("unknown channel number {0}")]
    ChannelNotFound(String),

    /// Unknown value for `/lineup.post?scan=`
    #[error("{0} is not a valid scan command")]
    BadScanCommand(String),

    /// The decoder could not be started or wired
    #[error("decoder error: {0}")]
    Process(String),

    /// Lineup XML serialisation failed
    #[error("error marshalling lineup to XML: {0}")]
    Xml(#[from] quick_xml::SeError),
}

impl TunerError {
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadScanCommand(_) => StatusCode::BAD_REQUEST,
            // les clients HDHomeRun n'attendent pas de 404 sur /auto
            Self::ChannelNotFound(_) | Self::Process(_) | Self::Xml(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TunerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}
