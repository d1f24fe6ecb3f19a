use serde::Serialize;
use thiserror::Error;

/// Failure of a single catalog call. Every remote wrapper returns one of
/// these instead of panicking or swallowing the error.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CatalogError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("catalog returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unreadable catalog response: {0}")]
    Decode(String),
}

impl From<ureq::Error> for CatalogError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => CatalogError::Status {
                status,
                message: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => CatalogError::Transport(transport.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
