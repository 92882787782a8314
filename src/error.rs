use std::path::PathBuf;

use crate::language::UnsupportedLanguage;

/// Failure to obtain a dictionary for a language.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedLanguage),

    #[error("failed to build dictionary URL from `{base}`")]
    InvalidUrl {
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to request `{url}`")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error response `{status}` received from `{url}`")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dictionary for `{code}` not found")]
    NotFound { code: String },

    #[error("malformed dictionary for `{code}`")]
    Malformed {
        code: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Whether the resource simply does not exist, as opposed to being broken.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Unsupported(_) | Self::NotFound { .. } => true,
            Self::Status { status, .. } => *status == reqwest::StatusCode::NOT_FOUND,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::InvalidUrl { .. } | Self::Request { .. } | Self::Malformed { .. } => false,
        }
    }
}
