use shared::error::{ApiException, ErrorCode};
use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request ({code:?}): {message}")]
    Api { code: ErrorCode, message: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("invalid input: {0}")]
    Validation(FieldErrors),
}

impl ClientError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::NotAuthenticated => Some(ErrorCode::Unauthorized),
            Self::Validation(_) => Some(ErrorCode::Validation),
            _ => None,
        }
    }
}

impl From<ApiException> for ClientError {
    fn from(value: ApiException) -> Self {
        Self::Api {
            code: value.code,
            message: value.message,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
