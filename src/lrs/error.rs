use hyper::{Method, StatusCode};
use thiserror::Error;

use crate::lrs::events::BoxError;
use crate::xapi::ParseError;

/// Why a request to an LRS resource failed.
#[derive(Debug, Error)]
pub enum LrsError {
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Payload(#[from] ParseError),

    #[error("method {method} is not supported for {resource}")]
    UnsupportedMethod {
        method: Method,
        resource: &'static str,
    },

    #[error("no agent profile document for `{0}`")]
    DocumentNotFound(String),

    #[error("observer failed: {0}")]
    Observer(#[source] BoxError),
}

impl LrsError {
    /// Status code the failed request is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            LrsError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unimplemented_features_are_501() {
        assert_eq!(
            LrsError::NotImplemented("x").status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            LrsError::Payload(ParseError::UnexpectedPayload).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LrsError::UnsupportedMethod {
                method: Method::PATCH,
                resource: "statements"
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LrsError::Observer("boom".into()).to_string(),
            "observer failed: boom"
        );
    }
}
