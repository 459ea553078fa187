//! Error types for the API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use goteam_state::{AccessError, ReconcileError, TokenError};
use goteam_store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// A failed request.
///
/// Client errors carry the message shown to the user. Server errors carry
/// the cause, which is logged but never sent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed or failed validation.
    #[error("{0}")]
    BadRequest(String),

    /// No valid identity accompanied the request.
    #[error("{0}")]
    Unauthorized(String),

    /// The identity's role is insufficient.
    #[error("{0}")]
    Forbidden(String),

    /// The target does not exist for this identity.
    #[error("{0}")]
    NotFound(String),

    /// Something failed on the server's side.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for [`ApiError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Maps a failed authorization of `action`, such as "create tasks".
    pub fn denied(error: AccessError, action: &str) -> Self {
        match error {
            AccessError::Forbidden { .. } => {
                Self::Forbidden(format!("Only team admins can {action}."))
            }
            other => other.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            Self::Internal(cause) => {
                error!(%status, %cause, "Request failed");
                "Internal server error.".to_owned()
            }
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message) => {
                debug!(%status, %message, "Request rejected");
                message
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<AccessError> for ApiError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::Unauthenticated => Self::Unauthorized("Invalid auth token.".into()),
            AccessError::NotFound { target } => {
                Self::NotFound(format!("{} not found.", capitalized(&target.level().to_string())))
            }
            AccessError::Forbidden { required, .. } => {
                Self::Forbidden(format!("Only team {required}s can do that."))
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { kind, .. } => {
                Self::NotFound(format!("{} not found.", capitalized(kind)))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(error: ReconcileError) -> Self {
        Self::Internal(format!("State reconciliation failed: {error}"))
    }
}

impl From<TokenError> for ApiError {
    fn from(error: TokenError) -> Self {
        Self::Internal(format!("Token issuance failed: {error}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use goteam_state::{Role, Target};

    use super::*;

    #[test]
    fn it_maps_access_errors_to_statuses() {
        let cases = [
            (AccessError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                AccessError::NotFound {
                    target: Target::task("t1"),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AccessError::Forbidden {
                    target: Target::task("t1"),
                    required: Role::Admin,
                },
                StatusCode::FORBIDDEN,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_code(), status);
        }
    }

    #[test]
    fn it_names_the_denied_action() {
        let forbidden = || AccessError::Forbidden {
            target: Target::column("c1"),
            required: Role::Admin,
        };

        assert_eq!(
            ApiError::denied(forbidden(), "create tasks").to_string(),
            "Only team admins can create tasks."
        );
        assert_eq!(
            ApiError::denied(forbidden(), "edit columns").to_string(),
            "Only team admins can edit columns."
        );

        let missing = ApiError::denied(
            AccessError::NotFound {
                target: Target::column("c1"),
            },
            "create tasks",
        );
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Column not found.");
    }

    #[test]
    fn it_names_the_missing_resource() {
        let error = ApiError::from(AccessError::NotFound {
            target: Target::column("c1"),
        });

        assert_eq!(error.to_string(), "Column not found.");
    }

    #[test]
    fn it_treats_conflicts_and_reconciliation_as_server_errors() {
        let conflict = ApiError::from(StoreError::DupKey {
            kind: "task",
            key: "t1".into(),
        });
        let oversized = ApiError::from(ReconcileError::Token(TokenError::TooLarge {
            size: 5000,
            ceiling: 4000,
        }));

        assert_eq!(conflict.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(oversized.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::from(StoreError::NotFound {
                kind: "board",
                key: "b1".into()
            })
            .to_string(),
            "Board not found."
        );
    }
}
