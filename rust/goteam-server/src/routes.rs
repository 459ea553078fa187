//! Request handlers, one module per resource.
//!
//! Authenticated handlers share a shape: extract a [`Session`](crate::Session),
//! authorize, validate, persist through the store and then re-issue
//! `state-token` with the same change applied.

use axum::Json;
use axum::extract::Query;
use axum_extra::extract::WithRejection;
use goteam_state::{Level, Position};
use serde::{Deserialize, Serialize};

use crate::ApiError;

pub mod auth;
pub mod board;
pub mod column;
pub mod member;
pub mod subtask;
pub mod task;

/// The `?id=` query string.
#[derive(Debug, Clone, Deserialize)]
pub struct IdQuery {
    /// The id of the resource to act on
    pub id: String,
}

/// A `?id=` query that rejects with an [`ApiError`].
pub type Id = WithRejection<Query<IdQuery>, ApiError>;

/// A JSON body that rejects with an [`ApiError`].
pub type Body<T> = WithRejection<Json<T>, ApiError>;

/// Response to requests that create a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created {
    /// The new resource's id
    pub id: String,
}

/// Unwraps an ancestor that authorization is known to resolve.
fn ancestor(position: Option<Position>, level: Level) -> Result<Position, ApiError> {
    position.ok_or_else(|| ApiError::Internal(format!("Authorized path has no {level}")))
}
