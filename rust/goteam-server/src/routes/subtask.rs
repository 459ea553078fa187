//! `/subtask`

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum_extra::extract::{CookieJar, WithRejection};
use goteam_state::{Mutation, Operation, Target};
use goteam_store::Backend;
use serde::Deserialize;

use super::{Body, Id, IdQuery};
use crate::{ApiError, AppState, Session};

/// Body of `PATCH /subtask`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSubtask {
    /// Whether the subtask is done
    pub done: bool,
}

/// `PATCH /subtask`
pub async fn update<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(IdQuery { id }), _): Id,
    WithRejection(Json(body), _): Body<UpdateSubtask>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    session.authorize(Operation::admin(Target::subtask(&id)), "edit subtasks")?;

    app.store.set_subtask_done(&id, body.done).await?;
    let jar = app.reconcile(jar, &session, &[Mutation::set_done(id, body.done)])?;

    Ok((jar, StatusCode::OK))
}
