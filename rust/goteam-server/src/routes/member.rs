//! `/member`

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use goteam_state::{Operation, Target};
use goteam_store::Backend;
use tracing::info;

use super::{Id, IdQuery};
use crate::{ApiError, AppState, Session};

/// `DELETE /member?id=<username>`
///
/// Removes a user from the caller's team. The state token is untouched since
/// users are not part of the hierarchy.
pub async fn delete<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    WithRejection(Query(IdQuery { id }), _): Id,
) -> Result<StatusCode, ApiError> {
    let team = session.identity.team.as_str();
    session.authorize(Operation::admin(Target::team(team)), "remove members")?;

    if id == session.identity.user {
        return Err(ApiError::bad_request("Admins cannot remove themselves."));
    }

    let user = app.store.user(&id).await?;
    if user.team_id != team {
        return Err(ApiError::NotFound("User not found.".into()));
    }

    app.store.delete_user(&id).await?;
    info!(team, username = %id, "Removed team member");

    Ok(StatusCode::OK)
}
