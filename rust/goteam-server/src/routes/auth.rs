//! `/register` and `/login`.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::{CookieJar, WithRejection};
use goteam_store::{Backend, StoreError, UserRecord};
use serde::Deserialize;
use tracing::info;

use super::Body;
use crate::{ApiError, AppState, validate};

/// Name given to the board every new team starts with.
pub const FIRST_BOARD_NAME: &str = "New Board";

/// Body of `POST /register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// Plain-text password
    pub password: String,
    /// Joins an existing team as a member when present
    #[serde(default)]
    pub invite_code: Option<String>,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username
    pub username: String,
    /// Plain-text password
    pub password: String,
}

/// `POST /register`
///
/// Without an invite code the user founds a new team, becomes its admin and
/// gets a first board. With one, they join that team as a member.
pub async fn register<B: Backend>(
    State(app): State<AppState<B>>,
    jar: CookieJar,
    WithRejection(Json(body), _): Body<RegisterRequest>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    validate::username(&body.username)?;
    validate::password(&body.password)?;

    match app.store.user(&body.username).await {
        Ok(_) => return Err(ApiError::bad_request("Username is already taken.")),
        Err(error) if error.is_not_found() => {}
        Err(error) => return Err(error.into()),
    }

    let (team_id, is_admin) = match body.invite_code.as_deref() {
        Some(code) => {
            let team = app
                .store
                .team_by_invite(code)
                .await
                .map_err(|error| match error {
                    StoreError::NotFound { .. } => ApiError::bad_request("Invalid invite code."),
                    other => other.into(),
                })?;
            (team.id, false)
        }
        None => (app.store.create_team().await?.id, true),
    };

    let user = UserRecord {
        username: body.username,
        password_hash: app.passwords.hash(&body.password)?,
        team_id,
        is_admin,
    };
    app.store
        .create_user(user.clone())
        .await
        .map_err(|error| match error {
            StoreError::DupKey { .. } => ApiError::bad_request("Username is already taken."),
            other => other.into(),
        })?;

    if is_admin {
        app.store
            .create_board(&user.team_id, FIRST_BOARD_NAME)
            .await?;
    }

    info!(user = %user.username, team = %user.team_id, is_admin, "Registered user");
    Ok((app.sign_in(jar, &user).await?, StatusCode::OK))
}

/// `POST /login`
pub async fn login<B: Backend>(
    State(app): State<AppState<B>>,
    jar: CookieJar,
    WithRejection(Json(body), _): Body<LoginRequest>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let invalid = || ApiError::bad_request("Invalid username or password.");

    if body.username.is_empty() || body.password.is_empty() {
        return Err(invalid());
    }

    let user = match app.store.user(&body.username).await {
        Ok(user) => user,
        Err(error) if error.is_not_found() => return Err(invalid()),
        Err(error) => return Err(error.into()),
    };
    if !app.passwords.verify(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    Ok((app.sign_in(jar, &user).await?, StatusCode::OK))
}
