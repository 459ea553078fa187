//! `/task`

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum_extra::extract::{CookieJar, WithRejection};
use goteam_state::{Level, Mutation, Operation, Parent, Target};
use goteam_store::Backend;
use serde::Deserialize;

use super::{Body, Created, Id, IdQuery, ancestor};
use crate::{ApiError, AppState, Session, snapshot_task, validate};

/// Body of `POST /task`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    /// Column to add the task to
    pub column: String,
    /// Title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Subtask titles, in display order
    #[serde(default)]
    pub subtasks: Vec<String>,
}

/// Body of `PATCH /task`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: String,
    /// New description
    #[serde(default)]
    pub description: String,
    /// Subtask titles replacing the current subtasks
    #[serde(default)]
    pub subtasks: Vec<String>,
}

fn validate_titles(title: &str, subtasks: &[String]) -> Result<(), ApiError> {
    validate::title("Task title", title)?;
    for subtask in subtasks {
        validate::title("Subtask title", subtask)?;
    }
    Ok(())
}

/// `POST /task`
pub async fn create<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Json(body), _): Body<CreateTask>,
) -> Result<(CookieJar, Json<Created>), ApiError> {
    session.authorize(Operation::admin(Target::column(&body.column)), "create tasks")?;
    validate_titles(&body.title, &body.subtasks)?;

    let tree = app
        .store
        .create_task(&body.column, &body.title, &body.description, &body.subtasks)
        .await?;
    let jar = app.reconcile(
        jar,
        &session,
        &[Mutation::insert(
            Parent::column(&body.column),
            snapshot_task(&tree),
        )],
    )?;

    Ok((jar, Json(Created { id: tree.task.id })))
}

/// `PATCH /task`
///
/// Replaces the title, description and every subtask. The task keeps its
/// place in its column.
pub async fn update<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(IdQuery { id }), _): Id,
    WithRejection(Json(body), _): Body<UpdateTask>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let path = session.authorize(Operation::admin(Target::task(&id)), "edit tasks")?;
    let column = ancestor(path.column, Level::Column)?;
    let task = ancestor(path.task, Level::Task)?;
    validate_titles(&body.title, &body.subtasks)?;

    let tree = app
        .store
        .replace_task(&id, &body.title, &body.description, &body.subtasks)
        .await?;
    let jar = app.reconcile(
        jar,
        &session,
        &[
            Mutation::delete(Target::task(&id)),
            Mutation::insert_at(Parent::column(column.id), snapshot_task(&tree), task.index),
        ],
    )?;

    Ok((jar, StatusCode::OK))
}

/// `DELETE /task`
pub async fn delete<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(IdQuery { id }), _): Id,
) -> Result<(CookieJar, StatusCode), ApiError> {
    session.authorize(Operation::admin(Target::task(&id)), "delete tasks")?;

    app.store.delete_task(&id).await?;
    let jar = app.reconcile(jar, &session, &[Mutation::delete(Target::task(id))])?;

    Ok((jar, StatusCode::OK))
}
