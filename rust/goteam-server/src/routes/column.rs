//! `/column`

use std::collections::HashSet;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum_extra::extract::{CookieJar, WithRejection};
use goteam_state::{Level, Mutation, Operation, Parent, Target};
use goteam_store::Backend;
use serde::Deserialize;

use super::{Body, Id, IdQuery, ancestor};
use crate::{ApiError, AppState, Session};

/// Body of `PATCH /column`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateColumn {
    /// Every task the column should hold, in display order
    pub tasks: Vec<String>,
}

/// `PATCH /column`
///
/// Sets the column's full task order. Tasks listed from other columns of the
/// same board are moved in; every task already in the column must be listed.
pub async fn update<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(IdQuery { id }), _): Id,
    WithRejection(Json(body), _): Body<UpdateColumn>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let path = session.authorize(Operation::admin(Target::column(&id)), "edit columns")?;
    let board = ancestor(path.board, Level::Board)?;
    let column = ancestor(path.column, Level::Column)?;

    let mut listed = HashSet::new();
    let mut arriving = Vec::new();
    for task in &body.tasks {
        if !listed.insert(task.as_str()) {
            return Err(ApiError::bad_request("Tasks cannot be listed twice."));
        }

        let task_path = session.authorize(Operation::admin(Target::task(task)), "move tasks")?;
        if task_path.board.as_ref().map(|position| &position.id) != Some(&board.id) {
            return Err(ApiError::bad_request(
                "Tasks can only be moved between columns of the same board.",
            ));
        }
        if task_path.column.as_ref().map(|position| &position.id) != Some(&column.id) {
            arriving.push(task.clone());
        }
    }

    let staying = session
        .tree
        .boards
        .get(board.index)
        .and_then(|board| board.columns.get(column.index))
        .map(|column| column.tasks.as_slice())
        .unwrap_or_default();
    if staying.iter().any(|task| !listed.contains(task.id.as_str())) {
        return Err(ApiError::bad_request(
            "Every task in the column must be listed.",
        ));
    }

    app.store.set_column_tasks(&id, &body.tasks).await?;

    let mut mutations: Vec<Mutation> = arriving
        .into_iter()
        .map(|task| Mutation::move_to(Target::task(task), Parent::column(&id), None))
        .collect();
    mutations.push(Mutation::reorder(Parent::column(&id), body.tasks.iter()));

    Ok((app.reconcile(jar, &session, &mutations)?, StatusCode::OK))
}
