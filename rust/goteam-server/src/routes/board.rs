//! `/board`

use std::collections::HashSet;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum_extra::extract::{CookieJar, WithRejection};
use goteam_state::{Level, Mutation, Operation, Parent, Target, authorize};
use goteam_store::{Backend, BoardTree, Table};
use serde::{Deserialize, Serialize};

use super::{Body, Created, Id, IdQuery, ancestor};
use crate::{ApiError, AppState, MAX_BOARDS, Session, snapshot, snapshot_board, validate};

/// The optional `?id=` of `GET /board`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardQuery {
    /// Board to show; the team's first board when absent
    #[serde(default)]
    pub id: Option<String>,
}

/// Body of `POST /board`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoard {
    /// Display name
    pub name: String,
}

/// Body of `PATCH /board`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBoard {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// Every column id of the board, in the new order
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

/// Response of `GET /board`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    /// The signed-in user
    pub user: UserView,
    /// Their team
    pub team: TeamView,
    /// Every board of the team, in creation order
    pub boards: Vec<BoardSummary>,
    /// The requested board, if the team has any
    pub active_board: Option<ActiveBoard>,
    /// Everyone on the team, admins first
    pub members: Vec<MemberView>,
}

/// The signed-in user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    /// Username
    pub username: String,
    /// Whether they administer the team
    pub is_admin: bool,
}

/// A user on the team.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    /// Username
    pub username: String,
    /// Whether they administer the team
    pub is_admin: bool,
}

/// The user's team. Only admins see the invite code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    /// Team id
    pub id: String,
    /// Code that lets others join as members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

/// A board in the board list.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSummary {
    /// Board id
    pub id: String,
    /// Display name
    pub name: String,
}

/// A board with everything on it.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveBoard {
    /// Board id
    pub id: String,
    /// Display name
    pub name: String,
    /// Columns in display order
    pub columns: Vec<ColumnView>,
}

/// A column with its tasks.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    /// Column id
    pub id: String,
    /// Tasks in display order
    pub tasks: Vec<TaskView>,
}

/// A task with its subtasks.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    /// Task id
    pub id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Subtasks in display order
    pub subtasks: Vec<SubtaskView>,
}

/// A subtask.
#[derive(Debug, Clone, Serialize)]
pub struct SubtaskView {
    /// Subtask id
    pub id: String,
    /// Title
    pub title: String,
    /// Whether it is done
    pub done: bool,
}

impl From<&BoardTree> for ActiveBoard {
    fn from(tree: &BoardTree) -> Self {
        Self {
            id: tree.board.id.clone(),
            name: tree.board.name.clone(),
            columns: tree
                .columns
                .iter()
                .map(|column| ColumnView {
                    id: column.column.id.clone(),
                    tasks: column
                        .tasks
                        .iter()
                        .map(|task| TaskView {
                            id: task.task.id.clone(),
                            title: task.task.title.clone(),
                            description: task.task.description.clone(),
                            subtasks: task
                                .subtasks
                                .iter()
                                .map(|subtask| SubtaskView {
                                    id: subtask.id.clone(),
                                    title: subtask.title.clone(),
                                    done: subtask.done,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// `GET /board`
///
/// Reads the team's boards from the store and always re-issues
/// `state-token` from what it read.
pub async fn read<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(query), _): WithRejection<Query<BoardQuery>, ApiError>,
) -> Result<(CookieJar, Json<BoardView>), ApiError> {
    let team_id = session.identity.team.as_str();
    let trees = app.store.hierarchy(team_id).await?;
    let fresh = snapshot(&trees);

    let active = match query.id {
        Some(id) => {
            let path = authorize(
                Some(&session.identity),
                &fresh,
                &Operation::member(Target::board(id)),
                session.now,
            )?;
            let board = ancestor(path.board, Level::Board)?;
            trees.get(board.index)
        }
        None => trees.first(),
    };

    let team = app.store.backend().teams().select(team_id).await?;
    let mut members = app.store.members(team_id).await?;
    members.sort_by_key(|member| !member.is_admin);

    let view = BoardView {
        user: UserView {
            username: session.identity.user.clone(),
            is_admin: session.is_admin(),
        },
        team: TeamView {
            id: team.id,
            invite_code: session.is_admin().then_some(team.invite_code),
        },
        boards: trees
            .iter()
            .map(|tree| BoardSummary {
                id: tree.board.id.clone(),
                name: tree.board.name.clone(),
            })
            .collect(),
        active_board: active.map(ActiveBoard::from),
        members: members
            .into_iter()
            .map(|member| MemberView {
                username: member.username,
                is_admin: member.is_admin,
            })
            .collect(),
    };

    let jar = app.issue_state(jar, &fresh, session.now)?;
    Ok((jar, Json(view)))
}

/// `POST /board`
pub async fn create<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Json(body), _): Body<CreateBoard>,
) -> Result<(CookieJar, Json<Created>), ApiError> {
    let team_id = session.identity.team.clone();
    session.authorize(Operation::admin(Target::team(&team_id)), "create boards")?;
    validate::title("Board name", &body.name)?;

    let existing = app.store.backend().boards().select_children(&team_id).await?;
    if existing.len() >= MAX_BOARDS {
        return Err(ApiError::bad_request(format!(
            "Max {MAX_BOARDS} boards is allowed per team."
        )));
    }

    let tree = app.store.create_board(&team_id, &body.name).await?;
    let jar = app.reconcile(
        jar,
        &session,
        &[Mutation::insert(Parent::Root, snapshot_board(&tree))],
    )?;

    Ok((jar, Json(Created { id: tree.board.id })))
}

/// `PATCH /board`
///
/// Renames the board, reorders its columns, or both.
pub async fn update<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(IdQuery { id }), _): Id,
    WithRejection(Json(body), _): Body<UpdateBoard>,
) -> Result<(CookieJar, StatusCode), ApiError> {
    let path = session.authorize(Operation::admin(Target::board(&id)), "edit boards")?;

    if body.name.is_none() && body.columns.is_none() {
        return Err(ApiError::bad_request("Nothing to update."));
    }
    if let Some(name) = &body.name {
        validate::title("Board name", name)?;
    }
    if let Some(columns) = &body.columns {
        let position = ancestor(path.board, Level::Board)?;
        let current = session
            .tree
            .boards
            .get(position.index)
            .map(|board| board.columns.iter().map(|column| column.id.as_str()).collect())
            .unwrap_or_else(HashSet::new);
        let requested: HashSet<&str> = columns.iter().map(String::as_str).collect();

        if requested.len() != columns.len() || requested != current {
            return Err(ApiError::bad_request(
                "Columns must list every column of the board exactly once.",
            ));
        }
    }

    let mut mutations = Vec::new();
    if let Some(name) = body.name {
        app.store.rename_board(&id, &name).await?;
        mutations.push(Mutation::rename_board(&id, name));
    }
    if let Some(columns) = body.columns {
        app.store.reorder_columns(&columns).await?;
        mutations.push(Mutation::reorder(Parent::board(&id), columns));
    }

    Ok((app.reconcile(jar, &session, &mutations)?, StatusCode::OK))
}

/// `DELETE /board`
pub async fn delete<B: Backend>(
    State(app): State<AppState<B>>,
    session: Session,
    jar: CookieJar,
    WithRejection(Query(IdQuery { id }), _): Id,
) -> Result<(CookieJar, StatusCode), ApiError> {
    session.authorize(Operation::admin(Target::board(&id)), "delete boards")?;

    app.store.delete_board(&id).await?;
    let jar = app.reconcile(jar, &session, &[Mutation::delete(Target::board(id))])?;

    Ok((jar, StatusCode::OK))
}
