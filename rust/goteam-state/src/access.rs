//! Authorization of operations against the decoded hierarchy.
//!
//! Handlers describe what they are about to do as an [`Operation`] and call
//! [`authorize`] once, instead of each one checking team membership and role
//! on its own.

use std::fmt;

use thiserror::Error;

use crate::{HierarchyState, Identity, Level, Role, Timestamp};

/// The resource an operation acts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A team, for operations that create boards
    Team(String),
    /// A board by id
    Board(String),
    /// A column by id
    Column(String),
    /// A task by id
    Task(String),
    /// A subtask by id
    Subtask(String),
}

impl Target {
    /// Targets a team.
    pub fn team(id: impl Into<String>) -> Self {
        Self::Team(id.into())
    }

    /// Targets a board.
    pub fn board(id: impl Into<String>) -> Self {
        Self::Board(id.into())
    }

    /// Targets a column.
    pub fn column(id: impl Into<String>) -> Self {
        Self::Column(id.into())
    }

    /// Targets a task.
    pub fn task(id: impl Into<String>) -> Self {
        Self::Task(id.into())
    }

    /// Targets a subtask.
    pub fn subtask(id: impl Into<String>) -> Self {
        Self::Subtask(id.into())
    }

    /// The depth at which the target lives.
    pub fn level(&self) -> Level {
        match self {
            Target::Team(_) => Level::Team,
            Target::Board(_) => Level::Board,
            Target::Column(_) => Level::Column,
            Target::Task(_) => Level::Task,
            Target::Subtask(_) => Level::Subtask,
        }
    }

    /// The target's id.
    pub fn id(&self) -> &str {
        match self {
            Target::Team(id)
            | Target::Board(id)
            | Target::Column(id)
            | Target::Task(id)
            | Target::Subtask(id) => id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level(), self.id())
    }
}

/// A requested action: the resource it touches and the role it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The resource acted on
    pub target: Target,
    /// The least role allowed to perform the action
    pub role: Role,
}

impl Operation {
    /// Creates an operation on `target` requiring `role`.
    pub fn new(target: Target, role: Role) -> Self {
        Self { target, role }
    }

    /// An operation any team member may perform.
    pub fn member(target: Target) -> Self {
        Self::new(target, Role::Member)
    }

    /// An operation only team admins may perform.
    pub fn admin(target: Target) -> Self {
        Self::new(target, Role::Admin)
    }
}

/// Where a node sits among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Index within the parent's sequence
    pub index: usize,
    /// The node's id
    pub id: String,
}

impl Position {
    fn new(index: usize, id: &str) -> Self {
        Self {
            index,
            id: id.to_owned(),
        }
    }
}

/// The ancestor chain of an authorized target, ending at the target itself.
///
/// Handlers use this instead of asking the store which board a task belongs
/// to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The team owning the chain
    pub team: String,
    /// The board, unless the target is the team itself
    pub board: Option<Position>,
    /// The column, for column, task and subtask targets
    pub column: Option<Position>,
    /// The task, for task and subtask targets
    pub task: Option<Position>,
    /// The subtask, for subtask targets
    pub subtask: Option<Position>,
}

impl ResolvedPath {
    fn team(team: &str) -> Self {
        Self {
            team: team.to_owned(),
            board: None,
            column: None,
            task: None,
            subtask: None,
        }
    }

    /// The deepest node on the path.
    pub fn leaf(&self) -> Option<&Position> {
        self.subtask
            .as_ref()
            .or(self.task.as_ref())
            .or(self.column.as_ref())
            .or(self.board.as_ref())
    }
}

/// Reasons an operation is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// No valid identity accompanied the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The target does not exist in the caller's tree.
    #[error("{target} not found")]
    NotFound {
        /// The missing target
        target: Target,
    },

    /// The caller's role is insufficient.
    #[error("{target} requires the {required} role")]
    Forbidden {
        /// The refused target
        target: Target,
        /// The role the operation requires
        required: Role,
    },
}

/// Finds `target` in `tree` and returns its ancestor chain.
///
/// Only the target's own depth is searched. When ids repeat (an upstream
/// integrity problem) the first match in display order wins. Team targets
/// are not part of the tree and never resolve here.
pub fn locate(tree: &HierarchyState, target: &Target) -> Option<ResolvedPath> {
    let level = target.level();
    let id = target.id();

    for (b, board) in tree.boards.iter().enumerate() {
        let mut path = ResolvedPath::team(&board.team);
        path.board = Some(Position::new(b, &board.id));

        if level == Level::Board {
            if board.id == id {
                return Some(path);
            }
            continue;
        }

        for (c, column) in board.columns.iter().enumerate() {
            path.column = Some(Position::new(c, &column.id));

            if level == Level::Column {
                if column.id == id {
                    return Some(path);
                }
                continue;
            }

            for (t, task) in column.tasks.iter().enumerate() {
                path.task = Some(Position::new(t, &task.id));

                if level == Level::Task {
                    if task.id == id {
                        return Some(path);
                    }
                    continue;
                }

                for (s, subtask) in task.subtasks.iter().enumerate() {
                    if level == Level::Subtask && subtask.id == id {
                        path.subtask = Some(Position::new(s, &subtask.id));
                        return Some(path);
                    }
                }
            }
        }
    }

    None
}

/// Decides whether `identity` may perform `operation` given the tree they
/// presented.
///
/// # Errors
///
/// - [`AccessError::Unauthenticated`] when the identity is missing or expired
/// - [`AccessError::NotFound`] when the target is absent from the tree or
///   owned by another team
/// - [`AccessError::Forbidden`] when the target exists but the identity's
///   role is insufficient
pub fn authorize(
    identity: Option<&Identity>,
    tree: &HierarchyState,
    operation: &Operation,
    now: Timestamp,
) -> Result<ResolvedPath, AccessError> {
    let identity = match identity {
        Some(identity) if !identity.is_expired(now) => identity,
        _ => return Err(AccessError::Unauthenticated),
    };

    let not_found = || AccessError::NotFound {
        target: operation.target.clone(),
    };

    let path = match &operation.target {
        Target::Team(team) => Some(ResolvedPath::team(team)),
        target => locate(tree, target),
    }
    .ok_or_else(not_found)?;

    // The tree is built per team, so a foreign board here means the token was
    // assembled incorrectly. Report it the same way as an absent resource.
    if path.team != identity.team {
        return Err(not_found());
    }

    if !identity.role.satisfies(operation.role) {
        return Err(AccessError::Forbidden {
            target: operation.target.clone(),
            required: operation.role,
        });
    }

    Ok(path)
}
