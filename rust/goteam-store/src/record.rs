//! Record types, one per table.

use std::convert::Infallible;

/// A row in one of the store's tables.
pub trait Record: Clone + Send + Sync + 'static {
    /// Name of the record kind, used in errors.
    const KIND: &'static str;

    /// A partial update accepted by [`crate::Table::update`].
    type Patch: Send + Sync;

    /// The record's primary key.
    fn key(&self) -> &str;

    /// Key of the owning record, if this kind has one.
    fn parent(&self) -> Option<&str> {
        None
    }

    /// Display position among records sharing a parent.
    fn order(&self) -> usize {
        0
    }

    /// Applies `patch` in place.
    fn apply(&mut self, patch: Self::Patch);
}

/// The root of ownership. Users join a team with its invite code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRecord {
    /// Primary key
    pub id: String,
    /// Code other users register with to join as members
    pub invite_code: String,
}

/// A registered user, keyed by username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Primary key
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// The user's team
    pub team_id: String,
    /// Whether the user administers their team
    pub is_admin: bool,
}

/// A board owned by a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRecord {
    /// Primary key
    pub id: String,
    /// Display name
    pub name: String,
    /// The owning team
    pub team_id: String,
    /// Position among the team's boards
    pub order: usize,
}

/// A column on a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRecord {
    /// Primary key
    pub id: String,
    /// The owning board
    pub board_id: String,
    /// Position on the board
    pub order: usize,
}

/// A task in a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Primary key
    pub id: String,
    /// The column holding the task
    pub column_id: String,
    /// Task title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Position in the column
    pub order: usize,
}

/// A checklist item in a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskRecord {
    /// Primary key
    pub id: String,
    /// The owning task
    pub task_id: String,
    /// Subtask title
    pub title: String,
    /// Position in the task
    pub order: usize,
    /// Whether it has been ticked off
    pub done: bool,
}

/// Changes to a [`BoardRecord`].
#[derive(Debug, Clone, Default)]
pub struct BoardPatch {
    /// New name
    pub name: Option<String>,
}

/// Changes to a [`ColumnRecord`].
#[derive(Debug, Clone, Default)]
pub struct ColumnPatch {
    /// New position
    pub order: Option<usize>,
}

/// Changes to a [`TaskRecord`].
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// Column to move the task to
    pub column_id: Option<String>,
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New position
    pub order: Option<usize>,
}

/// Changes to a [`SubtaskRecord`].
#[derive(Debug, Clone, Default)]
pub struct SubtaskPatch {
    /// New done flag
    pub done: Option<bool>,
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

impl Record for TeamRecord {
    const KIND: &'static str = "team";
    type Patch = Infallible;

    fn key(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, patch: Infallible) {
        match patch {}
    }
}

impl Record for UserRecord {
    const KIND: &'static str = "user";
    type Patch = Infallible;

    fn key(&self) -> &str {
        &self.username
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.team_id)
    }

    fn apply(&mut self, patch: Infallible) {
        match patch {}
    }
}

impl Record for BoardRecord {
    const KIND: &'static str = "board";
    type Patch = BoardPatch;

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.team_id)
    }

    fn order(&self) -> usize {
        self.order
    }

    fn apply(&mut self, patch: BoardPatch) {
        set(&mut self.name, patch.name);
    }
}

impl Record for ColumnRecord {
    const KIND: &'static str = "column";
    type Patch = ColumnPatch;

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.board_id)
    }

    fn order(&self) -> usize {
        self.order
    }

    fn apply(&mut self, patch: ColumnPatch) {
        set(&mut self.order, patch.order);
    }
}

impl Record for TaskRecord {
    const KIND: &'static str = "task";
    type Patch = TaskPatch;

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.column_id)
    }

    fn order(&self) -> usize {
        self.order
    }

    fn apply(&mut self, patch: TaskPatch) {
        set(&mut self.column_id, patch.column_id);
        set(&mut self.title, patch.title);
        set(&mut self.description, patch.description);
        set(&mut self.order, patch.order);
    }
}

impl Record for SubtaskRecord {
    const KIND: &'static str = "subtask";
    type Patch = SubtaskPatch;

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.task_id)
    }

    fn order(&self) -> usize {
        self.order
    }

    fn apply(&mut self, patch: SubtaskPatch) {
        set(&mut self.done, patch.done);
    }
}
