//! The board → column → task → subtask tree a user is allowed to see.
//!
//! This is a denormalized snapshot of the store, not the source of truth. It
//! only carries what authorization and display ordering need; titles and
//! descriptions stay in the store. Field names are shortened on the wire to
//! keep the token inside a single cookie.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TokenCodec;

/// Issues and decodes hierarchy state tokens.
pub type HierarchyCodec = TokenCodec<HierarchyState>;

/// A depth in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Above the boards: the team that owns them
    Team,
    /// Depth 0
    Board,
    /// Depth 1
    Column,
    /// Depth 2
    Task,
    /// Depth 3
    Subtask,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Team => "team",
            Level::Board => "board",
            Level::Column => "column",
            Level::Task => "task",
            Level::Subtask => "subtask",
        };
        f.write_str(name)
    }
}

/// Anything in the tree that has an id unique among its siblings.
pub trait Identified {
    /// The node's id.
    fn id(&self) -> &str;
}

/// Every board visible to one user, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyState {
    /// The boards
    #[serde(rename = "b")]
    pub boards: Vec<Board>,
}

impl HierarchyState {
    /// Creates a state from its boards.
    pub fn new(boards: Vec<Board>) -> Self {
        Self { boards }
    }

    /// Finds a board by id.
    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|board| board.id == id)
    }
}

/// A board and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// The board's id
    #[serde(rename = "i")]
    pub id: String,
    /// The board's display name
    #[serde(rename = "n")]
    pub name: String,
    /// The team that owns the board
    #[serde(rename = "t")]
    pub team: String,
    /// The columns in display order
    #[serde(rename = "c")]
    pub columns: Vec<Column>,
}

impl Board {
    /// Creates a board without columns.
    pub fn new(id: impl Into<String>, name: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: team.into(),
            columns: Vec::new(),
        }
    }

    /// Replaces the board's columns.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }
}

/// A column and its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// The column's id
    #[serde(rename = "i")]
    pub id: String,
    /// The tasks in display order
    #[serde(rename = "k")]
    pub tasks: Vec<Task>,
}

impl Column {
    /// Creates an empty column.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: Vec::new(),
        }
    }

    /// Replaces the column's tasks.
    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }
}

/// A task and its subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// The task's id
    #[serde(rename = "i")]
    pub id: String,
    /// The subtasks in display order
    #[serde(rename = "s")]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Creates a task without subtasks.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subtasks: Vec::new(),
        }
    }

    /// Replaces the task's subtasks.
    #[must_use]
    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self
    }
}

/// A checklist item within a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    /// The subtask's id
    #[serde(rename = "i")]
    pub id: String,
    /// Whether the subtask has been ticked off
    #[serde(rename = "d")]
    pub done: bool,
}

impl Subtask {
    /// Creates a subtask.
    pub fn new(id: impl Into<String>, done: bool) -> Self {
        Self {
            id: id.into(),
            done,
        }
    }
}

macro_rules! identified {
    ($($node:ty),*) => {
        $(impl Identified for $node {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

identified!(Board, Column, Task, Subtask);
