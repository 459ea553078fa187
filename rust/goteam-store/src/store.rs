use ulid::Ulid;

use crate::{
    Backend, BoardPatch, BoardRecord, ColumnPatch, ColumnRecord, Record, StoreError,
    SubtaskPatch, SubtaskRecord, Table, TaskPatch, TaskRecord, TeamRecord, UserRecord,
};

/// How many ids [`insert_fresh`] tries before giving up on collisions.
pub const ID_ATTEMPTS: usize = 3;

/// How many columns a new board starts with.
pub const DEFAULT_COLUMNS: usize = 4;

/// Generates a new record id.
pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Inserts the record `build` makes from a freshly generated id.
///
/// A [`StoreError::DupKey`] is retried with a new id, up to [`ID_ATTEMPTS`]
/// attempts in total.
pub async fn insert_fresh<R, T, F>(table: &T, build: F) -> Result<R, StoreError>
where
    R: Record,
    T: Table<R>,
    F: Fn(String) -> R + Send + Sync,
{
    insert_fresh_with(table, new_id, build).await
}

/// Like [`insert_fresh`], drawing ids from `ids`.
pub async fn insert_fresh_with<R, T, I, F>(
    table: &T,
    mut ids: I,
    build: F,
) -> Result<R, StoreError>
where
    R: Record,
    T: Table<R>,
    I: FnMut() -> String + Send,
    F: Fn(String) -> R + Send + Sync,
{
    let mut attempt = 1;
    loop {
        let record = build(ids());
        match table.insert(record.clone()).await {
            Ok(()) => return Ok(record),
            Err(StoreError::DupKey { .. }) if attempt < ID_ATTEMPTS => attempt += 1,
            Err(error) => return Err(error),
        }
    }
}

/// A board with its columns, tasks and subtasks, each level in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardTree {
    /// The board
    pub board: BoardRecord,
    /// Its columns
    pub columns: Vec<ColumnTree>,
}

/// A column with its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTree {
    /// The column
    pub column: ColumnRecord,
    /// Its tasks
    pub tasks: Vec<TaskTree>,
}

/// A task with its subtasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTree {
    /// The task
    pub task: TaskRecord,
    /// Its subtasks
    pub subtasks: Vec<SubtaskRecord>,
}

/// Multi-table operations over a [`Backend`].
///
/// Each call issues several independent table operations; there is no
/// transaction spanning them.
#[derive(Clone)]
pub struct Store<B> {
    backend: B,
}

impl<B: Backend> Store<B> {
    /// Wraps `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Direct access to the tables.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates a team with a fresh invite code.
    pub async fn create_team(&self) -> Result<TeamRecord, StoreError> {
        let invite_code = new_id();
        insert_fresh(self.backend.teams(), |id| TeamRecord {
            id,
            invite_code: invite_code.clone(),
        })
        .await
    }

    /// Finds the team whose invite code is `code`.
    pub async fn team_by_invite(&self, code: &str) -> Result<TeamRecord, StoreError> {
        self.backend
            .teams()
            .select_where(&|team: &TeamRecord| team.invite_code == code)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                kind: TeamRecord::KIND,
                key: code.to_owned(),
            })
    }

    /// Fetches a user by username.
    pub async fn user(&self, username: &str) -> Result<UserRecord, StoreError> {
        self.backend.users().select(username).await
    }

    /// Registers a user. Fails with [`StoreError::DupKey`] if the username
    /// is taken.
    pub async fn create_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.backend.users().insert(user).await
    }

    /// Every user of `team_id`, ordered by username.
    pub async fn members(&self, team_id: &str) -> Result<Vec<UserRecord>, StoreError> {
        self.backend.users().select_children(team_id).await
    }

    /// Removes a user. Their tokens stop resolving once they expire.
    pub async fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        self.backend.users().delete(username).await
    }

    /// Creates a board for `team_id` with [`DEFAULT_COLUMNS`] empty columns,
    /// after the team's existing boards.
    pub async fn create_board(&self, team_id: &str, name: &str) -> Result<BoardTree, StoreError> {
        let order = self
            .backend
            .boards()
            .select_children(team_id)
            .await?
            .last()
            .map_or(0, |board| board.order + 1);

        let board = insert_fresh(self.backend.boards(), |id| BoardRecord {
            id,
            name: name.to_owned(),
            team_id: team_id.to_owned(),
            order,
        })
        .await?;

        let mut columns = Vec::with_capacity(DEFAULT_COLUMNS);
        for order in 0..DEFAULT_COLUMNS {
            let column = insert_fresh(self.backend.columns(), |id| ColumnRecord {
                id,
                board_id: board.id.clone(),
                order,
            })
            .await?;
            columns.push(ColumnTree {
                column,
                tasks: Vec::new(),
            });
        }

        Ok(BoardTree { board, columns })
    }

    /// Renames a board.
    pub async fn rename_board(&self, id: &str, name: &str) -> Result<(), StoreError> {
        self.backend
            .boards()
            .update(
                id,
                BoardPatch {
                    name: Some(name.to_owned()),
                },
            )
            .await
    }

    /// Gives each column in `order` its index as display position.
    pub async fn reorder_columns(&self, order: &[String]) -> Result<(), StoreError> {
        for (position, id) in order.iter().enumerate() {
            self.backend
                .columns()
                .update(
                    id,
                    ColumnPatch {
                        order: Some(position),
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Deletes a board with all of its columns, tasks and subtasks.
    pub async fn delete_board(&self, id: &str) -> Result<(), StoreError> {
        self.backend.boards().select(id).await?;

        for column in self.backend.columns().select_children(id).await? {
            for task in self.backend.tasks().select_children(&column.id).await? {
                self.delete_task(&task.id).await?;
            }
            self.backend.columns().delete(&column.id).await?;
        }

        self.backend.boards().delete(id).await
    }

    /// Adds a task, with one subtask per title, to the end of a column.
    pub async fn create_task(
        &self,
        column_id: &str,
        title: &str,
        description: &str,
        subtasks: &[String],
    ) -> Result<TaskTree, StoreError> {
        self.backend.columns().select(column_id).await?;

        let order = self
            .backend
            .tasks()
            .select_children(column_id)
            .await?
            .last()
            .map_or(0, |task| task.order + 1);

        let task = insert_fresh(self.backend.tasks(), |id| TaskRecord {
            id,
            column_id: column_id.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
            order,
        })
        .await?;

        let subtasks = self.insert_subtasks(&task.id, subtasks).await?;
        Ok(TaskTree { task, subtasks })
    }

    /// Replaces a task's title, description and subtasks.
    pub async fn replace_task(
        &self,
        id: &str,
        title: &str,
        description: &str,
        subtasks: &[String],
    ) -> Result<TaskTree, StoreError> {
        self.backend
            .tasks()
            .update(
                id,
                TaskPatch {
                    title: Some(title.to_owned()),
                    description: Some(description.to_owned()),
                    ..TaskPatch::default()
                },
            )
            .await?;

        for subtask in self.backend.subtasks().select_children(id).await? {
            self.backend.subtasks().delete(&subtask.id).await?;
        }

        let task = self.backend.tasks().select(id).await?;
        let subtasks = self.insert_subtasks(id, subtasks).await?;
        Ok(TaskTree { task, subtasks })
    }

    /// Deletes a task and its subtasks.
    pub async fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        self.backend.tasks().select(id).await?;

        for subtask in self.backend.subtasks().select_children(id).await? {
            self.backend.subtasks().delete(&subtask.id).await?;
        }

        self.backend.tasks().delete(id).await
    }

    /// Places every task in `order` into `column_id`, at its index.
    pub async fn set_column_tasks(
        &self,
        column_id: &str,
        order: &[String],
    ) -> Result<(), StoreError> {
        for (position, id) in order.iter().enumerate() {
            self.backend
                .tasks()
                .update(
                    id,
                    TaskPatch {
                        column_id: Some(column_id.to_owned()),
                        order: Some(position),
                        ..TaskPatch::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Ticks or unticks a subtask.
    pub async fn set_subtask_done(&self, id: &str, done: bool) -> Result<(), StoreError> {
        self.backend
            .subtasks()
            .update(id, SubtaskPatch { done: Some(done) })
            .await
    }

    /// Reads every board owned by `team_id` and everything under them.
    ///
    /// Boards come back in the order they were created, as do the boards a
    /// reconciled `Mutation::insert` appends.
    pub async fn hierarchy(&self, team_id: &str) -> Result<Vec<BoardTree>, StoreError> {
        let mut trees = Vec::new();
        for board in self.backend.boards().select_children(team_id).await? {
            trees.push(self.populate(board).await?);
        }
        Ok(trees)
    }

    async fn populate(&self, board: BoardRecord) -> Result<BoardTree, StoreError> {
        let mut columns = Vec::new();
        for column in self.backend.columns().select_children(&board.id).await? {
            let mut tasks = Vec::new();
            for task in self.backend.tasks().select_children(&column.id).await? {
                let subtasks = self.backend.subtasks().select_children(&task.id).await?;
                tasks.push(TaskTree { task, subtasks });
            }
            columns.push(ColumnTree { column, tasks });
        }
        Ok(BoardTree { board, columns })
    }

    async fn insert_subtasks(
        &self,
        task_id: &str,
        titles: &[String],
    ) -> Result<Vec<SubtaskRecord>, StoreError> {
        let mut subtasks = Vec::with_capacity(titles.len());
        for (order, title) in titles.iter().enumerate() {
            let subtask = insert_fresh(self.backend.subtasks(), |id| SubtaskRecord {
                id,
                task_id: task_id.to_owned(),
                title: title.clone(),
                order,
                done: false,
            })
            .await?;
            subtasks.push(subtask);
        }
        Ok(subtasks)
    }
}
