use async_trait::async_trait;

use crate::{
    BoardRecord, ColumnRecord, Record, StoreError, SubtaskRecord, TaskRecord, TeamRecord,
    UserRecord,
};

/// A filter over the records of one table.
pub type Predicate<'a, R> = &'a (dyn Fn(&R) -> bool + Send + Sync);

/// A [Table] is a facade over one kind of record in some storage substrate,
/// addressed by primary key.
#[async_trait]
pub trait Table<R: Record>: Clone + Send + Sync {
    /// Fetch the record stored under `key`.
    async fn select(&self, key: &str) -> Result<R, StoreError>;

    /// Fetch every record matching `predicate`, in key order.
    async fn select_where(&self, predicate: Predicate<'_, R>) -> Result<Vec<R>, StoreError>;

    /// Store a new record, failing with [`StoreError::DupKey`] if its key is
    /// taken.
    async fn insert(&self, record: R) -> Result<(), StoreError>;

    /// Apply `patch` to the record under `key`.
    async fn update(&self, key: &str, patch: R::Patch) -> Result<(), StoreError>;

    /// Remove the record under `key`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Fetch the records owned by `parent`, in display order.
    ///
    /// Records with equal order fall back to key order.
    async fn select_children(&self, parent: &str) -> Result<Vec<R>, StoreError> {
        let mut children = self
            .select_where(&|record: &R| record.parent() == Some(parent))
            .await?;
        children.sort_by(|a, b| {
            a.order()
                .cmp(&b.order())
                .then_with(|| a.key().cmp(b.key()))
        });
        Ok(children)
    }
}

/// One table per record kind.
pub trait Backend: Clone + Send + Sync + 'static {
    /// Team table
    type Teams: Table<TeamRecord>;
    /// User table
    type Users: Table<UserRecord>;
    /// Board table
    type Boards: Table<BoardRecord>;
    /// Column table
    type Columns: Table<ColumnRecord>;
    /// Task table
    type Tasks: Table<TaskRecord>;
    /// Subtask table
    type Subtasks: Table<SubtaskRecord>;

    /// The team table.
    fn teams(&self) -> &Self::Teams;
    /// The user table.
    fn users(&self) -> &Self::Users;
    /// The board table.
    fn boards(&self) -> &Self::Boards;
    /// The column table.
    fn columns(&self) -> &Self::Columns;
    /// The task table.
    fn tasks(&self) -> &Self::Tasks;
    /// The subtask table.
    fn subtasks(&self) -> &Self::Subtasks;
}
