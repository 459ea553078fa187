use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Backend, BoardRecord, ColumnRecord, Predicate, Record, StoreError, SubtaskRecord, Table,
    TaskRecord, TeamRecord, UserRecord,
};

/// A trivial implementation of [Table] - backed by a [BTreeMap] - where all
/// records are kept in memory and never persisted.
///
/// Clones share the same records.
pub struct MemoryTable<R> {
    records: Arc<RwLock<BTreeMap<String, R>>>,
}

impl<R> Clone for MemoryTable<R> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<R> Default for MemoryTable<R> {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl<R> MemoryTable<R> {
    /// Number of records in the table.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the table holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn not_found<R: Record>(key: &str) -> StoreError {
    StoreError::NotFound {
        kind: R::KIND,
        key: key.to_owned(),
    }
}

#[async_trait]
impl<R: Record> Table<R> for MemoryTable<R> {
    async fn select(&self, key: &str) -> Result<R, StoreError> {
        let records = self.records.read().await;
        records.get(key).cloned().ok_or_else(|| not_found::<R>(key))
    }

    async fn select_where(&self, predicate: Predicate<'_, R>) -> Result<Vec<R>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|&record| predicate(record))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: R) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(record.key()) {
            return Err(StoreError::DupKey {
                kind: R::KIND,
                key: record.key().to_owned(),
            });
        }
        records.insert(record.key().to_owned(), record);
        Ok(())
    }

    async fn update(&self, key: &str, patch: R::Patch) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(key).ok_or_else(|| not_found::<R>(key))?;
        record.apply(patch);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found::<R>(key))
    }
}

/// A [Backend] whose tables all live in memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    teams: MemoryTable<TeamRecord>,
    users: MemoryTable<UserRecord>,
    boards: MemoryTable<BoardRecord>,
    columns: MemoryTable<ColumnRecord>,
    tasks: MemoryTable<TaskRecord>,
    subtasks: MemoryTable<SubtaskRecord>,
}

impl Backend for MemoryBackend {
    type Teams = MemoryTable<TeamRecord>;
    type Users = MemoryTable<UserRecord>;
    type Boards = MemoryTable<BoardRecord>;
    type Columns = MemoryTable<ColumnRecord>;
    type Tasks = MemoryTable<TaskRecord>;
    type Subtasks = MemoryTable<SubtaskRecord>;

    fn teams(&self) -> &Self::Teams {
        &self.teams
    }

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn boards(&self) -> &Self::Boards {
        &self.boards
    }

    fn columns(&self) -> &Self::Columns {
        &self.columns
    }

    fn tasks(&self) -> &Self::Tasks {
        &self.tasks
    }

    fn subtasks(&self) -> &Self::Subtasks {
        &self.subtasks
    }
}
