use goteam_state::{Board, Column, HierarchyState, Subtask, Task};
use goteam_store::{BoardTree, ColumnTree, TaskTree};

/// Projects boards read from the store onto the hierarchy carried in
/// `state-token`. Titles and descriptions are dropped; only ids, ownership
/// and done flags travel with the client.
pub fn snapshot(boards: &[BoardTree]) -> HierarchyState {
    HierarchyState::new(boards.iter().map(snapshot_board).collect())
}

/// Projects one board.
pub fn snapshot_board(tree: &BoardTree) -> Board {
    Board::new(&tree.board.id, &tree.board.name, &tree.board.team_id)
        .with_columns(tree.columns.iter().map(column).collect())
}

fn column(tree: &ColumnTree) -> Column {
    Column::new(&tree.column.id).with_tasks(tree.tasks.iter().map(snapshot_task).collect())
}

/// Projects one task with its subtasks.
pub fn snapshot_task(tree: &TaskTree) -> Task {
    Task::new(&tree.task.id).with_subtasks(
        tree.subtasks
            .iter()
            .map(|subtask| Subtask::new(&subtask.id, subtask.done))
            .collect(),
    )
}
