//! Keeping the client-held hierarchy in step with the store.
//!
//! After a change is persisted the handler describes it as one or more
//! [`Mutation`]s. The [`Reconciler`] replays them on a copy of the tree the
//! client presented and re-issues the state token. A batch either applies in
//! full or not at all.

use std::mem;

use crate::{
    Board, Column, HierarchyCodec, HierarchyState, Identified, Level, ReconcileError,
    ResolvedPath, Subtask, Target, Task, Timestamp, locate,
};

/// A node to be inserted, with its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A board
    Board(Board),
    /// A column
    Column(Column),
    /// A task
    Task(Task),
    /// A subtask
    Subtask(Subtask),
}

impl Node {
    /// The depth the node belongs at.
    pub fn level(&self) -> Level {
        match self {
            Node::Board(_) => Level::Board,
            Node::Column(_) => Level::Column,
            Node::Task(_) => Level::Task,
            Node::Subtask(_) => Level::Subtask,
        }
    }

    /// The node's id.
    pub fn id(&self) -> &str {
        match self {
            Node::Board(board) => board.id(),
            Node::Column(column) => column.id(),
            Node::Task(task) => task.id(),
            Node::Subtask(subtask) => subtask.id(),
        }
    }
}

macro_rules! node_from {
    ($($variant:ident),*) => {
        $(impl From<$variant> for Node {
            fn from(node: $variant) -> Self {
                Node::$variant(node)
            }
        })*
    };
}

node_from!(Board, Column, Task, Subtask);

/// The sequence a node is inserted into or moved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// The top-level list of boards
    Root,
    /// A board's columns
    Board(String),
    /// A column's tasks
    Column(String),
    /// A task's subtasks
    Task(String),
}

impl Parent {
    /// A board's columns.
    pub fn board(id: impl Into<String>) -> Self {
        Self::Board(id.into())
    }

    /// A column's tasks.
    pub fn column(id: impl Into<String>) -> Self {
        Self::Column(id.into())
    }

    /// A task's subtasks.
    pub fn task(id: impl Into<String>) -> Self {
        Self::Task(id.into())
    }

    /// The depth of the parent's children.
    pub fn child_level(&self) -> Level {
        match self {
            Parent::Root => Level::Board,
            Parent::Board(_) => Level::Column,
            Parent::Column(_) => Level::Task,
            Parent::Task(_) => Level::Subtask,
        }
    }

    /// The parent as an addressable node, unless it is the root.
    pub fn target(&self) -> Option<Target> {
        match self {
            Parent::Root => None,
            Parent::Board(id) => Some(Target::board(id.as_str())),
            Parent::Column(id) => Some(Target::column(id.as_str())),
            Parent::Task(id) => Some(Target::task(id.as_str())),
        }
    }
}

/// A field-level change to an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Renames a board
    Rename(String),
    /// Ticks or unticks a subtask
    Done(bool),
}

impl Change {
    fn level(&self) -> Level {
        match self {
            Change::Rename(_) => Level::Board,
            Change::Done(_) => Level::Subtask,
        }
    }
}

/// One persisted change, as seen by the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Adds a node under `parent`, at `position` or at the end.
    Insert {
        /// Where the node goes
        parent: Parent,
        /// The node and its subtree
        node: Node,
        /// Index among the new siblings; `None` appends
        position: Option<usize>,
    },
    /// Removes a node and its subtree.
    Delete {
        /// The node to remove
        target: Target,
    },
    /// Changes a field of a node in place.
    Update {
        /// The node to change
        target: Target,
        /// The change to make
        change: Change,
    },
    /// Permutes a parent's children.
    Reorder {
        /// Whose children to reorder
        parent: Parent,
        /// Every existing child id, in the new order
        order: Vec<String>,
    },
    /// Detaches a node and inserts it under another parent.
    Move {
        /// The node to move
        target: Target,
        /// The new parent
        to: Parent,
        /// Index among the new siblings; `None` appends
        position: Option<usize>,
    },
}

impl Mutation {
    /// Appends `node` to `parent`'s children.
    pub fn insert(parent: Parent, node: impl Into<Node>) -> Self {
        Self::Insert {
            parent,
            node: node.into(),
            position: None,
        }
    }

    /// Inserts `node` at `position` among `parent`'s children.
    pub fn insert_at(parent: Parent, node: impl Into<Node>, position: usize) -> Self {
        Self::Insert {
            parent,
            node: node.into(),
            position: Some(position),
        }
    }

    /// Deletes `target` and its subtree.
    pub fn delete(target: Target) -> Self {
        Self::Delete { target }
    }

    /// Renames board `id`.
    pub fn rename_board(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Update {
            target: Target::board(id),
            change: Change::Rename(name.into()),
        }
    }

    /// Sets whether subtask `id` is done.
    pub fn set_done(id: impl Into<String>, done: bool) -> Self {
        Self::Update {
            target: Target::subtask(id),
            change: Change::Done(done),
        }
    }

    /// Puts `parent`'s children in `order`.
    pub fn reorder<I, S>(parent: Parent, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Reorder {
            parent,
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    /// Moves `target` under `to`, at `position` or at the end.
    pub fn move_to(target: Target, to: Parent, position: Option<usize>) -> Self {
        Self::Move {
            target,
            to,
            position,
        }
    }
}

/// A reconciled tree and the token that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The tree after every mutation was applied
    pub state: HierarchyState,
    /// The re-issued hierarchy token
    pub token: String,
}

/// Applies mutations to hierarchy state and re-issues its token.
#[derive(Debug, Clone)]
pub struct Reconciler {
    codec: HierarchyCodec,
}

impl Reconciler {
    /// Creates a reconciler that issues tokens with `codec`.
    pub fn new(codec: HierarchyCodec) -> Self {
        Self { codec }
    }

    /// The codec used to issue reconciled tokens.
    pub fn codec(&self) -> &HierarchyCodec {
        &self.codec
    }

    /// Applies `mutations` to `old` in order and issues a token for the
    /// result.
    ///
    /// # Errors
    ///
    /// Fails without a partial result when any mutation does not apply, or
    /// with [`ReconcileError::Token`] when the new tree cannot be issued
    /// (for example because it no longer fits in a token).
    pub fn reconcile(
        &self,
        old: &HierarchyState,
        mutations: &[Mutation],
        now: Timestamp,
    ) -> Result<Reconciled, ReconcileError> {
        let state = apply(old, mutations)?;
        let token = self.codec.issue(&state, now)?;

        Ok(Reconciled { state, token })
    }
}

/// Applies `mutations` to a copy of `old`.
///
/// `old` is never modified, so a failure partway through a batch leaves the
/// caller holding the tree it started with.
pub fn apply(
    old: &HierarchyState,
    mutations: &[Mutation],
) -> Result<HierarchyState, ReconcileError> {
    let mut tree = old.clone();
    for mutation in mutations {
        apply_one(&mut tree, mutation)?;
    }
    Ok(tree)
}

fn apply_one(tree: &mut HierarchyState, mutation: &Mutation) -> Result<(), ReconcileError> {
    match mutation {
        Mutation::Insert {
            parent,
            node,
            position,
        } => children(tree, parent)?.place(node.clone(), *position),

        Mutation::Delete { target } => {
            detach(tree, target)?;
            Ok(())
        }

        Mutation::Update { target, change } => {
            let expected = change.level();
            if target.level() != expected {
                return Err(ReconcileError::LevelMismatch {
                    expected,
                    found: target.level(),
                });
            }

            let (siblings, index) = occupied(tree, target)?;
            match (siblings, change) {
                (Siblings::Boards(boards), Change::Rename(name)) => {
                    boards[index].name.clone_from(name);
                }
                (Siblings::Subtasks(subtasks), Change::Done(done)) => {
                    subtasks[index].done = *done;
                }
                (siblings, _) => {
                    return Err(ReconcileError::LevelMismatch {
                        expected,
                        found: siblings.level(),
                    });
                }
            }
            Ok(())
        }

        Mutation::Reorder { parent, order } => children(tree, parent)?.reorder(order),

        Mutation::Move {
            target,
            to,
            position,
        } => {
            let expected = to.child_level();
            if target.level() != expected {
                return Err(ReconcileError::LevelMismatch {
                    expected,
                    found: target.level(),
                });
            }

            let node = detach(tree, target)?;
            children(tree, to)?.place(node, *position)
        }
    }
}

/// A mutable borrow of one sibling sequence in the tree.
enum Siblings<'a> {
    Boards(&'a mut Vec<Board>),
    Columns(&'a mut Vec<Column>),
    Tasks(&'a mut Vec<Task>),
    Subtasks(&'a mut Vec<Subtask>),
}

impl Siblings<'_> {
    fn level(&self) -> Level {
        match self {
            Siblings::Boards(_) => Level::Board,
            Siblings::Columns(_) => Level::Column,
            Siblings::Tasks(_) => Level::Task,
            Siblings::Subtasks(_) => Level::Subtask,
        }
    }

    fn place(self, node: Node, position: Option<usize>) -> Result<(), ReconcileError> {
        match (self, node) {
            (Siblings::Boards(boards), Node::Board(board)) => place(boards, board, position),
            (Siblings::Columns(columns), Node::Column(column)) => {
                place(columns, column, position)
            }
            (Siblings::Tasks(tasks), Node::Task(task)) => place(tasks, task, position),
            (Siblings::Subtasks(subtasks), Node::Subtask(subtask)) => {
                place(subtasks, subtask, position)
            }
            (siblings, node) => Err(ReconcileError::LevelMismatch {
                expected: siblings.level(),
                found: node.level(),
            }),
        }
    }

    fn remove(self, index: usize) -> Node {
        match self {
            Siblings::Boards(boards) => Node::Board(boards.remove(index)),
            Siblings::Columns(columns) => Node::Column(columns.remove(index)),
            Siblings::Tasks(tasks) => Node::Task(tasks.remove(index)),
            Siblings::Subtasks(subtasks) => Node::Subtask(subtasks.remove(index)),
        }
    }

    fn reorder(self, order: &[String]) -> Result<(), ReconcileError> {
        let level = self.level();
        match self {
            Siblings::Boards(boards) => permute(boards, order, level),
            Siblings::Columns(columns) => permute(columns, order, level),
            Siblings::Tasks(tasks) => permute(tasks, order, level),
            Siblings::Subtasks(subtasks) => permute(subtasks, order, level),
        }
    }
}

/// Descends along `path` to the sequence holding nodes of `level`.
fn siblings<'a>(
    tree: &'a mut HierarchyState,
    path: &ResolvedPath,
    level: Level,
) -> Option<Siblings<'a>> {
    match level {
        Level::Team => return None,
        Level::Board => return Some(Siblings::Boards(&mut tree.boards)),
        _ => {}
    }

    let board = tree.boards.get_mut(path.board.as_ref()?.index)?;
    if level == Level::Column {
        return Some(Siblings::Columns(&mut board.columns));
    }

    let column = board.columns.get_mut(path.column.as_ref()?.index)?;
    if level == Level::Task {
        return Some(Siblings::Tasks(&mut column.tasks));
    }

    let task = column.tasks.get_mut(path.task.as_ref()?.index)?;
    Some(Siblings::Subtasks(&mut task.subtasks))
}

/// The children of `parent`.
fn children<'a>(
    tree: &'a mut HierarchyState,
    parent: &Parent,
) -> Result<Siblings<'a>, ReconcileError> {
    let Some(target) = parent.target() else {
        return Ok(Siblings::Boards(&mut tree.boards));
    };

    let not_found = || ReconcileError::NotFound {
        target: target.clone(),
    };
    let path = locate(tree, &target).ok_or_else(not_found)?;

    siblings(tree, &path, parent.child_level()).ok_or_else(not_found)
}

/// The sequence holding `target`, and the target's index within it.
fn occupied<'a>(
    tree: &'a mut HierarchyState,
    target: &Target,
) -> Result<(Siblings<'a>, usize), ReconcileError> {
    let not_found = || ReconcileError::NotFound {
        target: target.clone(),
    };

    let path = locate(tree, target).ok_or_else(not_found)?;
    let index = path.leaf().map(|leaf| leaf.index).ok_or_else(not_found)?;
    let siblings = siblings(tree, &path, target.level()).ok_or_else(not_found)?;

    Ok((siblings, index))
}

fn detach(tree: &mut HierarchyState, target: &Target) -> Result<Node, ReconcileError> {
    let (siblings, index) = occupied(tree, target)?;
    Ok(siblings.remove(index))
}

fn place<T: Identified>(
    siblings: &mut Vec<T>,
    node: T,
    position: Option<usize>,
) -> Result<(), ReconcileError>
where
    T: Into<Node>,
{
    if siblings.iter().any(|sibling| sibling.id() == node.id()) {
        let node: Node = node.into();
        return Err(ReconcileError::DuplicateId {
            level: node.level(),
            id: node.id().to_owned(),
        });
    }

    let len = siblings.len();
    let position = position.unwrap_or(len);
    if position > len {
        return Err(ReconcileError::PositionOutOfBounds { position, len });
    }

    siblings.insert(position, node);
    Ok(())
}

fn permute<T: Identified>(
    siblings: &mut Vec<T>,
    order: &[String],
    level: Level,
) -> Result<(), ReconcileError> {
    let inconsistent = |siblings: &[T]| ReconcileError::InconsistentReorder {
        level,
        expected: siblings.iter().map(|node| node.id().to_owned()).collect(),
        found: order.to_vec(),
    };

    if order.len() != siblings.len() {
        return Err(inconsistent(siblings.as_slice()));
    }

    let mut taken = vec![false; siblings.len()];
    let mut indices = Vec::with_capacity(order.len());
    for id in order {
        let index = siblings
            .iter()
            .enumerate()
            .position(|(index, node)| !taken[index] && node.id() == id)
            .ok_or_else(|| inconsistent(siblings.as_slice()))?;
        taken[index] = true;
        indices.push(index);
    }

    let mut slots: Vec<Option<T>> = mem::take(siblings).into_iter().map(Some).collect();
    siblings.extend(indices.into_iter().filter_map(|index| slots[index].take()));

    Ok(())
}
