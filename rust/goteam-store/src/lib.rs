#![warn(missing_docs)]

//! Persistence for GoTeam: the canonical records behind every board.
//!
//! The store is the source of truth. Handlers read it to build the hierarchy
//! a user is allowed to see, and write it before reconciling that hierarchy.
//!
//! Every table implements [`Table`], a small select / insert / update /
//! delete contract. A [`Backend`] groups one table per record kind, and
//! [`Store`] layers the multi-table operations on top: id generation,
//! cascading deletes and the recursive board read.
//!
//! [`MemoryBackend`] keeps everything in process memory and is what the
//! server runs against by default.

mod error;
pub use error::*;

mod record;
pub use record::*;

mod table;
pub use table::*;

mod memory;
pub use memory::*;

mod store;
pub use store::*;
