#![warn(missing_docs)]

//! Client-held authorization state for GoTeam task boards.
//!
//! A signed-in user carries two tokens between requests:
//!
//! - an identity token (who they are, which team they belong to and their
//!   [`Role`] within it), and
//! - a hierarchy state token (every board, column, task and subtask that
//!   their team can see).
//!
//! Both are produced by a [`TokenCodec`] on top of the HMAC [`Signer`], so the
//! server can check them without touching the database.
//!
//! # Overview
//!
//! The request flow:
//!
//! 1. The [`Signer`] verifies token integrity
//! 2. [`IdentityCodec`] and [`HierarchyCodec`] decode the payloads and check
//!    expiry
//! 3. [`authorize`] locates the requested resource in the decoded tree,
//!    checks team ownership and role, and returns its [`ResolvedPath`]
//! 4. After the change is persisted, the [`Reconciler`] applies the same
//!    [`Mutation`]s to the tree and re-issues the hierarchy token
//!
//! Nothing in this crate performs I/O or logs; every failure is returned as a
//! typed error for the caller to map onto a response.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use goteam_state::{
//!     Board, Column, HierarchyCodec, HierarchyState, IdentityCodec, Operation, Role, Signer,
//!     Target, Timestamp, authorize,
//! };
//!
//! let signer = Signer::new(b"an-example-secret-that-is-long-enough").unwrap();
//! let identities = IdentityCodec::new(signer.clone(), Duration::from_secs(3600));
//! let hierarchies = HierarchyCodec::new(signer, Duration::from_secs(3600));
//!
//! let now = Timestamp::from_unix(1_700_000_000);
//! let auth = identities.issue("bob123", "team-1", Role::Admin, now).unwrap();
//! let tree = HierarchyState::new(vec![Board::new("board-1", "Main", "team-1")
//!     .with_columns(vec![Column::new("column-1")])]);
//! let state = hierarchies.issue(&tree, now).unwrap();
//!
//! let identity = identities.decode(&auth, now).unwrap();
//! let tree = hierarchies.decode(&state, now).unwrap();
//! let path = authorize(
//!     Some(&identity),
//!     &tree,
//!     &Operation::admin(Target::column("column-1")),
//!     now,
//! )
//! .unwrap();
//!
//! assert_eq!(path.board.map(|board| board.id), Some("board-1".to_string()));
//! ```

mod access;
pub use access::*;

mod codec;
pub use codec::*;

mod error;
pub use error::*;

mod hierarchy;
pub use hierarchy::*;

mod identity;
pub use identity::*;

mod reconcile;
pub use reconcile::*;

mod signer;
pub use signer::*;

mod time;
pub use time::*;
