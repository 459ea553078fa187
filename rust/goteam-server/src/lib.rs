#![warn(missing_docs)]

//! The GoTeam JSON HTTP API.
//!
//! Every authenticated request carries two cookies: `auth-token`, the signed
//! identity, and `state-token`, the signed board hierarchy the identity may
//! see. The [`Session`] extractor decodes both; handlers then
//!
//! 1. authorize their [`goteam_state::Operation`] against the decoded tree,
//! 2. persist the change through the [`goteam_store::Store`], and
//! 3. reconcile the tree with the same change and re-issue `state-token`.
//!
//! Use [`router`] to build the service around an [`AppState`].

mod app;
pub use app::*;

mod config;
pub use config::*;

mod cookies;
pub use cookies::*;

mod error;
pub use error::*;

mod password;
pub use password::*;

pub mod routes;

mod session;
pub use session::*;

mod snapshot;
pub use snapshot::*;

pub mod validate;
