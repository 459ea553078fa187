use thiserror::Error;

use crate::{Level, Target, Timestamp};

/// Errors that can occur while constructing a [`crate::Signer`].
#[derive(Debug, Error)]
pub enum SignerError {
    /// The signing secret was empty.
    #[error("Signing secret cannot be empty")]
    EmptySecret,

    /// The MAC rejected the key material.
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}

/// Errors that can occur while issuing or decoding a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token failed signature verification or its payload is malformed.
    ///
    /// Callers should treat this the same as a missing token.
    #[error("Invalid token")]
    Invalid,

    /// The token was valid but its lifetime has passed.
    #[error("Token expired at {expired_at}")]
    Expired {
        /// The moment the token stopped being valid
        expired_at: Timestamp,
    },

    /// The encoded token would not fit within the transport ceiling.
    #[error("Token of {size} bytes exceeds the {ceiling} byte ceiling")]
    TooLarge {
        /// Size of the token that would have been issued
        size: usize,
        /// The configured ceiling
        ceiling: usize,
    },

    /// The payload could not be encoded.
    #[error("Failed to encode token payload: {0}")]
    Encode(String),
}

/// Errors that can occur while reconciling a hierarchy with a batch of
/// mutations.
///
/// Any of these leaves the input tree untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A mutation referenced a node or parent absent from the tree.
    #[error("Cannot reconcile: {target} not found")]
    NotFound {
        /// The missing node
        target: Target,
    },

    /// An insert or move would give a parent two children with one id.
    #[error("Cannot reconcile: {level} {id} already exists under its parent")]
    DuplicateId {
        /// Depth of the duplicated node
        level: Level,
        /// The duplicated id
        id: String,
    },

    /// A reorder was not a permutation of the parent's existing children.
    #[error("Cannot reorder {level}s: expected a permutation of {expected:?}, got {found:?}")]
    InconsistentReorder {
        /// Depth of the reordered children
        level: Level,
        /// The children's ids before the reorder
        expected: Vec<String>,
        /// The requested order
        found: Vec<String>,
    },

    /// An explicit position lies past the end of the parent's children.
    #[error("Position {position} is out of bounds for {len} siblings")]
    PositionOutOfBounds {
        /// The requested position
        position: usize,
        /// How many siblings there are
        len: usize,
    },

    /// A node was paired with a parent or change for a different depth.
    #[error("Expected a {expected} but got a {found}")]
    LevelMismatch {
        /// The depth the mutation required
        expected: Level,
        /// The depth it was given
        found: Level,
    },

    /// The reconciled tree could not be issued as a token.
    #[error(transparent)]
    Token(#[from] TokenError),
}
