//! Authenticated identity tokens.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Signer, Timestamp, TokenCodec, TokenError};

/// A user's role within their team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May read and mutate every resource owned by the team.
    #[serde(rename = "admin")]
    Admin,
    /// May read every resource owned by the team.
    #[serde(rename = "member")]
    Member,
}

impl Role {
    /// Whether a holder of this role may perform an action that requires
    /// `required`.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Member => true,
            Role::Admin => self == Role::Admin,
        }
    }

    /// Shorthand for `self == Role::Admin`.
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Member => write!(f, "member"),
        }
    }
}

/// Who is making a request.
///
/// An identity is immutable once issued; logging in again replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The user's id (their username)
    pub user: String,
    /// The team the user belongs to
    pub team: String,
    /// The user's role within `team`
    pub role: Role,
    /// When the token carrying this identity stops being valid
    pub expires: Timestamp,
}

impl Identity {
    /// Whether the identity is no longer valid at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "u")]
    user: String,
    #[serde(rename = "t")]
    team: String,
    #[serde(rename = "r")]
    role: Role,
}

/// Issues and decodes identity tokens.
#[derive(Clone, Debug)]
pub struct IdentityCodec {
    tokens: TokenCodec<Claims>,
}

impl IdentityCodec {
    /// Creates a codec whose tokens live for `ttl`.
    pub fn new(signer: Signer, ttl: Duration) -> Self {
        Self {
            tokens: TokenCodec::new(signer, ttl),
        }
    }

    /// How long issued identity tokens stay valid.
    pub fn ttl(&self) -> Duration {
        self.tokens.ttl()
    }

    /// Issues a token for `user` acting as `role` within `team`.
    pub fn issue(
        &self,
        user: &str,
        team: &str,
        role: Role,
        now: Timestamp,
    ) -> Result<String, TokenError> {
        if user.is_empty() || team.is_empty() {
            return Err(TokenError::Encode(
                "an identity requires both a user and a team".into(),
            ));
        }

        self.tokens.issue(
            &Claims {
                user: user.to_owned(),
                team: team.to_owned(),
                role,
            },
            now,
        )
    }

    /// Decodes and validates an identity token.
    ///
    /// # Errors
    ///
    /// [`TokenError::Invalid`] for a bad signature, an unknown role or a
    /// missing user or team; [`TokenError::Expired`] once the TTL has passed.
    pub fn decode(&self, token: &str, now: Timestamp) -> Result<Identity, TokenError> {
        let (claims, expires) = self.tokens.open(token, now)?;

        if claims.user.is_empty() || claims.team.is_empty() {
            return Err(TokenError::Invalid);
        }

        Ok(Identity {
            user: claims.user,
            team: claims.team,
            role: claims.role,
            expires,
        })
    }
}
