use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use goteam_state::{
    HierarchyState, Identity, Operation, ResolvedPath, Timestamp, TokenError, authorize,
};
use goteam_store::Backend;
use tracing::debug;

use crate::{AUTH_COOKIE, ApiError, AppState, STATE_COOKIE};

/// The decoded tokens of an authenticated request.
///
/// Extracting a session checks `auth-token` and loads the hierarchy from
/// `state-token`. A missing or expired `state-token` is rebuilt from the
/// store, since the store stays the source of truth; a tampered one is
/// rejected.
#[derive(Debug, Clone)]
pub struct Session {
    /// Who is making the request
    pub identity: Identity,
    /// What they can see
    pub tree: HierarchyState,
    /// The instant the tokens were checked at
    pub now: Timestamp,
}

impl Session {
    /// Authorizes `operation` against this session's tree. A role too weak
    /// for it is reported as being unable to `action`.
    pub fn authorize(&self, operation: Operation, action: &str) -> Result<ResolvedPath, ApiError> {
        authorize(Some(&self.identity), &self.tree, &operation, self.now)
            .map_err(|error| ApiError::denied(error, action))
    }

    /// Whether the identity administers its team.
    pub fn is_admin(&self) -> bool {
        self.identity.role.is_admin()
    }
}

impl<B: Backend> FromRequestParts<AppState<B>> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        app: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let now = Timestamp::now();

        let auth = jar
            .get(AUTH_COOKIE)
            .ok_or_else(|| ApiError::Unauthorized("Auth token not found.".into()))?;
        let identity = app.identities.decode(auth.value(), now).map_err(|error| {
            debug!(%error, "Rejected auth token");
            ApiError::Unauthorized("Invalid auth token.".into())
        })?;

        let decoded = jar
            .get(STATE_COOKIE)
            .map(|state| app.reconciler.codec().decode(state.value(), now));
        let tree = match decoded {
            Some(Ok(tree)) => tree,
            None | Some(Err(TokenError::Expired { .. })) => {
                debug!(team = %identity.team, "Rebuilding state token from the store");
                app.hierarchy(&identity.team).await?
            }
            Some(Err(error)) => {
                debug!(%error, "Rejected state token");
                return Err(ApiError::bad_request("Invalid state token."));
            }
        };

        Ok(Self {
            identity,
            tree,
            now,
        })
    }
}
