use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use goteam_state::{
    HierarchyCodec, HierarchyState, IdentityCodec, Mutation, ReconcileError, Reconciler, Role,
    Signer, Timestamp, TokenError,
};
use goteam_store::{Backend, Store, UserRecord};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{auth, board, column, member, subtask, task};
use crate::{
    AUTH_COOKIE, ApiError, ConfigError, PasswordHasher, STATE_COOKIE, ServerConfig, Session,
    snapshot, token_cookie,
};

/// The most boards a single team may own.
pub const MAX_BOARDS: usize = 3;

/// Everything a handler needs, shared across requests.
///
/// The codecs are built once from the signing key and never change for the
/// life of the process.
#[derive(Clone)]
pub struct AppState<B> {
    /// Persistence
    pub store: Store<B>,
    /// Issues and decodes `auth-token`
    pub identities: IdentityCodec,
    /// Applies changes to the hierarchy and issues `state-token`
    pub reconciler: Reconciler,
    /// Password hashing
    pub passwords: PasswordHasher,
    client_origin: Option<HeaderValue>,
}

impl<B: Backend> AppState<B> {
    /// Validates `config` and builds the shared state around `backend`.
    pub fn new(config: &ServerConfig, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;

        let signer = Signer::new(config.signing_key.as_bytes())?;
        let identities = IdentityCodec::new(signer.clone(), config.auth_ttl());
        let hierarchies =
            HierarchyCodec::new(signer, config.state_ttl()).with_ceiling(config.token_ceiling);

        Ok(Self {
            store: Store::new(backend),
            identities,
            reconciler: Reconciler::new(hierarchies),
            passwords: PasswordHasher::default(),
            client_origin: config.client_origin()?,
        })
    }

    /// Reads the hierarchy of `team` from the store.
    pub async fn hierarchy(&self, team: &str) -> Result<HierarchyState, ApiError> {
        Ok(snapshot(&self.store.hierarchy(team).await?))
    }

    /// Adds a freshly issued `state-token` carrying `tree` to `jar`.
    ///
    /// A tree too large to sign leaves the client without a `state-token`;
    /// the next request rebuilds it from the store.
    pub fn issue_state(
        &self,
        jar: CookieJar,
        tree: &HierarchyState,
        now: Timestamp,
    ) -> Result<CookieJar, ApiError> {
        self.state_cookie(jar, self.reconciler.codec().issue(tree, now))
    }

    /// Issues both cookies for `user`.
    pub async fn sign_in(&self, jar: CookieJar, user: &UserRecord) -> Result<CookieJar, ApiError> {
        let now = Timestamp::now();
        let role = if user.is_admin {
            Role::Admin
        } else {
            Role::Member
        };

        let auth = self
            .identities
            .issue(&user.username, &user.team_id, role, now)?;
        let tree = self.hierarchy(&user.team_id).await?;

        let jar = jar.add(token_cookie(AUTH_COOKIE, auth, self.identities.ttl()));
        self.issue_state(jar, &tree, now)
    }

    /// Applies `mutations`, which have already been persisted, to the
    /// session's tree and re-issues `state-token`.
    pub fn reconcile(
        &self,
        jar: CookieJar,
        session: &Session,
        mutations: &[Mutation],
    ) -> Result<CookieJar, ApiError> {
        match self
            .reconciler
            .reconcile(&session.tree, mutations, session.now)
        {
            Ok(reconciled) => self.state_cookie(jar, Ok(reconciled.token)),
            Err(ReconcileError::Token(error)) => self.state_cookie(jar, Err(error)),
            Err(error) => Err(error.into()),
        }
    }

    fn state_cookie(
        &self,
        jar: CookieJar,
        issued: Result<String, TokenError>,
    ) -> Result<CookieJar, ApiError> {
        match issued {
            Ok(token) => {
                let ttl = self.reconciler.codec().ttl();
                Ok(jar.add(token_cookie(STATE_COOKIE, token, ttl)))
            }
            Err(TokenError::TooLarge { size, ceiling }) => {
                warn!(size, ceiling, "Hierarchy exceeds the token ceiling, dropping state token");
                Ok(jar.remove(Cookie::build(STATE_COOKIE).path("/")))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn cors(&self) -> Option<CorsLayer> {
        self.client_origin.clone().map(|origin| {
            info!(origin = ?origin, "Allowing cross-origin requests");
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_headers([CONTENT_TYPE])
                .allow_credentials(true)
        })
    }
}

/// Builds the API around `app`.
pub fn router<B: Backend>(app: AppState<B>) -> Router {
    let cors = app.cors();

    let router = Router::new()
        .route("/register", post(auth::register::<B>))
        .route("/login", post(auth::login::<B>))
        .route(
            "/board",
            get(board::read::<B>)
                .post(board::create::<B>)
                .patch(board::update::<B>)
                .delete(board::delete::<B>),
        )
        .route("/column", patch(column::update::<B>))
        .route(
            "/task",
            post(task::create::<B>)
                .patch(task::update::<B>)
                .delete(task::delete::<B>),
        )
        .route("/subtask", patch(subtask::update::<B>))
        .route("/member", delete(member::delete::<B>))
        .with_state(app);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
