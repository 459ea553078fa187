use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use clap::Parser;
use goteam_state::{DEFAULT_TOKEN_CEILING, SignerError};
use thiserror::Error;

/// The shortest signing key the server accepts, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Server settings, read from flags or `GOTEAM_*` environment variables.
#[derive(Clone, Parser)]
#[command(name = "goteam")]
#[command(bin_name = "goteam")]
#[command(about = "GoTeam task board API server", long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "GOTEAM_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Secret used to sign every token. Changing it signs everyone out.
    #[arg(long, env = "GOTEAM_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: String,

    /// Lifetime of identity tokens, in seconds
    #[arg(long, env = "GOTEAM_AUTH_TTL_SECS", default_value_t = 3600)]
    pub auth_ttl_secs: u64,

    /// Lifetime of hierarchy state tokens, in seconds
    #[arg(long, env = "GOTEAM_STATE_TTL_SECS", default_value_t = 3600)]
    pub state_ttl_secs: u64,

    /// Largest token the server will issue, in bytes
    #[arg(long, env = "GOTEAM_TOKEN_CEILING", default_value_t = DEFAULT_TOKEN_CEILING)]
    pub token_ceiling: usize,

    /// Browser origin allowed to call the API with credentials
    #[arg(long, env = "GOTEAM_CLIENT_ORIGIN")]
    pub client_origin: Option<String>,
}

/// Problems with a [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The signing key is too short to be trusted.
    #[error("Signing key is {0} bytes long, at least 32 are required")]
    ShortSigningKey(usize),

    /// A token lifetime was zero.
    #[error("{0} must be greater than zero")]
    ZeroTtl(&'static str),

    /// The client origin is not a valid header value.
    #[error("Invalid client origin: {0}")]
    InvalidOrigin(String),

    /// The signer rejected the key.
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl ServerConfig {
    /// A configuration with default settings and the given key.
    pub fn with_signing_key(signing_key: impl Into<String>) -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            signing_key: signing_key.into(),
            auth_ttl_secs: 3600,
            state_ttl_secs: 3600,
            token_ceiling: DEFAULT_TOKEN_CEILING,
            client_origin: None,
        }
    }

    /// Checks the settings that clap cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::ShortSigningKey(self.signing_key.len()));
        }
        if self.auth_ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl("auth_ttl_secs"));
        }
        if self.state_ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl("state_ttl_secs"));
        }
        self.client_origin()?;
        Ok(())
    }

    /// Lifetime of identity tokens.
    pub fn auth_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_ttl_secs)
    }

    /// Lifetime of hierarchy state tokens.
    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    /// The CORS origin as a header value.
    pub fn client_origin(&self) -> Result<Option<HeaderValue>, ConfigError> {
        self.client_origin
            .as_deref()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidOrigin(origin.to_owned()))
            })
            .transpose()
    }
}
