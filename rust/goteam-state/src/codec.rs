//! Signed, expiring token envelopes.
//!
//! Every token payload is the DAG-CBOR encoding of an envelope holding the
//! expiry and the body. Struct fields are encoded in a fixed order, so the
//! same body issued at the same instant always yields the same token.

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Signer, Timestamp, TokenError};

/// Default upper bound for a token string: what fits in a single cookie
/// alongside its name and attributes.
pub const DEFAULT_TOKEN_CEILING: usize = 4000;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    exp: Timestamp,
    body: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    exp: Timestamp,
    body: T,
}

/// Issues and decodes signed tokens carrying a `T`.
pub struct TokenCodec<T> {
    signer: Signer,
    ttl: Duration,
    ceiling: usize,
    body: PhantomData<fn() -> T>,
}

impl<T> TokenCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a codec whose tokens live for `ttl` after issuance.
    pub fn new(signer: Signer, ttl: Duration) -> Self {
        Self {
            signer,
            ttl,
            ceiling: DEFAULT_TOKEN_CEILING,
            body: PhantomData,
        }
    }

    /// Replaces the token size ceiling.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// How long issued tokens stay valid.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The largest token, in bytes, this codec will issue.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Signs `body` into a token that expires `ttl` after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::TooLarge`] rather than truncating when the token
    /// would exceed the ceiling.
    pub fn issue(&self, body: &T, now: Timestamp) -> Result<String, TokenError> {
        let envelope = EnvelopeRef {
            exp: now.saturating_add(self.ttl),
            body,
        };
        let payload = serde_ipld_dagcbor::to_vec(&envelope)
            .map_err(|error| TokenError::Encode(error.to_string()))?;

        let token = self.signer.sign(&payload);
        if token.len() > self.ceiling {
            return Err(TokenError::TooLarge {
                size: token.len(),
                ceiling: self.ceiling,
            });
        }

        Ok(token)
    }

    /// Verifies `token` and returns its body along with its expiry.
    pub fn open(&self, token: &str, now: Timestamp) -> Result<(T, Timestamp), TokenError> {
        let payload = self.signer.verify(token).ok_or(TokenError::Invalid)?;
        let envelope: Envelope<T> =
            serde_ipld_dagcbor::from_slice(&payload).map_err(|_| TokenError::Invalid)?;

        if now > envelope.exp {
            return Err(TokenError::Expired {
                expired_at: envelope.exp,
            });
        }

        Ok((envelope.body, envelope.exp))
    }

    /// Verifies `token` and returns its body.
    pub fn decode(&self, token: &str, now: Timestamp) -> Result<T, TokenError> {
        self.open(token, now).map(|(body, _)| body)
    }
}

impl<T> Clone for TokenCodec<T> {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
            ttl: self.ttl,
            ceiling: self.ceiling,
            body: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TokenCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .field("ceiling", &self.ceiling)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
        pinned: bool,
    }

    fn codec() -> TokenCodec<Note> {
        TokenCodec::new(Signer::new("codec-test-secret").unwrap(), Duration::from_secs(60))
    }

    fn note() -> Note {
        Note {
            text: "remember the milk".into(),
            pinned: true,
        }
    }

    #[test]
    fn it_decodes_what_it_issues() {
        let now = Timestamp::from_unix(1_000);
        let token = codec().issue(&note(), now).unwrap();

        let (body, expires) = codec().open(&token, now).unwrap();
        assert_eq!(body, note());
        assert_eq!(expires, Timestamp::from_unix(1_060));
    }

    #[test]
    fn it_accepts_tokens_until_the_expiry_second_passes() {
        let issued = Timestamp::from_unix(1_000);
        let token = codec().issue(&note(), issued).unwrap();

        assert!(codec().decode(&token, Timestamp::from_unix(1_060)).is_ok());
        assert_eq!(
            codec().decode(&token, Timestamp::from_unix(1_061)),
            Err(TokenError::Expired {
                expired_at: Timestamp::from_unix(1_060)
            })
        );
    }

    #[test]
    fn it_refuses_to_issue_past_the_ceiling() {
        let codec = codec().with_ceiling(16);
        let result = codec.issue(&note(), Timestamp::from_unix(0));

        assert!(matches!(
            result,
            Err(TokenError::TooLarge { ceiling: 16, size }) if size > 16
        ));
    }

    #[test]
    fn it_rejects_signed_payloads_of_the_wrong_shape() {
        let signer = Signer::new("codec-test-secret").unwrap();
        let other: TokenCodec<u64> = TokenCodec::new(signer, Duration::from_secs(60));
        let token = other.issue(&7, Timestamp::from_unix(0)).unwrap();

        assert_eq!(
            codec().decode(&token, Timestamp::from_unix(0)),
            Err(TokenError::Invalid)
        );
    }
}
