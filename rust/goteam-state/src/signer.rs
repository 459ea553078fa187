//! HMAC-SHA256 token signing.
//!
//! A token is `base64url(payload) "." base64url(mac)` without padding. The
//! secret is fixed when the [`Signer`] is constructed and never changes for
//! its lifetime; replacing it invalidates every outstanding token.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::SignerError;

type HmacSha256 = Hmac<Sha256>;

/// Separates the encoded payload from the encoded signature.
const SEPARATOR: char = '.';

/// Signs opaque payloads into compact token strings and verifies them.
///
/// Cloning is cheap; clones share the same keyed MAC state.
#[derive(Clone)]
pub struct Signer {
    mac: Arc<HmacSha256>,
}

impl Signer {
    /// Creates a signer keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::EmptySecret`] when `secret` is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SignerError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }

        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|error| SignerError::InvalidKey(error.to_string()))?;

        Ok(Self { mac: Arc::new(mac) })
    }

    /// Signs `payload` and returns the token string.
    pub fn sign(&self, payload: &[u8]) -> String {
        let tag = self.tag(payload);

        let mut token = URL_SAFE_NO_PAD.encode(payload);
        token.push(SEPARATOR);
        URL_SAFE_NO_PAD.encode_string(tag, &mut token);
        token
    }

    /// Verifies `token` and returns its payload.
    ///
    /// Fails closed: a malformed token, a non-canonical encoding or a
    /// signature mismatch all yield `None`, never a partial payload.
    pub fn verify(&self, token: &str) -> Option<Vec<u8>> {
        let (payload, tag) = token.split_once(SEPARATOR)?;

        let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;

        if bool::from(self.tag(&payload).ct_eq(&tag)) {
            Some(payload)
        } else {
            None
        }
    }

    fn tag(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::clone(&self.mac);
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}
