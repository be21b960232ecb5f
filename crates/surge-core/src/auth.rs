//! Subscription auth for protected channels.
//!
//! Private and presence subscriptions carry an auth token
//! `"<key>:<signature>"` where the signature is the hex HMAC-SHA256 of
//! `"{socket_id}:{channel}"` (with `":{channel_data}"` appended when member
//! data is supplied) under the application secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a subscription auth token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No auth token was supplied for a protected channel.
    #[error("Authentication required")]
    Missing,

    /// Token was not of the form `key:signature`.
    #[error("Malformed auth token")]
    Malformed,

    /// Token named a different application key.
    #[error("Unknown application key")]
    KeyMismatch,

    /// Signature did not verify against the application secret.
    #[error("Invalid auth signature")]
    BadSignature,
}

/// Verifies subscription auth tokens for one application identity.
#[derive(Debug, Clone)]
pub struct AuthVerifier {
    key: String,
    secret: String,
}

impl AuthVerifier {
    /// Create a verifier for an application key/secret pair.
    #[must_use]
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// The application key this verifier accepts.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn mac(&self, socket_id: &str, channel: &str, channel_data: Option<&str>) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(socket_id.as_bytes());
        mac.update(b":");
        mac.update(channel.as_bytes());
        if let Some(data) = channel_data {
            mac.update(b":");
            mac.update(data.as_bytes());
        }
        mac
    }

    /// Produce the full `key:signature` token for a subscription.
    #[must_use]
    pub fn sign(&self, socket_id: &str, channel: &str, channel_data: Option<&str>) -> String {
        let digest = self.mac(socket_id, channel, channel_data).finalize();
        format!("{}:{}", self.key, hex::encode(digest.into_bytes()))
    }

    /// Verify a subscription auth token.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason when the token is missing, malformed,
    /// names the wrong key, or carries a signature that does not verify.
    pub fn verify(
        &self,
        socket_id: &str,
        channel: &str,
        auth: Option<&str>,
        channel_data: Option<&str>,
    ) -> Result<(), AuthError> {
        let token = auth.filter(|t| !t.is_empty()).ok_or(AuthError::Missing)?;
        let (key, signature) = token.split_once(':').ok_or(AuthError::Malformed)?;
        if key != self.key {
            return Err(AuthError::KeyMismatch);
        }
        let signature = hex::decode(signature).map_err(|_| AuthError::BadSignature)?;
        self.mac(socket_id, channel, channel_data)
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> AuthVerifier {
        AuthVerifier::new("app-key", "app-secret")
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let verifier = verifier();
        let token = verifier.sign("1234.5678", "private-chat", None);

        assert!(token.starts_with("app-key:"));
        assert!(verifier
            .verify("1234.5678", "private-chat", Some(&token), None)
            .is_ok());
    }

    #[test]
    fn test_channel_data_is_part_of_the_message() {
        let verifier = verifier();
        let data = r#"{"user_id":"u1"}"#;
        let token = verifier.sign("1234.5678", "presence-room", Some(data));

        assert!(verifier
            .verify("1234.5678", "presence-room", Some(&token), Some(data))
            .is_ok());
        // Same token without the member data must not verify
        assert_eq!(
            verifier.verify("1234.5678", "presence-room", Some(&token), None),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_missing_and_malformed_tokens() {
        let verifier = verifier();

        assert_eq!(
            verifier.verify("1.2", "private-chat", None, None),
            Err(AuthError::Missing)
        );
        assert_eq!(
            verifier.verify("1.2", "private-chat", Some(""), None),
            Err(AuthError::Missing)
        );
        assert_eq!(
            verifier.verify("1.2", "private-chat", Some("no-separator"), None),
            Err(AuthError::Malformed)
        );
    }

    #[test]
    fn test_wrong_key_rejected() {
        let verifier = verifier();
        let token = AuthVerifier::new("other-key", "app-secret").sign("1.2", "private-chat", None);

        assert_eq!(
            verifier.verify("1.2", "private-chat", Some(&token), None),
            Err(AuthError::KeyMismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = verifier();
        let token = AuthVerifier::new("app-key", "wrong-secret").sign("1.2", "private-chat", None);

        assert_eq!(
            verifier.verify("1.2", "private-chat", Some(&token), None),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_signature_bound_to_socket_and_channel() {
        let verifier = verifier();
        let token = verifier.sign("1.2", "private-chat", None);

        assert!(verifier
            .verify("9.9", "private-chat", Some(&token), None)
            .is_err());
        assert!(verifier
            .verify("1.2", "private-other", Some(&token), None)
            .is_err());
    }
}
