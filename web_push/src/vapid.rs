//! Voluntary Application Server Identification according to
//! [RFC8292](https://www.rfc-editor.org/rfc/rfc8292).

use crate::{error::Result, signature};
use base64ct::{Base64UrlUnpadded, Encoding};
use p256::{
    ecdsa::{signature::Signer, DerSignature, SigningKey, VerifyingKey},
    SecretKey,
};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Longest lifetime a VAPID assertion may be issued for
pub const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const JWT_HEADER: &str = r#"{"typ":"JWT","alg":"ES256"}"#;

#[derive(Serialize)]
struct Claims<'a> {
    aud: &'a str,
    exp: u64,
    sub: &'a str,
}

/// Application server key pair together with its contact subject.
#[derive(Clone)]
pub struct VapidIdentity {
    signing_key: SigningKey,
    public_key: String,
    subject: String,
}

impl VapidIdentity {
    /// Creates an identity from a P-256 secret key and a `mailto:` or
    /// `https:` contact URI.
    pub fn new<S: Into<String>>(secret: &SecretKey, subject: S) -> Self {
        let signing_key = SigningKey::from(secret);
        let public_key = Base64UrlUnpadded::encode_string(
            signing_key.verifying_key().to_encoded_point(false).as_bytes(),
        );

        Self {
            signing_key,
            public_key,
            subject: subject.into(),
        }
    }

    /// Creates an identity from a raw 32 byte private scalar.
    pub fn from_bytes<S: Into<String>>(
        private_key: &[u8],
        subject: S,
    ) -> std::result::Result<Self, p256::elliptic_curve::Error> {
        let secret = SecretKey::from_slice(private_key)?;
        Ok(Self::new(&secret, subject))
    }

    /// Generates a fresh key pair.
    pub fn generate<S: Into<String>>(subject: S) -> Self {
        let secret = SecretKey::random(&mut aes_gcm::aead::OsRng);
        Self::new(&secret, subject)
    }

    /// Base64url encoded uncompressed public key, as passed to
    /// `pushManager.subscribe` in the browser.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Signs an assertion for `audience` that is valid for [`MAX_LIFETIME`].
    pub fn sign(&self, audience: &str) -> Result<VapidAssertion> {
        self.sign_with_lifetime(audience, MAX_LIFETIME)
    }

    /// Signs an assertion for `audience`, clamping `lifetime` to between one
    /// second and [`MAX_LIFETIME`].
    pub fn sign_with_lifetime(&self, audience: &str, lifetime: Duration) -> Result<VapidAssertion> {
        let lifetime = lifetime.clamp(Duration::from_secs(1), MAX_LIFETIME);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let expires_at = (now + lifetime).as_secs();

        let claims = serde_json::to_vec(&Claims {
            aud: audience,
            exp: expires_at,
            sub: &self.subject,
        })?;

        let signing_input = format!(
            "{}.{}",
            Base64UrlUnpadded::encode_string(JWT_HEADER.as_bytes()),
            Base64UrlUnpadded::encode_string(&claims)
        );

        let der: DerSignature = self.signing_key.try_sign(signing_input.as_bytes())?;
        let (r, s) = signature::to_raw(der.as_bytes())?;
        let mut raw = [0u8; 64];
        raw[..32].copy_from_slice(&r);
        raw[32..].copy_from_slice(&s);

        Ok(VapidAssertion {
            token: format!(
                "{}.{}",
                signing_input,
                Base64UrlUnpadded::encode_string(&raw)
            ),
            public_key: self.public_key.clone(),
            expires_at,
        })
    }
}

impl std::fmt::Debug for VapidIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidIdentity")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Signed JWT bound to one push service origin.
#[derive(Clone, Debug)]
pub struct VapidAssertion {
    token: String,
    public_key: String,
    expires_at: u64,
}

impl VapidAssertion {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Expiry as seconds since the unix epoch
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

impl From<&VapidAssertion> for http::HeaderValue {
    fn from(assertion: &VapidAssertion) -> Self {
        let value = format!("vapid t={}, k={}", assertion.token, assertion.public_key);
        Self::try_from(value).expect("base64url segments are always valid header characters")
    }
}
