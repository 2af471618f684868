//! This crate delivers end-to-end encrypted web push messages according to
//! [RFC8030](https://www.rfc-editor.org/rfc/rfc8030),
//! [RFC8291](https://www.rfc-editor.org/rfc/rfc8291) and
//! [RFC8292](https://www.rfc-editor.org/rfc/rfc8292).
//!
//! The lower layers are plain functions: [`encrypt`] turns a payload into an
//! [`EncryptedRecord`] for one subscriber, [`VapidIdentity`] signs the
//! per-origin assertion, and [`WebPushBuilder`] puts both into an HTTP
//! request. [`Dispatcher`] fans a notification out to every subscription of
//! a user and prunes the ones the push service reports as gone.
//!
//! # Example
//!
//! Building a single push request by hand:
//!
//! ```
//! use aes_gcm::aead::OsRng;
//! use push_engine::{
//!     audience,
//!     p256::{elliptic_curve::sec1::ToEncodedPoint, SecretKey},
//!     VapidIdentity, WebPushBuilder,
//! };
//!
//! # fn main() -> Result<(), push_engine::Error> {
//! // Placeholders for what the browser hands out from `pushManager.subscribe`.
//! let endpoint: http::Uri = "https://push.example.net/send/abc".parse().unwrap();
//! let ua_secret = SecretKey::random(&mut OsRng);
//! let p256dh = ua_secret.public_key().to_encoded_point(false);
//! let auth = [7u8; 16];
//!
//! // Load the key pair from configuration in real deployments.
//! let identity = VapidIdentity::generate("mailto:ops@example.com");
//! let assertion = identity.sign(&audience(&endpoint)?)?;
//!
//! let request = WebPushBuilder::new(&endpoint, p256dh.as_bytes(), &auth)
//!     .with_vapid(&assertion)
//!     .build(br#"{"title":"Time for your dose"}"#)?;
//! assert_eq!(request.headers()["content-encoding"], "aes128gcm");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
mod error;
pub mod guard;
mod payload;
pub mod registry;
mod serde_;
pub mod signature;
mod subscription;
pub mod transport;
pub mod vapid;

pub use dispatch::{DispatchOutcome, DispatchSummary, Dispatcher};
pub use error::{BoxError, Error, Result};
pub use p256;
pub use payload::{NotificationPayload, MAX_PAYLOAD_LEN};
pub use push_ece::hkdf;
pub use subscription::{PushSubscription, SubscriptionInfo, SubscriptionKeys, UserId};
pub use vapid::{VapidAssertion, VapidIdentity};

use aes_gcm::aead::{
    generic_array::{typenum::U16, GenericArray},
    rand_core::RngCore,
    OsRng,
};
use http::{header, HeaderValue, Request, Uri};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use std::time::Duration;

/// HTTP push authentication secret
pub type Auth = GenericArray<u8, U16>;

/// Length of an uncompressed SEC1 encoded P-256 point
pub const PUBLIC_KEY_LEN: usize = 65;

/// TTL used when none is set on the builder
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Wire form of one encrypted push message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub salt: [u8; 16],
    pub record_size: u32,
    pub ephemeral_public: [u8; PUBLIC_KEY_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    /// `salt || rs || 65 || ephemeral_public || ciphertext`
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = push_ece::Header {
            salt: self.salt,
            record_size: self.record_size,
            keyid: &self.ephemeral_public,
        };

        let mut body = header
            .to_bytes()
            .expect("an uncompressed point always fits the key id length");
        body.extend_from_slice(&self.ciphertext);
        body
    }

    pub fn parse(body: &[u8]) -> Result<Self> {
        let (header, ciphertext) = push_ece::Header::parse(body)?;
        let ephemeral_public = header
            .keyid
            .try_into()
            .map_err(|_| push_ece::Error::KeyIdLengthInvalid)?;

        Ok(Self {
            salt: header.salt,
            record_size: header.record_size,
            ephemeral_public,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Parses a user agent public key, which must be an uncompressed point.
pub(crate) fn parse_client_key(bytes: &[u8]) -> Result<p256::PublicKey> {
    if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != 0x04 {
        return Err(Error::InvalidClientKey);
    }
    p256::PublicKey::from_sec1_bytes(bytes).map_err(|_| Error::InvalidClientKey)
}

pub(crate) fn parse_auth(bytes: &[u8]) -> Result<Auth> {
    if bytes.len() != 16 {
        return Err(Error::InvalidAuthSecret);
    }
    Ok(Auth::clone_from_slice(bytes))
}

fn encode_point(public: &p256::PublicKey) -> [u8; PUBLIC_KEY_LEN] {
    let mut encoded = [0u8; PUBLIC_KEY_LEN];
    encoded.copy_from_slice(public.to_encoded_point(false).as_bytes());
    encoded
}

/// Encrypts `message` for one user agent with a fresh ephemeral key and salt.
pub fn encrypt(message: &[u8], ua_public: &[u8], ua_auth: &[u8]) -> Result<EncryptedRecord> {
    let ua_public = parse_client_key(ua_public)?;
    let ua_auth = parse_auth(ua_auth)?;

    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let as_secret = p256::SecretKey::random(&mut OsRng);

    encrypt_predictably(salt, message, &as_secret, &ua_public, &ua_auth)
}

fn encrypt_predictably(
    salt: [u8; 16],
    message: &[u8],
    as_secret: &p256::SecretKey,
    ua_public: &p256::PublicKey,
    ua_auth: &Auth,
) -> Result<EncryptedRecord> {
    let as_public = as_secret.public_key();
    let shared = p256::ecdh::diffie_hellman(as_secret.to_nonzero_scalar(), ua_public.as_affine());

    let ikm = compute_ikm(ua_auth, &shared, ua_public, &as_public);
    let ciphertext = push_ece::seal(&ikm, salt, message.to_vec())?;

    Ok(EncryptedRecord {
        salt,
        record_size: push_ece::RECORD_SIZE,
        ephemeral_public: encode_point(&as_public),
        ciphertext,
    })
}

/// Receiver side decryption, as performed by the user agent
pub fn decrypt(
    encrypted_message: &[u8],
    ua_secret: &p256::SecretKey,
    ua_auth: &[u8],
) -> Result<Vec<u8>> {
    let ua_auth = parse_auth(ua_auth)?;
    let record = EncryptedRecord::parse(encrypted_message)?;

    let as_public = parse_client_key(&record.ephemeral_public)?;
    let shared = p256::ecdh::diffie_hellman(ua_secret.to_nonzero_scalar(), as_public.as_affine());

    let ikm = compute_ikm(&ua_auth, &shared, &ua_secret.public_key(), &as_public);

    Ok(push_ece::decrypt(&ikm, encrypted_message)?)
}

fn compute_ikm(
    auth: &Auth,
    shared: &p256::ecdh::SharedSecret,
    ua_public: &p256::PublicKey,
    as_public: &p256::PublicKey,
) -> [u8; 32] {
    let mut info = Vec::with_capacity(14 + 2 * PUBLIC_KEY_LEN);
    info.extend_from_slice(b"WebPush: info\0");
    info.extend_from_slice(&encode_point(ua_public));
    info.extend_from_slice(&encode_point(as_public));

    let prk = hkdf::extract(auth.as_slice(), shared.raw_secret_bytes().as_slice());
    hkdf::expand(&prk, &info)
}

/// The `aud` claim for an endpoint: its origin, with the port only when it
/// differs from the scheme's default.
pub fn audience(endpoint: &Uri) -> Result<String> {
    let scheme = endpoint
        .scheme_str()
        .ok_or(Error::InvalidEndpoint("missing scheme in endpoint"))?;
    let host = endpoint
        .host()
        .ok_or(Error::InvalidEndpoint("missing host in endpoint"))?;

    let default_port = match scheme {
        "https" => Some(443),
        "http" => Some(80),
        _ => None,
    };

    Ok(match endpoint.port_u16() {
        Some(port) if Some(port) != default_port => format!("{}://{}:{}", scheme, host, port),
        _ => format!("{}://{}", scheme, host),
    })
}

/// Delivery urgency according to RFC8030 section 5.3
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Urgency {
    VeryLow,
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::VeryLow => "very-low",
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
        }
    }
}

/// Builder for HTTP push requests to one user agent
#[derive(Clone, Debug)]
pub struct WebPushBuilder<'a> {
    endpoint: &'a Uri,
    ua_public: &'a [u8],
    ua_auth: &'a [u8],
    ttl: Duration,
    urgency: Urgency,
    vapid: Option<&'a VapidAssertion>,
}

impl<'a> WebPushBuilder<'a> {
    /// Creates a new [`WebPushBuilder`] for HTTP push requests.
    ///
    /// Requests have a TTL of [`DEFAULT_TTL`], normal urgency and no VAPID
    /// signature. Most push services require one, so you will most likely
    /// want to add it using [`WebPushBuilder::with_vapid`].
    pub fn new(endpoint: &'a Uri, ua_public: &'a [u8], ua_auth: &'a [u8]) -> Self {
        Self {
            endpoint,
            ua_public,
            ua_auth,
            ttl: DEFAULT_TTL,
            urgency: Urgency::default(),
            vapid: None,
        }
    }

    pub fn for_subscription(subscription: &'a PushSubscription) -> Self {
        Self::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        )
    }

    /// Sets how long the push service should queue undelivered messages.
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    pub fn with_urgency(self, urgency: Urgency) -> Self {
        Self { urgency, ..self }
    }

    /// Sets the VAPID authorization header. The assertion must have been
    /// signed for this endpoint's [`audience`].
    pub fn with_vapid(self, assertion: &'a VapidAssertion) -> Self {
        Self {
            vapid: Some(assertion),
            ..self
        }
    }

    /// Encrypts `body` and wraps it into a push request.
    pub fn build(&self, body: &[u8]) -> Result<Request<Vec<u8>>> {
        let payload = encrypt(body, self.ua_public, self.ua_auth)?.to_bytes();

        let mut builder = Request::builder()
            .uri(self.endpoint.clone())
            .method(http::Method::POST)
            .header("TTL", self.ttl.as_secs())
            .header("Urgency", HeaderValue::from_static(self.urgency.as_str()))
            .header(header::CONTENT_ENCODING, "aes128gcm")
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, payload.len());

        if let Some(assertion) = self.vapid {
            builder = builder.header(header::AUTHORIZATION, HeaderValue::from(assertion));
        }

        Ok(builder.body(payload)?)
    }
}
