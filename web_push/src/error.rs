use thiserror::Error;

/// Boxed error returned by pluggable collaborators such as the subscription
/// registry or the HTTP transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with this crate's error.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("caller may not act on behalf of the target user")]
    Forbidden,

    #[error("malformed DER signature")]
    MalformedSignature,

    #[error("client public key is not an uncompressed P-256 point")]
    InvalidClientKey,

    #[error("client auth secret must be exactly 16 bytes")]
    InvalidAuthSecret,

    #[error("invalid subscription endpoint: {0}")]
    InvalidEndpoint(&'static str),

    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("could not encrypt using ECE")]
    Encryption(#[from] push_ece::Error),

    #[error("VAPID signing failed")]
    Signing(#[from] p256::ecdsa::Error),

    #[error("could not serialize payload")]
    Serialization(#[from] serde_json::Error),

    #[error("could not build request")]
    Http(#[from] http::Error),

    #[error("subscription registry failed")]
    Registry(#[source] BoxError),
}
