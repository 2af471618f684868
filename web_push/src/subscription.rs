use crate::{error::Result, serde_};
use chrono::{DateTime, Utc};
use http::Uri;
use serde::{Deserialize, Serialize};

/// Identifier of the user owning a subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Key material a user agent hands out when subscribing.
///
/// The bytes are kept as received; they are only checked when a message is
/// encrypted for them, or explicitly with [`PushSubscription::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Uncompressed P-256 public key of the user agent
    #[serde(with = "serde_::base64url")]
    pub p256dh: Vec<u8>,
    /// 16 byte authentication secret
    #[serde(with = "serde_::base64url")]
    pub auth: Vec<u8>,
}

/// The JSON object produced by `PushSubscription.toJSON()` in the browser.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    #[serde(with = "serde_::uri")]
    pub endpoint: Uri,
    #[serde(default)]
    pub expiration_time: Option<u64>,
    pub keys: SubscriptionKeys,
}

/// A registered push endpoint, unique per `(owner_user_id, endpoint)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    #[serde(with = "serde_::uri")]
    pub endpoint: Uri,
    pub keys: SubscriptionKeys,
    pub owner_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl PushSubscription {
    pub fn new(owner_user_id: UserId, info: SubscriptionInfo) -> Self {
        Self {
            endpoint: info.endpoint,
            keys: info.keys,
            owner_user_id,
            created_at: Utc::now(),
        }
    }

    /// Checks that the endpoint is an absolute URI and the keys can be
    /// encrypted for.
    pub fn validate(&self) -> Result<()> {
        crate::audience(&self.endpoint)?;
        crate::parse_client_key(&self.keys.p256dh)?;
        crate::parse_auth(&self.keys.auth)?;
        Ok(())
    }
}
