use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Largest serialized payload accepted for delivery.
///
/// Push services cap the request body at 4096 bytes, which leaves this much
/// plaintext after the 86 byte header, the padding delimiter and the tag.
pub const MAX_PAYLOAD_LEN: usize = 4096 - 86 - 17;

/// Notification as shown by the service worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl NotificationPayload {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: None,
            tag: None,
        }
    }

    pub fn with_url<U: Into<String>>(self, url: U) -> Self {
        Self {
            url: Some(url.into()),
            ..self
        }
    }

    /// Notifications sharing a tag replace each other on the device.
    pub fn with_tag<T: Into<String>>(self, tag: T) -> Self {
        Self {
            tag: Some(tag.into()),
            ..self
        }
    }

    /// Serializes to compact JSON, rejecting payloads above [`MAX_PAYLOAD_LEN`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = serde_json::to_vec(self)?;
        if bytes.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge {
                size: bytes.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(bytes)
    }
}
