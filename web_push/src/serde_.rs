//! Field adapters for the browser's `PushSubscription.toJSON()` shape.

pub(crate) mod uri {
    use http::Uri;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(uri: &Uri, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&uri.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Uri, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

pub(crate) mod base64url {
    use base64ct::{Base64UrlUnpadded, Encoding};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&Base64UrlUnpadded::encode_string(bytes))
    }

    /// Browsers emit unpadded base64url, but some client libraries pad it.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let b64 = String::deserialize(d)?;
        Base64UrlUnpadded::decode_vec(b64.trim_end_matches('=')).map_err(de::Error::custom)
    }
}
