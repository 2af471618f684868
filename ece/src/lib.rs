//! This crate implements single-record ECE encryption according to rfc8188,
//! using the `aes128gcm` content coding with a fixed record size of
//! [`RECORD_SIZE`].
//!
//! Messages that do not fit into one record are rejected instead of being
//! split, since web push messages are always delivered as one record.

pub mod hkdf;
#[cfg(test)]
mod tests;

use aes_gcm::{
    aead::{consts::U12, generic_array::typenum::Unsigned, Tag},
    AeadCore, AeadInPlace, Aes128Gcm, KeyInit, Nonce,
};

/// Record size advertised in the header of every encrypted message
pub const RECORD_SIZE: u32 = 4096;

/// Length of the fixed part of the header: salt, record size and key id length
pub const HEADER_LEN: usize = 21;

/// Largest plaintext that still fits into one record together with the
/// padding delimiter and the authentication tag
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - TAG_LEN - 1;

const TAG_LEN: usize = 16;
const LAST_RECORD_DELIMITER: u8 = 0x02;

/// Error modes for rfc8188 encryption and decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Header of the encrypted payload was too short
    HeaderLengthInvalid,
    /// The `keyid` parameter passed to the encryption routine was too large
    KeyIdLengthInvalid,
    /// The record was too large to fit the record size, or too short to carry a tag
    RecordLengthInvalid,
    /// Padding of the encrypted record was malformed
    PaddingInvalid,
    /// Internal aes128gcm error, including authentication failure
    Aes128Gcm,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The `aes128gcm` coding header preceding the record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header<'a> {
    pub salt: [u8; 16],
    pub record_size: u32,
    pub keyid: &'a [u8],
}

impl<'a> Header<'a> {
    /// Serializes the header as `salt || rs || idlen || keyid`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let idlen: u8 = self
            .keyid
            .len()
            .try_into()
            .map_err(|_| Error::KeyIdLengthInvalid)?;

        let mut header = Vec::with_capacity(HEADER_LEN + self.keyid.len());
        header.extend_from_slice(&self.salt);
        header.extend_from_slice(&self.record_size.to_be_bytes());
        header.push(idlen);
        header.extend_from_slice(self.keyid);

        Ok(header)
    }

    /// Splits an encrypted message into its header and the remaining record.
    pub fn parse(message: &'a [u8]) -> Result<(Self, &'a [u8]), Error> {
        if message.len() < HEADER_LEN {
            return Err(Error::HeaderLengthInvalid);
        }

        let (fixed, rest) = message.split_at(HEADER_LEN);
        let mut salt = [0u8; 16];
        salt.copy_from_slice(&fixed[..16]);
        let mut record_size = [0u8; 4];
        record_size.copy_from_slice(&fixed[16..20]);
        let idlen = usize::from(fixed[20]);

        if rest.len() < idlen {
            return Err(Error::KeyIdLengthInvalid);
        }
        let (keyid, record) = rest.split_at(idlen);

        let header = Header {
            salt,
            record_size: u32::from_be_bytes(record_size),
            keyid,
        };
        Ok((header, record))
    }
}

fn derive_key(prk: &hkdf::Prk) -> aes_gcm::Key<Aes128Gcm> {
    let okm: [u8; 16] = hkdf::expand(prk, b"Content-Encoding: aes128gcm\0");
    aes_gcm::Key::<Aes128Gcm>::from(okm)
}

fn derive_nonce(prk: &hkdf::Prk) -> Nonce<U12> {
    let okm: [u8; 12] = hkdf::expand(prk, b"Content-Encoding: nonce\0");
    Nonce::from(okm)
}

/// Encrypts `record` as the only (and therefore last) record of a message,
/// returning the ciphertext including its authentication tag.
pub fn seal(ikm: &[u8], salt: [u8; 16], mut record: Vec<u8>) -> Result<Vec<u8>, Error> {
    if record.len() > MAX_PLAINTEXT_LEN {
        return Err(Error::RecordLengthInvalid);
    }

    let prk = hkdf::extract(&salt, ikm);
    record.push(LAST_RECORD_DELIMITER);

    Aes128Gcm::new(&derive_key(&prk))
        .encrypt_in_place(&derive_nonce(&prk), b"", &mut record)
        .map_err(|_| Error::Aes128Gcm)?;

    Ok(record)
}

/// Decrypts a single last record produced by [`seal`], stripping its padding.
pub fn open(ikm: &[u8], salt: [u8; 16], mut record: Vec<u8>) -> Result<Vec<u8>, Error> {
    let tag_len = <Aes128Gcm as AeadCore>::TagSize::to_usize();
    if record.len() < tag_len {
        return Err(Error::RecordLengthInvalid);
    }

    let prk = hkdf::extract(&salt, ikm);
    let tag_pos = record.len() - tag_len;
    let (msg, tag) = record.split_at_mut(tag_pos);

    Aes128Gcm::new(&derive_key(&prk))
        .decrypt_in_place_detached(
            &derive_nonce(&prk),
            b"",
            msg,
            Tag::<Aes128Gcm>::from_slice(tag),
        )
        .map_err(|_| Error::Aes128Gcm)?;

    let pad_index = msg
        .iter()
        .rposition(|it| *it != 0)
        .ok_or(Error::PaddingInvalid)?;
    if msg[pad_index] != LAST_RECORD_DELIMITER {
        return Err(Error::PaddingInvalid);
    }

    record.truncate(pad_index);
    Ok(record)
}

/// Low-level rfc8188 ece encryption routine producing `header || record`
pub fn encrypt<KI: AsRef<[u8]>>(
    ikm: &[u8],
    salt: [u8; 16],
    keyid: KI,
    plaintext: Vec<u8>,
) -> Result<Vec<u8>, Error> {
    let header = Header {
        salt,
        record_size: RECORD_SIZE,
        keyid: keyid.as_ref(),
    };

    let mut output = header.to_bytes()?;
    output.extend_from_slice(&seal(ikm, salt, plaintext)?);

    Ok(output)
}

/// Low-level rfc8188 ece decryption routine for single-record messages
pub fn decrypt(ikm: &[u8], encrypted_message: &[u8]) -> Result<Vec<u8>, Error> {
    let (header, record) = Header::parse(encrypted_message)?;

    let record_size = usize::try_from(header.record_size).map_err(|_| Error::RecordLengthInvalid)?;
    if record_size <= TAG_LEN || record.len() > record_size {
        return Err(Error::RecordLengthInvalid);
    }

    open(ikm, header.salt, record.to_vec())
}
