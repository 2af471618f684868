//! HMAC-SHA-256 extract/expand key derivation according to
//! [RFC5869](https://www.rfc-editor.org/rfc/rfc5869).
//!
//! Every key in the web push scheme is at most one hash block long, so
//! [`expand`] only ever produces the first output block `T(1)`.

use hkdf::Hkdf;
use sha2::Sha256;

/// Length of one HMAC-SHA-256 output block
pub const BLOCK_LEN: usize = 32;

/// Pseudorandom key produced by [`extract`]
pub type Prk = [u8; BLOCK_LEN];

/// `HMAC-SHA-256(salt, ikm)`
pub fn extract(salt: &[u8], ikm: &[u8]) -> Prk {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    prk.into()
}

/// `HMAC-SHA-256(prk, info || 0x01)` truncated to `N` bytes.
///
/// # Panics
///
/// If `N` is larger than [`BLOCK_LEN`].
pub fn expand<const N: usize>(prk: &Prk, info: &[u8]) -> [u8; N] {
    assert!(N <= BLOCK_LEN, "hkdf output is limited to a single block");

    let hk = Hkdf::<Sha256>::from_prk(prk).expect("prk is always exactly one block long");
    let mut okm = [0u8; N];
    hk.expand(info, &mut okm)
        .expect("okm length never exceeds one block, impossible for it to be too large");

    okm
}
