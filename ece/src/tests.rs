use super::*;
use base64ct::{Base64UrlUnpadded, Encoding};
use once_cell::sync::Lazy;

macro_rules! DECODE {
    ($e:expr) => {
        Lazy::new(|| {
            let decoded = Base64UrlUnpadded::decode_vec($e).unwrap();
            decoded.try_into().unwrap()
        })
    };
}

mod rfc8188_example1 {
    use super::*;

    const PLAINTEXT: &[u8] = b"I am the walrus";
    const KEYID: &[u8] = b"";
    static IKM: Lazy<[u8; 16]> = DECODE!("yqdlZ-tYemfogSmv7Ws5PQ");

    static ENCRYPTED: Lazy<[u8; 53]> =
        DECODE!("I1BsxtFttlv3u_Oo94xnmwAAEAAA-NAVub2qFgBEuQKRapoZu-IxkIva3MEB1PD-ly8Thjg");

    static SALT: Lazy<[u8; 16]> = DECODE!("I1BsxtFttlv3u_Oo94xnmw");
    static PRK: Lazy<[u8; 32]> = DECODE!("zyeH5phsIsgUyd4oiSEIy35x-gIi4aM7y0hCF8mwn9g");
    static CEK: Lazy<[u8; 16]> = DECODE!("_wniytB-ofscZDh4tbSjHw");
    static NONCE: Lazy<[u8; 12]> = DECODE!("Bcs8gkIRKLI8GeI8");

    #[test]
    fn test_prk_generation() {
        assert_eq!(hkdf::extract(&*SALT, &*IKM), *PRK);
    }

    #[test]
    fn test_key_derivation() {
        assert_eq!(
            &derive_key(&PRK),
            aes_gcm::Key::<Aes128Gcm>::from_slice(&*CEK)
        );
    }

    #[test]
    fn test_nonce_derivation() {
        assert_eq!(derive_nonce(&PRK), Nonce::from(*NONCE));
    }

    #[test]
    fn test_header_roundtrip() {
        let (header, record) = Header::parse(&*ENCRYPTED).unwrap();
        assert_eq!(header.salt, *SALT);
        assert_eq!(header.record_size, RECORD_SIZE);
        assert!(header.keyid.is_empty());
        assert_eq!(record.len(), 53 - HEADER_LEN);
        assert_eq!(header.to_bytes().unwrap(), ENCRYPTED[..HEADER_LEN]);
    }

    #[test]
    fn test_encryption() {
        let encrypted = encrypt(&*IKM, *SALT, KEYID, PLAINTEXT.to_vec()).unwrap();

        assert_eq!(encrypted.len(), ENCRYPTED.len());
        assert_eq!(encrypted[..16], ENCRYPTED[..16]);
        assert_eq!(encrypted[21..], ENCRYPTED[21..]);
        assert_eq!(encrypted, &ENCRYPTED[..]);
    }

    #[test]
    fn test_decryption() {
        let decrypted = decrypt(&*IKM, &*ENCRYPTED).unwrap();
        assert_eq!(decrypted, PLAINTEXT);
    }

    #[test]
    fn test_decryption_detects_tampering() {
        let mut tampered = *ENCRYPTED;
        tampered[30] ^= 0x01;
        assert_eq!(decrypt(&*IKM, &tampered), Err(Error::Aes128Gcm));
    }
}

#[test]
fn test_keyid_is_embedded() {
    let keyid = [0x04u8; 65];
    let encrypted = encrypt(b"some input keying", [7u8; 16], keyid, b"hello".to_vec()).unwrap();

    let (header, record) = Header::parse(&encrypted).unwrap();
    assert_eq!(header.keyid, &keyid[..]);
    // plaintext, delimiter and tag
    assert_eq!(record.len(), 5 + 1 + 16);
    assert_eq!(decrypt(b"some input keying", &encrypted).unwrap(), b"hello");
}

#[test]
fn test_keyid_too_long() {
    let keyid = vec![0u8; 256];
    assert_eq!(
        encrypt(b"ikm", [0u8; 16], keyid, b"x".to_vec()),
        Err(Error::KeyIdLengthInvalid)
    );
}

#[test]
fn test_largest_record() {
    let plaintext = vec![0x61u8; MAX_PLAINTEXT_LEN];
    let encrypted = encrypt(b"ikm", [1u8; 16], b"", plaintext.clone()).unwrap();
    assert_eq!(encrypted.len(), HEADER_LEN + RECORD_SIZE as usize);
    assert_eq!(decrypt(b"ikm", &encrypted).unwrap(), plaintext);
}

#[test]
fn test_record_too_large() {
    let plaintext = vec![0x61u8; MAX_PLAINTEXT_LEN + 1];
    assert_eq!(
        encrypt(b"ikm", [1u8; 16], b"", plaintext),
        Err(Error::RecordLengthInvalid)
    );
}

#[test]
fn test_short_header() {
    assert_eq!(decrypt(b"ikm", &[0u8; 20]), Err(Error::HeaderLengthInvalid));
}

#[test]
fn test_truncated_keyid() {
    let mut message = vec![0u8; HEADER_LEN];
    message[20] = 65;
    message.extend_from_slice(&[4u8; 10]);
    assert_eq!(decrypt(b"ikm", &message), Err(Error::KeyIdLengthInvalid));
}

#[test]
fn test_record_without_tag() {
    let mut message = Header {
        salt: [0u8; 16],
        record_size: RECORD_SIZE,
        keyid: b"",
    }
    .to_bytes()
    .unwrap();
    message.extend_from_slice(&[0u8; 8]);
    assert_eq!(decrypt(b"ikm", &message), Err(Error::RecordLengthInvalid));
}

#[test]
fn test_wrong_delimiter() {
    let salt = [3u8; 16];
    let prk = hkdf::extract(&salt, b"ikm");
    // a non-last record delimiter inside the only record
    let mut record = b"payload\x01".to_vec();
    Aes128Gcm::new(&derive_key(&prk))
        .encrypt_in_place(&derive_nonce(&prk), b"", &mut record)
        .unwrap();

    assert_eq!(open(b"ikm", salt, record), Err(Error::PaddingInvalid));
}
