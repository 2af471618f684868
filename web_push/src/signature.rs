//! Conversion between ASN.1/DER encoded ECDSA P-256 signatures and the
//! fixed-width `r || s` form used by JWS.

use crate::error::{Error, Result};

const SEQUENCE: u8 = 0x30;
const INTEGER: u8 = 0x02;
const SCALAR_LEN: usize = 32;

/// Big-endian, fixed-width signature scalar
pub type Scalar = [u8; SCALAR_LEN];

/// Splits a DER `SEQUENCE { r INTEGER, s INTEGER }` into zero-padded
/// 32 byte scalars.
pub fn to_raw(der: &[u8]) -> Result<(Scalar, Scalar)> {
    let (tag, body, rest) = read_tlv(der)?;
    if tag != SEQUENCE || !rest.is_empty() {
        return Err(Error::MalformedSignature);
    }

    let (r, body) = read_integer(body)?;
    let (s, body) = read_integer(body)?;
    if !body.is_empty() {
        return Err(Error::MalformedSignature);
    }

    Ok((r, s))
}

/// Encodes two scalars as a minimal DER `SEQUENCE` of two `INTEGER`s.
pub fn to_der(r: &Scalar, s: &Scalar) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 * (SCALAR_LEN + 3));
    write_integer(&mut body, r);
    write_integer(&mut body, s);

    let mut der = Vec::with_capacity(body.len() + 2);
    der.push(SEQUENCE);
    // at most 70 bytes, always the short length form
    der.push(body.len() as u8);
    der.extend_from_slice(&body);
    der
}

fn read_tlv(input: &[u8]) -> Result<(u8, &[u8], &[u8])> {
    let (&tag, input) = input.split_first().ok_or(Error::MalformedSignature)?;
    let (&len, input) = input.split_first().ok_or(Error::MalformedSignature)?;

    let (len, input) = match len {
        0x00..=0x7f => (usize::from(len), input),
        0x81 => {
            let (&len, input) = input.split_first().ok_or(Error::MalformedSignature)?;
            (usize::from(len), input)
        }
        _ => return Err(Error::MalformedSignature),
    };

    if input.len() < len {
        return Err(Error::MalformedSignature);
    }
    let (value, rest) = input.split_at(len);

    Ok((tag, value, rest))
}

fn read_integer(input: &[u8]) -> Result<(Scalar, &[u8])> {
    let (tag, value, rest) = read_tlv(input)?;
    if tag != INTEGER || value.is_empty() || value.len() > SCALAR_LEN + 1 {
        return Err(Error::MalformedSignature);
    }
    // negative integers never occur in ECDSA signatures
    if value[0] & 0x80 != 0 {
        return Err(Error::MalformedSignature);
    }

    let start = value
        .iter()
        .position(|it| *it != 0)
        .unwrap_or(value.len());
    let digits = &value[start..];
    if digits.len() > SCALAR_LEN {
        return Err(Error::MalformedSignature);
    }

    let mut scalar = [0u8; SCALAR_LEN];
    scalar[SCALAR_LEN - digits.len()..].copy_from_slice(digits);

    Ok((scalar, rest))
}

fn write_integer(out: &mut Vec<u8>, scalar: &Scalar) {
    let start = scalar
        .iter()
        .position(|it| *it != 0)
        .unwrap_or(SCALAR_LEN - 1);
    let digits = &scalar[start..];
    let sign_pad = digits[0] & 0x80 != 0;

    out.push(INTEGER);
    out.push((digits.len() + usize::from(sign_pad)) as u8);
    if sign_pad {
        out.push(0);
    }
    out.extend_from_slice(digits);
}
