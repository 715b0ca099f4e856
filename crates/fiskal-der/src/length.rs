// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DER length octets (X.690 §8.1.3, §10.1).
//
//   len <= 127   one octet holding len
//   len >= 128   0x80 | n, then n big-endian octets, n minimal

use fiskal_core::error::{FiskalError, Result};

/// Largest number of subsequent length octets this codec will write or read.
pub const MAX_LENGTH_OCTETS: usize = 126;

/// Largest value that still fits the short form.
const SHORT_FORM_MAX: usize = 0x7F;

const LONG_FORM_BIT: u8 = 0x80;

/// Encode `len` as DER length octets.
pub fn encode_length(len: usize) -> Result<Vec<u8>> {
    if len <= SHORT_FORM_MAX {
        return Ok(vec![len as u8]);
    }

    let be = len.to_be_bytes();
    let skip = be.iter().take_while(|b| **b == 0).count();
    let octets = &be[skip..];
    if octets.len() > MAX_LENGTH_OCTETS {
        return Err(FiskalError::ValueTooBig(len));
    }

    let mut out = Vec::with_capacity(1 + octets.len());
    out.push(LONG_FORM_BIT | octets.len() as u8);
    out.extend_from_slice(octets);
    Ok(out)
}

/// Decode DER length octets at the start of `bytes`.
///
/// Returns the length value and the number of octets it occupied.  The
/// indefinite form and non-minimal long forms are not DER and are rejected.
pub fn decode_length(bytes: &[u8]) -> Result<(usize, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| FiskalError::MalformedTlv("missing length octet".into()))?;

    if first & LONG_FORM_BIT == 0 {
        return Ok((first as usize, 1));
    }

    let count = (first & !LONG_FORM_BIT) as usize;
    if count == 0 {
        return Err(FiskalError::MalformedTlv(
            "indefinite length is not allowed in DER".into(),
        ));
    }
    if count > MAX_LENGTH_OCTETS {
        return Err(FiskalError::MalformedTlv(format!(
            "{count} length octets exceed the limit of {MAX_LENGTH_OCTETS}"
        )));
    }
    let octets = bytes.get(1..1 + count).ok_or_else(|| {
        FiskalError::MalformedTlv(format!(
            "length declares {count} octets but only {} remain",
            bytes.len() - 1
        ))
    })?;
    if octets[0] == 0 {
        return Err(FiskalError::MalformedTlv(
            "long-form length has a leading zero octet".into(),
        ));
    }

    let mut len: usize = 0;
    for &octet in octets {
        len = len
            .checked_mul(256)
            .and_then(|v| v.checked_add(octet as usize))
            .ok_or_else(|| FiskalError::MalformedTlv("length does not fit in memory".into()))?;
    }
    if len <= SHORT_FORM_MAX {
        return Err(FiskalError::MalformedTlv(format!(
            "length {len} must use the short form"
        )));
    }

    Ok((len, 1 + count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_boundary() {
        assert_eq!(encode_length(0).unwrap(), vec![0x00]);
        assert_eq!(encode_length(127).unwrap(), vec![0x7F]);
    }

    #[test]
    fn long_form_boundary() {
        assert_eq!(encode_length(128).unwrap(), vec![0x81, 0x80]);
        assert_eq!(encode_length(255).unwrap(), vec![0x81, 0xFF]);
        assert_eq!(encode_length(256).unwrap(), vec![0x82, 0x01, 0x00]);
        assert_eq!(encode_length(65_536).unwrap(), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn decode_matches_encode() {
        for len in [0usize, 1, 127, 128, 200, 255, 256, 4096, 1 << 20] {
            let encoded = encode_length(len).unwrap();
            assert_eq!(decode_length(&encoded).unwrap(), (len, encoded.len()));
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        assert_eq!(decode_length(&[0x05, 0xAA, 0xBB]).unwrap(), (5, 1));
        assert_eq!(decode_length(&[0x81, 0x90, 0xAA]).unwrap(), (0x90, 2));
    }

    #[test]
    fn rejects_indefinite_form() {
        assert!(matches!(decode_length(&[0x80]), Err(FiskalError::MalformedTlv(_))));
    }

    #[test]
    fn rejects_truncated_long_form() {
        assert!(decode_length(&[0x82, 0x01]).is_err());
        assert!(decode_length(&[]).is_err());
    }

    #[test]
    fn rejects_non_minimal_long_form() {
        assert!(decode_length(&[0x81, 0x05]).is_err(), "fits the short form");
        assert!(decode_length(&[0x82, 0x00, 0x90]).is_err(), "leading zero octet");
    }

    #[test]
    fn rejects_too_many_length_octets() {
        let mut bytes = vec![0xFF];
        bytes.extend(std::iter::repeat_n(0x01, 127));
        assert!(decode_length(&bytes).is_err());
    }

    #[test]
    fn rejects_length_beyond_usize() {
        let mut bytes = vec![0x80 | 9];
        bytes.extend(std::iter::repeat_n(0xFF, 9));
        assert!(matches!(decode_length(&bytes), Err(FiskalError::MalformedTlv(_))));
    }
}
