// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Non-negative INTEGER contents octets (X.690 §8.3).

use fiskal_core::error::{FiskalError, Result};

/// Minimal two's-complement encoding of `value`.
///
/// A `0x00` octet is prepended when the most significant bit of the leading
/// octet is set, so the value is never read back as negative.
pub fn encode_unsigned(value: u64) -> Vec<u8> {
    let be = value.to_be_bytes();
    let skip = be.iter().take_while(|b| **b == 0).count().min(be.len() - 1);
    let octets = &be[skip..];

    let mut out = Vec::with_capacity(octets.len() + 1);
    if octets[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(octets);
    out
}

/// Decode INTEGER contents produced by [`encode_unsigned`].
pub fn decode_unsigned(bytes: &[u8]) -> Result<u64> {
    let (&first, rest) = bytes
        .split_first()
        .ok_or_else(|| FiskalError::MalformedTlv("empty INTEGER".into()))?;

    if first & 0x80 != 0 {
        return Err(FiskalError::MalformedTlv("negative INTEGER".into()));
    }
    if first == 0 && rest.first().is_some_and(|b| b & 0x80 == 0) {
        return Err(FiskalError::MalformedTlv(
            "INTEGER is not minimally encoded".into(),
        ));
    }

    let magnitude = if first == 0 && !rest.is_empty() { rest } else { bytes };
    if magnitude.len() > 8 {
        return Err(FiskalError::MalformedTlv(format!(
            "INTEGER of {} octets does not fit in 64 bits",
            magnitude.len()
        )));
    }

    Ok(magnitude
        .iter()
        .fold(0u64, |acc, &octet| (acc << 8) | octet as u64))
}
