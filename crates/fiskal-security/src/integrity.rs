// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SHA-256 fingerprints: the TSE serial number and record digests.

use fiskal_core::error::{FiskalError, Result};
use sha2::{Digest, Sha256};

/// Octet that prefixes an uncompressed SEC1 point.
const UNCOMPRESSED_POINT_PREFIX: u8 = 0x04;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Used by the record store to fingerprint stored records.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// TSE serial number: SHA-256 over the public key point.
///
/// The leading byte that DER / SEC1 put in front of the coordinates (the
/// `0x00` bit-string pad or the `0x04` uncompressed-point prefix) is not part
/// of the hashed material.
pub fn serial_number(public_key: &[u8]) -> Result<Vec<u8>> {
    let coordinates = match public_key.split_first() {
        Some((&(0x00 | UNCOMPRESSED_POINT_PREFIX), rest)) if !rest.is_empty() => rest,
        _ => {
            return Err(FiskalError::Signing(format!(
                "public key of {} bytes is not an uncompressed point",
                public_key.len()
            )));
        }
    };
    Ok(Sha256::digest(coordinates).to_vec())
}
