// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OBJECT IDENTIFIER contents octets (X.690 §8.19).
//
// The first two arcs share one subidentifier (40 * arc1 + arc2).  Every
// subidentifier is written base-128, most significant group first, with bit 8
// set on all but its last octet.

use fiskal_core::error::{FiskalError, Result};

/// Convert a dotted-decimal OID such as `"0.4.0.127.0.7.3.7.1.1"` into its DER
/// contents octets.
pub fn oid_string_to_bytes(oid: &str) -> Result<Vec<u8>> {
    let arcs = oid
        .split('.')
        .map(|arc| parse_arc(oid, arc))
        .collect::<Result<Vec<u64>>>()?;

    if arcs.len() < 2 {
        return Err(FiskalError::InvalidOid(format!(
            "{oid:?} needs at least two arcs"
        )));
    }
    let (first, second) = (arcs[0], arcs[1]);
    if first > 2 {
        return Err(FiskalError::InvalidOid(format!(
            "{oid:?}: first arc must be 0, 1 or 2"
        )));
    }
    if first < 2 && second >= 40 {
        return Err(FiskalError::InvalidOid(format!(
            "{oid:?}: second arc must be below 40 under arc {first}"
        )));
    }
    let head = (first * 40).checked_add(second).ok_or_else(|| {
        FiskalError::InvalidOid(format!("{oid:?}: second arc overflows"))
    })?;

    let mut out = Vec::with_capacity(arcs.len() + 4);
    push_subidentifier(&mut out, head);
    for &arc in &arcs[2..] {
        push_subidentifier(&mut out, arc);
    }
    Ok(out)
}

/// Convert DER contents octets back into dotted-decimal form.
///
/// Subidentifiers that would not fit in a `u64` are reported as
/// [`FiskalError::InvalidOid`] rather than wrapped.
pub fn oid_bytes_to_string(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(FiskalError::InvalidOid("empty OID contents".into()));
    }

    let mut subidentifiers = Vec::new();
    let mut value: u64 = 0;
    let mut in_progress = false;
    for &octet in bytes {
        if !in_progress && octet == 0x80 {
            return Err(FiskalError::InvalidOid(
                "subidentifier has a leading 0x80 octet".into(),
            ));
        }
        if value > u64::MAX >> 7 {
            return Err(FiskalError::InvalidOid(
                "subidentifier overflows 64 bits".into(),
            ));
        }
        value = (value << 7) | (octet & 0x7F) as u64;
        if octet & 0x80 == 0 {
            subidentifiers.push(value);
            value = 0;
            in_progress = false;
        } else {
            in_progress = true;
        }
    }
    if in_progress {
        return Err(FiskalError::InvalidOid(
            "last subidentifier is truncated".into(),
        ));
    }

    let head = subidentifiers[0];
    let (first, second) = match head {
        0..=39 => (0, head),
        40..=79 => (1, head - 40),
        _ => (2, head - 80),
    };

    let mut text = format!("{first}.{second}");
    for arc in &subidentifiers[1..] {
        text.push('.');
        text.push_str(&arc.to_string());
    }
    Ok(text)
}

fn parse_arc(oid: &str, arc: &str) -> Result<u64> {
    if arc.is_empty() || !arc.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FiskalError::InvalidOid(format!(
            "{oid:?}: arc {arc:?} is not a decimal number"
        )));
    }
    arc.parse::<u64>()
        .map_err(|_| FiskalError::InvalidOid(format!("{oid:?}: arc {arc} overflows")))
}

fn push_subidentifier(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7F) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0x00 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_log_oid() {
        let bytes = oid_string_to_bytes("0.4.0.127.0.7.3.7.1.1").unwrap();
        assert_eq!(bytes, vec![0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x07, 0x01, 0x01]);
        assert_eq!(oid_bytes_to_string(&bytes).unwrap(), "0.4.0.127.0.7.3.7.1.1");
    }

    #[test]
    fn multi_octet_arcs() {
        // 1.2.840.113549 (rsadsi)
        let bytes = oid_string_to_bytes("1.2.840.113549").unwrap();
        assert_eq!(bytes, vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]);
        assert_eq!(oid_bytes_to_string(&bytes).unwrap(), "1.2.840.113549");
    }

    #[test]
    fn joint_iso_itu_large_second_arc() {
        let bytes = oid_string_to_bytes("2.999.3").unwrap();
        assert_eq!(bytes, vec![0x88, 0x37, 0x03]);
        assert_eq!(oid_bytes_to_string(&bytes).unwrap(), "2.999.3");
    }

    #[test]
    fn round_trips_arcs_up_to_300() {
        for first in 0..=2u64 {
            let second_max = if first < 2 { 39 } else { 300 };
            for second in (0..=second_max).step_by(7) {
                for third in 0..=300u64 {
                    let text = format!("{first}.{second}.{third}.{}", 300 - third);
                    let bytes = oid_string_to_bytes(&text).unwrap();
                    assert_eq!(oid_bytes_to_string(&bytes).unwrap(), text);
                }
            }
        }
    }

    #[test]
    fn max_u64_arc_round_trips() {
        let text = format!("1.3.{}", u64::MAX);
        let bytes = oid_string_to_bytes(&text).unwrap();
        assert_eq!(oid_bytes_to_string(&bytes).unwrap(), text);
    }

    #[test]
    fn rejects_overflowing_subidentifier() {
        let mut bytes = vec![0x2B];
        bytes.extend(std::iter::repeat_n(0xFF, 10));
        bytes.push(0x7F);
        assert!(matches!(oid_bytes_to_string(&bytes), Err(FiskalError::InvalidOid(_))));
    }

    #[test]
    fn rejects_bad_text() {
        for text in ["", "1", "3.1", "0.40", "1.2.x", "1..2", "-1.2", "1.2.99999999999999999999"] {
            assert!(oid_string_to_bytes(text).is_err(), "{text:?} must be rejected");
        }
    }

    #[test]
    fn rejects_bad_bytes() {
        assert!(oid_bytes_to_string(&[]).is_err());
        assert!(oid_bytes_to_string(&[0x2A, 0x86]).is_err(), "truncated");
        assert!(oid_bytes_to_string(&[0x2A, 0x80, 0x01]).is_err(), "padded");
    }
}
