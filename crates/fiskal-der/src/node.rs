// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TLV nodes: encoding, single-node decoding and the flat stream decoder.
//
// A constructed node does not own a child list.  Its value *is* the
// concatenation of its children's encodings, and appending a child means
// appending that child's encoding to the value.

use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::first_unprintable;

use crate::integer::{decode_unsigned, encode_unsigned};
use crate::length::{decode_length, encode_length};
use crate::oid::{oid_bytes_to_string, oid_string_to_bytes};
use crate::tag::Tag;

/// DER encoding of BOOLEAN TRUE.
const DER_TRUE: u8 = 0xFF;

/// DER encoding of BOOLEAN FALSE.
const DER_FALSE: u8 = 0x00;

/// One tag-length-value unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TlvNode {
    tag: Tag,
    value: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl TlvNode {
    /// A node with an arbitrary tag and raw contents octets.
    pub fn new(tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// The NULL node, which carries no value.
    pub fn null() -> Self {
        Self::new(Tag::NULL, Vec::new())
    }

    pub fn integer(value: u64) -> Self {
        Self::new(Tag::INTEGER, encode_unsigned(value))
    }

    pub fn enumerated(value: u64) -> Self {
        Self::new(Tag::ENUMERATED, encode_unsigned(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(Tag::BOOLEAN, vec![if value { DER_TRUE } else { DER_FALSE }])
    }

    pub fn octet_string(value: impl Into<Vec<u8>>) -> Self {
        Self::new(Tag::OCTET_STRING, value)
    }

    /// PrintableString; fails for characters outside the X.680 repertoire.
    pub fn printable_string(text: &str) -> Result<Self> {
        validate_printable(text)?;
        Ok(Self::new(Tag::PRINTABLE_STRING, text.as_bytes()))
    }

    /// OBJECT IDENTIFIER from its dotted-decimal form.
    pub fn oid(dotted: &str) -> Result<Self> {
        Ok(Self::new(Tag::OBJECT_IDENTIFIER, oid_string_to_bytes(dotted)?))
    }

    /// Primitive context-specific node `[number]`.
    pub fn context(number: u8, value: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self::new(Tag::context(number)?, value))
    }

    /// SEQUENCE holding `children` in order.
    pub fn sequence(children: &[TlvNode]) -> Result<Self> {
        let mut node = Self::new(Tag::SEQUENCE, Vec::new());
        for child in children {
            node.push_child(child)?;
        }
        Ok(node)
    }

    /// Append `child`'s full encoding to this constructed node's value.
    pub fn push_child(&mut self, child: &TlvNode) -> Result<()> {
        if !self.tag.is_constructed() {
            return Err(FiskalError::MalformedTlv(format!(
                "cannot append a child to primitive tag {}",
                self.tag
            )));
        }
        let encoded = child.encode()?;
        self.value.extend_from_slice(&encoded);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl TlvNode {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.is_constructed()
    }

    /// Interpret the value as a non-negative INTEGER or ENUMERATED.
    pub fn as_unsigned(&self) -> Result<u64> {
        decode_unsigned(&self.value)
    }

    /// Interpret the value as a DER BOOLEAN.
    pub fn as_bool(&self) -> Result<bool> {
        match self.value.as_slice() {
            [DER_TRUE] => Ok(true),
            [DER_FALSE] => Ok(false),
            other => Err(FiskalError::MalformedTlv(format!(
                "BOOLEAN contents {} are not DER",
                hex::encode(other)
            ))),
        }
    }

    /// Interpret the value as a character string.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.value)
            .map_err(|e| FiskalError::MalformedTlv(format!("string is not UTF-8: {e}")))
    }

    /// Interpret the value as an OBJECT IDENTIFIER.
    pub fn as_oid(&self) -> Result<String> {
        oid_bytes_to_string(&self.value)
    }

    /// Total number of octets [`TlvNode::encode`] produces.
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(1 + encode_length(self.value.len())?.len() + self.value.len())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

impl TlvNode {
    /// Tag octet, DER length, value.
    ///
    /// NULL without a value encodes as `05 00`.  INTEGER, ENUMERATED and
    /// BOOLEAN nodes without a value are rejected, as is a NULL node that
    /// carries one.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append the encoding to `out`.  Nothing is written on failure.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        self.check_value()?;
        let length = encode_length(self.value.len())?;

        out.reserve(1 + length.len() + self.value.len());
        out.push(self.tag.octet());
        out.extend_from_slice(&length);
        out.extend_from_slice(&self.value);
        Ok(())
    }

    fn check_value(&self) -> Result<()> {
        match self.tag {
            Tag::NULL if !self.value.is_empty() => Err(FiskalError::MalformedTlv(format!(
                "NULL must not carry a value ({} bytes given)",
                self.value.len()
            ))),
            Tag::INTEGER | Tag::ENUMERATED | Tag::BOOLEAN if self.value.is_empty() => {
                Err(FiskalError::MissingValue(self.tag.octet()))
            }
            _ => Ok(()),
        }
    }
}

/// Concatenate the encodings of `nodes`.
pub fn encode_all<'a>(nodes: impl IntoIterator<Item = &'a TlvNode>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for node in nodes {
        node.encode_into(&mut out)?;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decoded header: tag, value length, header length.
fn decode_header(bytes: &[u8]) -> Result<(Tag, usize, usize)> {
    if bytes.len() < 2 {
        return Err(FiskalError::MalformedTlv(format!(
            "need at least 2 bytes for a TLV, got {}",
            bytes.len()
        )));
    }
    let tag = Tag::new(bytes[0])?;
    let (len, len_octets) = decode_length(&bytes[1..])?;
    let header = 1 + len_octets;
    let remaining = bytes.len() - header;
    if len > remaining {
        return Err(FiskalError::MalformedTlv(format!(
            "tag {tag} declares {len} value bytes but only {remaining} remain"
        )));
    }
    if tag.is_null() && len != 0 {
        return Err(FiskalError::MalformedTlv(format!(
            "NULL declares a {len} byte value"
        )));
    }
    Ok((tag, len, header))
}

/// Decode the first TLV in `bytes`.
///
/// Returns the node and the number of bytes it occupied; trailing bytes are
/// left for the caller.
pub fn decode_one(bytes: &[u8]) -> Result<(TlvNode, usize)> {
    let (tag, len, header) = decode_header(bytes)?;
    let node = TlvNode::new(tag, &bytes[header..header + len]);
    Ok((node, header + len))
}

/// Decode every TLV in `bytes` into a **flat** list.
///
/// Primitive TLVs yield one node each.  A constructed TLV yields one node
/// holding its raw child bytes, and its children are then decoded and
/// emitted right after it as siblings, recursively.  The output is flat, not
/// nested: `SEQUENCE { INTEGER 1 }` decodes to `[SEQUENCE, INTEGER]`.
/// Record parsing relies on this positional layout; do not turn it into a
/// tree.
///
/// A child whose encoding runs past the end of its enclosing constructed
/// node is rejected.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<TlvNode>> {
    let mut nodes = Vec::new();
    // Ends of the constructed nodes we are currently inside.
    let mut enclosing: Vec<usize> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        while enclosing.last() == Some(&pos) {
            enclosing.pop();
        }
        let limit = enclosing.last().copied().unwrap_or(bytes.len());

        let (tag, len, header) = decode_header(&bytes[pos..limit])?;
        let value_start = pos + header;
        let end = value_start + len;
        nodes.push(TlvNode::new(tag, &bytes[value_start..end]));

        if tag.is_constructed() {
            if len > 0 {
                enclosing.push(end);
            }
            pos = value_start;
        } else {
            pos = end;
        }
    }

    Ok(nodes)
}

fn validate_printable(text: &str) -> Result<()> {
    match first_unprintable(text) {
        Some(bad) => Err(FiskalError::MalformedTlv(format!(
            "{bad:?} is not allowed in a PrintableString"
        ))),
        None => Ok(()),
    }
}
