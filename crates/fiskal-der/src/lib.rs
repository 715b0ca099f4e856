// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fiskal DER — ASN.1 Distinguished Encoding Rules tag-length-value codec.
//
// Every log record the TSE emits is a plain concatenation of DER TLVs.  This
// crate owns the byte-exact encoding of those TLVs: single-octet tags, DER
// lengths, object identifiers and unsigned integers.  All functions are pure
// and never write partial output on failure.

pub mod integer;
pub mod length;
pub mod node;
pub mod oid;
pub mod tag;

pub use integer::{decode_unsigned, encode_unsigned};
pub use length::{decode_length, encode_length};
pub use node::{TlvNode, decode_all, decode_one, encode_all};
pub use oid::{oid_bytes_to_string, oid_string_to_bytes};
pub use tag::{Tag, TagClass, TagForm};
