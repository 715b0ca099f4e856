// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-octet ASN.1 identifiers (X.690 §8.1.2).

use fiskal_core::error::{FiskalError, Result};

/// Bits 8-7 of the identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// Bit 6 of the identifier octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagForm {
    Primitive,
    Constructed,
}

/// Low five bits all set marks the high-tag-number form.
const HIGH_TAG_NUMBER_MASK: u8 = 0x1F;

const CONSTRUCTED_BIT: u8 = 0x20;

/// A one-octet ASN.1 tag.
///
/// High-tag-number form (`xxx11111`) is rejected at construction, so every
/// `Tag` value encodes to exactly one octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(u8);

impl Tag {
    pub const BOOLEAN: Tag = Tag(0x01);
    pub const INTEGER: Tag = Tag(0x02);
    pub const OCTET_STRING: Tag = Tag(0x04);
    pub const NULL: Tag = Tag(0x05);
    pub const OBJECT_IDENTIFIER: Tag = Tag(0x06);
    pub const ENUMERATED: Tag = Tag(0x0A);
    pub const UTF8_STRING: Tag = Tag(0x0C);
    pub const PRINTABLE_STRING: Tag = Tag(0x13);
    pub const SEQUENCE: Tag = Tag(0x30);
    pub const SET: Tag = Tag(0x31);

    /// Wrap an identifier octet, refusing the high-tag-number form.
    pub fn new(octet: u8) -> Result<Self> {
        if octet & HIGH_TAG_NUMBER_MASK == HIGH_TAG_NUMBER_MASK {
            return Err(FiskalError::UnsupportedTag(octet));
        }
        Ok(Self(octet))
    }

    /// Primitive context-specific tag `[number]`.
    pub fn context(number: u8) -> Result<Self> {
        Self::build(0x80, number)
    }

    /// Constructed context-specific tag `[number]`.
    pub fn context_constructed(number: u8) -> Result<Self> {
        Self::build(0x80 | CONSTRUCTED_BIT, number)
    }

    fn build(high_bits: u8, number: u8) -> Result<Self> {
        if number >= HIGH_TAG_NUMBER_MASK {
            return Err(FiskalError::UnsupportedTag(high_bits | HIGH_TAG_NUMBER_MASK));
        }
        Ok(Self(high_bits | number))
    }

    /// The raw identifier octet.
    pub fn octet(&self) -> u8 {
        self.0
    }

    /// Tag number (low five bits).
    pub fn number(&self) -> u8 {
        self.0 & HIGH_TAG_NUMBER_MASK
    }

    pub fn class(&self) -> TagClass {
        match self.0 >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    pub fn form(&self) -> TagForm {
        if self.0 & CONSTRUCTED_BIT != 0 {
            TagForm::Constructed
        } else {
            TagForm::Primitive
        }
    }

    pub fn is_constructed(&self) -> bool {
        self.form() == TagForm::Constructed
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_universal_primitive() {
        let tag = Tag::INTEGER;
        assert_eq!(tag.class(), TagClass::Universal);
        assert_eq!(tag.form(), TagForm::Primitive);
        assert_eq!(tag.number(), 2);
    }

    #[test]
    fn classifies_sequence_as_constructed() {
        assert_eq!(Tag::SEQUENCE.form(), TagForm::Constructed);
        assert_eq!(Tag::SEQUENCE.number(), 0x10);
    }

    #[test]
    fn classifies_all_classes() {
        assert_eq!(Tag::new(0x41).unwrap().class(), TagClass::Application);
        assert_eq!(Tag::new(0x85).unwrap().class(), TagClass::ContextSpecific);
        assert_eq!(Tag::new(0xC3).unwrap().class(), TagClass::Private);
    }

    #[test]
    fn high_tag_number_form_rejected() {
        for octet in [0x1F, 0x3F, 0x9F, 0xFF] {
            assert!(
                matches!(Tag::new(octet), Err(FiskalError::UnsupportedTag(o)) if o == octet),
                "0x{octet:02x} must be rejected"
            );
        }
    }

    #[test]
    fn context_tags() {
        assert_eq!(Tag::context(0).unwrap().octet(), 0x80);
        assert_eq!(Tag::context(5).unwrap().octet(), 0x85);
        assert_eq!(Tag::context_constructed(1).unwrap().octet(), 0xA1);
        assert!(Tag::context(31).is_err());
    }

    #[test]
    fn null_is_distinguished() {
        assert!(Tag::NULL.is_null());
        assert!(!Tag::OCTET_STRING.is_null());
    }
}
