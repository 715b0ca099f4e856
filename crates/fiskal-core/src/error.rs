// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Fiskal.

use thiserror::Error;

/// Top-level error type for all Fiskal operations.
#[derive(Debug, Error)]
pub enum FiskalError {
    // -- Encoding errors --
    #[error("malformed TLV: {0}")]
    MalformedTlv(String),

    #[error("unsupported tag 0x{0:02x}: high-tag-number form is not supported")]
    UnsupportedTag(u8),

    #[error("value of {0} bytes is too big to length-encode")]
    ValueTooBig(usize),

    #[error("tag 0x{0:02x} requires a value")]
    MissingValue(u8),

    #[error("invalid object identifier: {0}")]
    InvalidOid(String),

    // -- Counter errors --
    #[error("signature counter exhausted at {0}")]
    SignatureCounterOverflow(u64),

    #[error("transaction counter exhausted at {0}")]
    TransactionCounterOverflow(u64),

    // -- State errors --
    #[error("too many open transactions (maximum {max})")]
    TooManyOpenTransactions { max: usize },

    #[error("no open transaction with number {0}")]
    NoSuchTransaction(u64),

    #[error("TSE is shut down")]
    ShutDown,

    // -- Input errors --
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    // -- Time errors --
    #[error("invalid time {0}: must lie in [2019-01-01T00:00:00Z, 2100-01-01T00:00:00Z)")]
    InvalidTime(i64),

    // -- Crypto errors --
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("signature verification failed: {0}")]
    Verification(String),

    // -- Environment --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Bugs --
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Coarse classification of a [`FiskalError`].
///
/// Everything except [`ErrorClass::Invariant`] is an expected outcome the
/// caller is meant to handle. `Invariant` means internal state is
/// inconsistent and indicates a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Encoding,
    Counter,
    State,
    Input,
    Time,
    Crypto,
    Environment,
    Invariant,
}

impl FiskalError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedTlv(_)
            | Self::UnsupportedTag(_)
            | Self::ValueTooBig(_)
            | Self::MissingValue(_)
            | Self::InvalidOid(_) => ErrorClass::Encoding,
            Self::SignatureCounterOverflow(_) | Self::TransactionCounterOverflow(_) => {
                ErrorClass::Counter
            }
            Self::TooManyOpenTransactions { .. } | Self::NoSuchTransaction(_) | Self::ShutDown => {
                ErrorClass::State
            }
            Self::InvalidInput { .. } => ErrorClass::Input,
            Self::InvalidTime(_) => ErrorClass::Time,
            Self::Signing(_) | Self::Verification(_) => ErrorClass::Crypto,
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorClass::Environment
            }
            Self::Internal(_) => ErrorClass::Invariant,
        }
    }

    /// `true` when the error signals a bug rather than a domain outcome.
    pub fn is_invariant_violation(&self) -> bool {
        self.class() == ErrorClass::Invariant
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FiskalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_outcomes_are_not_invariant_violations() {
        assert!(!FiskalError::NoSuchTransaction(7).is_invariant_violation());
        assert!(!FiskalError::MalformedTlv("short".into()).is_invariant_violation());
        assert!(FiskalError::Internal("lock poisoned".into()).is_invariant_violation());
    }

    #[test]
    fn classes() {
        assert_eq!(FiskalError::ValueTooBig(1).class(), ErrorClass::Encoding);
        assert_eq!(
            FiskalError::SignatureCounterOverflow(u64::MAX - 1).class(),
            ErrorClass::Counter
        );
        assert_eq!(
            FiskalError::TooManyOpenTransactions { max: 2 }.class(),
            ErrorClass::State
        );
        assert_eq!(FiskalError::ShutDown.class(), ErrorClass::State);
        assert_eq!(
            FiskalError::InvalidInput {
                field: "client_id",
                reason: "empty".into()
            }
            .class(),
            ErrorClass::Input
        );
        assert_eq!(FiskalError::InvalidTime(0).class(), ErrorClass::Time);
        assert_eq!(FiskalError::Signing("x".into()).class(), ErrorClass::Crypto);
    }

    #[test]
    fn display_mentions_transaction_number() {
        let msg = FiskalError::NoSuchTransaction(42).to_string();
        assert!(msg.contains("42"), "got {msg}");
    }
}
