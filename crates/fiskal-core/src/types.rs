// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Fiskal TSE simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Earliest instant the simulated clock may show (2019-01-01T00:00:00Z).
pub const CLOCK_LOWER_BOUND: i64 = 1_546_300_800;

/// First instant the simulated clock may no longer show (2100-01-01T00:00:00Z).
pub const CLOCK_UPPER_BOUND: i64 = 4_102_444_800;

/// Record format version written into every log record.
pub const LOG_FORMAT_VERSION: u64 = 2;

/// First character of `text` outside the PrintableString repertoire
/// (X.680: letters, digits, space and `'()+,-./:=?`).
pub fn first_unprintable(text: &str) -> Option<char> {
    text.chars().find(|&c| {
        !(c.is_ascii_alphanumeric()
            || matches!(c, ' ' | '\'' | '(' | ')' | '+' | ',' | '-' | '.' | '/' | ':' | '=' | '?'))
    })
}

/// The two elliptic-curve signature schemes a TSE can be configured with.
///
/// Both produce plain (fixed-width `r || s`) signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// ECDSA over NIST P-256 with SHA-256.
    #[serde(rename = "ecdsa-plain-SHA256")]
    EcdsaPlainSha256,
    /// ECDSA over NIST P-384 with SHA-384.
    #[serde(rename = "ecdsa-plain-SHA384")]
    EcdsaPlainSha384,
}

impl SignatureScheme {
    /// Dotted-decimal algorithm identifier embedded in every record.
    pub fn oid(&self) -> &'static str {
        match self {
            Self::EcdsaPlainSha256 => "0.4.0.127.0.7.1.1.4.1.3",
            Self::EcdsaPlainSha384 => "0.4.0.127.0.7.1.1.4.1.4",
        }
    }

    /// Configuration name of the scheme.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EcdsaPlainSha256 => "ecdsa-plain-SHA256",
            Self::EcdsaPlainSha384 => "ecdsa-plain-SHA384",
        }
    }

    /// Resolve a scheme from its algorithm identifier.
    pub fn from_oid(oid: &str) -> Option<Self> {
        [Self::EcdsaPlainSha256, Self::EcdsaPlainSha384]
            .into_iter()
            .find(|s| s.oid() == oid)
    }

    /// Length in bytes of a fixed-width signature.
    pub fn signature_len(&self) -> usize {
        match self {
            Self::EcdsaPlainSha256 => 64,
            Self::EcdsaPlainSha384 => 96,
        }
    }
}

impl Default for SignatureScheme {
    fn default() -> Self {
        Self::EcdsaPlainSha256
    }
}

impl std::fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed time window, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl ValidityWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Validity information published by the TSE certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValidity {
    /// NotBefore / NotAfter of the certificate itself.
    pub validity: ValidityWindow,
    /// Optional private-key-usage-period extension. When present the key may
    /// only be used inside this (usually narrower) window.
    #[serde(default)]
    pub private_key_usage_period: Option<ValidityWindow>,
}

/// Which kind of log record a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Transaction,
    System,
}

impl LogKind {
    /// `certifiedDataType` identifier for this record kind.
    pub fn certified_data_type(&self) -> &'static str {
        match self {
            Self::Transaction => "0.4.0.127.0.7.3.7.1.1",
            Self::System => "0.4.0.127.0.7.3.7.1.2",
        }
    }

    pub fn from_certified_data_type(oid: &str) -> Option<Self> {
        [Self::Transaction, Self::System]
            .into_iter()
            .find(|k| k.certified_data_type() == oid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::System => "system",
        }
    }
}

/// The operation a log record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    StartTransaction,
    UpdateTransaction,
    FinishTransaction,
    Initialize,
    UpdateTime,
    Disable,
    AuthenticateUser,
    LogOut,
    UnblockUser,
}

impl OperationType {
    const ALL: [Self; 9] = [
        Self::StartTransaction,
        Self::UpdateTransaction,
        Self::FinishTransaction,
        Self::Initialize,
        Self::UpdateTime,
        Self::Disable,
        Self::AuthenticateUser,
        Self::LogOut,
        Self::UnblockUser,
    ];

    /// PrintableString written into the `operationType` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartTransaction => "StartTransaction",
            Self::UpdateTransaction => "UpdateTransaction",
            Self::FinishTransaction => "FinishTransaction",
            Self::Initialize => "Initialize",
            Self::UpdateTime => "UpdateTime",
            Self::Disable => "Disable",
            Self::AuthenticateUser => "AuthenticateUser",
            Self::LogOut => "LogOut",
            Self::UnblockUser => "UnblockUser",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn kind(&self) -> LogKind {
        match self {
            Self::StartTransaction | Self::UpdateTransaction | Self::FinishTransaction => {
                LogKind::Transaction
            }
            _ => LogKind::System,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles a user can authenticate as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    TimeAdmin,
}

impl UserRole {
    /// ENUMERATED value written into `authenticateUser` records.
    pub fn code(&self) -> u64 {
        match self {
            Self::Admin => 0,
            Self::TimeAdmin => 1,
        }
    }
}

/// Why a user session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogOutCause {
    User,
    Timeout,
    DifferentUserLoggedIn,
}

impl LogOutCause {
    /// ENUMERATED value written into `logOut` records.
    pub fn code(&self) -> u64 {
        match self {
            Self::User => 0,
            Self::Timeout => 1,
            Self::DifferentUserLoggedIn => 2,
        }
    }
}

/// Counter and clock state carried across process lifetimes.
///
/// The TSE accepts a snapshot at construction and produces one on demand;
/// writing it somewhere durable is the storage layer's job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub signature_counter: u64,
    pub transaction_counter: u64,
    /// Seconds added to host wall-clock time to obtain TSE time.
    pub clock_offset_secs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn printable_repertoire() {
        assert_eq!(first_unprintable("TSE-Shutdown (1/2) = ok?"), None);
        assert_eq!(first_unprintable("TSE_Shutdown"), Some('_'));
        assert_eq!(first_unprintable("Kasse\u{e4}"), Some('\u{e4}'));
    }

    #[test]
    fn scheme_oid_lookup() {
        for scheme in [SignatureScheme::EcdsaPlainSha256, SignatureScheme::EcdsaPlainSha384] {
            assert_eq!(SignatureScheme::from_oid(scheme.oid()), Some(scheme));
        }
        assert_eq!(SignatureScheme::from_oid("1.2.3"), None);
    }

    #[test]
    fn scheme_serializes_by_name() {
        let json = serde_json::to_string(&SignatureScheme::EcdsaPlainSha384).unwrap();
        assert_eq!(json, "\"ecdsa-plain-SHA384\"");
        let back: SignatureScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SignatureScheme::EcdsaPlainSha384);
    }

    #[test]
    fn operation_type_names_round_trip() {
        for op in OperationType::ALL {
            assert_eq!(OperationType::parse(op.as_str()), Some(op));
        }
        assert_eq!(OperationType::StartTransaction.kind(), LogKind::Transaction);
        assert_eq!(OperationType::AuthenticateUser.kind(), LogKind::System);
    }

    #[test]
    fn clock_bounds_match_calendar() {
        assert_eq!(
            Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap().timestamp(),
            CLOCK_LOWER_BOUND
        );
        assert_eq!(
            Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap().timestamp(),
            CLOCK_UPPER_BOUND
        );
    }

    #[test]
    fn validity_window_is_inclusive() {
        let window = ValidityWindow {
            not_before: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
        };
        assert!(window.contains(window.not_before));
        assert!(window.contains(window.not_after));
        assert!(!window.contains(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 1).unwrap()));
    }

    #[test]
    fn negative_snapshot_counter_is_rejected() {
        let json = r#"{"signature_counter":-1,"transaction_counter":0,"clock_offset_secs":0}"#;
        assert!(serde_json::from_str::<StateSnapshot>(json).is_err());
    }
}
