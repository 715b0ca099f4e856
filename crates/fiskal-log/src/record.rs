// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record parsing and out-of-band verification.
//
// A record is `payload || signatureCounter || logTime || signatureValue`, all
// top-level TLVs.  The signed bytes are every top-level TLV except the last,
// so the verifier re-encodes the top-level nodes of the flat decode, skipping
// the children of constructed nodes (the algorithm OID inside the
// signatureAlgorithm SEQUENCE) and the signature value itself.

use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::{LogKind, OperationType, SignatureScheme};
use fiskal_der::{Tag, TagClass, TlvNode, decode_all, encode_all};
use fiskal_security::{check_public_key, verify_signature};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::payload::{
    FIELD_ADDITIONAL_EXTERNAL_DATA, FIELD_ADDITIONAL_INTERNAL_DATA, FIELD_CLIENT_ID,
    FIELD_OPERATION_TYPE, FIELD_PROCESS_DATA, FIELD_PROCESS_TYPE, FIELD_SYSTEM_OPERATION_DATA,
    FIELD_TRANSACTION_NUMBER,
};

fn as_hex<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn as_hex_opt<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serializer.serialize_some(&hex::encode(b)),
        None => serializer.serialize_none(),
    }
}

fn malformed(what: impl Into<String>) -> FiskalError {
    FiskalError::MalformedTlv(what.into())
}

/// Every field of a log record, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRecord {
    pub version: u64,
    pub kind: LogKind,
    pub operation: OperationType,
    pub client_id: Option<String>,
    #[serde(serialize_with = "as_hex_opt")]
    pub process_data: Option<Vec<u8>>,
    pub process_type: Option<String>,
    /// additionalExternalData for transactions, additionalInternalData for
    /// system records.
    #[serde(serialize_with = "as_hex_opt")]
    pub additional_data: Option<Vec<u8>>,
    /// Encoded operation-specific TLVs of a system record.
    #[serde(serialize_with = "as_hex_opt")]
    pub system_operation_data: Option<Vec<u8>>,
    pub transaction_number: Option<u64>,
    #[serde(serialize_with = "as_hex")]
    pub serial_number: Vec<u8>,
    pub scheme: SignatureScheme,
    pub signature_counter: u64,
    pub log_time: i64,
    #[serde(serialize_with = "as_hex")]
    pub signature: Vec<u8>,
    #[serde(skip)]
    signed_bytes: Vec<u8>,
}

/// Nesting depth of each node in a flat decode.
fn depths(nodes: &[TlvNode]) -> Result<Vec<usize>> {
    // Value bytes still unaccounted for in each enclosing constructed node.
    let mut remaining: Vec<usize> = Vec::new();
    let mut out = Vec::with_capacity(nodes.len());

    for node in nodes {
        while remaining.last() == Some(&0) {
            remaining.pop();
        }
        out.push(remaining.len());

        let len = node.encoded_len()?;
        if let Some(parent) = remaining.last_mut() {
            *parent = parent
                .checked_sub(len)
                .ok_or_else(|| malformed("child overruns its constructed parent"))?;
        }
        if node.is_constructed() && !node.value().is_empty() {
            remaining.push(node.value().len());
        }
    }
    Ok(out)
}

fn expect_tag<'a>(node: Option<&'a TlvNode>, tag: Tag, what: &str) -> Result<&'a TlvNode> {
    match node {
        Some(n) if n.tag() == tag => Ok(n),
        Some(n) => Err(malformed(format!("{what}: expected tag {tag}, found {}", n.tag()))),
        None => Err(malformed(format!("{what}: record ends early"))),
    }
}

fn text(node: &TlvNode) -> Result<String> {
    node.as_str().map(str::to_owned)
}

impl ParsedRecord {
    /// Decode a complete record.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let nodes = decode_all(bytes)?;
        let depths = depths(&nodes)?;

        // Position of each top-level node in the flat list.
        let top: Vec<usize> = depths
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let field = |n: usize| top.get(n).map(|&i| &nodes[i]);

        let version = expect_tag(field(0), Tag::INTEGER, "version")?.as_unsigned()?;
        let data_type = expect_tag(field(1), Tag::OBJECT_IDENTIFIER, "certifiedDataType")?.as_oid()?;
        let kind = LogKind::from_certified_data_type(&data_type)
            .ok_or_else(|| malformed(format!("unknown certifiedDataType {data_type}")))?;

        let mut record = Self {
            version,
            kind,
            operation: OperationType::Initialize,
            client_id: None,
            process_data: None,
            process_type: None,
            additional_data: None,
            system_operation_data: None,
            transaction_number: None,
            serial_number: Vec::new(),
            scheme: SignatureScheme::default(),
            signature_counter: 0,
            log_time: 0,
            signature: Vec::new(),
            signed_bytes: Vec::new(),
        };

        let mut operation = None;
        let mut next = 2;
        while let Some(node) = field(next) {
            if node.tag().class() != TagClass::ContextSpecific {
                break;
            }
            let number = node.tag().number();
            match (kind, number) {
                (_, FIELD_OPERATION_TYPE) => {
                    let name = node.as_str()?;
                    operation = Some(
                        OperationType::parse(name)
                            .ok_or_else(|| malformed(format!("unknown operation {name:?}")))?,
                    );
                }
                (LogKind::Transaction, FIELD_CLIENT_ID) => record.client_id = Some(text(node)?),
                (LogKind::Transaction, FIELD_PROCESS_DATA) => {
                    record.process_data = Some(node.value().to_vec());
                }
                (LogKind::Transaction, FIELD_PROCESS_TYPE) => {
                    record.process_type = Some(text(node)?);
                }
                (LogKind::Transaction, FIELD_ADDITIONAL_EXTERNAL_DATA)
                | (LogKind::System, FIELD_ADDITIONAL_INTERNAL_DATA) => {
                    record.additional_data = Some(node.value().to_vec());
                }
                (LogKind::Transaction, FIELD_TRANSACTION_NUMBER) => {
                    record.transaction_number = Some(node.as_unsigned()?);
                }
                (LogKind::System, FIELD_SYSTEM_OPERATION_DATA) => {
                    record.system_operation_data = Some(node.value().to_vec());
                }
                _ => {
                    return Err(malformed(format!(
                        "unexpected field [{number}] in a {} record",
                        kind.as_str()
                    )));
                }
            }
            next += 1;
        }

        record.operation = operation.ok_or_else(|| malformed("operationType missing"))?;
        if record.operation.kind() != kind {
            return Err(malformed(format!(
                "{} is not a {} operation",
                record.operation,
                kind.as_str()
            )));
        }
        if kind == LogKind::Transaction && record.transaction_number.is_none() {
            return Err(malformed("transactionNumber missing"));
        }

        record.serial_number = expect_tag(field(next), Tag::OCTET_STRING, "serialNumber")?
            .value()
            .to_vec();

        expect_tag(field(next + 1), Tag::SEQUENCE, "signatureAlgorithm")?;
        let algorithm_index = top[next + 1] + 1;
        let algorithm = expect_tag(
            nodes.get(algorithm_index),
            Tag::OBJECT_IDENTIFIER,
            "signatureAlgorithm",
        )?
        .as_oid()?;
        record.scheme = SignatureScheme::from_oid(&algorithm)
            .ok_or_else(|| malformed(format!("unknown signature algorithm {algorithm}")))?;

        record.signature_counter =
            expect_tag(field(next + 2), Tag::INTEGER, "signatureCounter")?.as_unsigned()?;
        let log_time = expect_tag(field(next + 3), Tag::INTEGER, "logTime")?.as_unsigned()?;
        record.log_time = i64::try_from(log_time)
            .map_err(|_| malformed(format!("logTime {log_time} out of range")))?;
        record.signature = expect_tag(field(next + 4), Tag::OCTET_STRING, "signatureValue")?
            .value()
            .to_vec();

        if top.len() != next + 5 {
            return Err(malformed(format!(
                "{} trailing TLVs after signatureValue",
                top.len() - (next + 5).min(top.len())
            )));
        }

        record.signed_bytes = encode_all(top[..next + 4].iter().map(|&i| &nodes[i]))?;
        Ok(record)
    }

    /// The exact bytes the signature was computed over.
    pub fn signed_bytes(&self) -> &[u8] {
        &self.signed_bytes
    }

    /// Check the signature against `public_key` using the record's scheme.
    pub fn verify(&self, public_key: &[u8]) -> bool {
        verify_signature(self.scheme, public_key, &self.signature, &self.signed_bytes)
    }
}

/// Parse `record` and check its signature.
///
/// `Ok(false)` means the record is well formed but the signature does not
/// match.  Malformed records and keys that do not fit the record's scheme
/// are errors.
pub fn verify_record(record: &[u8], public_key: &[u8]) -> Result<bool> {
    let parsed = ParsedRecord::parse(record)?;
    check_public_key(parsed.scheme, public_key)?;
    let valid = parsed.verify(public_key);
    debug!(
        signature_counter = parsed.signature_counter,
        operation = %parsed.operation,
        valid,
        "record verified"
    );
    Ok(valid)
}
