// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unsigned payload assembly for transaction and system log records.
//
// Payload layout:
//
//   version             INTEGER (2)
//   certifiedDataType   OBJECT IDENTIFIER
//   certifiedData       context-specific fields, per record kind
//   serialNumber        OCTET STRING
//   signatureAlgorithm  SEQUENCE { OBJECT IDENTIFIER }
//
// Transaction certifiedData:
//   [0] operationType  [1] clientId  [2] processData  [3] processType
//   [4] additionalExternalData (optional)  [5] transactionNumber
//
// System certifiedData:
//   [0] operationType  [1] systemOperationData  [2] additionalInternalData
//   (optional)

use fiskal_core::error::Result;
use fiskal_core::types::{
    LOG_FORMAT_VERSION, LogKind, LogOutCause, OperationType, SignatureScheme, UserRole,
};
use fiskal_der::{TlvNode, encode_all};

// ---------------------------------------------------------------------------
// Context-specific field numbers
// ---------------------------------------------------------------------------

pub const FIELD_OPERATION_TYPE: u8 = 0;
pub const FIELD_CLIENT_ID: u8 = 1;
pub const FIELD_PROCESS_DATA: u8 = 2;
pub const FIELD_PROCESS_TYPE: u8 = 3;
pub const FIELD_ADDITIONAL_EXTERNAL_DATA: u8 = 4;
pub const FIELD_TRANSACTION_NUMBER: u8 = 5;

pub const FIELD_SYSTEM_OPERATION_DATA: u8 = 1;
pub const FIELD_ADDITIONAL_INTERNAL_DATA: u8 = 2;

/// Identity of the TSE that signs the payload.
#[derive(Debug, Clone, Copy)]
pub struct Signatory<'a> {
    pub serial_number: &'a [u8],
    pub scheme: SignatureScheme,
}

/// Fields of a transaction log record.
#[derive(Debug, Clone, Copy)]
pub struct TransactionFields<'a> {
    pub operation: OperationType,
    pub client_id: &'a str,
    pub process_data: &'a [u8],
    pub process_type: &'a str,
    pub additional_data: Option<&'a [u8]>,
    pub transaction_number: u64,
}

/// PrintableString contents retagged as `[number]`.
fn printable_field(number: u8, text: &str) -> Result<TlvNode> {
    let node = TlvNode::printable_string(text)?;
    TlvNode::context(number, node.into_value())
}

fn assemble(signatory: Signatory<'_>, kind: LogKind, certified: Vec<TlvNode>) -> Result<Vec<u8>> {
    let mut fields = Vec::with_capacity(certified.len() + 4);
    fields.push(TlvNode::integer(LOG_FORMAT_VERSION));
    fields.push(TlvNode::oid(kind.certified_data_type())?);
    fields.extend(certified);
    fields.push(TlvNode::octet_string(signatory.serial_number));
    fields.push(TlvNode::sequence(&[TlvNode::oid(signatory.scheme.oid())?])?);
    encode_all(&fields)
}

/// Payload of a start, update or finish transaction record.
pub fn transaction_payload(signatory: Signatory<'_>, fields: &TransactionFields<'_>) -> Result<Vec<u8>> {
    let mut certified = vec![
        printable_field(FIELD_OPERATION_TYPE, fields.operation.as_str())?,
        printable_field(FIELD_CLIENT_ID, fields.client_id)?,
        TlvNode::context(FIELD_PROCESS_DATA, fields.process_data)?,
        printable_field(FIELD_PROCESS_TYPE, fields.process_type)?,
    ];
    if let Some(additional) = fields.additional_data {
        certified.push(TlvNode::context(FIELD_ADDITIONAL_EXTERNAL_DATA, additional)?);
    }
    certified.push(TlvNode::context(
        FIELD_TRANSACTION_NUMBER,
        TlvNode::integer(fields.transaction_number).into_value(),
    )?);

    assemble(signatory, LogKind::Transaction, certified)
}

/// Payload of a system operation record.
///
/// `operation_data` is the operation-specific TLV list; it is carried
/// encoded inside the `systemOperationData` field.
pub fn system_payload(
    signatory: Signatory<'_>,
    operation: OperationType,
    operation_data: &[TlvNode],
    additional_internal_data: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut certified = vec![
        printable_field(FIELD_OPERATION_TYPE, operation.as_str())?,
        TlvNode::context(FIELD_SYSTEM_OPERATION_DATA, encode_all(operation_data)?)?,
    ];
    if let Some(additional) = additional_internal_data {
        certified.push(TlvNode::context(FIELD_ADDITIONAL_INTERNAL_DATA, additional)?);
    }

    assemble(signatory, LogKind::System, certified)
}

// ---------------------------------------------------------------------------
// systemOperationData schemas
// ---------------------------------------------------------------------------

/// `initialize`: description, or NULL when none is given.
pub fn initialize_data(description: Option<&str>) -> Result<Vec<TlvNode>> {
    Ok(vec![match description {
        Some(text) => TlvNode::printable_string(text)?,
        None => TlvNode::null(),
    }])
}

/// `updateTime`: clock reading before and after the update, Unix seconds.
pub fn update_time_data(before: u64, after: u64) -> Vec<TlvNode> {
    vec![TlvNode::integer(before), TlvNode::integer(after)]
}

/// `disable`: no data, a NULL placeholder.
pub fn disable_data() -> Vec<TlvNode> {
    vec![TlvNode::null()]
}

/// `authenticateUser`: user id, role (NULL when none), result.
pub fn authenticate_user_data(
    user_id: &str,
    role: Option<UserRole>,
    authenticated: bool,
) -> Result<Vec<TlvNode>> {
    Ok(vec![
        TlvNode::printable_string(user_id)?,
        role.map_or_else(TlvNode::null, |r| TlvNode::enumerated(r.code())),
        TlvNode::boolean(authenticated),
    ])
}

/// `logOut`: user id and cause.
pub fn log_out_data(user_id: &str, cause: LogOutCause) -> Result<Vec<TlvNode>> {
    Ok(vec![
        TlvNode::printable_string(user_id)?,
        TlvNode::enumerated(cause.code()),
    ])
}

/// `unblockUser`: user id and result.
pub fn unblock_user_data(user_id: &str, unblocked: bool) -> Result<Vec<TlvNode>> {
    Ok(vec![
        TlvNode::printable_string(user_id)?,
        TlvNode::boolean(unblocked),
    ])
}
