// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signing core — produces the signed trailer of every log record.
//
// Trailer layout (all DER):
//
//   signatureCounter  INTEGER       counter after this signature
//   logTime           INTEGER       simulated clock, Unix seconds
//   signatureValue    OCTET STRING  ECDSA over payload || counter || time
//
// Appending the trailer to the payload reproduces the signed bytes followed
// by the signature, which is what lets a verifier rebuild the message.

use chrono::{DateTime, Utc};
use fiskal_core::TseConfig;
use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::{CertificateValidity, SignatureScheme, StateSnapshot};
use fiskal_der::TlvNode;
use tracing::{debug, info, instrument, warn};

use crate::algorithm::{EcdsaKey, SignatureAlgorithm};
use crate::certificate::is_certificate_expired;
use crate::clock::SimulatedClock;
use crate::counter::MonotonicCounter;
use crate::integrity::serial_number;

/// Key, signature counter, clock and certificate of one TSE.
///
/// Every mutating method takes `&mut self`; sharing a core between threads
/// means wrapping it in a lock, which serialises signatures in arrival order.
pub struct SigningCore {
    algorithm: Box<dyn SignatureAlgorithm>,
    counter: MonotonicCounter,
    clock: SimulatedClock,
    certificate: CertificateValidity,
    serial_number: Vec<u8>,
}

impl SigningCore {
    /// Assemble a core from its parts, resuming counter and clock.
    pub fn new(
        algorithm: Box<dyn SignatureAlgorithm>,
        certificate: CertificateValidity,
        signature_counter: u64,
        clock_offset_secs: i64,
    ) -> Result<Self> {
        let serial_number = serial_number(algorithm.public_key())?;
        let counter = MonotonicCounter::starting_at(signature_counter)?;
        let clock = SimulatedClock::with_offset(clock_offset_secs)?;

        Ok(Self {
            algorithm,
            counter,
            clock,
            certificate,
            serial_number,
        })
    }

    /// Build the core described by `config`, resuming from `snapshot`.
    ///
    /// Loads the PKCS#8 key from `config.key_path` when set, otherwise
    /// generates a fresh key for the configured scheme.
    #[instrument(skip_all, fields(scheme = %config.signature_scheme))]
    pub fn from_config(config: &TseConfig, snapshot: &StateSnapshot) -> Result<Self> {
        let key = match &config.key_path {
            Some(path) => EcdsaKey::load(config.signature_scheme, path)?,
            None => {
                warn!("no key_path configured, generating an ephemeral key");
                EcdsaKey::generate(config.signature_scheme)?
            }
        };

        let core = Self::new(
            Box::new(key),
            config.certificate.clone(),
            snapshot.signature_counter,
            snapshot.clock_offset_secs,
        )?;

        info!(
            serial = %hex::encode(&core.serial_number),
            signature_counter = core.counter.value(),
            "signing core ready"
        );
        Ok(core)
    }

    /// Sign `payload` and return its trailer.
    ///
    /// Fails with [`FiskalError::SignatureCounterOverflow`] when the counter is
    /// at its ceiling.  On any failure the counter is left as it was.
    #[instrument(skip_all, fields(payload_len = payload.len()))]
    pub fn sign(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let next = self
            .counter
            .peek_next()
            .ok_or(FiskalError::SignatureCounterOverflow(self.counter.value()))?;

        let log_time = u64::try_from(self.clock.unix_time()).map_err(|_| {
            FiskalError::Internal("simulated clock is before the Unix epoch".into())
        })?;

        let counter_tlv = TlvNode::integer(next).encode()?;
        let time_tlv = TlvNode::integer(log_time).encode()?;

        let mut signed = Vec::with_capacity(payload.len() + counter_tlv.len() + time_tlv.len());
        signed.extend_from_slice(payload);
        signed.extend_from_slice(&counter_tlv);
        signed.extend_from_slice(&time_tlv);

        let signature = self.algorithm.sign(&signed)?;
        let signature_tlv = TlvNode::octet_string(signature).encode()?;

        self.counter.commit(next)?;

        let mut trailer =
            Vec::with_capacity(counter_tlv.len() + time_tlv.len() + signature_tlv.len());
        trailer.extend_from_slice(&counter_tlv);
        trailer.extend_from_slice(&time_tlv);
        trailer.extend_from_slice(&signature_tlv);

        debug!(signature_counter = next, log_time, "payload signed");
        Ok(trailer)
    }

    /// Check a signature produced by this core's key.
    pub fn verify(&self, signature: &[u8], signed_bytes: &[u8]) -> bool {
        self.algorithm.verify(signature, signed_bytes)
    }

    /// Set the simulated clock; refused outside 2019..2100.
    pub fn set_clock(&mut self, instant: DateTime<Utc>) -> Result<()> {
        self.clock.set(instant)
    }

    /// Follow host time again.
    pub fn resync_clock(&mut self) {
        self.clock.resync();
    }

    /// Copy of the clock, for rolling back a clock change whose log record
    /// could not be signed.
    pub fn clock(&self) -> SimulatedClock {
        self.clock
    }

    pub fn restore_clock(&mut self, clock: SimulatedClock) {
        self.clock = clock;
    }

    /// Current TSE time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock_offset_secs(&self) -> i64 {
        self.clock.offset_secs()
    }

    pub fn is_certificate_expired(&self) -> bool {
        is_certificate_expired(&self.certificate, self.clock.now())
    }

    /// SHA-256 over the public key point.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn signature_counter(&self) -> u64 {
        self.counter.value()
    }

    pub fn public_key(&self) -> &[u8] {
        self.algorithm.public_key()
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.algorithm.scheme()
    }
}
