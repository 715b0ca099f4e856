// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Elliptic-curve signature schemes: ECDSA P-256/SHA-256 and P-384/SHA-384
// with plain (fixed-width r || s) signatures.
//
// # Design note
//
// The scheme is chosen once, when the key is created or loaded.  Everything
// downstream talks to the `SignatureAlgorithm` capability and never asks
// which curve it is on.

use std::path::Path;

use fiskal_core::error::{FiskalError, Result};
use fiskal_core::types::SignatureScheme;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED,
    ECDSA_P384_SHA384_FIXED_SIGNING, EcdsaKeyPair, EcdsaSigningAlgorithm,
    EcdsaVerificationAlgorithm, KeyPair, UnparsedPublicKey,
};
use tracing::{debug, instrument};

/// The signing capability the TSE needs from a key.
pub trait SignatureAlgorithm: Send + Sync {
    /// Sign `message`, returning the raw signature value.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// Check `signature` over `message` against this key's public half.
    fn verify(&self, signature: &[u8], message: &[u8]) -> bool;

    /// Uncompressed SEC1 public key (`0x04 || x || y`).
    fn public_key(&self) -> &[u8];

    /// Scheme the key signs with.
    fn scheme(&self) -> SignatureScheme;
}

fn signing_algorithm(scheme: SignatureScheme) -> &'static EcdsaSigningAlgorithm {
    match scheme {
        SignatureScheme::EcdsaPlainSha256 => &ECDSA_P256_SHA256_FIXED_SIGNING,
        SignatureScheme::EcdsaPlainSha384 => &ECDSA_P384_SHA384_FIXED_SIGNING,
    }
}

fn verification_algorithm(scheme: SignatureScheme) -> &'static EcdsaVerificationAlgorithm {
    match scheme {
        SignatureScheme::EcdsaPlainSha256 => &ECDSA_P256_SHA256_FIXED,
        SignatureScheme::EcdsaPlainSha384 => &ECDSA_P384_SHA384_FIXED,
    }
}

/// Reject a public key that cannot be an uncompressed point on `scheme`'s
/// curve.  Plain signatures are `r || s`, so the point is one byte longer.
pub fn check_public_key(scheme: SignatureScheme, public_key: &[u8]) -> Result<()> {
    let expected = scheme.signature_len() + 1;
    if public_key.len() != expected || public_key.first() != Some(&0x04) {
        return Err(FiskalError::Verification(format!(
            "public key is not an uncompressed {scheme} point ({} bytes, expected {expected})",
            public_key.len()
        )));
    }
    Ok(())
}

/// Verify a plain ECDSA signature with nothing but the public key.
///
/// This is what an out-of-band verifier uses; it never needs the private key.
pub fn verify_signature(
    scheme: SignatureScheme,
    public_key: &[u8],
    signature: &[u8],
    message: &[u8],
) -> bool {
    UnparsedPublicKey::new(verification_algorithm(scheme), public_key)
        .verify(message, signature)
        .is_ok()
}

/// An ECDSA key pair bound to one [`SignatureScheme`].
///
/// The private key is kept as a PKCS#8 v1 DER document so it can be written
/// out and loaded again across restarts.
pub struct EcdsaKey {
    scheme: SignatureScheme,
    /// PKCS#8 v1 DER-encoded private key (includes the public key).
    pkcs8_der: Vec<u8>,
    key_pair: EcdsaKeyPair,
    /// Uncompressed SEC1 public key bytes.
    public_key: Vec<u8>,
    rng: SystemRandom,
}

impl EcdsaKey {
    /// Generate a fresh key pair using the OS CSPRNG.
    #[instrument(skip_all, fields(scheme = %scheme))]
    pub fn generate(scheme: SignatureScheme) -> Result<Self> {
        let rng = SystemRandom::new();

        let pkcs8_document = EcdsaKeyPair::generate_pkcs8(signing_algorithm(scheme), &rng)
            .map_err(|e| FiskalError::Signing(format!("key generation failed: {e}")))?;

        Self::from_pkcs8(scheme, pkcs8_document.as_ref())
    }

    /// Parse a PKCS#8 v1 private key for `scheme`.
    ///
    /// Fails when the key is on the wrong curve for the scheme.
    pub fn from_pkcs8(scheme: SignatureScheme, pkcs8_der: &[u8]) -> Result<Self> {
        let rng = SystemRandom::new();

        let key_pair = EcdsaKeyPair::from_pkcs8(signing_algorithm(scheme), pkcs8_der, &rng)
            .map_err(|e| FiskalError::Signing(format!("key parsing failed: {e}")))?;

        let public_key = key_pair.public_key().as_ref().to_vec();

        debug!(
            %scheme,
            pkcs8_len = pkcs8_der.len(),
            pubkey_len = public_key.len(),
            "ECDSA key pair loaded"
        );

        Ok(Self {
            scheme,
            pkcs8_der: pkcs8_der.to_vec(),
            key_pair,
            public_key,
            rng,
        })
    }

    /// Read a PKCS#8 DER file.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), scheme = %scheme))]
    pub fn load(scheme: SignatureScheme, path: impl AsRef<Path>) -> Result<Self> {
        let der = std::fs::read(path.as_ref())?;
        Self::from_pkcs8(scheme, &der)
    }

    /// Write the PKCS#8 DER document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.pkcs8_der)?;
        Ok(())
    }

    /// The PKCS#8 v1 DER-encoded private key.
    pub fn private_key_pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }
}

impl SignatureAlgorithm for EcdsaKey {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let sig = self
            .key_pair
            .sign(&self.rng, message)
            .map_err(|e| FiskalError::Signing(format!("ECDSA signing failed: {e}")))?;

        Ok(sig.as_ref().to_vec())
    }

    fn verify(&self, signature: &[u8], message: &[u8]) -> bool {
        verify_signature(self.scheme, &self.public_key, signature, message)
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMES: [SignatureScheme; 2] =
        [SignatureScheme::EcdsaPlainSha256, SignatureScheme::EcdsaPlainSha384];

    #[test]
    fn generate_key_pair() {
        for (scheme, point_len) in SCHEMES.into_iter().zip([65, 97]) {
            let key = EcdsaKey::generate(scheme).expect("key generation failed");
            assert_eq!(key.public_key().len(), point_len);
            assert_eq!(key.public_key()[0], 0x04, "must be uncompressed point");
            assert_eq!(key.scheme(), scheme);
        }
    }

    #[test]
    fn public_key_shape() {
        let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).unwrap();
        assert!(check_public_key(SignatureScheme::EcdsaPlainSha256, key.public_key()).is_ok());
        assert!(matches!(
            check_public_key(SignatureScheme::EcdsaPlainSha384, key.public_key()),
            Err(FiskalError::Verification(_))
        ));
        assert!(check_public_key(SignatureScheme::EcdsaPlainSha256, &key.public_key()[1..]).is_err());
        let mut compressed = key.public_key().to_vec();
        compressed[0] = 0x02;
        assert!(check_public_key(SignatureScheme::EcdsaPlainSha256, &compressed).is_err());
    }

    #[test]
    fn sign_and_verify() {
        for scheme in SCHEMES {
            let key = EcdsaKey::generate(scheme).expect("key generation failed");
            let message = b"Fiskal start transaction";

            let signature = key.sign(message).expect("signing failed");
            assert_eq!(signature.len(), scheme.signature_len());

            assert!(key.verify(&signature, message));
            assert!(verify_signature(scheme, key.public_key(), &signature, message));
            assert!(!key.verify(&signature, b"tampered"));
        }
    }

    #[test]
    fn wrong_scheme_does_not_verify() {
        let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).unwrap();
        let signature = key.sign(b"x").unwrap();
        assert!(!verify_signature(
            SignatureScheme::EcdsaPlainSha384,
            key.public_key(),
            &signature,
            b"x"
        ));
    }

    #[test]
    fn pkcs8_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tse.pk8");

        let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha384).unwrap();
        key.save(&path).unwrap();

        let loaded = EcdsaKey::load(SignatureScheme::EcdsaPlainSha384, &path).unwrap();
        assert_eq!(loaded.public_key(), key.public_key());

        let signature = loaded.sign(b"reloaded").unwrap();
        assert!(key.verify(&signature, b"reloaded"));
    }

    #[test]
    fn key_on_wrong_curve_rejected() {
        let key = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).unwrap();
        let result =
            EcdsaKey::from_pkcs8(SignatureScheme::EcdsaPlainSha384, key.private_key_pkcs8_der());
        assert!(matches!(result, Err(FiskalError::Signing(_))));
    }

    #[test]
    fn different_keys_each_time() {
        let a = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).expect("gen a");
        let b = EcdsaKey::generate(SignatureScheme::EcdsaPlainSha256).expect("gen b");
        assert_ne!(a.public_key(), b.public_key());
    }
}
