// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! CA key material, partitioned by purpose.
//!
//! The engine never touches private keys directly: every signature and every
//! key transport decryption goes through a [`CaSigningKey`]. How the keys are
//! held (software keystore, PKCS#11 session, HSM) is up to the implementation.

use crate::error::{Error, Result};
use crate::rsa;
use const_oid::ObjectIdentifier;
use const_oid::db::rfc5912::{
    SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION, SHA_512_WITH_RSA_ENCRYPTION,
};
use der::asn1::Any;
use serde::{Deserialize, Serialize};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Role a CA key is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPurpose {
    /// Signs issued certificates.
    CertSign,
    /// Signs revocation lists.
    CrlSign,
    /// Unwraps key recovery content encryption keys.
    KeyEncrypt,
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyPurpose::CertSign => "certSign",
            KeyPurpose::CrlSign => "crlSign",
            KeyPurpose::KeyEncrypt => "keyEncrypt",
        })
    }
}

/// Signature scheme a CA key signs with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// sha256WithRSAEncryption (1.2.840.113549.1.1.11).
    #[default]
    Sha256WithRsa,
    /// sha384WithRSAEncryption (1.2.840.113549.1.1.12).
    Sha384WithRsa,
    /// sha512WithRSAEncryption (1.2.840.113549.1.1.13).
    Sha512WithRsa,
}

impl SignatureAlgorithm {
    /// Returns the signature algorithm OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRsa => SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRsa => SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRsa => SHA_512_WITH_RSA_ENCRYPTION,
        }
    }

    /// Looks up the algorithm an OID names.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::Sha384WithRsa,
            SignatureAlgorithm::Sha512WithRsa,
        ]
        .into_iter()
        .find(|alg| alg.oid() == *oid)
    }

    /// Returns the AlgorithmIdentifier embedded in certificates and CRLs. The
    /// PKCS#1 v1.5 identifiers carry explicit NULL parameters (RFC 4055).
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::null()),
        }
    }
}

/// Capability handle over a CA's private keys.
///
/// Implementations must return [`Error::TokenOffline`] when the key for a
/// purpose is unreachable, and must be callable from any thread; whether
/// concurrent calls for the same purpose are allowed is up to them.
pub trait CaSigningKey: Send + Sync {
    /// Signs `data` with the key for `purpose`.
    fn sign(&self, purpose: KeyPurpose, data: &[u8]) -> Result<Vec<u8>>;

    /// Returns the public half of the key for `purpose`.
    fn public_key(&self, purpose: KeyPurpose) -> Result<SubjectPublicKeyInfoOwned>;

    /// Performs key transport decryption with the key for `purpose`.
    fn decrypt(&self, purpose: KeyPurpose, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// Reports the signature algorithm the key for `purpose` produces.
    fn signature_algorithm(&self, purpose: KeyPurpose) -> Result<SignatureAlgorithm>;

    /// Identifies the cryptographic provider backing the keys.
    fn provider_id(&self) -> String;
}

struct SoftKey {
    secret: rsa::SecretKey,
    algorithm: SignatureAlgorithm,
}

/// Software keystore holding one RSA key per purpose in memory.
pub struct SoftCaToken {
    keys: HashMap<KeyPurpose, SoftKey>,
    active: AtomicBool,
}

impl SoftCaToken {
    /// Provider identity reported by software tokens.
    pub const PROVIDER_ID: &'static str = "caforge-soft";

    /// Creates an empty, active token.
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            active: AtomicBool::new(true),
        }
    }

    /// Creates a token with freshly generated keys: one signing key shared by
    /// certificate and CRL signing, and a separate key transport key.
    pub fn generate(algorithm: SignatureAlgorithm, bits: usize) -> Result<Self> {
        let sign = rsa::SecretKey::generate(bits).map_err(|e| Error::TokenOperation {
            purpose: KeyPurpose::CertSign,
            details: e.to_string(),
        })?;
        let encrypt = rsa::SecretKey::generate(bits).map_err(|e| Error::TokenOperation {
            purpose: KeyPurpose::KeyEncrypt,
            details: e.to_string(),
        })?;
        debug!(bits, ?algorithm, "generated software CA keys");

        Ok(Self::new()
            .with_key(KeyPurpose::CertSign, sign.clone(), algorithm)
            .with_key(KeyPurpose::CrlSign, sign, algorithm)
            .with_key(KeyPurpose::KeyEncrypt, encrypt, algorithm))
    }

    /// Installs a key for a purpose, replacing any previous one.
    pub fn with_key(
        mut self,
        purpose: KeyPurpose,
        secret: rsa::SecretKey,
        algorithm: SignatureAlgorithm,
    ) -> Self {
        self.keys.insert(purpose, SoftKey { secret, algorithm });
        self
    }

    /// Installs a PKCS#8 PEM key for a purpose.
    pub fn with_pem_key(
        self,
        purpose: KeyPurpose,
        pem: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<Self> {
        let secret = rsa::SecretKey::from_pem(pem).map_err(|e| Error::TokenOperation {
            purpose,
            details: e.to_string(),
        })?;
        Ok(self.with_key(purpose, secret, algorithm))
    }

    /// Makes the keys usable again.
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Takes the token offline; every operation fails until reactivated.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Reports whether the token is online.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn key(&self, purpose: KeyPurpose) -> Result<&SoftKey> {
        if !self.is_active() {
            warn!(%purpose, "software CA token is deactivated");
            return Err(Error::TokenOffline { purpose });
        }
        self.keys.get(&purpose).ok_or_else(|| {
            warn!(%purpose, "software CA token holds no key for purpose");
            Error::TokenOffline { purpose }
        })
    }
}

impl Default for SoftCaToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CaSigningKey for SoftCaToken {
    fn sign(&self, purpose: KeyPurpose, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.key(purpose)?;
        key.secret
            .sign(key.algorithm, data)
            .map_err(|e| Error::TokenOperation {
                purpose,
                details: e.to_string(),
            })
    }

    fn public_key(&self, purpose: KeyPurpose) -> Result<SubjectPublicKeyInfoOwned> {
        self.key(purpose)?
            .secret
            .public_key()
            .to_spki()
            .map_err(|e| Error::TokenOperation {
                purpose,
                details: e.to_string(),
            })
    }

    fn decrypt(&self, purpose: KeyPurpose, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.key(purpose)?
            .secret
            .decrypt(ciphertext)
            .map_err(|e| Error::TokenOperation {
                purpose,
                details: e.to_string(),
            })
    }

    fn signature_algorithm(&self, purpose: KeyPurpose) -> Result<SignatureAlgorithm> {
        Ok(self.key(purpose)?.algorithm)
    }

    fn provider_id(&self) -> String {
        Self::PROVIDER_ID.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rsa::test::TEST_KEY_PEM;

    fn token() -> SoftCaToken {
        SoftCaToken::new()
            .with_pem_key(
                KeyPurpose::CertSign,
                TEST_KEY_PEM,
                SignatureAlgorithm::Sha384WithRsa,
            )
            .unwrap()
    }

    /// Verifies that a token signs with the algorithm it reports.
    #[test]
    fn test_sign_with_reported_algorithm() {
        let token = token();
        let alg = token.signature_algorithm(KeyPurpose::CertSign).unwrap();
        assert_eq!(alg, SignatureAlgorithm::Sha384WithRsa);

        let signature = token.sign(KeyPurpose::CertSign, b"tbs").unwrap();
        let spki = token.public_key(KeyPurpose::CertSign).unwrap();
        rsa::PublicKey::from_spki(&spki)
            .unwrap()
            .verify(alg, b"tbs", &signature)
            .unwrap();
    }

    /// Verifies that missing purposes and deactivated tokens report offline.
    #[test]
    fn test_offline_conditions() {
        let token = token();
        let err = token.sign(KeyPurpose::CrlSign, b"tbs").unwrap_err();
        assert!(matches!(
            err,
            Error::TokenOffline {
                purpose: KeyPurpose::CrlSign
            }
        ));

        token.deactivate();
        assert!(token.sign(KeyPurpose::CertSign, b"tbs").unwrap_err().is_token_offline());
        assert!(token.public_key(KeyPurpose::CertSign).unwrap_err().is_token_offline());

        token.activate();
        assert!(token.sign(KeyPurpose::CertSign, b"tbs").is_ok());
    }

    /// Verifies that a garbage ciphertext is an operation failure, not offline.
    #[test]
    fn test_decrypt_failure_is_operation_error() {
        let token = SoftCaToken::new()
            .with_pem_key(KeyPurpose::KeyEncrypt, TEST_KEY_PEM, SignatureAlgorithm::default())
            .unwrap();
        let err = token.decrypt(KeyPurpose::KeyEncrypt, &[0u8; 256]).unwrap_err();
        assert!(matches!(err, Error::TokenOperation { .. }));
    }

    /// Verifies the algorithm OID table in both directions.
    #[test]
    fn test_signature_algorithm_oids() {
        for alg in [
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::Sha384WithRsa,
            SignatureAlgorithm::Sha512WithRsa,
        ] {
            assert_eq!(SignatureAlgorithm::from_oid(&alg.oid()), Some(alg));
            assert_eq!(alg.algorithm_identifier().parameters, Some(Any::null()));
        }
        assert_eq!(
            SignatureAlgorithm::Sha256WithRsa.oid().to_string(),
            "1.2.840.113549.1.1.11"
        );
        assert_eq!(
            SignatureAlgorithm::from_oid(&const_oid::db::rfc5912::RSA_ENCRYPTION),
            None
        );
    }
}
