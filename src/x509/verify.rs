// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::IssuerCertificate;
use super::oid;
use crate::error::{Error, Result};
use crate::rsa;
use crate::token::SignatureAlgorithm;
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use spki::SubjectPublicKeyInfoOwned;
use tracing::error;
use x509_cert::Certificate;
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::name::Name;
use x509_parser::x509::AlgorithmIdentifier;

/// Verifies the signature of a DER certificate against `signer`.
///
/// Any failure, including trailing data or an unsupported signature
/// algorithm, is an integrity error.
pub fn verify_certificate_der(der: &[u8], signer: &SubjectPublicKeyInfoOwned) -> Result<()> {
    let (rem, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| integrity_failure("certificate", format!("failed to decode: {e}")))?;
    ensure_no_trailing_der(rem, "certificate")?;

    if cert.signature_algorithm != cert.tbs_certificate.signature {
        return Err(integrity_failure(
            "certificate",
            "outer and inner signature algorithms differ",
        ));
    }
    verify_signature(
        "certificate",
        &cert.signature_algorithm,
        cert.tbs_certificate.as_ref(),
        cert.signature_value.data.as_ref(),
        signer,
    )
}

/// Verifies the signature of a DER CRL against `signer`.
pub fn verify_crl_der(der: &[u8], signer: &SubjectPublicKeyInfoOwned) -> Result<()> {
    let (rem, crl) = x509_parser::parse_x509_crl(der)
        .map_err(|e| integrity_failure("CRL", format!("failed to decode: {e}")))?;
    ensure_no_trailing_der(rem, "CRL")?;

    if crl.signature_algorithm != crl.tbs_cert_list.signature {
        return Err(integrity_failure("CRL", "outer and inner signature algorithms differ"));
    }
    verify_signature(
        "CRL",
        &crl.signature_algorithm,
        crl.tbs_cert_list.as_ref(),
        crl.signature_value.data.as_ref(),
        signer,
    )
}

fn verify_signature(
    what: &str,
    algorithm: &AlgorithmIdentifier<'_>,
    tbs: &[u8],
    signature: &[u8],
    signer: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    let algorithm = ObjectIdentifier::new(&algorithm.algorithm.to_id_string())
        .ok()
        .and_then(|oid| SignatureAlgorithm::from_oid(&oid))
        .ok_or_else(|| integrity_failure(what, "unsupported signature algorithm"))?;

    let public = rsa::PublicKey::from_spki(signer)
        .map_err(|e| integrity_failure(what, format!("unusable signer key: {e}")))?;
    public
        .verify(algorithm, tbs, signature)
        .map_err(|e| integrity_failure(what, format!("signature does not verify: {e}")))
}

fn ensure_no_trailing_der(rem: &[u8], what: &str) -> Result<()> {
    if !rem.is_empty() {
        return Err(integrity_failure(what, "trailing data after DER"));
    }
    Ok(())
}

fn integrity_failure(what: &str, details: impl std::fmt::Display) -> Error {
    error!(%details, "self-verification of {what} failed");
    Error::integrity(format!("{what}: {details}"))
}

/// Decodes a CA's own certificate into the parts needed for issuing.
///
/// The subject is kept as the exact bytes found in the certificate; a subject
/// that would not survive a decode and re-encode unchanged is refused, since
/// it could not be copied verbatim into the issuer field.
pub(crate) fn inspect_ca_certificate(der: &[u8]) -> Result<IssuerCertificate> {
    let invalid = |details: String| Error::InvalidCaCertificate { details };

    let (rem, parsed) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| invalid(format!("failed to decode: {e}")))?;
    if !rem.is_empty() {
        return Err(invalid("trailing data after DER".to_string()));
    }
    let raw_subject = parsed.tbs_certificate.subject.as_raw();

    let cert = Certificate::from_der(der).map_err(|e| invalid(format!("failed to decode: {e}")))?;
    let subject =
        Name::from_der(raw_subject).map_err(|e| invalid(format!("subject: {e}")))?;
    if subject.to_der()? != raw_subject {
        return Err(invalid("subject DN is not canonically encoded".to_string()));
    }

    let tbs = &cert.tbs_certificate;
    let subject_key_id = tbs
        .extensions
        .iter()
        .flatten()
        .find(|ext| ext.extn_id == oid::CE_SUBJECT_KEY_IDENTIFIER)
        .map(|ext| SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes()))
        .transpose()
        .map_err(|e| invalid(format!("subject key identifier: {e}")))?
        .map(|ski| ski.0.as_bytes().to_vec());

    Ok(IssuerCertificate {
        der: der.to_vec(),
        subject,
        not_after: tbs.validity.not_after.to_unix_duration().as_secs(),
        subject_key_id,
        public_key: tbs.subject_public_key_info.clone(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{CaConfiguration, CertificateProfile};
    use crate::token::{CaSigningKey, KeyPurpose, SoftCaToken};
    use crate::x509::{ResolvedProfile, SubjectRequest, build_certificate_at};

    const NOW: u64 = 1_750_000_000;

    fn token() -> SoftCaToken {
        SoftCaToken::new()
            .with_pem_key(
                KeyPurpose::CertSign,
                crate::rsa::test::TEST_KEY_PEM,
                SignatureAlgorithm::Sha256WithRsa,
            )
            .unwrap()
    }

    fn root_der() -> Vec<u8> {
        let token = token();
        let spki = token.public_key(KeyPurpose::CertSign).unwrap();
        let ca = CaConfiguration::new("Root", "CN=Root,O=Example");
        let profile = ResolvedProfile::new(CertificateProfile::root_ca()).unwrap();
        build_certificate_at(&SubjectRequest::new("CN=Root,O=Example", spki), &profile, &ca, &token, NOW)
            .unwrap()
            .into_der()
    }

    /// Verifies that a produced certificate verifies and a tampered one fails.
    #[test]
    fn test_verify_certificate() {
        let der = root_der();
        let spki = token().public_key(KeyPurpose::CertSign).unwrap();
        verify_certificate_der(&der, &spki).unwrap();

        let mut tampered = der.clone();
        let idx = tampered.len() - 1;
        tampered[idx] ^= 0x01;
        let err = verify_certificate_der(&tampered, &spki).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));

        let mut trailing = der;
        trailing.push(0);
        let err = verify_certificate_der(&trailing, &spki).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }

    /// Verifies extraction of the issuing parts of a CA certificate.
    #[test]
    fn test_inspect_ca_certificate() {
        let der = root_der();
        let cert = inspect_ca_certificate(&der).unwrap();
        let parsed = Certificate::from_der(&der).unwrap();

        assert_eq!(cert.subject, parsed.tbs_certificate.subject);
        assert_eq!(
            cert.subject_key_id.as_deref(),
            Some(&crate::rsa::key_identifier(&cert.public_key)[..])
        );
        assert_eq!(cert.not_after, NOW + CertificateProfile::root_ca().validity_days * 86_400);
    }
}
