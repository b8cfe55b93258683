// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::validity::encode_time;
use super::{
    GeneratedCrl, RevocationEntry, RevocationReason, make_extension, now, oid, serial_hex, verify,
};
use crate::config::CaConfiguration;
use crate::error::{Error, Result};
use crate::rsa::key_identifier;
use crate::token::{CaSigningKey, KeyPurpose};
use der::Encode;
use der::asn1::{Any, BitString, OctetString};
use tracing::{debug, info};
use x509_cert::Version;
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::ext::pkix::AuthorityKeyIdentifier;

const SECONDS_PER_HOUR: u64 = 60 * 60;

/// Produces a CRL listing `entries`, in the given order, signed by the CRL
/// signing key of `ca`.
///
/// `crl_number` is used as is; keeping it increasing is up to the caller.
pub fn build_crl(
    entries: &[RevocationEntry],
    crl_number: u64,
    ca: &CaConfiguration,
    signing_key: &dyn CaSigningKey,
) -> Result<GeneratedCrl> {
    build_crl_at(entries, crl_number, ca, signing_key, now())
}

/// Same as [`build_crl`], with thisUpdate set to the given UNIX time.
pub fn build_crl_at(
    entries: &[RevocationEntry],
    crl_number: u64,
    ca: &CaConfiguration,
    signing_key: &dyn CaSigningKey,
    now: u64,
) -> Result<GeneratedCrl> {
    let signer_key = signing_key.public_key(KeyPurpose::CrlSign)?;
    let algorithm = signing_key.signature_algorithm(KeyPurpose::CrlSign)?;

    let this_update = now;
    let next_update = ca
        .crl_period_hours
        .checked_mul(SECONDS_PER_HOUR)
        .and_then(|period| this_update.checked_add(period))
        .ok_or_else(|| Error::invalid_profile("CRL period out of range"))?;

    let revoked = entries
        .iter()
        .map(revoked_cert)
        .collect::<Result<Vec<_>>>()?;

    let mut extensions = Vec::new();
    if ca.use_authority_key_identifier {
        debug!("deriving CRL authority key identifier from CRL signing key");
        extensions.push(make_extension(
            oid::CE_AUTHORITY_KEY_IDENTIFIER,
            ca.authority_key_identifier_critical,
            &AuthorityKeyIdentifier {
                key_identifier: Some(OctetString::new(key_identifier(&signer_key).to_vec())?),
                authority_cert_issuer: None,
                authority_cert_serial_number: None,
            },
        )?);
    }
    if ca.use_crl_number {
        extensions.push(make_extension(
            oid::CE_CRL_NUMBER,
            ca.crl_number_critical,
            &crl_number,
        )?);
    }

    let tbs_cert_list = TbsCertList {
        version: Version::V2,
        signature: algorithm.algorithm_identifier(),
        issuer: ca.issuer_name()?,
        this_update: encode_time(this_update)?,
        next_update: Some(encode_time(next_update)?),
        revoked_certificates: (!revoked.is_empty()).then_some(revoked),
        crl_extensions: (!extensions.is_empty()).then_some(extensions),
    };
    let tbs_der = tbs_cert_list.to_der()?;
    let signature = signing_key.sign(KeyPurpose::CrlSign, &tbs_der)?;

    let crl = CertificateList {
        tbs_cert_list,
        signature_algorithm: algorithm.algorithm_identifier(),
        signature: BitString::from_bytes(&signature)?,
    };
    let der = crl.to_der()?;
    verify::verify_crl_der(&der, &signer_key)?;

    info!(
        ca = %ca.name,
        crl_number,
        entries = entries.len(),
        next_update,
        "issued CRL"
    );
    Ok(GeneratedCrl {
        der,
        crl_number,
        this_update,
        next_update,
    })
}

fn revoked_cert(entry: &RevocationEntry) -> Result<RevokedCert> {
    let crl_entry_extensions = match entry.reason {
        RevocationReason::Unspecified => None,
        reason => {
            let code = Any::new(der::Tag::Enumerated, vec![reason.code()])?;
            Some(vec![make_extension(oid::CE_CRL_REASON, false, &code)?])
        }
    };
    debug!(serial = %serial_hex(&entry.serial), reason = ?entry.reason, "adding CRL entry");
    Ok(RevokedCert {
        serial_number: entry.serial.clone(),
        revocation_date: encode_time(entry.revoked_at)?,
        crl_entry_extensions,
    })
}
