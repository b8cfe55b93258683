// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::altname::AltNames;
use super::extensions::{ExtensionPolicyResolver, ResolvedProfile};
use super::name::DistinguishedName;
use super::validity::{encode_time, resolve_validity};
use super::{GeneratedCertificate, SerialNumberAllocator, SubjectRequest, now, serial_hex, verify};
use crate::config::CaConfiguration;
use crate::error::{Error, Result};
use crate::token::{CaSigningKey, KeyPurpose};
use der::Encode;
use der::asn1::BitString;
use tracing::info;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner, Version};
use x509_cert::name::Name;
use x509_cert::time::Validity;

/// Issues a certificate for `request` under `profile`, signed by the
/// certificate signing key of `ca`.
///
/// The certificate is verified against the signer's public key before it is
/// returned; nothing is returned on any failure.
pub fn build_certificate(
    request: &SubjectRequest,
    profile: &ResolvedProfile,
    ca: &CaConfiguration,
    signing_key: &dyn CaSigningKey,
) -> Result<GeneratedCertificate> {
    build_certificate_at(request, profile, ca, signing_key, now())
}

/// Same as [`build_certificate`], issuing at the given UNIX time.
pub fn build_certificate_at(
    request: &SubjectRequest,
    profile: &ResolvedProfile,
    ca: &CaConfiguration,
    signing_key: &dyn CaSigningKey,
    now: u64,
) -> Result<GeneratedCertificate> {
    // Fail fast if the token cannot sign at all
    let signer_key = signing_key.public_key(KeyPurpose::CertSign)?;
    let algorithm = signing_key.signature_algorithm(KeyPurpose::CertSign)?;

    let window = resolve_validity(
        now,
        request,
        &profile.profile,
        ca.issuer_certificate().map(|cert| cert.not_after),
    )?;

    let (subject_dn, subject) = subject_name(request, profile, ca)?;
    let alt_names = subject_alt_names(request, profile)?;
    let issuer = ca.issuer_name()?;

    let serial_number = SerialNumberAllocator::with_width(ca.serial_number_width)?.next()?;
    let extensions = ExtensionPolicyResolver {
        request,
        alt_names: &alt_names,
        profile,
        ca,
        signer_key: &signer_key,
    }
    .resolve()?;

    let tbs_certificate = TbsCertificateInner {
        version: Version::V3,
        serial_number: serial_number.clone(),
        signature: algorithm.algorithm_identifier(),
        issuer,
        validity: Validity {
            not_before: encode_time(window.not_before)?,
            not_after: encode_time(window.not_after)?,
        },
        subject,
        subject_public_key_info: request.public_key.clone(),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: (!extensions.is_empty()).then_some(extensions),
    };

    // Sign the canonical DER encoding of TBSCertificate
    let tbs_der = tbs_certificate.to_der()?;
    let signature = signing_key.sign(KeyPurpose::CertSign, &tbs_der)?;

    let certificate = CertificateInner {
        tbs_certificate,
        signature_algorithm: algorithm.algorithm_identifier(),
        signature: BitString::from_bytes(&signature)?,
    };
    let der = certificate.to_der()?;
    verify::verify_certificate_der(&der, &signer_key)?;

    info!(
        ca = %ca.name,
        profile = %profile.profile.name,
        serial = %serial_hex(&serial_number),
        subject = %subject_dn,
        not_after = window.not_after,
        "issued certificate"
    );
    Ok(GeneratedCertificate {
        der,
        serial: serial_number,
        not_before: window.not_before,
        not_after: window.not_after,
    })
}

/// Parses the requested subject, applies the profile's DN subset and CN
/// postfix rules and encodes it with the CA's string mode.
fn subject_name(
    request: &SubjectRequest,
    profile: &ResolvedProfile,
    ca: &CaConfiguration,
) -> Result<(DistinguishedName, Name)> {
    let mut dn = DistinguishedName::parse(&request.subject_dn)
        .map_err(|e| Error::invalid_subject(format!("subject DN: {e}")))?;
    if profile.profile.use_subject_dn_subset {
        dn.retain_types(&profile.parsed.subject_dn_subset);
    }
    if profile.profile.use_cn_postfix && !profile.profile.cn_postfix.is_empty() {
        dn.append_cn_postfix(&profile.profile.cn_postfix);
    }
    let name = dn
        .to_name(ca.dn_encoding)
        .map_err(|e| Error::invalid_subject(format!("subject DN: {e}")))?;
    Ok((dn, name))
}

fn subject_alt_names(request: &SubjectRequest, profile: &ResolvedProfile) -> Result<AltNames> {
    let mut names = AltNames::parse(request.subject_alt_name.as_deref().unwrap_or(""))
        .map_err(|e| Error::invalid_subject(format!("subject alternative name: {e}")))?;
    if profile.profile.use_subject_alt_name_subset {
        names.retain_kinds(&profile.profile.subject_alt_name_subset);
    }
    Ok(names)
}
