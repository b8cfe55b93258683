// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Profile driven selection and encoding of certificate extensions.
//!
//! https://datatracker.ietf.org/doc/html/rfc5280#section-4.2

mod dirattr;
mod plugin;
mod qc;

pub use plugin::{
    BasicCertificateExtension, CertificateExtension, ExtensionRegistry, ResolvedProfile,
    ValueEncoding,
};

use super::altname::AltNames;
use super::{SubjectRequest, make_extension, oid};
use crate::config::{CaConfiguration, ProfileType, key_usage_flags, split_list};
use crate::error::{Error, Result};
use crate::rsa::key_identifier;
use crate::x509::name::DistinguishedName;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, Ia5String, OctetString};
use der::{Decode, Encode, Sequence, Tag};
use std::collections::HashSet;
use tracing::debug;
use x509_cert::ext::Extension;
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, AuthorityKeyIdentifier, BasicConstraints,
    CrlDistributionPoints, ExtendedKeyUsage, KeyUsage, SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::ext::pkix::certpolicy::{CertificatePolicies, PolicyInformation, PolicyQualifierInfo};
use x509_cert::name::Name;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

/// UserNotice ::= SEQUENCE { noticeRef OPTIONAL, explicitText DisplayText OPTIONAL }
///
/// Only explicitText is produced; it is carried as a raw DisplayText choice so
/// that both BMPString and UTF8String can be emitted.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct UserNotice {
    explicit_text: Any,
}

/// Everything the extension rules look at for one issuance.
pub(crate) struct ExtensionPolicyResolver<'a> {
    pub request: &'a SubjectRequest,
    /// Subject alternative names after the profile's subset rule.
    pub alt_names: &'a AltNames,
    pub profile: &'a ResolvedProfile,
    pub ca: &'a CaConfiguration,
    /// Public half of the certificate signing key.
    pub signer_key: &'a SubjectPublicKeyInfoOwned,
}

impl ExtensionPolicyResolver<'_> {
    /// Produces the ordered extension list: basic constraints, key usage,
    /// extended key usage, key identifiers, alternative names, policies,
    /// distribution points, authority information access, template name,
    /// QC statements, directory attributes and finally plugins.
    pub(crate) fn resolve(&self) -> Result<Vec<Extension>> {
        let mut list = ExtensionList::default();

        self.basic_constraints(&mut list)?;
        self.key_usage(&mut list)?;
        self.extended_key_usage(&mut list)?;
        self.subject_key_identifier(&mut list)?;
        self.authority_key_identifier(&mut list)?;
        self.subject_alt_name(&mut list)?;
        self.certificate_policies(&mut list)?;
        self.crl_distribution_points(&mut list)?;
        self.authority_info_access(&mut list)?;
        self.microsoft_template(&mut list)?;
        self.qc_statements(&mut list)?;
        self.subject_directory_attributes(&mut list)?;
        self.plugins(&mut list)?;

        Ok(list.extensions)
    }

    fn basic_constraints(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_basic_constraints {
            return Ok(());
        }
        let ca = profile.profile_type.is_ca();
        let path_len_constraint = match ca && profile.use_path_length_constraint {
            true => Some(profile.path_length_constraint),
            false => None,
        };
        list.push(make_extension(
            oid::CE_BASIC_CONSTRAINTS,
            profile.basic_constraints_critical,
            &BasicConstraints {
                ca,
                path_len_constraint,
            },
        )?)
    }

    fn key_usage(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_key_usage {
            return Ok(());
        }
        let usage = match self.request.key_usage {
            Some(requested) if profile.allow_key_usage_override => {
                debug!("using key usage from request");
                requested
            }
            _ => key_usage_flags(&profile.key_usage),
        };
        if usage.is_empty() {
            debug!("key usage is empty, omitting extension");
            return Ok(());
        }
        list.push(make_extension(
            oid::CE_KEY_USAGE,
            profile.key_usage_critical,
            &KeyUsage(usage),
        )?)
    }

    fn extended_key_usage(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        let usages = &self.profile.parsed.extended_key_usage;
        if !profile.use_extended_key_usage || usages.is_empty() {
            return Ok(());
        }
        list.push(make_extension(
            oid::CE_EXT_KEY_USAGE,
            profile.extended_key_usage_critical,
            &ExtendedKeyUsage(usages.clone()),
        )?)
    }

    fn subject_key_identifier(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_subject_key_identifier {
            return Ok(());
        }
        let id = key_identifier(&self.request.public_key);
        list.push(make_extension(
            oid::CE_SUBJECT_KEY_IDENTIFIER,
            profile.subject_key_identifier_critical,
            &SubjectKeyIdentifier(OctetString::new(id.to_vec())?),
        )?)
    }

    fn authority_key_identifier(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_authority_key_identifier {
            return Ok(());
        }
        // Roots always derive from the signing key, a renewal may rotate it
        let existing = match profile.profile_type {
            ProfileType::RootCa => None,
            _ => self
                .ca
                .issuer_certificate()
                .and_then(|cert| cert.subject_key_id.clone()),
        };
        let id = match existing {
            Some(id) => {
                debug!("using authority key identifier from CA certificate");
                id
            }
            None => {
                debug!("deriving authority key identifier from signing key");
                key_identifier(self.signer_key).to_vec()
            }
        };
        list.push(make_extension(
            oid::CE_AUTHORITY_KEY_IDENTIFIER,
            profile.authority_key_identifier_critical,
            &AuthorityKeyIdentifier {
                key_identifier: Some(OctetString::new(id)?),
                authority_cert_issuer: None,
                authority_cert_serial_number: None,
            },
        )?)
    }

    fn subject_alt_name(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_subject_alternative_name || self.alt_names.is_empty() {
            return Ok(());
        }
        let names = self
            .alt_names
            .to_general_names(self.ca.dn_encoding)
            .map_err(|e| Error::invalid_subject(format!("subject alternative name: {e}")))?;
        list.push(make_extension(
            oid::CE_SUBJECT_ALT_NAME,
            profile.subject_alternative_name_critical,
            &SubjectAltName(names),
        )?)
    }

    fn certificate_policies(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        let ids = &self.profile.parsed.policy_ids;
        if !profile.use_certificate_policies || ids.is_empty() {
            return Ok(());
        }
        let mut qualifiers = Vec::new();
        let notice = profile.policy_user_notice_text.trim();
        if !notice.is_empty() {
            let explicit_text = match self.ca.use_utf8_policy_text {
                true => Any::new(Tag::Utf8String, notice.as_bytes().to_vec())?,
                false => {
                    let bmp: Vec<u8> = notice.encode_utf16().flat_map(u16::to_be_bytes).collect();
                    Any::new(Tag::BmpString, bmp)?
                }
            };
            let notice = UserNotice { explicit_text };
            qualifiers.push(PolicyQualifierInfo {
                policy_qualifier_id: oid::QT_UNOTICE,
                qualifier: Some(Any::from_der(&notice.to_der()?)?),
            });
        }
        let cps = profile.policy_cps_url.trim();
        if !cps.is_empty() {
            qualifiers.push(PolicyQualifierInfo {
                policy_qualifier_id: oid::QT_CPS,
                qualifier: Some(Any::encode_from(&Ia5String::new(cps)?)?),
            });
        }

        let mut qualifiers = (!qualifiers.is_empty()).then_some(qualifiers);
        let policies = ids
            .iter()
            .map(|id| PolicyInformation {
                policy_identifier: *id,
                policy_qualifiers: qualifiers.take(),
            })
            .collect();
        list.push(make_extension(
            oid::CE_CERTIFICATE_POLICIES,
            profile.certificate_policies_critical,
            &CertificatePolicies(policies),
        )?)
    }

    fn crl_distribution_points(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_crl_distribution_point {
            return Ok(());
        }
        let (uris, issuers) = match profile.use_default_crl_distribution_point {
            true => (
                self.ca.default_crl_distribution_point.as_str(),
                self.ca.default_crl_issuer.as_str(),
            ),
            false => (
                profile.crl_distribution_point_uri.as_str(),
                profile.crl_issuer.as_str(),
            ),
        };
        let uris: Vec<&str> = split_list(uris).collect();
        let issuers = split_list(issuers)
            .map(|dn| self.encode_crl_issuer(dn))
            .collect::<Result<Vec<_>>>()?;

        let count = uris.len().max(issuers.len());
        if count == 0 {
            debug!("no CRL distribution points configured, omitting extension");
            return Ok(());
        }
        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            let distribution_point = match uris.get(i) {
                Some(uri) => {
                    debug!(uri, "adding CRL distribution point");
                    Some(DistributionPointName::FullName(vec![
                        GeneralName::UniformResourceIdentifier(Ia5String::new(*uri)?),
                    ]))
                }
                None => None,
            };
            let crl_issuer = issuers
                .get(i)
                .map(|name| vec![GeneralName::DirectoryName(name.clone())]);
            points.push(DistributionPoint {
                distribution_point,
                reasons: None,
                crl_issuer,
            });
        }
        list.push(make_extension(
            oid::CE_CRL_DISTRIBUTION_POINTS,
            profile.crl_distribution_point_critical,
            &CrlDistributionPoints(points),
        )?)
    }

    fn encode_crl_issuer(&self, dn: &str) -> Result<Name> {
        DistinguishedName::parse(dn)
            .and_then(|dn| dn.to_name(self.ca.dn_encoding))
            .map_err(|e| Error::invalid_profile(format!("CRL issuer {dn:?}: {e}")))
    }

    fn authority_info_access(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_ocsp_service_locator {
            return Ok(());
        }
        let uri = match profile.use_default_ocsp_service_locator {
            true => self.ca.default_ocsp_locator.trim(),
            false => profile.ocsp_service_locator_uri.trim(),
        };
        if uri.is_empty() {
            return Ok(());
        }
        list.push(make_extension(
            oid::PE_AUTHORITY_INFO_ACCESS,
            false,
            &AuthorityInfoAccessSyntax(vec![AccessDescription {
                access_method: oid::AD_OCSP,
                access_location: GeneralName::UniformResourceIdentifier(Ia5String::new(uri)?),
            }]),
        )?)
    }

    fn microsoft_template(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        let name = profile.microsoft_template.trim();
        if !profile.use_microsoft_template || name.is_empty() {
            return Ok(());
        }
        list.push(make_extension(
            oid::MS_CERTIFICATE_TEMPLATE_NAME,
            false,
            &Ia5String::new(name)?,
        )?)
    }

    fn qc_statements(&self, list: &mut ExtensionList) -> Result<()> {
        let profile = &self.profile.profile;
        if !profile.use_qc_statements {
            return Ok(());
        }
        let statements = qc::statements(
            &profile.qc_statements,
            &self.profile.parsed,
            self.ca.dn_encoding,
        )?;
        list.push(make_extension(
            oid::PE_QC_STATEMENTS,
            profile.qc_statements_critical,
            &statements,
        )?)
    }

    fn subject_directory_attributes(&self, list: &mut ExtensionList) -> Result<()> {
        if !self.profile.profile.use_subject_directory_attributes {
            return Ok(());
        }
        let Some(input) = self
            .request
            .extended_information
            .subject_directory_attributes
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        else {
            return Ok(());
        };
        let attrs = dirattr::parse(input)
            .map_err(|e| Error::invalid_subject(format!("subject directory attributes: {e}")))?;
        if attrs.is_empty() {
            return Ok(());
        }
        list.push(make_extension(
            oid::CE_SUBJECT_DIRECTORY_ATTRIBUTES,
            false,
            &attrs,
        )?)
    }

    fn plugins(&self, list: &mut ExtensionList) -> Result<()> {
        for plugin in &self.profile.plugins {
            let value = plugin.value(self.request, self.ca, &self.profile.profile)?;
            debug!(oid = %plugin.oid(), "adding custom certificate extension");
            list.push(Extension {
                extn_id: plugin.oid(),
                critical: plugin.critical(),
                extn_value: OctetString::new(value)?,
            })?;
        }
        Ok(())
    }
}

/// Ordered extensions with a guard against repeated identifiers.
#[derive(Default)]
struct ExtensionList {
    extensions: Vec<Extension>,
    seen: HashSet<ObjectIdentifier>,
}

impl ExtensionList {
    fn push(&mut self, ext: Extension) -> Result<()> {
        if !self.seen.insert(ext.extn_id) {
            return Err(Error::invalid_profile(format!(
                "extension {} included more than once",
                ext.extn_id
            )));
        }
        self.extensions.push(ext);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{CaCertificate, CertificateProfile, KeyUsageBit};
    use crate::rsa;
    use crate::x509::IssuerCertificate;
    use der::Tagged;
    use der::flagset::FlagSet;
    use std::sync::{Arc, OnceLock};
    use x509_cert::ext::pkix::KeyUsages;

    fn spki() -> SubjectPublicKeyInfoOwned {
        static SPKI: OnceLock<SubjectPublicKeyInfoOwned> = OnceLock::new();
        SPKI.get_or_init(|| {
            rsa::SecretKey::from_pem(rsa::test::TEST_KEY_PEM)
                .unwrap()
                .public_key()
                .to_spki()
                .unwrap()
        })
        .clone()
    }

    fn resolve_with(
        profile: CertificateProfile,
        ca: &CaConfiguration,
        request: &SubjectRequest,
    ) -> Result<Vec<Extension>> {
        let resolved = ResolvedProfile::new(profile)?;
        let alt_names = AltNames::parse(request.subject_alt_name.as_deref().unwrap_or(""))
            .map_err(Error::invalid_subject)?;
        let signer_key = spki();
        ExtensionPolicyResolver {
            request,
            alt_names: &alt_names,
            profile: &resolved,
            ca,
            signer_key: &signer_key,
        }
        .resolve()
    }

    fn resolve(profile: CertificateProfile) -> Vec<Extension> {
        let ca = CaConfiguration::new("Test CA", "CN=Test CA,O=Example");
        resolve_with(profile, &ca, &SubjectRequest::new("CN=Alice", spki())).unwrap()
    }

    fn find(exts: &[Extension], oid: ObjectIdentifier) -> Option<&Extension> {
        exts.iter().find(|e| e.extn_id == oid)
    }

    fn decode<'a, T: Decode<'a>>(ext: &'a Extension) -> T {
        T::from_der(ext.extn_value.as_bytes()).unwrap()
    }

    /// Verifies the end user preset yields its extensions in canonical order.
    #[test]
    fn test_end_user_order() {
        let exts = resolve(CertificateProfile::end_user());
        let oids: Vec<_> = exts.iter().map(|e| e.extn_id).collect();
        assert_eq!(
            oids,
            vec![
                oid::CE_BASIC_CONSTRAINTS,
                oid::CE_KEY_USAGE,
                oid::CE_EXT_KEY_USAGE,
                oid::CE_SUBJECT_KEY_IDENTIFIER,
                oid::CE_AUTHORITY_KEY_IDENTIFIER,
            ]
        );
        let bc: BasicConstraints = decode(&exts[0]);
        assert!(!bc.ca);
        assert!(exts[0].critical);
    }

    /// Verifies CA basic constraints with and without a path length.
    #[test]
    fn test_basic_constraints_ca() {
        let mut profile = CertificateProfile::sub_ca();
        let exts = resolve(profile.clone());
        let bc: BasicConstraints = decode(find(&exts, oid::CE_BASIC_CONSTRAINTS).unwrap());
        assert_eq!((bc.ca, bc.path_len_constraint), (true, None));

        profile.use_path_length_constraint = true;
        profile.path_length_constraint = 2;
        let exts = resolve(profile);
        let bc: BasicConstraints = decode(find(&exts, oid::CE_BASIC_CONSTRAINTS).unwrap());
        assert_eq!((bc.ca, bc.path_len_constraint), (true, Some(2)));
    }

    /// Verifies that requested key usage only wins when the profile allows it.
    #[test]
    fn test_key_usage_override() {
        let ca = CaConfiguration::new("Test CA", "CN=Test CA");
        let request = SubjectRequest {
            key_usage: Some(FlagSet::from(KeyUsages::KeyAgreement)),
            ..SubjectRequest::new("CN=Alice", spki())
        };

        let mut profile = CertificateProfile::end_user();
        profile.key_usage = vec![KeyUsageBit::DigitalSignature];
        let exts = resolve_with(profile.clone(), &ca, &request).unwrap();
        let ku: KeyUsage = decode(find(&exts, oid::CE_KEY_USAGE).unwrap());
        assert_eq!(ku.0, FlagSet::from(KeyUsages::DigitalSignature));

        profile.allow_key_usage_override = true;
        let exts = resolve_with(profile.clone(), &ca, &request).unwrap();
        let ku: KeyUsage = decode(find(&exts, oid::CE_KEY_USAGE).unwrap());
        assert_eq!(ku.0, FlagSet::from(KeyUsages::KeyAgreement));

        profile.allow_key_usage_override = false;
        profile.key_usage.clear();
        let exts = resolve_with(profile, &ca, &request).unwrap();
        assert!(find(&exts, oid::CE_KEY_USAGE).is_none());
    }

    /// Verifies that an empty EKU list never yields an empty sequence.
    #[test]
    fn test_empty_eku_omitted() {
        let mut profile = CertificateProfile::end_user();
        profile.extended_key_usage.clear();
        let exts = resolve(profile);
        assert!(find(&exts, oid::CE_EXT_KEY_USAGE).is_none());
    }

    /// Verifies that the AKI copies the signer's SKI, unless issuing a root.
    #[test]
    fn test_authority_key_identifier_source() {
        let signer = IssuerCertificate {
            der: Vec::new(),
            subject: DistinguishedName::parse("CN=Test CA")
                .unwrap()
                .to_name(Default::default())
                .unwrap(),
            not_after: u64::MAX,
            subject_key_id: Some(vec![0xAA, 0xBB, 0xCC]),
            public_key: spki(),
        };
        let mut ca = CaConfiguration::new("Test CA", "CN=Test CA");
        ca.certificate = CaCertificate::SubordinateOrRenewal(Box::new(signer));
        let request = SubjectRequest::new("CN=Alice", spki());

        let exts = resolve_with(CertificateProfile::end_user(), &ca, &request).unwrap();
        let aki: AuthorityKeyIdentifier = decode(find(&exts, oid::CE_AUTHORITY_KEY_IDENTIFIER).unwrap());
        assert_eq!(aki.key_identifier.unwrap().as_bytes(), &[0xAA, 0xBB, 0xCC]);

        let exts = resolve_with(CertificateProfile::root_ca(), &ca, &request).unwrap();
        let aki: AuthorityKeyIdentifier = decode(find(&exts, oid::CE_AUTHORITY_KEY_IDENTIFIER).unwrap());
        assert_eq!(aki.key_identifier.unwrap().as_bytes(), &key_identifier(&spki()));
    }

    /// Verifies that qualifiers attach to the first policy only.
    #[test]
    fn test_certificate_policies_qualifiers() {
        let mut profile = CertificateProfile::end_user();
        profile.use_certificate_policies = true;
        profile.certificate_policy_id = "1.2.3.4;1.2.3.5".to_string();
        profile.policy_cps_url = "https://example.com/cps".to_string();
        profile.policy_user_notice_text = "Hi".to_string();

        let exts = resolve(profile);
        let policies: CertificatePolicies = decode(find(&exts, oid::CE_CERTIFICATE_POLICIES).unwrap());
        assert_eq!(policies.0.len(), 2);

        let qualifiers = policies.0[0].policy_qualifiers.as_ref().unwrap();
        assert_eq!(qualifiers[0].policy_qualifier_id, oid::QT_UNOTICE);
        assert_eq!(qualifiers[1].policy_qualifier_id, oid::QT_CPS);
        let notice = qualifiers[0].qualifier.as_ref().unwrap().to_der().unwrap();
        let notice = UserNotice::from_der(&notice).unwrap();
        assert_eq!(notice.explicit_text.tag(), Tag::BmpString);
        assert_eq!(notice.explicit_text.value(), &[0, b'H', 0, b'i']);

        assert!(policies.0[1].policy_qualifiers.is_none());
    }

    /// Verifies zipping of distribution points with CRL issuers.
    #[test]
    fn test_crl_distribution_points_zip() {
        let mut profile = CertificateProfile::end_user();
        profile.use_crl_distribution_point = true;
        profile.crl_distribution_point_uri = "http://a/crl;http://b/crl".to_string();
        profile.crl_issuer = "CN=X".to_string();

        let exts = resolve(profile.clone());
        let cdp: CrlDistributionPoints = decode(find(&exts, oid::CE_CRL_DISTRIBUTION_POINTS).unwrap());
        assert_eq!(cdp.0.len(), 2);
        assert!(cdp.0[0].crl_issuer.is_some());
        assert!(cdp.0[1].crl_issuer.is_none());
        assert!(cdp.0[1].distribution_point.is_some());

        profile.crl_distribution_point_uri.clear();
        profile.crl_issuer.clear();
        let exts = resolve(profile);
        assert!(find(&exts, oid::CE_CRL_DISTRIBUTION_POINTS).is_none());
    }

    /// Verifies that CA defaults replace profile values when requested.
    #[test]
    fn test_ca_defaults() {
        let mut ca = CaConfiguration::new("Test CA", "CN=Test CA");
        ca.default_crl_distribution_point = "http://ca/crl".to_string();
        ca.default_ocsp_locator = "http://ca/ocsp".to_string();

        let mut profile = CertificateProfile::end_user();
        profile.use_crl_distribution_point = true;
        profile.use_default_crl_distribution_point = true;
        profile.crl_distribution_point_uri = "http://profile/crl".to_string();
        profile.use_ocsp_service_locator = true;
        profile.use_default_ocsp_service_locator = true;

        let request = SubjectRequest::new("CN=Alice", spki());
        let exts = resolve_with(profile, &ca, &request).unwrap();
        let cdp: CrlDistributionPoints = decode(find(&exts, oid::CE_CRL_DISTRIBUTION_POINTS).unwrap());
        assert_eq!(cdp.0.len(), 1);
        let Some(DistributionPointName::FullName(names)) = &cdp.0[0].distribution_point else {
            panic!("expected full name");
        };
        assert_eq!(
            names[0],
            GeneralName::UniformResourceIdentifier(Ia5String::new("http://ca/crl").unwrap())
        );

        let aia = find(&exts, oid::PE_AUTHORITY_INFO_ACCESS).unwrap();
        assert!(!aia.critical);
        let aia: AuthorityInfoAccessSyntax = decode(aia);
        assert_eq!(aia.0[0].access_method, oid::AD_OCSP);
    }

    /// Verifies SAN, template name and directory attributes.
    #[test]
    fn test_subject_derived_extensions() {
        let ca = CaConfiguration::new("Test CA", "CN=Test CA");
        let mut profile = CertificateProfile::end_user();
        profile.use_microsoft_template = true;
        profile.microsoft_template = "User".to_string();
        profile.use_subject_directory_attributes = true;

        let mut request = SubjectRequest::new("CN=Alice", spki());
        request.subject_alt_name = Some("dnsName=alice.example.com, rfc822Name=alice@example.com".to_string());
        request.extended_information.subject_directory_attributes =
            Some("countryOfCitizenship=SE".to_string());

        let exts = resolve_with(profile, &ca, &request).unwrap();
        let san: SubjectAltName = decode(find(&exts, oid::CE_SUBJECT_ALT_NAME).unwrap());
        assert_eq!(san.0.len(), 2);

        let template: Ia5String = decode(find(&exts, oid::MS_CERTIFICATE_TEMPLATE_NAME).unwrap());
        assert_eq!(template.to_string(), "User");

        let sda = find(&exts, oid::CE_SUBJECT_DIRECTORY_ATTRIBUTES).unwrap();
        assert!(!sda.critical);
        let oids: Vec<_> = exts.iter().map(|e| e.extn_id).collect();
        assert_eq!(oids.last(), Some(&oid::CE_SUBJECT_DIRECTORY_ATTRIBUTES));

        request.extended_information.subject_directory_attributes = Some("bogus=1".to_string());
        let err = resolve_with(CertificateProfile {
            use_subject_directory_attributes: true,
            ..CertificateProfile::end_user()
        }, &ca, &request)
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSubject { .. }));
    }

    /// Verifies that plugins come last and may not repeat a built-in OID.
    #[test]
    fn test_plugins() {
        let ca = CaConfiguration::new("Test CA", "CN=Test CA");
        let request = SubjectRequest::new("CN=Alice", spki());

        let mut registry = ExtensionRegistry::new();
        let custom = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1");
        registry
            .register(1, Arc::new(BasicCertificateExtension::new(custom, false, ValueEncoding::Null, "").unwrap()))
            .unwrap();
        registry
            .register(
                2,
                Arc::new(BasicCertificateExtension::new(oid::CE_KEY_USAGE, true, ValueEncoding::Null, "").unwrap()),
            )
            .unwrap();

        let resolved = registry
            .resolve(CertificateProfile {
                certificate_extensions: vec![1],
                ..CertificateProfile::end_user()
            })
            .unwrap();
        let alt_names = AltNames::default();
        let signer_key = spki();
        let exts = ExtensionPolicyResolver {
            request: &request,
            alt_names: &alt_names,
            profile: &resolved,
            ca: &ca,
            signer_key: &signer_key,
        }
        .resolve()
        .unwrap();
        assert_eq!(exts.last().unwrap().extn_id, custom);
        assert_eq!(exts.last().unwrap().extn_value.as_bytes(), &[0x05, 0x00]);

        let resolved = registry
            .resolve(CertificateProfile {
                certificate_extensions: vec![2],
                ..CertificateProfile::end_user()
            })
            .unwrap();
        let err = ExtensionPolicyResolver {
            request: &request,
            alt_names: &alt_names,
            profile: &resolved,
            ca: &ca,
            signer_key: &signer_key,
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, Error::InvalidProfileConfiguration { .. }));
    }
}
