// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::{from_toml, read, split_list};
use crate::error::{Error, Result};
use crate::x509::altname::{AltNameKind, AltNames};
use crate::x509::name::{DistinguishedName, attribute_oid, is_printable_string};
use crate::x509::oid;
use const_oid::ObjectIdentifier;
use der::flagset::FlagSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use x509_cert::ext::pkix::KeyUsages;

/// Kind of certificate a profile issues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    #[default]
    EndEntity,
    SubCa,
    RootCa,
}

impl ProfileType {
    /// Reports whether certificates of this type are CA certificates.
    pub fn is_ca(self) -> bool {
        matches!(self, ProfileType::SubCa | ProfileType::RootCa)
    }
}

/// Key usage bits, named as in RFC 5280.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsageBit {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl From<KeyUsageBit> for KeyUsages {
    fn from(bit: KeyUsageBit) -> Self {
        match bit {
            KeyUsageBit::DigitalSignature => KeyUsages::DigitalSignature,
            KeyUsageBit::NonRepudiation => KeyUsages::NonRepudiation,
            KeyUsageBit::KeyEncipherment => KeyUsages::KeyEncipherment,
            KeyUsageBit::DataEncipherment => KeyUsages::DataEncipherment,
            KeyUsageBit::KeyAgreement => KeyUsages::KeyAgreement,
            KeyUsageBit::KeyCertSign => KeyUsages::KeyCertSign,
            KeyUsageBit::CrlSign => KeyUsages::CRLSign,
            KeyUsageBit::EncipherOnly => KeyUsages::EncipherOnly,
            KeyUsageBit::DecipherOnly => KeyUsages::DecipherOnly,
        }
    }
}

/// Collapses a list of key usage bits into a flag set.
pub fn key_usage_flags(bits: &[KeyUsageBit]) -> FlagSet<KeyUsages> {
    bits.iter()
        .fold(FlagSet::default(), |acc, bit| acc | KeyUsages::from(*bit))
}

/// Qualified certificate statement settings (RFC 3739, ETSI EN 319 412-5).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcStatementSettings {
    /// Use id-qcs-pkixQCSyntax-v2 instead of v1.
    pub use_pkix_qc_syntax_v2: bool,
    /// Semantics identifier OID, or empty.
    pub semantics_id: String,
    /// Name registration authorities, in alternative name form, or empty.
    pub ra_name: String,
    pub use_etsi_qc_compliance: bool,
    pub use_etsi_value_limit: bool,
    pub etsi_value_limit: i64,
    pub etsi_value_limit_exponent: i64,
    /// ISO 4217 alphabetic currency code.
    pub etsi_value_limit_currency: String,
    pub use_etsi_sscd: bool,
    pub use_custom_string: bool,
    pub custom_string_oid: String,
    pub custom_string_text: String,
}

/// Certificate template: which extensions a certificate gets and how.
///
/// Flags come in `use_x` / `x_critical` pairs; string lists use `;` as the
/// separator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateProfile {
    pub name: String,
    pub profile_type: ProfileType,
    /// Validity in days counted from issuance.
    pub validity_days: u64,
    /// Honor caller supplied notBefore/notAfter.
    pub allow_validity_override: bool,
    /// Honor the caller's requested key usage.
    pub allow_key_usage_override: bool,

    pub use_basic_constraints: bool,
    pub basic_constraints_critical: bool,
    pub use_path_length_constraint: bool,
    pub path_length_constraint: u8,

    pub use_key_usage: bool,
    pub key_usage_critical: bool,
    pub key_usage: Vec<KeyUsageBit>,

    pub use_extended_key_usage: bool,
    pub extended_key_usage_critical: bool,
    /// Key purpose names (`server_auth`, `client_auth`, ...) or dotted OIDs.
    pub extended_key_usage: Vec<String>,

    pub use_subject_key_identifier: bool,
    pub subject_key_identifier_critical: bool,
    pub use_authority_key_identifier: bool,
    pub authority_key_identifier_critical: bool,

    pub use_subject_alternative_name: bool,
    pub subject_alternative_name_critical: bool,

    pub use_certificate_policies: bool,
    pub certificate_policies_critical: bool,
    /// `;` separated policy OIDs; qualifiers attach to the first only.
    pub certificate_policy_id: String,
    pub policy_cps_url: String,
    pub policy_user_notice_text: String,

    pub use_crl_distribution_point: bool,
    pub crl_distribution_point_critical: bool,
    /// Take distribution points and CRL issuers from the CA defaults.
    pub use_default_crl_distribution_point: bool,
    /// `;` separated distribution point URIs.
    pub crl_distribution_point_uri: String,
    /// `;` separated CRL issuer DNs, paired by position with the URIs.
    pub crl_issuer: String,

    pub use_ocsp_service_locator: bool,
    pub use_default_ocsp_service_locator: bool,
    pub ocsp_service_locator_uri: String,

    pub use_microsoft_template: bool,
    pub microsoft_template: String,

    pub use_qc_statements: bool,
    pub qc_statements_critical: bool,
    pub qc_statements: QcStatementSettings,

    pub use_subject_directory_attributes: bool,

    pub use_subject_dn_subset: bool,
    /// Attribute types kept when the subset is enabled.
    pub subject_dn_subset: Vec<String>,
    pub use_subject_alt_name_subset: bool,
    pub subject_alt_name_subset: Vec<AltNameKind>,
    pub use_cn_postfix: bool,
    pub cn_postfix: String,

    /// Ids of registered certificate extension plugins, applied in order.
    pub certificate_extensions: Vec<u32>,
}

impl Default for CertificateProfile {
    fn default() -> Self {
        Self::end_user()
    }
}

impl CertificateProfile {
    /// End entity template: two year validity, digital signature and key
    /// encipherment, client auth and email protection.
    pub fn end_user() -> Self {
        Self {
            name: "ENDUSER".to_string(),
            profile_type: ProfileType::EndEntity,
            validity_days: 730,
            allow_validity_override: false,
            allow_key_usage_override: false,
            use_basic_constraints: true,
            basic_constraints_critical: true,
            use_path_length_constraint: false,
            path_length_constraint: 0,
            use_key_usage: true,
            key_usage_critical: true,
            key_usage: vec![
                KeyUsageBit::DigitalSignature,
                KeyUsageBit::NonRepudiation,
                KeyUsageBit::KeyEncipherment,
            ],
            use_extended_key_usage: true,
            extended_key_usage_critical: false,
            extended_key_usage: vec!["client_auth".to_string(), "email_protection".to_string()],
            use_subject_key_identifier: true,
            subject_key_identifier_critical: false,
            use_authority_key_identifier: true,
            authority_key_identifier_critical: false,
            use_subject_alternative_name: true,
            subject_alternative_name_critical: false,
            use_certificate_policies: false,
            certificate_policies_critical: false,
            certificate_policy_id: String::new(),
            policy_cps_url: String::new(),
            policy_user_notice_text: String::new(),
            use_crl_distribution_point: false,
            crl_distribution_point_critical: false,
            use_default_crl_distribution_point: false,
            crl_distribution_point_uri: String::new(),
            crl_issuer: String::new(),
            use_ocsp_service_locator: false,
            use_default_ocsp_service_locator: false,
            ocsp_service_locator_uri: String::new(),
            use_microsoft_template: false,
            microsoft_template: String::new(),
            use_qc_statements: false,
            qc_statements_critical: false,
            qc_statements: QcStatementSettings::default(),
            use_subject_directory_attributes: false,
            use_subject_dn_subset: false,
            subject_dn_subset: Vec::new(),
            use_subject_alt_name_subset: false,
            subject_alt_name_subset: Vec::new(),
            use_cn_postfix: false,
            cn_postfix: String::new(),
            certificate_extensions: Vec::new(),
        }
    }

    /// Subordinate CA template: 25 year validity, certificate and CRL signing.
    pub fn sub_ca() -> Self {
        Self {
            name: "SUBCA".to_string(),
            profile_type: ProfileType::SubCa,
            validity_days: 25 * 365,
            key_usage: vec![
                KeyUsageBit::DigitalSignature,
                KeyUsageBit::KeyCertSign,
                KeyUsageBit::CrlSign,
            ],
            use_extended_key_usage: false,
            extended_key_usage: Vec::new(),
            use_subject_alternative_name: false,
            ..Self::end_user()
        }
    }

    /// Root CA template, identical to the subordinate one apart from type.
    pub fn root_ca() -> Self {
        Self {
            name: "ROOTCA".to_string(),
            profile_type: ProfileType::RootCa,
            ..Self::sub_ca()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let profile: Self = from_toml(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml(&read(path.as_ref())?)
    }

    /// Checks every string field for syntax.
    pub fn validate(&self) -> Result<()> {
        self.parse().map(|_| ())
    }

    /// Parses the string fields into their typed forms.
    pub(crate) fn parse(&self) -> Result<ParsedProfile> {
        let extended_key_usage = self
            .extended_key_usage
            .iter()
            .map(|name| key_purpose_oid(name))
            .collect::<Result<Vec<_>>>()?;

        let policy_ids = split_list(&self.certificate_policy_id)
            .map(|id| parse_oid(id, "certificate policy"))
            .collect::<Result<Vec<_>>>()?;

        let subject_dn_subset = self
            .subject_dn_subset
            .iter()
            .map(|name| {
                attribute_oid(name)
                    .map_err(|e| Error::invalid_profile(format!("subject DN subset: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        for issuer in split_list(&self.crl_issuer) {
            DistinguishedName::parse(issuer)
                .map_err(|e| Error::invalid_profile(format!("CRL issuer: {e}")))?;
        }
        for uri in split_list(&self.crl_distribution_point_uri)
            .chain(split_list(&self.ocsp_service_locator_uri))
            .chain(std::iter::once(self.policy_cps_url.as_str()))
            .chain(std::iter::once(self.microsoft_template.as_str()))
        {
            if !uri.is_ascii() {
                return Err(Error::invalid_profile(format!("non-ASCII value {uri:?}")));
            }
        }
        if self.policy_user_notice_text.chars().count() > 200 {
            return Err(Error::invalid_profile(
                "user notice text exceeds 200 characters",
            ));
        }

        let qc = &self.qc_statements;
        let qc_semantics_id = match qc.semantics_id.trim() {
            "" => None,
            id => Some(parse_oid(id, "QC semantics identifier")?),
        };
        let qc_ra_names = AltNames::parse(&qc.ra_name)
            .map_err(|e| Error::invalid_profile(format!("QC RA name: {e}")))?;
        let qc_custom_oid = match (qc.use_custom_string, qc.custom_string_oid.trim()) {
            (true, id) if !id.is_empty() => Some(parse_oid(id, "QC custom statement")?),
            _ => None,
        };
        let currency = qc.etsi_value_limit_currency.trim();
        if qc.use_etsi_value_limit
            && !currency.is_empty()
            && (currency.len() != 3 || !is_printable_string(currency))
        {
            return Err(Error::invalid_profile(format!(
                "QC value limit currency {currency:?} is not an ISO 4217 code"
            )));
        }

        Ok(ParsedProfile {
            extended_key_usage,
            policy_ids,
            subject_dn_subset,
            qc_semantics_id,
            qc_ra_names,
            qc_custom_oid,
        })
    }
}

/// String fields of a profile in parsed form.
#[derive(Clone, Debug, Default)]
pub(crate) struct ParsedProfile {
    pub(crate) extended_key_usage: Vec<ObjectIdentifier>,
    pub(crate) policy_ids: Vec<ObjectIdentifier>,
    pub(crate) subject_dn_subset: Vec<ObjectIdentifier>,
    pub(crate) qc_semantics_id: Option<ObjectIdentifier>,
    pub(crate) qc_ra_names: AltNames,
    pub(crate) qc_custom_oid: Option<ObjectIdentifier>,
}

fn parse_oid(value: &str, what: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(value.trim())
        .map_err(|e| Error::invalid_profile(format!("{what} {value:?}: {e}")))
}

fn key_purpose_oid(name: &str) -> Result<ObjectIdentifier> {
    let oid = match name.trim() {
        "server_auth" => oid::KP_SERVER_AUTH,
        "client_auth" => oid::KP_CLIENT_AUTH,
        "code_signing" => oid::KP_CODE_SIGNING,
        "email_protection" => oid::KP_EMAIL_PROTECTION,
        "time_stamping" => oid::KP_TIME_STAMPING,
        "ocsp_signing" => oid::KP_OCSP_SIGNING,
        "ms_smartcard_logon" => oid::KP_MS_SMARTCARD_LOGON,
        "any" => oid::ANY_EXTENDED_KEY_USAGE,
        other => parse_oid(other, "extended key usage")?,
    };
    Ok(oid)
}

#[cfg(test)]
mod test {
    use super::*;

    /// Verifies the presets are internally consistent.
    #[test]
    fn test_presets_validate() {
        for profile in [
            CertificateProfile::end_user(),
            CertificateProfile::sub_ca(),
            CertificateProfile::root_ca(),
        ] {
            profile.validate().unwrap();
        }
        assert!(!CertificateProfile::end_user().profile_type.is_ca());
        assert!(CertificateProfile::sub_ca().profile_type.is_ca());
        assert_eq!(CertificateProfile::root_ca().profile_type, ProfileType::RootCa);
        assert!(CertificateProfile::sub_ca().extended_key_usage.is_empty());
    }

    /// Verifies TOML loading on top of the end user defaults.
    #[test]
    fn test_from_toml() {
        let profile = CertificateProfile::from_toml(
            r#"
            name = "TLS"
            validity_days = 90
            key_usage = ["digital_signature", "key_encipherment"]
            extended_key_usage = ["server_auth", "1.3.6.1.4.1.311.10.3.4"]
            use_certificate_policies = true
            certificate_policy_id = "1.2.3.4; 1.2.3.5"

            [qc_statements]
            semantics_id = "0.4.0.194121.1.2"
            "#,
        )
        .unwrap();
        assert_eq!(profile.validity_days, 90);
        assert_eq!(profile.profile_type, ProfileType::EndEntity);

        let parsed = profile.parse().unwrap();
        assert_eq!(parsed.extended_key_usage[0], oid::KP_SERVER_AUTH);
        assert_eq!(parsed.policy_ids.len(), 2);
        assert!(parsed.qc_semantics_id.is_some());
        assert_eq!(
            key_usage_flags(&profile.key_usage),
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment
        );
    }

    /// Verifies that malformed strings fail at load time.
    #[test]
    fn test_rejects_malformed_strings() {
        let cases = [
            "extended_key_usage = [\"nonsense\"]",
            "certificate_policy_id = \"1.2.x\"",
            "crl_issuer = \"CN=A;NOPE\"",
            "subject_dn_subset = [\"XYZ\"]",
            "[qc_statements]\nra_name = \"bogus=1\"",
            "[qc_statements]\nuse_etsi_value_limit = true\netsi_value_limit_currency = \"EURO\"",
        ];
        for case in cases {
            let err = CertificateProfile::from_toml(case).unwrap_err();
            assert!(
                matches!(err, Error::InvalidProfileConfiguration { .. }),
                "{case}: {err}"
            );
        }
    }
}
