// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use super::{from_toml, read, split_list};
use crate::error::{Error, Result};
use crate::pem;
use crate::x509::name::{DistinguishedName, DnEncoding};
use crate::x509::{IssuerCertificate, SerialNumberAllocator, verify};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use x509_cert::name::Name;

/// Signer certificate state of a CA.
#[derive(Clone, Debug, Default)]
pub enum CaCertificate {
    /// A root CA being created; no certificate exists yet, so the issuer name
    /// is derived from the configured subject DN.
    #[default]
    RootInitialization,
    /// The CA already has a certificate (subordinate CA, or a root being
    /// renewed); its subject name is copied verbatim as issuer.
    SubordinateOrRenewal(Box<IssuerCertificate>),
}

/// Long-lived configuration of one CA.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaConfiguration {
    /// Display name of the CA.
    pub name: String,
    /// Subject DN of the CA, in `CN=..,O=..` form.
    pub subject_dn: String,
    /// String type used when encoding DNs this CA issues.
    pub dn_encoding: DnEncoding,
    /// Whether CRLs carry an authority key identifier.
    pub use_authority_key_identifier: bool,
    pub authority_key_identifier_critical: bool,
    /// Whether CRLs carry a CRL number.
    pub use_crl_number: bool,
    pub crl_number_critical: bool,
    /// `;` separated CRL distribution point URIs used by profiles that defer
    /// to the CA default.
    pub default_crl_distribution_point: String,
    /// `;` separated CRL issuer DNs paired with the default distribution points.
    pub default_crl_issuer: String,
    /// OCSP responder URI used by profiles that defer to the CA default.
    pub default_ocsp_locator: String,
    /// Encode policy user notices as UTF8String instead of BMPString.
    pub use_utf8_policy_text: bool,
    /// Hours between thisUpdate and nextUpdate of a CRL.
    pub crl_period_hours: u64,
    /// Hours between scheduled CRL runs (0 = derived from the period). Only
    /// consumed by the scheduler.
    pub crl_issue_interval_hours: u64,
    /// Minutes a new CRL is issued ahead of the previous nextUpdate. Only
    /// consumed by the scheduler.
    pub crl_overlap_minutes: u64,
    /// Octets in the serial numbers this CA assigns.
    pub serial_number_width: usize,
    /// Signer certificate state, attached after loading.
    #[serde(skip)]
    pub certificate: CaCertificate,
}

impl Default for CaConfiguration {
    fn default() -> Self {
        Self {
            name: String::new(),
            subject_dn: String::new(),
            dn_encoding: DnEncoding::Utf8,
            use_authority_key_identifier: true,
            authority_key_identifier_critical: false,
            use_crl_number: true,
            crl_number_critical: false,
            default_crl_distribution_point: String::new(),
            default_crl_issuer: String::new(),
            default_ocsp_locator: String::new(),
            use_utf8_policy_text: false,
            crl_period_hours: 24,
            crl_issue_interval_hours: 0,
            crl_overlap_minutes: 10,
            serial_number_width: SerialNumberAllocator::DEFAULT_WIDTH,
            certificate: CaCertificate::RootInitialization,
        }
    }
}

impl CaConfiguration {
    /// Creates a configuration with defaults for the given subject.
    pub fn new(name: impl Into<String>, subject_dn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject_dn: subject_dn.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = from_toml(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml(&read(path.as_ref())?)
    }

    /// Checks every string field for syntax.
    pub fn validate(&self) -> Result<()> {
        let dn = DistinguishedName::parse(&self.subject_dn)
            .map_err(|e| Error::invalid_profile(format!("CA subject DN: {e}")))?;
        if dn.is_empty() {
            return Err(Error::invalid_profile("CA subject DN is empty"));
        }
        dn.to_name(self.dn_encoding)
            .map_err(|e| Error::invalid_profile(format!("CA subject DN: {e}")))?;

        for issuer in split_list(&self.default_crl_issuer) {
            DistinguishedName::parse(issuer)
                .and_then(|dn| dn.to_name(self.dn_encoding))
                .map_err(|e| Error::invalid_profile(format!("default CRL issuer: {e}")))?;
        }
        for uri in split_list(&self.default_crl_distribution_point)
            .chain(split_list(&self.default_ocsp_locator))
        {
            if !uri.is_ascii() {
                return Err(Error::invalid_profile(format!("non-ASCII URI {uri:?}")));
            }
        }
        if self.crl_period_hours == 0 {
            return Err(Error::invalid_profile("CRL period must be at least one hour"));
        }
        SerialNumberAllocator::with_width(self.serial_number_width)?;
        Ok(())
    }

    /// Attaches the CA's own certificate from DER.
    pub fn with_certificate_der(mut self, der: &[u8]) -> Result<Self> {
        let cert = verify::inspect_ca_certificate(der)?;
        self.certificate = CaCertificate::SubordinateOrRenewal(Box::new(cert));
        Ok(self)
    }

    /// Attaches the CA's own certificate from PEM.
    pub fn with_certificate_pem(self, pem_str: &str) -> Result<Self> {
        let der = pem::decode_labeled(pem_str.as_bytes(), pem::CERTIFICATE).map_err(|e| {
            Error::InvalidCaCertificate {
                details: e.to_string(),
            }
        })?;
        self.with_certificate_der(&der)
    }

    /// Returns the signer certificate, if one is attached.
    pub fn issuer_certificate(&self) -> Option<&IssuerCertificate> {
        match &self.certificate {
            CaCertificate::RootInitialization => None,
            CaCertificate::SubordinateOrRenewal(cert) => Some(cert),
        }
    }

    /// Encodes the configured subject DN with the CA's string mode.
    pub(crate) fn encoded_subject(&self) -> Result<Name> {
        DistinguishedName::parse(&self.subject_dn)
            .and_then(|dn| dn.to_name(self.dn_encoding))
            .map_err(|e| Error::invalid_profile(format!("CA subject DN: {e}")))
    }

    /// Resolves the issuer name for anything this CA signs: the subject of
    /// the existing certificate byte for byte, or the re-encoded subject DN
    /// while the root is being initialized.
    pub(crate) fn issuer_name(&self) -> Result<Name> {
        match &self.certificate {
            CaCertificate::RootInitialization => {
                debug!(ca = %self.name, "using configured subject DN as issuer DN");
                self.encoded_subject()
            }
            CaCertificate::SubordinateOrRenewal(cert) => {
                debug!(ca = %self.name, "using issuer DN from the CA certificate");
                Ok(cert.subject.clone())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Verifies that TOML loading applies defaults and validates.
    #[test]
    fn test_from_toml_defaults() {
        let config = CaConfiguration::from_toml(
            r#"
            name = "Issuing CA"
            subject_dn = "CN=Issuing CA,O=Example,C=SE"
            dn_encoding = "printable"
            default_crl_distribution_point = "http://a/crl;http://b/crl"
            default_crl_issuer = "CN=X"
            "#,
        )
        .unwrap();
        assert_eq!(config.dn_encoding, DnEncoding::Printable);
        assert_eq!(config.crl_period_hours, 24);
        assert_eq!(config.crl_overlap_minutes, 10);
        assert_eq!(config.serial_number_width, SerialNumberAllocator::DEFAULT_WIDTH);
        assert!(config.use_crl_number);
        assert!(config.issuer_certificate().is_none());
    }

    /// Verifies load-time rejection of malformed values.
    #[test]
    fn test_from_toml_rejects_invalid() {
        let err = CaConfiguration::from_toml("subject_dn = \"CN\"").unwrap_err();
        assert!(matches!(err, Error::InvalidProfileConfiguration { .. }));

        let err = CaConfiguration::from_toml(
            "subject_dn = \"CN=A\"\ndefault_crl_issuer = \"BOGUS=1\"",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidProfileConfiguration { .. }));

        let err = CaConfiguration::from_toml("subject_dn = \"CN=A\"\ncrl_period_hours = 0")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProfileConfiguration { .. }));

        let err = CaConfiguration::from_toml("subject_dn = \"CN=A\"\nserial_number_width = 21")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProfileConfiguration { .. }));

        let err = CaConfiguration::from_toml("subject_dn = [").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    /// Verifies that a missing file is a configuration error.
    #[test]
    fn test_load_missing_file() {
        let err = CaConfiguration::load("/nonexistent/caforge/ca.toml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    /// Verifies that garbage certificates are refused when attached.
    #[test]
    fn test_with_certificate_rejects_garbage() {
        let err = CaConfiguration::new("ca", "CN=A")
            .with_certificate_der(&[0x30, 0x03, 0x02, 0x01, 0x01])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCaCertificate { .. }));
    }
}
