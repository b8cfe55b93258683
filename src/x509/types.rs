// caforge: certificate authority engine
// Copyright 2026 Dark Bio AG. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::pem;
use der::flagset::FlagSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

/// Free-form per-subject data carried alongside a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedInformation {
    /// Subject directory attributes, e.g.
    /// `dateOfBirth=19700101, countryOfCitizenship=SE`.
    pub subject_directory_attributes: Option<String>,
    /// Arbitrary key/value data, available to extension plugins.
    pub custom_data: BTreeMap<String, String>,
}

/// Per-issuance input.
#[derive(Clone, Debug)]
pub struct SubjectRequest {
    /// Subject DN in `CN=..,O=..` form.
    pub subject_dn: String,
    /// Subject alternative names in `dnsName=..,rfc822Name=..` form.
    pub subject_alt_name: Option<String>,
    /// Public key to certify.
    pub public_key: SubjectPublicKeyInfoOwned,
    /// Requested key usage; only honored if the profile allows it.
    pub key_usage: Option<FlagSet<KeyUsages>>,
    /// Requested notBefore (UNIX seconds); only honored if the profile allows it.
    pub not_before: Option<u64>,
    /// Requested notAfter (UNIX seconds); only honored if the profile allows it.
    pub not_after: Option<u64>,
    pub extended_information: ExtendedInformation,
}

impl SubjectRequest {
    /// Creates a request with only the mandatory fields set.
    pub fn new(subject_dn: impl Into<String>, public_key: SubjectPublicKeyInfoOwned) -> Self {
        Self {
            subject_dn: subject_dn.into(),
            subject_alt_name: None,
            public_key,
            key_usage: None,
            not_before: None,
            not_after: None,
            extended_information: ExtendedInformation::default(),
        }
    }
}

/// A signed, self-verified certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedCertificate {
    pub(crate) der: Vec<u8>,
    pub(crate) serial: SerialNumber,
    pub(crate) not_before: u64,
    pub(crate) not_after: u64,
}

impl GeneratedCertificate {
    /// Returns the DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Consumes the certificate, returning the DER encoding.
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }

    /// Returns the PEM encoding.
    pub fn to_pem(&self) -> String {
        pem::encode(pem::CERTIFICATE, &self.der)
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    pub fn not_before(&self) -> u64 {
        self.not_before
    }

    pub fn not_after(&self) -> u64 {
        self.not_after
    }
}

/// A signed, self-verified CRL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedCrl {
    pub(crate) der: Vec<u8>,
    pub(crate) crl_number: u64,
    pub(crate) this_update: u64,
    pub(crate) next_update: u64,
}

impl GeneratedCrl {
    /// Returns the DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Consumes the CRL, returning the DER encoding.
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }

    /// Returns the PEM encoding.
    pub fn to_pem(&self) -> String {
        pem::encode(pem::X509_CRL, &self.der)
    }

    pub fn crl_number(&self) -> u64 {
        self.crl_number
    }

    pub fn this_update(&self) -> u64 {
        self.this_update
    }

    pub fn next_update(&self) -> u64 {
        self.next_update
    }
}

/// CRLReason codes (RFC 5280, section 5.3.1). Value 7 is unassigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    #[default]
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    /// Returns the ENUMERATED value.
    pub fn code(self) -> u8 {
        match self {
            RevocationReason::Unspecified => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
            RevocationReason::CertificateHold => 6,
            RevocationReason::RemoveFromCrl => 8,
            RevocationReason::PrivilegeWithdrawn => 9,
            RevocationReason::AaCompromise => 10,
        }
    }
}

/// One revoked certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevocationEntry {
    pub serial: SerialNumber,
    /// Revocation time (UNIX seconds).
    pub revoked_at: u64,
    pub reason: RevocationReason,
}

/// The parts of a CA's own certificate the builders need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuerCertificate {
    /// The full certificate.
    pub der: Vec<u8>,
    /// Subject name, re-encoding to exactly the certificate's subject bytes.
    pub subject: Name,
    /// notAfter (UNIX seconds).
    pub not_after: u64,
    /// Contents of the subject key identifier extension, if present.
    pub subject_key_id: Option<Vec<u8>>,
    pub public_key: SubjectPublicKeyInfoOwned,
}
